/// Outcome of either validation layer (§4.4). Never panics or raises — a
/// rejected slot is reported back to the caller, who owns deciding what the
/// customer sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub error_message: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error_message: None,
        }
    }

    pub fn reject(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error_message: Some(message.into()),
        }
    }

    /// Combine two layers: the first rejection wins.
    pub fn and(self, other: Self) -> Self {
        if !self.valid {
            self
        } else {
            other
        }
    }
}
