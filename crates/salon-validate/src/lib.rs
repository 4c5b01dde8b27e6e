//! The Slot Validator (C4, spec.md §4.4): a structural layer (is this a
//! well-formed instant at all) and a policy layer (is the salon open then,
//! is it far enough out). Both return a plain `ValidationResult` rather than
//! an error type — an invalid slot is an expected, user-correctable outcome,
//! not a fault (§7 category 1).

pub mod error;
pub mod holidays;
pub mod result;
pub mod validator;

pub use error::ValidateError;
pub use result::ValidationResult;
pub use validator::SlotValidator;
