use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use salon_core::config::MESSAGE_WINDOW;

/// Who sent a message in the bounded conversation window (§3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// The per-conversation checkpoint (§3.1). `fsm_state` is carried as an
/// opaque JSON value here — `salon-state` has no dependency on `salon-fsm`,
/// so the orchestrator is the one place that deserializes it into a live
/// `BookingFsm` via `BookingFsm::from_dict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub customer_phone: String,
    pub customer_id: Option<String>,
    pub messages: VecDeque<Message>,
    pub total_message_count: u64,
    pub fsm_state: serde_json::Value,
    pub error_count: u32,
    pub escalated: bool,
    /// Checked by the auditor (§4.1 step 8) against `fsm_state.state = BOOKED`.
    pub appointment_created: bool,
    pub name_confirmation_pending: bool,
    pub awaiting_category_choice: bool,
}

impl ConversationState {
    pub fn new(customer_phone: impl Into<String>) -> Self {
        Self {
            customer_phone: customer_phone.into(),
            customer_id: None,
            messages: VecDeque::new(),
            total_message_count: 0,
            fsm_state: serde_json::json!({"state": "IDLE", "collected_data": {}}),
            error_count: 0,
            escalated: false,
            appointment_created: false,
            name_confirmation_pending: false,
            awaiting_category_choice: false,
        }
    }

    /// Append a message, trimming the window to `MESSAGE_WINDOW` and
    /// incrementing the lifetime counter — §4.1 step 10.
    pub fn push_message(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push_back(Message {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
        while self.messages.len() > MESSAGE_WINDOW {
            self.messages.pop_front();
        }
        self.total_message_count += 1;
    }

    /// The last `k` messages, oldest first — used by the classifier (§4.3)
    /// and the non-booking handler prompt (§4.10).
    pub fn last_k(&self, k: usize) -> Vec<&Message> {
        let skip = self.messages.len().saturating_sub(k);
        self.messages.iter().skip(skip).collect()
    }

    /// §3.1 invariants: `len(messages) ≤ W`, `total_message_count ≥ len(messages)`.
    pub fn is_well_formed(&self) -> bool {
        self.messages.len() <= MESSAGE_WINDOW
            && self.total_message_count >= self.messages.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_bounded_to_message_window() {
        let mut state = ConversationState::new("+34600000000");
        for i in 0..(MESSAGE_WINDOW * 2) {
            state.push_message(MessageRole::User, format!("msg {i}"));
        }
        assert_eq!(state.messages.len(), MESSAGE_WINDOW);
        assert_eq!(state.total_message_count, (MESSAGE_WINDOW * 2) as u64);
        assert!(state.is_well_formed());
    }

    #[test]
    fn last_k_returns_most_recent_in_order() {
        let mut state = ConversationState::new("+34600000000");
        for i in 0..3 {
            state.push_message(MessageRole::User, format!("msg {i}"));
        }
        let last = state.last_k(2);
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].content, "msg 1");
        assert_eq!(last[1].content, "msg 2");
    }
}
