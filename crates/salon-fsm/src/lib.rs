//! The Booking FSM (C2, spec.md §4.2): transition table, transition
//! procedure, prescribed action per state, response guidance, and
//! checkpoint (de)serialization.

pub mod action;
pub mod data;
pub mod fsm;
pub mod guidance;
pub mod intent;
pub mod state;
pub mod templates;
pub mod transitions;

pub use action::{ActionType, FsmAction, ResponseGuidance, ToolCall};
pub use data::{CollectedData, ServiceDetail, SlotData};
pub use fsm::{BookingFsm, TransitionOutcome};
pub use intent::{Intent, IntentType};
pub use state::BookingState;
