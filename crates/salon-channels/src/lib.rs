//! RPC clients for the two external dependencies the orchestrator calls out
//! to beyond the database: the messaging gateway (§6.3) and the calendar
//! (§6.4). Both are guarded by their own circuit breaker and retry policy
//! (§5, §7) rather than trusted to succeed.

pub mod calendar;
pub mod error;
pub mod messaging;
pub mod retry;

pub use calendar::{
    BusyInterval, CalendarClient, CalendarEvent, EventPatch, GoogleCalendarClient,
    GoogleCalendarConfig, NewEvent,
};
pub use error::ChannelError;
pub use messaging::{ChatwootConfig, ChatwootGateway, MessagingGateway};
pub use retry::retry_with_backoff;
