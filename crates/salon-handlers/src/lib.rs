//! Intent Router, Booking Handler, and Non-Booking Handler (C8, C9, C10;
//! spec.md §4.8-§4.10): the per-turn dispatch layer the orchestrator calls
//! into once a message has been classified.

pub mod booking;
pub mod error;
pub mod non_booking;
pub mod router;

pub use booking::BookingInput;
pub use error::{HandlerError, Result};
pub use non_booking::NonBookingInput;
pub use router::is_booking_intent;
