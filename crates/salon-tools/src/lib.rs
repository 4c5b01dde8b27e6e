//! The Tool Registry & Executor (C6, spec.md §4.6): the fixed table of
//! tools the booking and non-booking handlers call into, a process-local
//! stylist cache, and the availability slot math shared by the two
//! calendar-search tools.

pub mod cache;
pub mod context;
pub mod error;
pub mod executor;
pub mod registry;
pub mod tools;

pub use cache::StylistCache;
pub use context::ToolContext;
pub use error::{Result, ToolError};
pub use executor::execute;
pub use registry::{ToolSpec, BOOK, CHECK_AVAILABILITY, ESCALATE_TO_HUMAN, FIND_NEXT_AVAILABLE, LIST_STYLISTS, MANAGE_CUSTOMER, NON_BOOKING_TOOLSET, QUERY_INFO, SEARCH_SERVICES};
