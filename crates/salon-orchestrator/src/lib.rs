//! The Orchestrator Node (C11, spec.md §4.1): the per-message driver that
//! wires together the state store, the FSM, the intent classifier, the
//! intent router/handlers, and the state-action audit into one turn.
//!
//! Also home to the circuit breaker registry (§5) every outbound call in
//! the turn is gated by, and the auditor that gives the turn's reply one
//! last coherence check before it is sent.

pub mod auditor;
pub mod breaker;
pub mod error;
pub mod node;

pub use breaker::{BreakerRegistry, BreakerState, CircuitBreaker};
pub use error::{OrchestratorError, Result};
pub use node::{Orchestrator, TurnOutcome};
