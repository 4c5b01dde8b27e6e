use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    State(#[from] salon_state::StateError),

    #[error(transparent)]
    Handler(#[from] salon_handlers::HandlerError),

    #[error(transparent)]
    Action(#[from] salon_fsm::action::ActionError),

    #[error(transparent)]
    Core(#[from] salon_core::SalonError),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
