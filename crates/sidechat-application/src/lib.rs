//! Application layer: the chat mediator and the panel state machine.

pub mod mediator;
pub mod panel;

pub use mediator::{ChatMediator, EventSender, RequestState, SendOutcome};
pub use panel::PanelState;
