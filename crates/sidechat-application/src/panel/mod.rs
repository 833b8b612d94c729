//! Side panel state machine.

pub mod composer;
pub mod state;

pub use composer::{Trigger, active_trigger};
pub use state::{ERROR_BANNER_TTL_SECS, ErrorBanner, PanelState, PopupKey, PopupState};
