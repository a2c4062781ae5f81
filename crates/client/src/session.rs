//! Session error state machine.
//!
//! Consumes error signals from every store and decides between three states:
//!
//! ```text
//!                 transport-error
//!   ┌────────┐ ─────────────────────▶ ┌──────────┐
//!   │ normal │                         │ degraded │
//!   └────────┘ ◀───────────────────── └──────────┘
//!     ▲    │            none                │
//!     │    │ auth-error                     │ auth-error
//!     │    ▼                                ▼
//!   ┌──────────────────────────────────────────┐
//!   │        recovering-from-auth-error        │
//!   └──────────────────────────────────────────┘
//!        none, or the guest identity observed → normal
//! ```
//!
//! Entering `recovering-from-auth-error` while an authenticated identity is
//! current yields a single [`SessionEffect::ForceSignOut`]. Degraded mode
//! blocks the UI with a reconnection notice; auth recovery never does.

use crust_core::Identity;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Error signal derived from the outcome of a remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionErrorCode {
    #[default]
    None,
    AuthError,
    TransportError,
}

/// Internal state of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Normal,
    RecoveringFromAuthError,
    Degraded,
}

/// Mode exposed to rendering layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Normal,
    /// Remote connectivity is impaired; show a blocking reconnection notice.
    Degraded,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    /// Sign the current identity out.
    ForceSignOut,
}

/// The result of feeding one input to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionState,
    pub to: SessionState,
    pub effect: Option<SessionEffect>,
}

impl Transition {
    /// Returns `true` if the state changed.
    #[must_use]
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }
}

/// See the module documentation for the transition table.
#[derive(Debug, Clone, Default)]
pub struct SessionErrorMachine {
    state: SessionState,
    code: SessionErrorCode,
}

impl SessionErrorMachine {
    /// Create a machine in the `normal` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// The current session error code.
    #[must_use]
    pub const fn code(&self) -> SessionErrorCode {
        self.code
    }

    #[must_use]
    pub const fn mode(&self) -> SessionMode {
        match self.state {
            SessionState::Degraded => SessionMode::Degraded,
            SessionState::Normal | SessionState::RecoveringFromAuthError => SessionMode::Normal,
        }
    }

    /// Feed an error signal. `identity` is the identity current at the time
    /// the signal is processed.
    pub fn signal(&mut self, code: SessionErrorCode, identity: &Identity) -> Transition {
        let from = self.state;
        let (to, effect) = match code {
            SessionErrorCode::None => (SessionState::Normal, None),
            SessionErrorCode::TransportError => (SessionState::Degraded, None),
            SessionErrorCode::AuthError => {
                // One sign-out per recovery, however many auth errors follow.
                let effect = (from != SessionState::RecoveringFromAuthError
                    && identity.is_authenticated())
                .then_some(SessionEffect::ForceSignOut);
                (SessionState::RecoveringFromAuthError, effect)
            }
        };
        self.state = to;
        self.code = code;
        self.record(Transition { from, to, effect })
    }

    /// The guest identity has been observed: an auth recovery is complete.
    pub fn guest_observed(&mut self) -> Transition {
        let from = self.state;
        if from == SessionState::RecoveringFromAuthError {
            self.state = SessionState::Normal;
            self.code = SessionErrorCode::None;
        }
        self.record(Transition {
            from,
            to: self.state,
            effect: None,
        })
    }

    fn record(&self, transition: Transition) -> Transition {
        if transition.is_change() {
            info!(
                from = ?transition.from,
                to = ?transition.to,
                code = ?self.code,
                "Session state changed"
            );
        }
        transition
    }
}
