//! Login state machine.
//!
//! ```text
//! unauthenticated → waitPhoneNumber → waitCode → ready
//!        └──────────────┴───────────────┴─────────┴──→ closed
//! ```
//!
//! Only `updateAuthorizationState` drives it. The machine itself is pure: it
//! returns the [`Effect`]s a transition implies and [`crate::Session`]
//! applies them.

use crate::ui::UiSignal;
use crate::update::{AuthorizationState, Update};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthPhase {
    #[default]
    Unauthenticated,
    WaitPhoneNumber,
    WaitCode,
    Ready,
    Closed,
}

/// Something the session must do in response to a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Status(String),
    Signal(UiSignal),
    /// Set the authorized flag.
    MarkAuthorized,
    /// Run the chat catalog fetch.
    FetchChats,
    /// Drop the client handle and reset the authorized flag.
    ClearSession,
}

#[derive(Clone, Debug, Default)]
pub struct AuthorizationMachine {
    phase: AuthPhase,
}

impl AuthorizationMachine {
    pub fn new() -> Self { Self::default() }

    pub fn phase(&self) -> AuthPhase { self.phase }

    pub fn is_closed(&self) -> bool { self.phase == AuthPhase::Closed }

    /// Feed an update. Anything but an authorization state change is a no-op.
    pub fn on_update(&mut self, update: &Update) -> Vec<Effect> {
        match update {
            Update::AuthorizationState(state) => self.on_state(state),
            Update::Raw { .. }                => Vec::new(),
        }
    }

    pub fn on_state(&mut self, state: &AuthorizationState) -> Vec<Effect> {
        if self.is_closed() {
            tracing::debug!("[layer-tdweb] session closed, ignoring {state:?}");
            return Vec::new();
        }

        let next = match state {
            AuthorizationState::WaitPhoneNumber => AuthPhase::WaitPhoneNumber,
            AuthorizationState::WaitCode        => AuthPhase::WaitCode,
            AuthorizationState::Ready           => AuthPhase::Ready,
            AuthorizationState::Closed          => AuthPhase::Closed,
            AuthorizationState::Other(tag)      => {
                return vec![Effect::Status(format!("Authorization state: {tag}"))];
            }
        };
        if next == self.phase {
            return Vec::new();
        }
        tracing::info!("[layer-tdweb] authorization: {:?} → {next:?}", self.phase);
        self.phase = next;

        match next {
            AuthPhase::WaitPhoneNumber => vec![
                Effect::Status("Please send your phone number.".into()),
                Effect::Signal(UiSignal::PhoneEntry(true)),
            ],
            AuthPhase::WaitCode => vec![
                Effect::Status("Enter the code Telegram sent you (SMS or app).".into()),
                Effect::Signal(UiSignal::CodeEntry(true)),
            ],
            AuthPhase::Ready => vec![
                Effect::Status("Authorized, chats can be loaded.".into()),
                Effect::MarkAuthorized,
                Effect::Signal(UiSignal::CodeEntry(false)),
                Effect::Signal(UiSignal::PhoneEntry(false)),
                Effect::Signal(UiSignal::Authorized),
                Effect::FetchChats,
            ],
            AuthPhase::Closed => vec![
                Effect::Status("Session closed.".into()),
                Effect::ClearSession,
                Effect::Signal(UiSignal::PhoneEntry(false)),
                Effect::Signal(UiSignal::Closed),
            ],
            AuthPhase::Unauthenticated => Vec::new(),
        }
    }
}
