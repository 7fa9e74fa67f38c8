//! The UI collaborator.
//!
//! DOM lookup, button wiring and list rendering live in the embedding page.
//! The session only talks to it through [`Ui`].

use std::sync::Arc;

use crate::catalog::ChatSummary;

/// UI state transitions emitted by the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiSignal {
    /// Show (`true`) or disable (`false`) phone number entry.
    PhoneEntry(bool),
    /// Show (`true`) or hide (`false`) login code entry.
    CodeEntry(bool),
    /// Login finished; show the chat list.
    Authorized,
    /// The session was closed.
    Closed,
}

pub trait Ui {
    fn set_status(&self, text: &str);
    fn signal(&self, signal: UiSignal);
    fn render_chats(&self, chats: &[ChatSummary]);
}

impl<U: Ui + ?Sized> Ui for Arc<U> {
    fn set_status(&self, text: &str) { (**self).set_status(text) }
    fn signal(&self, signal: UiSignal) { (**self).signal(signal) }
    fn render_chats(&self, chats: &[ChatSummary]) { (**self).render_chats(chats) }
}

impl<U: Ui + ?Sized> Ui for &U {
    fn set_status(&self, text: &str) { (**self).set_status(text) }
    fn signal(&self, signal: UiSignal) { (**self).signal(signal) }
    fn render_chats(&self, chats: &[ChatSummary]) { (**self).render_chats(chats) }
}
