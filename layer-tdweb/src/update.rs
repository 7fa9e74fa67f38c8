//! Updates pushed by the client.
//!
//! The client is handed a [`NativeFunction`] callback that classifies each
//! pushed object into an [`Update`] and forwards it over an unbounded
//! channel. The session reads them back from the [`UpdateStream`].

use serde_json::Value;
use tokio::sync::mpsc;

use crate::functions::type_tag;
use crate::host::{Binding, NativeFunction};

// ─── AuthorizationState ──────────────────────────────────────────────────────

/// The `authorization_state` carried by `updateAuthorizationState`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthorizationState {
    WaitPhoneNumber,
    WaitCode,
    Ready,
    Closed,
    /// Any other state, by its `@type` tag.
    Other(String),
}

impl AuthorizationState {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "authorizationStateWaitPhoneNumber" => Self::WaitPhoneNumber,
            "authorizationStateWaitCode"        => Self::WaitCode,
            "authorizationStateReady"           => Self::Ready,
            "authorizationStateClosed"          => Self::Closed,
            other                               => Self::Other(other.to_string()),
        }
    }
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum Update {
    AuthorizationState(AuthorizationState),
    /// Anything else, with its tag and full payload.
    Raw { tag: String, payload: Value },
}

impl Update {
    /// Classify a pushed object. Objects without a type tag are dropped.
    pub fn from_value(value: Value) -> Option<Self> {
        let tag = type_tag(&value)?.to_string();
        if tag != "updateAuthorizationState" {
            return Some(Self::Raw { tag, payload: value });
        }
        let state = value
            .get("authorization_state")
            .and_then(type_tag)
            .unwrap_or("unknown");
        Some(Self::AuthorizationState(AuthorizationState::from_tag(state)))
    }

    /// Classify a pushed host value.
    pub fn from_binding(b: &Binding) -> Option<Self> {
        match b {
            Binding::Data(v) => Self::from_value(v.clone()),
            other => {
                tracing::debug!("[layer-tdweb] ignoring non-data update {other:?}");
                None
            }
        }
    }

    /// Classify a DOM-style event, which carries the update in `detail`.
    /// Events without one are classified as they are.
    pub fn from_event(event: &Binding) -> Option<Self> {
        match event.get("detail") {
            Some(detail) => Self::from_binding(&detail),
            None         => Self::from_binding(event),
        }
    }
}

// ─── UpdateStream ─────────────────────────────────────────────────────────────

/// Asynchronous stream of [`Update`]s.
#[derive(Debug)]
pub struct UpdateStream {
    rx: mpsc::UnboundedReceiver<Update>,
}

impl UpdateStream {
    /// Wait for the next update. Returns `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<Update> {
        self.rx.recv().await
    }

    /// The next update if one is already queued.
    pub fn try_next(&mut self) -> Option<Update> {
        self.rx.try_recv().ok()
    }
}

/// The producing half: a host callback that feeds an [`UpdateStream`].
#[derive(Clone)]
pub struct UpdateSink {
    tx: mpsc::UnboundedSender<Update>,
}

impl UpdateSink {
    pub fn channel() -> (Self, UpdateStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, UpdateStream { rx })
    }

    /// Push an already classified update.
    pub fn push(&self, update: Update) {
        if self.tx.send(update).is_err() {
            tracing::debug!("[layer-tdweb] update stream closed, dropping update");
        }
    }

    /// The callback to hand to the client; it receives bare update objects.
    pub fn callback(&self) -> Binding {
        self.forward("onUpdate", Update::from_binding)
    }

    /// The listener for `addEventListener`; it receives events.
    pub fn listener(&self) -> Binding {
        self.forward("onUpdateEvent", Update::from_event)
    }

    fn forward(&self, name: &str, classify: fn(&Binding) -> Option<Update>) -> Binding {
        let sink = self.clone();
        NativeFunction::new(name)
            .on_call(move |args| {
                if let Some(update) = args.first().and_then(classify) {
                    sink.push(update);
                }
                Ok(Binding::Undefined)
            })
            .into()
    }
}

// ─── Registration ─────────────────────────────────────────────────────────────

/// How the update callback got attached to the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateHook {
    /// `client.on("update", cb)`
    On,
    /// `client.addEventListener("update", cb)`, event `detail` unwrapped.
    AddEventListener,
    /// `client.setOnUpdate(cb)`
    SetOnUpdate,
    /// `client.onUpdate(cb)`
    OnUpdate,
}

impl UpdateHook {
    const ORDER: [UpdateHook; 4] = [Self::On, Self::AddEventListener, Self::SetOnUpdate, Self::OnUpdate];

    fn method_name(self) -> &'static str {
        match self {
            Self::On               => "on",
            Self::AddEventListener => "addEventListener",
            Self::SetOnUpdate      => "setOnUpdate",
            Self::OnUpdate         => "onUpdate",
        }
    }

    fn args(self, sink: &UpdateSink) -> Vec<Binding> {
        match self {
            Self::On                           => vec![Binding::data("update"), sink.callback()],
            Self::AddEventListener             => vec![Binding::data("update"), sink.listener()],
            Self::SetOnUpdate | Self::OnUpdate => vec![sink.callback()],
        }
    }
}

/// Attach `sink` to the first registration mechanism `client` offers.
///
/// Returns `None` (and warns) when nothing could be attached; the session
/// still works but will never see authorization changes.
pub fn register(client: &Binding, sink: &UpdateSink) -> Option<UpdateHook> {
    for hook in UpdateHook::ORDER {
        let Some(method) = client.method(hook.method_name()) else { continue };
        match method.call(hook.args(sink)) {
            Ok(_) => {
                tracing::debug!("[layer-tdweb] update handler attached via {}()", hook.method_name());
                return Some(hook);
            }
            Err(e) => tracing::warn!("[layer-tdweb] {}() threw ({e}), trying next", hook.method_name()),
        }
    }
    tracing::warn!(
        "[layer-tdweb] no update hook (on / addEventListener / setOnUpdate / onUpdate); updates will not be received"
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HostError;
    use crate::host::HostMap;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn auth(tag: &str) -> Value {
        json!({"@type": "updateAuthorizationState", "authorization_state": {"@type": tag}})
    }

    #[test]
    fn classifies_authorization_updates() {
        assert_eq!(
            Update::from_value(auth("authorizationStateWaitCode")),
            Some(Update::AuthorizationState(AuthorizationState::WaitCode)),
        );
        assert_eq!(
            Update::from_value(auth("authorizationStateLoggingOut")),
            Some(Update::AuthorizationState(AuthorizationState::Other("authorizationStateLoggingOut".into()))),
        );
        assert!(matches!(
            Update::from_value(json!({"type": "updateNewMessage"})),
            Some(Update::Raw { ref tag, .. }) if tag == "updateNewMessage"
        ));
        assert_eq!(Update::from_value(json!({"no": "tag"})), None);
    }

    #[test]
    fn detail_is_unwrapped_for_events_only() {
        let event = Binding::from(HostMap::new().with("detail", auth("authorizationStateReady")));
        assert_eq!(
            Update::from_event(&event),
            Some(Update::AuthorizationState(AuthorizationState::Ready)),
        );
        assert_eq!(Update::from_event(&Binding::data(auth("authorizationStateWaitCode"))),
            Some(Update::AuthorizationState(AuthorizationState::WaitCode)));

        // a bare update that happens to carry a `detail` field is read as is
        let mut bare = auth("authorizationStateWaitCode");
        bare["detail"] = auth("authorizationStateReady");
        assert_eq!(
            Update::from_binding(&Binding::data(bare)),
            Some(Update::AuthorizationState(AuthorizationState::WaitCode)),
        );
    }

    type Calls = Arc<Mutex<Vec<Vec<Binding>>>>;

    /// A hook method that records its arguments, throwing if `throws`.
    fn hook(name: &'static str, calls: &Calls, throws: bool) -> NativeFunction {
        let calls = calls.clone();
        NativeFunction::new(name).on_call(move |args| {
            calls.lock().unwrap().push(args);
            if throws { Err(HostError::thrown("unsupported event")) } else { Ok(Binding::Undefined) }
        })
    }

    #[tokio::test]
    async fn on_comes_first_with_the_event_name() {
        let on: Calls = Arc::default();
        let listen: Calls = Arc::default();
        let client = Binding::from(
            HostMap::new()
                .with("addEventListener", hook("addEventListener", &listen, false))
                .with("setOnUpdate", hook("setOnUpdate", &listen, false))
                .with("on", hook("on", &on, false)),
        );
        let (sink, mut stream) = UpdateSink::channel();
        assert_eq!(register(&client, &sink), Some(UpdateHook::On));
        assert!(listen.lock().unwrap().is_empty());

        let args = on.lock().unwrap()[0].clone();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].as_data(), Some(&json!("update")));
        let Binding::Function(cb) = &args[1] else { panic!("callback is not a function") };
        cb.call(vec![Binding::data(auth("authorizationStateWaitCode"))]).unwrap();
        assert_eq!(stream.next().await, Some(Update::AuthorizationState(AuthorizationState::WaitCode)));
    }

    #[tokio::test]
    async fn throwing_hook_falls_through_to_the_next() {
        let on: Calls = Arc::default();
        let listen: Calls = Arc::default();
        let client = Binding::from(
            HostMap::new()
                .with("on", hook("on", &on, true))
                .with("addEventListener", hook("addEventListener", &listen, false)),
        );
        let (sink, mut stream) = UpdateSink::channel();
        assert_eq!(register(&client, &sink), Some(UpdateHook::AddEventListener));
        assert_eq!(on.lock().unwrap().len(), 1);

        let args = listen.lock().unwrap()[0].clone();
        assert_eq!(args[0].as_data(), Some(&json!("update")));
        let Binding::Function(cb) = &args[1] else { panic!("listener is not a function") };
        let event = HostMap::new().with("detail", auth("authorizationStateReady"));
        cb.call(vec![event.into()]).unwrap();
        assert_eq!(stream.next().await, Some(Update::AuthorizationState(AuthorizationState::Ready)));
    }

    #[tokio::test]
    async fn registers_first_available_hook() {
        let stored: Arc<Mutex<Option<Binding>>> = Arc::default();
        let slot = stored.clone();
        let client = Binding::from(
            HostMap::new()
                .with("onUpdate", NativeFunction::new("onUpdate").on_call(|_| Ok(Binding::Undefined)))
                .with("setOnUpdate", NativeFunction::new("setOnUpdate").on_call(move |args| {
                    *slot.lock().unwrap() = args.into_iter().next();
                    Ok(Binding::Undefined)
                })),
        );
        let (sink, mut stream) = UpdateSink::channel();
        assert_eq!(register(&client, &sink), Some(UpdateHook::SetOnUpdate));

        let cb = stored.lock().unwrap().clone().unwrap();
        let Binding::Function(cb) = cb else { panic!("callback is not a function") };
        cb.call(vec![Binding::data(auth("authorizationStateWaitPhoneNumber"))]).unwrap();
        assert_eq!(
            stream.next().await,
            Some(Update::AuthorizationState(AuthorizationState::WaitPhoneNumber)),
        );
    }

    #[test]
    fn stream_is_debug() {
        let (_sink, stream) = UpdateSink::channel();
        assert!(format!("{stream:?}").starts_with("UpdateStream"));
    }

    #[test]
    fn no_hook_is_not_fatal() {
        let (sink, _stream) = UpdateSink::channel();
        assert_eq!(register(&Binding::from(HostMap::new()), &sink), None);
    }
}
