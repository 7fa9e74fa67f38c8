//! Shared fixtures: a recording UI and a scripted TDLib module.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use layer_tdweb::{Binding, ChatSummary, HostFunction, HostMap, NativeFunction, Ui, UiSignal};
use serde_json::{json, Value};

// ─── RecordingUi ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingUi {
    pub statuses: Mutex<Vec<String>>,
    pub signals:  Mutex<Vec<UiSignal>>,
    pub rendered: Mutex<Vec<Vec<ChatSummary>>>,
}

impl RecordingUi {
    pub fn last_status(&self) -> String {
        self.statuses.lock().unwrap().last().cloned().unwrap_or_default()
    }

    pub fn signals(&self) -> Vec<UiSignal> {
        self.signals.lock().unwrap().clone()
    }
}

impl Ui for RecordingUi {
    fn set_status(&self, text: &str) {
        self.statuses.lock().unwrap().push(text.to_string());
    }

    fn signal(&self, signal: UiSignal) {
        self.signals.lock().unwrap().push(signal);
    }

    fn render_chats(&self, chats: &[ChatSummary]) {
        self.rendered.lock().unwrap().push(chats.to_vec());
    }
}

// ─── FakeTdlib ────────────────────────────────────────────────────────────────

type Responder = dyn Fn(&Value) -> Binding + Send + Sync;

/// A TDLib stand-in: records requests, answers them through `responder` and
/// pushes updates through whatever callback the session handed it.
pub struct FakeTdlib {
    pub requests: Mutex<Vec<Value>>,
    callback:     Mutex<Option<Arc<dyn HostFunction>>>,
    responder:    Box<Responder>,
}

impl FakeTdlib {
    pub fn new(responder: impl Fn(&Value) -> Binding + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            requests:  Mutex::new(Vec::new()),
            callback:  Mutex::new(None),
            responder: Box::new(responder),
        })
    }

    /// Answers `ok` to everything except the chat calls, which come from `chats`.
    pub fn with_chats(chats: Vec<(i64, Value)>) -> Arc<Self> {
        Self::new(move |req| match req["@type"].as_str() {
            Some("getChats") => {
                let ids: Vec<i64> = chats.iter().map(|(id, _)| *id).collect();
                Binding::data(json!({"@type": "chats", "total_count": ids.len(), "chat_ids": ids}))
            }
            Some("getChat") => {
                let id = req["chat_id"].as_i64().unwrap_or_default();
                match chats.iter().find(|(i, _)| *i == id) {
                    Some((_, detail)) => Binding::data(detail.clone()),
                    None => Binding::data(json!({"@type": "error", "code": 400, "message": "CHAT_NOT_FOUND"})),
                }
            }
            _ => Binding::data(json!({"@type": "ok"})),
        })
    }

    /// A client object exposing the request capability `method`.
    pub fn client(self: &Arc<Self>, method: &'static str) -> Binding {
        let me = self.clone();
        let request = NativeFunction::new(method).on_call(move |args| {
            let req = args.first().and_then(|a| a.as_data().cloned()).unwrap_or_default();
            me.requests.lock().unwrap().push(req.clone());
            Ok((me.responder)(&req))
        });
        HostMap::new().with(method, request).into()
    }

    /// A module with a `createClient(options)` factory that keeps `options.onUpdate`.
    pub fn module(self: &Arc<Self>, method: &'static str) -> Binding {
        let me = self.clone();
        let factory = NativeFunction::new("createClient").on_call(move |args| {
            if let Some(Binding::Function(cb)) = args.first().and_then(|o| o.get("onUpdate")) {
                *me.callback.lock().unwrap() = Some(cb);
            }
            Ok(me.client(method))
        });
        HostMap::new().with("createClient", factory).into()
    }

    /// Push a raw update object to the session.
    pub fn push(&self, update: Value) {
        let cb = self.callback.lock().unwrap().clone().expect("no update callback registered");
        cb.call(vec![Binding::data(update)]).unwrap();
    }

    pub fn push_auth(&self, state: &str) {
        self.push(json!({"@type": "updateAuthorizationState", "authorization_state": {"@type": state}}));
    }

    pub fn requests_of(&self, tag: &str) -> Vec<Value> {
        self.requests.lock().unwrap().iter().filter(|r| r["@type"] == tag).cloned().collect()
    }

    pub fn tags(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter()
            .filter_map(|r| r["@type"].as_str().map(str::to_string))
            .collect()
    }
}

pub fn private_chat(id: i64, user_id: i64) -> Value {
    json!({"@type": "chat", "id": id, "title": "", "type": {"@type": "chatTypePrivate", "user_id": user_id}})
}

pub fn group_chat(id: i64, title: &str) -> Value {
    json!({"@type": "chat", "id": id, "title": title, "type": {"@type": "chatTypeBasicGroup", "basic_group_id": id}})
}
