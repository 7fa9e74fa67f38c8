mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{group_chat, private_chat, FakeTdlib, RecordingUi};
use layer_tdweb::{
    ActionError, AuthPhase, Binding, ChatKind, Config, HostError, HostMap, InitError, InvocationError,
    NativeFunction, Promise, Request, RpcError, Session, UiSignal,
};
use serde_json::json;

fn config() -> Config {
    Config::from_ui_input("12345", "0123456789abcdef").unwrap()
}

fn session() -> (Session<Arc<RecordingUi>>, Arc<RecordingUi>) {
    let ui = Arc::new(RecordingUi::default());
    (Session::new(config(), ui.clone()), ui)
}

fn scope(module: Binding) -> HostMap {
    HostMap::new().with("tdweb", module)
}

#[tokio::test]
async fn requests_fail_before_initialization() {
    let (mut s, ui) = session();
    assert_eq!(ui.last_status(), "Ready. Enter API_ID/API_HASH and initialize TDLib.");
    assert_eq!(s.invoke(&Request::new("getMe")).await.unwrap_err(), InvocationError::NotInitialized);
    assert_eq!(
        s.send_phone_number("+15550100").await.unwrap_err(),
        ActionError::Invocation(InvocationError::NotInitialized),
    );
    assert_eq!(s.send_code("12345").await.unwrap_err(), ActionError::Invocation(InvocationError::NotInitialized));
}

#[tokio::test]
async fn full_login_flow() {
    let td = FakeTdlib::with_chats(vec![(1, private_chat(1, 77)), (2, group_chat(2, "Rustaceans"))]);
    let (mut s, ui) = session();

    let mut updates = s.initialize(&scope(td.module("send"))).await.unwrap();
    assert_eq!(td.tags(), vec!["setTdlibParameters", "checkDatabaseEncryptionKey"]);
    let params = td.requests_of("setTdlibParameters")[0]["parameters"].clone();
    assert_eq!(params["api_id"], 12345);
    assert_eq!(params["system_language_code"], "en");
    assert_eq!(ui.last_status(), "TDLib initialized. Please send your phone number.");
    assert!(s.context().phone_entry_enabled());

    td.push_auth("authorizationStateWaitPhoneNumber");
    assert_eq!(s.drain(&mut updates).await, 1);
    assert_eq!(s.phase(), AuthPhase::WaitPhoneNumber);

    s.send_phone_number("  +15550100 ").await.unwrap();
    assert_eq!(td.requests_of("setAuthenticationPhoneNumber")[0]["phone_number"], "+15550100");

    td.push_auth("authorizationStateWaitCode");
    s.drain(&mut updates).await;
    assert_eq!(ui.last_status(), "Enter the code Telegram sent you (SMS or app).");

    s.send_code("12345").await.unwrap();
    assert_eq!(td.requests_of("checkAuthenticationCode")[0]["code"], "12345");

    td.push_auth("authorizationStateReady");
    s.drain(&mut updates).await;
    assert!(s.context().is_authorized());
    assert!(!s.context().phone_entry_enabled());
    assert_eq!(ui.last_status(), "Chats loaded (2).");

    let rendered = ui.rendered.lock().unwrap().last().cloned().unwrap();
    let lines: Vec<String> = rendered.iter().map(ToString::to_string).collect();
    assert_eq!(lines, vec!["private chat with user 77 (id: 1)", "Rustaceans (id: 2)"]);

    let signals = ui.signals();
    let tail = &signals[signals.len() - 3..];
    assert_eq!(tail, [UiSignal::CodeEntry(false), UiSignal::PhoneEntry(false), UiSignal::Authorized]);

    assert_eq!(s.send_phone_number("+15550100").await.unwrap_err(), ActionError::PhoneEntryDisabled);

    td.push_auth("authorizationStateClosed");
    s.drain(&mut updates).await;
    assert_eq!(s.phase(), AuthPhase::Closed);
    assert!(!s.context().is_initialized());
    assert_eq!(ui.signals().last(), Some(&UiSignal::Closed));
    assert_eq!(s.invoke(&Request::new("getMe")).await.unwrap_err(), InvocationError::NotInitialized);

    // closed is terminal
    td.push_auth("authorizationStateWaitPhoneNumber");
    s.drain(&mut updates).await;
    assert_eq!(s.phase(), AuthPhase::Closed);
}

#[tokio::test]
async fn repeated_state_is_applied_once() {
    let td = FakeTdlib::with_chats(Vec::new());
    let (mut s, ui) = session();
    let mut updates = s.initialize(&scope(td.module("invoke"))).await.unwrap();

    td.push_auth("authorizationStateWaitCode");
    td.push_auth("authorizationStateWaitCode");
    assert_eq!(s.drain(&mut updates).await, 2);
    let code_prompts = ui.signals().iter().filter(|sig| **sig == UiSignal::CodeEntry(true)).count();
    assert_eq!(code_prompts, 1);
}

#[tokio::test]
async fn unknown_states_only_touch_the_status() {
    let td = FakeTdlib::with_chats(Vec::new());
    let (mut s, ui) = session();
    let mut updates = s.initialize(&scope(td.module("send"))).await.unwrap();

    td.push_auth("authorizationStateWaitPassword");
    td.push(json!({"@type": "updateOption", "name": "version"}));
    s.drain(&mut updates).await;
    assert_eq!(ui.last_status(), "Authorization state: authorizationStateWaitPassword");
    assert_eq!(s.phase(), AuthPhase::Unauthenticated);
}

#[tokio::test]
async fn failed_chat_details_are_dropped() {
    // id 2 is listed but getChat fails for it
    let td = FakeTdlib::new(|req| match (req["@type"].as_str(), req["chat_id"].as_i64()) {
        (Some("getChats"), _)     => Binding::data(json!({"@type": "chats", "chat_ids": [1, "2", 3]})),
        (Some("getChat"), Some(2)) =>
            Binding::data(json!({"@type": "error", "code": 400, "message": "CHAT_NOT_FOUND"})),
        (Some("getChat"), Some(id)) => Binding::data(group_chat(id, "group")),
        _                         => Binding::data(json!({"@type": "ok"})),
    });
    let (mut s, _ui) = session();
    let mut updates = s.initialize(&scope(td.module("send"))).await.unwrap();
    td.push_auth("authorizationStateReady");
    s.drain(&mut updates).await;

    let chats = s.fetch_chats().await.unwrap();
    let ids: Vec<i64> = chats.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(chats[0].kind, ChatKind::BasicGroup);
}

#[tokio::test]
async fn chat_details_keep_list_order() {
    let td = FakeTdlib::new(|req| match req["@type"].as_str() {
        Some("getChats") => Binding::data(json!({"@type": "chats", "chat_ids": [10, 20, 30]})),
        Some("getChat")  => {
            let id = req["chat_id"].as_i64().unwrap();
            // the first chat answers last
            let delay = Duration::from_millis(40 - id as u64);
            Promise::new(async move {
                tokio::time::sleep(delay).await;
                Ok(Binding::data(group_chat(id, &format!("chat #{id}"))))
            })
            .into()
        }
        _ => Binding::data(json!({"@type": "ok"})),
    });
    let (mut s, ui) = session();
    let mut updates = s.initialize(&scope(td.module("invoke"))).await.unwrap();
    td.push_auth("authorizationStateReady");
    s.drain(&mut updates).await;

    let rendered = ui.rendered.lock().unwrap().last().cloned().unwrap();
    let ids: Vec<i64> = rendered.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![10, 20, 30]);
}

#[tokio::test]
async fn empty_chat_list_skips_details() {
    let td = FakeTdlib::with_chats(Vec::new());
    let (mut s, ui) = session();
    let mut updates = s.initialize(&scope(td.module("send"))).await.unwrap();
    td.push_auth("authorizationStateReady");
    s.drain(&mut updates).await;

    assert_eq!(ui.last_status(), "No chats found.");
    assert!(td.requests_of("getChat").is_empty());
    assert_eq!(ui.rendered.lock().unwrap().last().map(Vec::len), Some(0));
}

#[tokio::test]
async fn chat_list_error_is_reported() {
    let td = FakeTdlib::new(|req| match req["@type"].as_str() {
        Some("getChats") => Binding::data(json!({"@type": "error", "code": 420, "message": "FLOOD_WAIT_3"})),
        _                => Binding::data(json!({"@type": "ok"})),
    });
    let (mut s, ui) = session();
    let mut updates = s.initialize(&scope(td.module("send"))).await.unwrap();
    td.push_auth("authorizationStateReady");
    s.drain(&mut updates).await;

    assert!(ui.last_status().starts_with("Loading chats failed"));
    assert!(ui.last_status().contains("(code 420)"));
    let err = s.refresh_chats().await.unwrap_err();
    assert!(err.is("FLOOD_WAIT_*"));
}

#[tokio::test]
async fn chats_require_authorization() {
    let td = FakeTdlib::with_chats(vec![(1, group_chat(1, "one"))]);
    let (mut s, _ui) = session();
    s.initialize(&scope(td.module("send"))).await.unwrap();

    assert_eq!(s.fetch_chats().await.unwrap_err(), InvocationError::Unauthorized);
    assert!(td.requests_of("getChats").is_empty());
}

#[tokio::test]
async fn empty_input_is_rejected_locally() {
    let td = FakeTdlib::with_chats(Vec::new());
    let (mut s, _ui) = session();
    s.initialize(&scope(td.module("send"))).await.unwrap();

    assert_eq!(s.send_phone_number("   ").await.unwrap_err(), ActionError::EmptyInput("phone number"));
    assert_eq!(s.send_code("").await.unwrap_err(), ActionError::EmptyInput("code"));
    assert!(td.requests_of("setAuthenticationPhoneNumber").is_empty());
}

#[tokio::test]
async fn rejected_phone_number_surfaces_the_rpc_error() {
    let td = FakeTdlib::new(|req| match req["@type"].as_str() {
        Some("setAuthenticationPhoneNumber") =>
            Binding::data(json!({"@type": "error", "code": 400, "message": "PHONE_NUMBER_INVALID"})),
        _ => Binding::data(json!({"@type": "ok"})),
    });
    let (mut s, ui) = session();
    s.initialize(&scope(td.module("request"))).await.unwrap();

    let err = s.send_phone_number("123").await.unwrap_err();
    assert_eq!(err, ActionError::Invocation(InvocationError::Rpc(RpcError::new(400, "PHONE_NUMBER_INVALID"))));
    assert_eq!(ui.last_status(), "Sending the phone number failed: PHONE_NUMBER_INVALID (code 400)");
    assert!(!ui.signals().contains(&UiSignal::CodeEntry(true)));
}

#[tokio::test]
async fn missing_module_lists_candidates() {
    let (mut s, ui) = session();
    let err = s.initialize(&HostMap::new()).await.unwrap_err();
    match err {
        InitError::ModuleNotFound { candidates } => assert_eq!(candidates[0], "tdweb"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(ui.last_status().starts_with("Initialization failed: TDLib module not found"));
    assert!(!s.context().is_initialized());
}

#[tokio::test]
async fn rejected_parameters_fail_initialization() {
    let td = FakeTdlib::new(|req| match req["@type"].as_str() {
        Some("setTdlibParameters") => Binding::data(json!({"@type": "error", "code": 400, "message": "API_ID_INVALID"})),
        _                          => Binding::data(json!({"@type": "ok"})),
    });
    let (mut s, _ui) = session();
    let err = s.initialize(&scope(td.module("send"))).await.unwrap_err();
    assert_eq!(err, InitError::Rpc(RpcError::new(400, "API_ID_INVALID")));
    assert!(td.requests_of("checkDatabaseEncryptionKey").is_empty());
    assert!(!s.context().is_initialized());
}

#[tokio::test]
async fn module_without_client_shape_fails() {
    let module = HostMap::new().with("version", json!("1.8")).with("ready", json!(true));
    let (mut s, _ui) = session();
    let err = s.initialize(&scope(module.into())).await.unwrap_err();
    assert!(matches!(err, InitError::Instantiation(_)), "{err:?}");

    // an instance that came out of a factory but has nothing to send with
    let factory = NativeFunction::new("createClient")
        .on_call(|_| Ok(HostMap::new().with("close", json!(null)).into()));
    let err = s.initialize(&scope(HostMap::new().with("createClient", factory).into())).await.unwrap_err();
    assert!(matches!(err, InitError::Instantiation(_)), "{err:?}");
}

#[tokio::test]
async fn module_behind_a_promise_is_awaited() {
    let td = FakeTdlib::with_chats(Vec::new());
    let lazy = Promise::new({
        let module = td.module("invoke");
        async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(module)
        }
    });
    let scope = HostMap::new()
        .with("Td", Promise::rejected(HostError::thrown("still loading")))
        .with("TdWeb", lazy);
    let (mut s, _ui) = session();
    s.initialize(&scope).await.unwrap();
    assert_eq!(td.tags(), vec!["setTdlibParameters", "checkDatabaseEncryptionKey"]);
}

#[tokio::test]
async fn reinitialize_replaces_the_client() {
    let first  = FakeTdlib::with_chats(Vec::new());
    let second = FakeTdlib::with_chats(Vec::new());
    let (mut s, _ui) = session();

    let mut updates = s.initialize(&scope(first.module("send"))).await.unwrap();
    first.push_auth("authorizationStateWaitCode");
    s.drain(&mut updates).await;
    assert_eq!(s.phase(), AuthPhase::WaitCode);

    s.initialize(&scope(second.module("send"))).await.unwrap();
    assert_eq!(s.phase(), AuthPhase::Unauthenticated);
    s.send_phone_number("+15550100").await.unwrap();
    assert!(first.requests_of("setAuthenticationPhoneNumber").is_empty());
    assert_eq!(second.requests_of("setAuthenticationPhoneNumber").len(), 1);
}

#[tokio::test]
async fn run_stops_at_closed() {
    let td = FakeTdlib::with_chats(Vec::new());
    let (mut s, _ui) = session();
    let updates = s.initialize(&scope(td.module("send"))).await.unwrap();

    td.push_auth("authorizationStateWaitPhoneNumber");
    td.push_auth("authorizationStateClosed");
    tokio::time::timeout(Duration::from_secs(1), s.run(updates)).await.unwrap();
    assert_eq!(s.phase(), AuthPhase::Closed);
}
