//! layer-tdweb-demo — Interactive login against a scripted, in-process TDLib module.
//!
//! Nothing leaves the machine: the module registered under `tdweb` answers
//! every request itself and pushes the authorization updates a real TDLib
//! build would. Run:
//!   cargo run -p layer-tdweb-demo
//!
//! Any positive API_ID and non-empty API_HASH are accepted. The login code is
//! `12345`.

use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

use layer_tdweb::{
    AuthPhase, Binding, ChatSummary, Config, HostFunction, HostMap, NativeFunction, Promise, Request,
    Session, Ui, UiSignal,
};
use serde_json::{json, Value};

const DEMO_CODE: &str = "12345";

#[tokio::main]
async fn main() {
    // Enable logging: RUST_LOG=layer_tdweb=debug cargo run -p layer-tdweb-demo
    if std::env::var("RUST_LOG").is_err() {
        // SAFETY: single-threaded at this point, no other threads reading env
        unsafe { std::env::set_var("RUST_LOG", "layer_tdweb=info,layer_tdweb_demo=info"); }
    }
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("\n✗ {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let api_id   = prompt("API_ID: ")?;
    let api_hash = prompt("API_HASH: ")?;
    let config   = Config::from_ui_input(&api_id, &api_hash)?;

    let scope = HostMap::new().with("tdweb", ScriptedTdlib::new().module());
    let mut session = Session::new(config, TerminalUi);
    let mut updates = session.initialize(&scope).await?;
    session.drain(&mut updates).await;

    // ── Login ──────────────────────────────────────────────────────────
    loop {
        match session.phase() {
            AuthPhase::Unauthenticated | AuthPhase::WaitPhoneNumber => {
                let phone = prompt("Phone number (international format): ")?;
                // failures are already on the status line; ask again
                let _ = session.send_phone_number(&phone).await;
            }
            AuthPhase::WaitCode => {
                let code = prompt(&format!("Login code (the demo accepts {DEMO_CODE}): "))?;
                let _ = session.send_code(&code).await;
            }
            AuthPhase::Ready | AuthPhase::Closed => break,
        }
        session.drain(&mut updates).await;
    }

    // ── Reload, then shut down ─────────────────────────────────────────
    if session.context().is_authorized() {
        if prompt("Reload chats? [y/N] ")?.eq_ignore_ascii_case("y") {
            session.refresh_chats().await?;
        }
        session.invoke(&Request::new("close")).await?;
        session.run(updates).await;
    }

    Ok(())
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
    }
    Ok(line.trim().to_string())
}

// ─── TerminalUi ───────────────────────────────────────────────────────────────

struct TerminalUi;

impl Ui for TerminalUi {
    fn set_status(&self, text: &str) {
        println!("Status: {text}");
    }

    fn signal(&self, signal: UiSignal) {
        match signal {
            UiSignal::Authorized => println!("✅ Authorized"),
            UiSignal::Closed     => println!("👋 Session closed"),
            UiSignal::PhoneEntry(_) | UiSignal::CodeEntry(_) => {}
        }
    }

    fn render_chats(&self, chats: &[ChatSummary]) {
        println!("\n💬 Chats ({}):", chats.len());
        for chat in chats {
            println!("  • {chat}");
        }
        println!();
    }
}

// ─── ScriptedTdlib ────────────────────────────────────────────────────────────

/// A module exporting a `TdClient` class whose instances answer from a
/// fixed script.
struct ScriptedTdlib {
    on_update: Mutex<Option<Arc<dyn HostFunction>>>,
}

impl ScriptedTdlib {
    fn new() -> Arc<Self> {
        Arc::new(Self { on_update: Mutex::new(None) })
    }

    fn module(self: &Arc<Self>) -> Binding {
        let me = self.clone();
        let class = NativeFunction::new("TdClient").on_construct(move |args| {
            if let Some(Binding::Function(cb)) = args.first().and_then(|o| o.get("onUpdate")) {
                if let Ok(mut slot) = me.on_update.lock() {
                    *slot = Some(cb);
                }
            }
            let td = me.clone();
            let invoke = NativeFunction::new("invoke").on_call(move |args| {
                let request = args.first().and_then(|a| a.as_data().cloned()).unwrap_or_default();
                Ok(Promise::resolved(td.answer(&request)).into())
            });
            Ok(HostMap::new().with("invoke", invoke).into())
        });
        HostMap::new().with("TdClient", class).with("version", json!("1.8.0")).into()
    }

    fn answer(&self, request: &Value) -> Value {
        match request["@type"].as_str().unwrap_or_default() {
            "setTdlibParameters" => ok(),
            "checkDatabaseEncryptionKey" => {
                self.push_auth("authorizationStateWaitPhoneNumber");
                ok()
            }
            "setAuthenticationPhoneNumber" => {
                let phone = request["phone_number"].as_str().unwrap_or_default();
                if !phone.starts_with('+') || phone.len() < 8 {
                    return error(400, "PHONE_NUMBER_INVALID");
                }
                self.push_auth("authorizationStateWaitCode");
                ok()
            }
            "checkAuthenticationCode" => {
                if request["code"] != DEMO_CODE {
                    return error(400, "PHONE_CODE_INVALID");
                }
                self.push_auth("authorizationStateReady");
                ok()
            }
            "getChats" => json!({"@type": "chats", "total_count": 4, "chat_ids": [777000, -1001234567890_i64, 42, 99]}),
            "getChat"  => match request["chat_id"].as_i64() {
                Some(777000) => chat(777000, "Telegram", json!({"@type": "chatTypePrivate", "user_id": 777000})),
                Some(-1001234567890) => chat(
                    -1001234567890,
                    "Rust Users",
                    json!({"@type": "chatTypeSupergroup", "supergroup_id": 1234567890, "is_channel": false}),
                ),
                Some(42) => chat(42, "", json!({"@type": "chatTypePrivate", "user_id": 42})),
                _        => error(400, "CHAT_NOT_FOUND"),
            },
            "close" => {
                self.push_auth("authorizationStateClosed");
                ok()
            }
            other => error(400, &format!("Unknown method \"{other}\"")),
        }
    }

    fn push_auth(&self, state: &str) {
        let cb = self.on_update.lock().ok().and_then(|slot| slot.clone());
        if let Some(cb) = cb {
            let update = json!({"@type": "updateAuthorizationState", "authorization_state": {"@type": state}});
            let _ = cb.call(vec![Binding::data(update)]);
        }
    }
}

fn ok() -> Value {
    json!({"@type": "ok"})
}

fn error(code: i32, message: &str) -> Value {
    json!({"@type": "error", "code": code, "message": message})
}

fn chat(id: i64, title: &str, ty: Value) -> Value {
    json!({"@type": "chat", "id": id, "title": title, "type": ty})
}
