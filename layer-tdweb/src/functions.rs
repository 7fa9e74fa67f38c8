//! TDLib JSON requests and responses.
//!
//! Every request is a flat object with an `"@type"` discriminator. The calls
//! this crate issues are typed [`RemoteCall`]s; anything else can be built
//! ad hoc with [`Request::new`].

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::{InvocationError, RpcError};
use crate::host::Binding;

/// A TDLib method with a fixed `@type` tag.
pub trait RemoteCall: Serialize {
    const TYPE: &'static str;
}

// ─── Request ──────────────────────────────────────────────────────────────────

/// A tagged request record. Immutable once handed to the invoker.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    tag:    String,
    fields: Map<String, Value>,
}

impl Request {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), fields: Map::new() }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Encode a typed call.
    pub fn from_call<R: RemoteCall>(call: &R) -> Result<Self, InvocationError> {
        match serde_json::to_value(call)? {
            Value::Object(fields) => Ok(Self { tag: R::TYPE.to_string(), fields }),
            other => Err(InvocationError::Encode(format!("{} encoded to {other}", R::TYPE))),
        }
    }

    pub fn tag(&self) -> &str { &self.tag }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The wire form: `{"@type": tag, ...fields}`.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::with_capacity(self.fields.len() + 1);
        obj.insert("@type".into(), Value::String(self.tag.clone()));
        for (k, v) in &self.fields {
            obj.insert(k.clone(), v.clone());
        }
        Value::Object(obj)
    }
}

// ─── Response ─────────────────────────────────────────────────────────────────

/// What a request resolved to.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    Payload(Value),
    Error(RpcError),
    /// Resolved without a payload (fire-and-forget clients).
    Empty,
}

impl Response {
    /// Classify a settled host value.
    pub fn from_binding(b: Binding) -> Result<Self, InvocationError> {
        match b {
            Binding::Undefined | Binding::Data(Value::Null) => Ok(Self::Empty),
            Binding::Data(v) => Ok(Self::from_value(v)),
            other => Err(InvocationError::UnexpectedResponse(format!("{other:?}"))),
        }
    }

    pub fn from_value(v: Value) -> Self {
        if type_tag(&v) != Some("error") {
            return Self::Payload(v);
        }
        let code = v.get("code")
            .and_then(Value::as_i64)
            .and_then(|c| i32::try_from(c).ok())
            .unwrap_or(0);
        let message = v.get("message").and_then(Value::as_str).unwrap_or_default();
        Self::Error(RpcError::new(code, message))
    }

    /// `Err` for error responses; the payload (if any) otherwise.
    pub fn into_result(self) -> Result<Option<Value>, RpcError> {
        match self {
            Self::Payload(v) => Ok(Some(v)),
            Self::Empty      => Ok(None),
            Self::Error(e)   => Err(e),
        }
    }
}

/// The discriminator of a TDLib object: `@type`, falling back to `type`.
pub fn type_tag(v: &Value) -> Option<&str> {
    v.get("@type")
        .and_then(Value::as_str)
        .or_else(|| v.get("type").and_then(Value::as_str))
}

// ─── Calls ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize)]
pub struct TdlibParameters {
    pub use_test_dc:              bool,
    pub api_id:                   i32,
    pub api_hash:                 String,
    pub system_language_code:     String,
    pub device_model:             String,
    pub system_version:           String,
    pub application_version:      String,
    pub enable_storage_optimizer: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct SetTdlibParameters {
    pub parameters: TdlibParameters,
}

impl RemoteCall for SetTdlibParameters {
    const TYPE: &'static str = "setTdlibParameters";
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CheckDatabaseEncryptionKey {
    pub encryption_key: String,
}

impl RemoteCall for CheckDatabaseEncryptionKey {
    const TYPE: &'static str = "checkDatabaseEncryptionKey";
}

#[derive(Clone, Debug, Serialize)]
pub struct SetAuthenticationPhoneNumber {
    pub phone_number:            String,
    pub allow_flash_call:        bool,
    pub is_current_phone_number: bool,
}

impl SetAuthenticationPhoneNumber {
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self { phone_number: phone_number.into(), allow_flash_call: false, is_current_phone_number: false }
    }
}

impl RemoteCall for SetAuthenticationPhoneNumber {
    const TYPE: &'static str = "setAuthenticationPhoneNumber";
}

#[derive(Clone, Debug, Serialize)]
pub struct CheckAuthenticationCode {
    pub code: String,
}

impl RemoteCall for CheckAuthenticationCode {
    const TYPE: &'static str = "checkAuthenticationCode";
}

#[derive(Clone, Debug, Serialize)]
pub struct GetChats {
    /// Decimal string; TDLib orders are 64-bit and do not survive a JS number.
    pub offset_order:   String,
    pub offset_chat_id: i64,
    pub limit:          i32,
}

impl GetChats {
    /// The first page of the main chat list.
    pub fn first_page(limit: i32) -> Self {
        Self { offset_order: i64::MAX.to_string(), offset_chat_id: 0, limit }
    }
}

impl RemoteCall for GetChats {
    const TYPE: &'static str = "getChats";
}

#[derive(Clone, Debug, Serialize)]
pub struct GetChat {
    pub chat_id: i64,
}

impl RemoteCall for GetChat {
    const TYPE: &'static str = "getChat";
}
