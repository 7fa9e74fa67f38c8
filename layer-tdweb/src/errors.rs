//! Error types for layer-tdweb.
//!
//! Initialization failures ([`InitError`]) are fatal to the session. Call
//! failures ([`InvocationError`]) and UI action failures ([`ActionError`])
//! are surfaced to whoever issued the call and leave the session usable.

use std::fmt;

// ─── HostError ────────────────────────────────────────────────────────────────

/// Something the host module threw, or a call it could not perform.
#[derive(Clone, Debug, PartialEq)]
pub enum HostError {
    /// The host threw (or a promise rejected) with this message.
    Thrown(String),
    /// `f(...)` on a value that cannot be called.
    NotCallable(String),
    /// `new f(...)` on a value that cannot be constructed.
    NotConstructible(String),
}

impl HostError {
    pub fn thrown(message: impl Into<String>) -> Self {
        Self::Thrown(message.into())
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thrown(m)           => write!(f, "{m}"),
            Self::NotCallable(n)      => write!(f, "{n} is not a function"),
            Self::NotConstructible(n) => write!(f, "{n} is not a constructor"),
        }
    }
}

impl std::error::Error for HostError {}

// ─── RpcError ─────────────────────────────────────────────────────────────────

/// An `{"@type": "error"}` response from TDLib.
///
/// # Example
/// `{"@type":"error","code":400,"message":"PHONE_NUMBER_INVALID"}`
/// → `RpcError { code: 400, message: "PHONE_NUMBER_INVALID" }`
#[derive(Clone, Debug, PartialEq)]
pub struct RpcError {
    pub code:    i32,
    pub message: String,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for RpcError {}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Match on the error message, with optional wildcard prefix/suffix `'*'`.
    ///
    /// # Examples
    /// - `err.is("PHONE_NUMBER_INVALID")` — exact match
    /// - `err.is("PHONE_CODE_*")` — starts-with match
    /// - `err.is("*_INVALID")` — ends-with match
    pub fn is(&self, pattern: &str) -> bool {
        if let Some(prefix) = pattern.strip_suffix('*') {
            self.message.starts_with(prefix)
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            self.message.ends_with(suffix)
        } else {
            self.message == pattern
        }
    }
}

// ─── InvocationError ──────────────────────────────────────────────────────────

/// The error type returned from anything that sends a request.
#[derive(Clone, Debug, PartialEq)]
pub enum InvocationError {
    /// No client has been initialized yet (or it was torn down).
    NotInitialized,
    /// The action requires the `ready` authorization state.
    Unauthorized,
    /// TDLib answered with an error object.
    Rpc(RpcError),
    /// The client threw, or its promise rejected.
    Host(HostError),
    /// The client answered with something that is not a data payload.
    UnexpectedResponse(String),
    /// The request could not be encoded.
    Encode(String),
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized        => write!(f, "client not initialized"),
            Self::Unauthorized          => write!(f, "not authorized"),
            Self::Rpc(e)                => write!(f, "{e}"),
            Self::Host(e)               => write!(f, "{e}"),
            Self::UnexpectedResponse(s) => write!(f, "unexpected response: {s}"),
            Self::Encode(s)             => write!(f, "encode error: {s}"),
        }
    }
}

impl std::error::Error for InvocationError {}

impl From<HostError> for InvocationError {
    fn from(e: HostError) -> Self { Self::Host(e) }
}

impl From<RpcError> for InvocationError {
    fn from(e: RpcError) -> Self { Self::Rpc(e) }
}

impl From<serde_json::Error> for InvocationError {
    fn from(e: serde_json::Error) -> Self { Self::Encode(e.to_string()) }
}

impl InvocationError {
    /// Returns `true` if this is the named RPC error (supports `'*'` wildcards).
    pub fn is(&self, pattern: &str) -> bool {
        match self {
            Self::Rpc(e) => e.is(pattern),
            _            => false,
        }
    }
}

// ─── InstantiationFailure ─────────────────────────────────────────────────────

/// One of the ways [`crate::ClientFactory`] tries to get a client out of a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// `new module.TdClient(options)`, then `new module.TdClient()`.
    NestedConstructor,
    /// `module.createClient(options)`.
    Factory,
    /// `new module(options)`, then `new module()`.
    Construct,
    /// `module(options)`.
    Call,
    /// Descend into `module.default`.
    DefaultExport,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NestedConstructor => "nested constructor",
            Self::Factory           => "factory",
            Self::Construct         => "construct",
            Self::Call              => "call",
            Self::DefaultExport     => "default export",
        })
    }
}

/// A strategy that was tried and did not produce a client.
#[derive(Clone, Debug, PartialEq)]
pub struct Attempt {
    pub strategy: Strategy,
    /// Property path of the value the strategy was applied to, e.g. `module.default.TdClient`.
    pub target:   String,
    pub error:    String,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}: {}", self.strategy, self.target, self.error)
    }
}

/// Every instantiation strategy was exhausted.
#[derive(Clone, Debug, PartialEq)]
pub struct InstantiationFailure {
    pub attempts:    Vec<Attempt>,
    /// The first own property names of the module.
    pub sample_keys: Vec<String>,
}

impl InstantiationFailure {
    pub fn tried(&self, strategy: Strategy) -> bool {
        self.attempts.iter().any(|a| a.strategy == strategy)
    }
}

impl fmt::Display for InstantiationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not create a client from the module (keys: {:?})", self.sample_keys)?;
        for a in &self.attempts {
            write!(f, "; {a}")?;
        }
        Ok(())
    }
}

impl std::error::Error for InstantiationFailure {}

// ─── UnsupportedClientShape ───────────────────────────────────────────────────

/// A handle that offers none of the recognized request capabilities.
#[derive(Clone, Debug, PartialEq)]
pub enum UnsupportedClientShape {
    /// A constructor or plain function was passed instead of an instance.
    BareFunction { name: String, sample_keys: Vec<String> },
    /// An object without `invoke`/`send`/`request`/`invokeJSON`/`postMessage`.
    NoCapability { sample_keys: Vec<String> },
    /// Neither an object nor a function.
    NotAnObject { kind: &'static str },
}

impl fmt::Display for UnsupportedClientShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BareFunction { name, sample_keys } => write!(
                f,
                "expected a client instance but got function {name} (keys: {sample_keys:?}); construct it first"
            ),
            Self::NoCapability { sample_keys } => write!(
                f,
                "client supports none of invoke/send/request/invokeJSON/postMessage (keys: {sample_keys:?})"
            ),
            Self::NotAnObject { kind } => write!(f, "expected a client instance but got {kind}"),
        }
    }
}

impl std::error::Error for UnsupportedClientShape {}

// ─── InitError ────────────────────────────────────────────────────────────────

/// Errors returned by [`crate::Session::initialize`].
#[derive(Clone, Debug, PartialEq)]
pub enum InitError {
    /// None of the candidate global names held a usable module.
    ModuleNotFound { candidates: Vec<String> },
    Instantiation(InstantiationFailure),
    UnsupportedShape(UnsupportedClientShape),
    /// TDLib rejected the parameters or the database key.
    Rpc(RpcError),
    Invocation(InvocationError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModuleNotFound { candidates } =>
                write!(f, "TDLib module not found (looked for {})", candidates.join(", ")),
            Self::Instantiation(e)    => write!(f, "{e}"),
            Self::UnsupportedShape(e) => write!(f, "{e}"),
            Self::Rpc(e)              => write!(f, "{e}"),
            Self::Invocation(e)       => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for InitError {}

impl From<InstantiationFailure> for InitError {
    fn from(e: InstantiationFailure) -> Self { Self::Instantiation(e) }
}

impl From<UnsupportedClientShape> for InitError {
    fn from(e: UnsupportedClientShape) -> Self { Self::UnsupportedShape(e) }
}

impl From<RpcError> for InitError {
    fn from(e: RpcError) -> Self { Self::Rpc(e) }
}

impl From<InvocationError> for InitError {
    fn from(e: InvocationError) -> Self {
        match e {
            InvocationError::Rpc(r) => Self::Rpc(r),
            other                   => Self::Invocation(other),
        }
    }
}

// ─── ActionError ──────────────────────────────────────────────────────────────

/// Errors returned by the user-facing actions on [`crate::Session`].
#[derive(Clone, Debug, PartialEq)]
pub enum ActionError {
    /// The named input was empty after trimming.
    EmptyInput(&'static str),
    /// Phone submission is closed (already authorized, or session closed).
    PhoneEntryDisabled,
    Invocation(InvocationError),
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput(field)  => write!(f, "{field} is required"),
            Self::PhoneEntryDisabled => write!(f, "phone number entry is disabled"),
            Self::Invocation(e)      => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ActionError {}

impl From<InvocationError> for ActionError {
    fn from(e: InvocationError) -> Self { Self::Invocation(e) }
}

impl From<RpcError> for ActionError {
    fn from(e: RpcError) -> Self { Self::Invocation(InvocationError::Rpc(e)) }
}

// ─── ConfigError ──────────────────────────────────────────────────────────────

/// Invalid credentials entered in the UI.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The api id is empty or contains something other than ASCII digits.
    InvalidApiId(String),
    /// The api id is zero or does not fit in an `i32`.
    NonPositiveApiId(String),
    MissingApiHash,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidApiId(raw) =>
                write!(f, "api id must contain digits only (got {raw:?}); get one at https://my.telegram.org/apps"),
            Self::NonPositiveApiId(raw) =>
                write!(f, "api id must be a positive integer (got {raw})"),
            Self::MissingApiHash =>
                write!(f, "api hash is required; get one at https://my.telegram.org/apps"),
        }
    }
}

impl std::error::Error for ConfigError {}
