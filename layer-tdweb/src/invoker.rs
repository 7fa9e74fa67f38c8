//! One request/response contract over every client shape.
//!
//! TDLib web builds disagree on what the request method is called and on
//! whether it returns a promise. [`detect`] picks the capability once;
//! [`Invoker`] then dispatches on that tag for every call.

use std::fmt;
use std::sync::Arc;

use crate::errors::{InvocationError, UnsupportedClientShape};
use crate::functions::{RemoteCall, Request, Response};
use crate::host::{Binding, HostFunction};

/// Request capabilities in priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    /// `invoke(request) -> Promise<response>`
    Invoke,
    /// `send(request) -> response | Promise<response>`
    Send,
    /// `request(request) -> response | Promise<response>`
    Request,
    /// `invokeJSON(request) -> response | Promise<response>`
    InvokeJson,
    /// `postMessage(request)`, no response.
    PostMessage,
    Unsupported,
}

impl Capability {
    pub const PRIORITY: [Capability; 5] = [
        Self::Invoke, Self::Send, Self::Request, Self::InvokeJson, Self::PostMessage,
    ];

    /// The method name a client exposes this capability under.
    pub fn method_name(self) -> Option<&'static str> {
        match self {
            Self::Invoke      => Some("invoke"),
            Self::Send        => Some("send"),
            Self::Request     => Some("request"),
            Self::InvokeJson  => Some("invokeJSON"),
            Self::PostMessage => Some("postMessage"),
            Self::Unsupported => None,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name().unwrap_or("unsupported"))
    }
}

/// The highest-priority capability `value` exposes. Only objects qualify;
/// functions (constructors, factories) are always [`Capability::Unsupported`].
pub fn detect(value: &Binding) -> Capability {
    if !matches!(value, Binding::Object(_)) {
        return Capability::Unsupported;
    }
    Capability::PRIORITY
        .into_iter()
        .find(|cap| cap.method_name().is_some_and(|m| value.method(m).is_some()))
        .unwrap_or(Capability::Unsupported)
}

/// Whether `value` is already a usable client instance.
pub fn looks_like_client(value: &Binding) -> bool {
    detect(value) != Capability::Unsupported
}

// ─── Invoker ──────────────────────────────────────────────────────────────────

/// A client handle bound to its request method.
#[derive(Clone)]
pub struct Invoker {
    capability: Capability,
    method:     Arc<dyn HostFunction>,
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invoker({})", self.capability)
    }
}

impl Invoker {
    /// Bind to the request method of `handle`.
    ///
    /// `key_sample_limit` bounds the property names included in the error.
    pub fn adapt(handle: &Binding, key_sample_limit: usize) -> Result<Self, UnsupportedClientShape> {
        let capability = match handle {
            Binding::Function(f) => {
                return Err(UnsupportedClientShape::BareFunction {
                    name:        f.name().to_string(),
                    sample_keys: handle.sample_keys(key_sample_limit),
                });
            }
            Binding::Object(_) => detect(handle),
            other => return Err(UnsupportedClientShape::NotAnObject { kind: other.kind() }),
        };

        let method = capability
            .method_name()
            .and_then(|name| handle.method(name))
            .ok_or_else(|| UnsupportedClientShape::NoCapability {
                sample_keys: handle.sample_keys(key_sample_limit),
            })?;

        tracing::debug!("[layer-tdweb] client requests go through {capability}()");
        Ok(Self { capability, method })
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Send `request` and wait for its response.
    pub async fn invoke(&self, request: &Request) -> Result<Response, InvocationError> {
        let arg = Binding::Data(request.to_json());
        match self.capability {
            Capability::PostMessage => {
                self.method.call(vec![arg])?;
                Ok(Response::Empty)
            }
            // Invoke is promise-returning by contract; the others may answer
            // synchronously. Settling covers both.
            Capability::Invoke
            | Capability::Send
            | Capability::Request
            | Capability::InvokeJson => {
                let returned = self.method.call(vec![arg])?;
                Response::from_binding(returned.settle().await?)
            }
            Capability::Unsupported => Err(InvocationError::NotInitialized),
        }
    }

    /// Encode and send a typed call.
    pub async fn call<R: RemoteCall>(&self, call: &R) -> Result<Response, InvocationError> {
        self.invoke(&Request::from_call(call)?).await
    }
}
