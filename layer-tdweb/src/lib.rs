//! # layer-tdweb
//!
//! Drives a TDLib web (WASM) build whose export shape is not known up front.
//!
//! ## Features
//! - Module discovery across the global names TDLib web builds use, awaiting
//!   lazily loaded modules and unwrapping `default` exports
//! - Client instantiation from ready instances, nested classes, factories,
//!   constructors or plain functions, with a structured report of every
//!   strategy that failed
//! - One `invoke(request) -> response` contract over `invoke`, `send`,
//!   `request`, `invokeJSON` and `postMessage` clients
//! - Phone + code login driven by `updateAuthorizationState`
//! - Concurrent chat list fetch that tolerates individual chat failures
//!
//! The embedding page stays in charge of the DOM; it implements [`Ui`] and
//! hands the session a [`GlobalScope`] to search.

#![deny(unsafe_code)]

mod auth;
mod catalog;
mod config;
mod errors;
mod factory;
pub mod functions;
pub mod host;
mod invoker;
mod locator;
mod session;
mod ui;
pub mod update;

pub use auth::{AuthPhase, AuthorizationMachine, Effect};
pub use catalog::{ChatCatalog, ChatKind, ChatSummary};
pub use config::{Config, DEFAULT_CANDIDATES};
pub use errors::{
    ActionError, Attempt, ConfigError, HostError, InitError, InstantiationFailure, InvocationError,
    RpcError, Strategy, UnsupportedClientShape,
};
pub use factory::{ClientFactory, FACTORY, NESTED_CONSTRUCTOR};
pub use functions::{Request, Response};
pub use host::{Binding, GlobalScope, HostFunction, HostMap, HostObject, NativeFunction, Promise};
pub use invoker::{detect, looks_like_client, Capability, Invoker};
pub use locator::{LocatedModule, ModuleLocator};
pub use session::{Session, SessionContext};
pub use ui::{Ui, UiSignal};
pub use update::{AuthorizationState, Update, UpdateHook, UpdateStream};
