//! Host value model.
//!
//! The TDLib web module is loaded by the embedding page, not by us, and its
//! export shape is only known at runtime. Everything that crosses that
//! boundary is a [`Binding`]: plain JSON data, a property bag, a callable
//! (which may also be a constructor and carry properties of its own) or a
//! deferred [`Promise`].
//!
//! [`HostMap`] and [`NativeFunction`] are in-process implementations of the
//! host traits. The session uses them for the update callback it hands to
//! the client; tests and the demo build whole modules out of them.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;

use crate::errors::HostError;

/// Result of any operation performed on a host value.
pub type HostResult<T = Binding> = Result<T, HostError>;

// ─── Traits ───────────────────────────────────────────────────────────────────

/// A value with named properties.
pub trait HostObject: Send + Sync {
    /// Property lookup. May return [`Binding::Undefined`]; callers normally go
    /// through [`Binding::get`], which folds that into `None`.
    fn get(&self, key: &str) -> Option<Binding>;

    /// Own property names, in definition order.
    fn keys(&self) -> Vec<String>;
}

/// A callable host value. Classes, factories and bound methods all land here.
pub trait HostFunction: HostObject {
    fn name(&self) -> &str;

    /// Plain call, `f(args)`.
    fn call(&self, args: Vec<Binding>) -> HostResult;

    /// Construction, `new f(args)`.
    fn construct(&self, args: Vec<Binding>) -> HostResult;
}

/// The set of global names the embedding page exposes.
pub trait GlobalScope: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Binding>;
}

// ─── Promise ──────────────────────────────────────────────────────────────────

/// A deferred host value. Cheap to clone; every clone observes the same
/// settlement.
#[derive(Clone)]
pub struct Promise {
    inner: Shared<BoxFuture<'static, HostResult>>,
}

impl Promise {
    pub fn new<F>(fut: F) -> Self
    where
        F: Future<Output = HostResult> + Send + 'static,
    {
        Self { inner: fut.boxed().shared() }
    }

    pub fn resolved(value: impl Into<Binding>) -> Self {
        Self::new(futures::future::ready(Ok(value.into())))
    }

    pub fn rejected(error: HostError) -> Self {
        Self::new(futures::future::ready(Err(error)))
    }

    /// Wait for settlement. Does not flatten nested promises; see
    /// [`Binding::settle`] for that.
    pub async fn wait(&self) -> HostResult {
        self.inner.clone().await
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.peek() {
            Some(Ok(v))  => write!(f, "Promise(resolved: {v:?})"),
            Some(Err(e)) => write!(f, "Promise(rejected: {e})"),
            None         => write!(f, "Promise(pending)"),
        }
    }
}

// ─── Binding ──────────────────────────────────────────────────────────────────

/// A dynamically shaped host value.
#[derive(Clone, Default)]
pub enum Binding {
    #[default]
    Undefined,
    Data(Value),
    Object(Arc<dyn HostObject>),
    Function(Arc<dyn HostFunction>),
    Thenable(Promise),
}

impl Binding {
    pub fn data(value: impl Into<Value>) -> Self {
        Self::Data(value.into())
    }

    pub fn object(obj: impl HostObject + 'static) -> Self {
        Self::Object(Arc::new(obj))
    }

    pub fn function(f: impl HostFunction + 'static) -> Self {
        Self::Function(Arc::new(f))
    }

    /// `undefined` and `null` are both absent.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Undefined | Self::Data(Value::Null))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data(v) => Some(v),
            _             => None,
        }
    }

    /// Property lookup; absent properties come back as `None`.
    pub fn get(&self, key: &str) -> Option<Binding> {
        let found = match self {
            Self::Object(o)               => o.get(key),
            Self::Function(f)             => f.get(key),
            Self::Data(Value::Object(map)) => map.get(key).cloned().map(Self::Data),
            _                             => None,
        };
        found.filter(|b| !b.is_absent())
    }

    /// The property `key`, if it is callable.
    pub fn method(&self, key: &str) -> Option<Arc<dyn HostFunction>> {
        match self.get(key)? {
            Self::Function(f) => Some(f),
            _                 => None,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        match self {
            Self::Object(o)               => o.keys(),
            Self::Function(f)             => f.keys(),
            Self::Data(Value::Object(map)) => map.keys().cloned().collect(),
            _                             => Vec::new(),
        }
    }

    /// The first `limit` own property names, for diagnostics.
    pub fn sample_keys(&self, limit: usize) -> Vec<String> {
        let mut keys = self.keys();
        keys.truncate(limit);
        keys
    }

    /// Reference identity of object-like values. Data and thenables have none.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Self::Object(o)   => Some(Arc::as_ptr(o) as *const () as usize),
            Self::Function(f) => Some(Arc::as_ptr(f) as *const () as usize),
            _                 => None,
        }
    }

    /// Await through any chain of thenables and return the settled value.
    /// Non-thenables settle to themselves.
    pub async fn settle(self) -> HostResult {
        let mut current = self;
        while let Self::Thenable(p) = current {
            current = p.wait().await?;
        }
        Ok(current)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Undefined   => "undefined",
            Self::Data(_)     => "data",
            Self::Object(_)   => "object",
            Self::Function(_) => "function",
            Self::Thenable(_) => "thenable",
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined   => write!(f, "undefined"),
            Self::Data(v)     => write!(f, "{v}"),
            Self::Object(o)   => write!(f, "object {:?}", o.keys()),
            Self::Function(x) => write!(f, "function {}() {:?}", x.name(), x.keys()),
            Self::Thenable(p) => write!(f, "{p:?}"),
        }
    }
}

impl From<Value> for Binding {
    fn from(v: Value) -> Self { Self::Data(v) }
}

impl From<HostMap> for Binding {
    fn from(m: HostMap) -> Self { Self::object(m) }
}

impl From<NativeFunction> for Binding {
    fn from(f: NativeFunction) -> Self { Self::function(f) }
}

impl From<Promise> for Binding {
    fn from(p: Promise) -> Self { Self::Thenable(p) }
}

// ─── HostMap ──────────────────────────────────────────────────────────────────

/// An ordered property bag.
#[derive(Clone, Default)]
pub struct HostMap {
    entries: Vec<(String, Binding)>,
}

impl HostMap {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Binding>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a property, keeping its original position if it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Binding>) {
        let key   = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None       => self.entries.push((key, value)),
        }
    }
}

impl HostObject for HostMap {
    fn get(&self, key: &str) -> Option<Binding> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }
}

impl GlobalScope for HostMap {
    fn lookup(&self, name: &str) -> Option<Binding> {
        HostObject::get(self, name)
    }
}

// ─── NativeFunction ───────────────────────────────────────────────────────────

type Body = dyn Fn(Vec<Binding>) -> HostResult + Send + Sync;

/// A host function backed by Rust closures.
///
/// A function without a call body throws when called, and one without a
/// construct body throws when constructed, so a class, a factory and a
/// plain callback are all expressible.
pub struct NativeFunction {
    name:      String,
    call:      Option<Box<Body>>,
    construct: Option<Box<Body>>,
    props:     HostMap,
}

impl NativeFunction {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), call: None, construct: None, props: HostMap::new() }
    }

    pub fn on_call<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Binding>) -> HostResult + Send + Sync + 'static,
    {
        self.call = Some(Box::new(f));
        self
    }

    pub fn on_construct<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Binding>) -> HostResult + Send + Sync + 'static,
    {
        self.construct = Some(Box::new(f));
        self
    }

    /// Attach a property (a static member, for classes).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Binding>) -> Self {
        self.props.insert(key, value);
        self
    }
}

impl HostObject for NativeFunction {
    fn get(&self, key: &str) -> Option<Binding> {
        HostObject::get(&self.props, key)
    }

    fn keys(&self) -> Vec<String> {
        self.props.keys()
    }
}

impl HostFunction for NativeFunction {
    fn name(&self) -> &str { &self.name }

    fn call(&self, args: Vec<Binding>) -> HostResult {
        match &self.call {
            Some(f) => f(args),
            None    => Err(HostError::NotCallable(self.name.clone())),
        }
    }

    fn construct(&self, args: Vec<Binding>) -> HostResult {
        match &self.construct {
            Some(f) => f(args),
            None    => Err(HostError::NotConstructible(self.name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_folds_null_and_undefined_into_absent() {
        let obj = Binding::from(
            HostMap::new()
                .with("a", Binding::Undefined)
                .with("b", json!(null))
                .with("c", json!(1)),
        );
        assert!(obj.get("a").is_none());
        assert!(obj.get("b").is_none());
        assert!(obj.get("c").is_some());
        assert_eq!(obj.keys(), vec!["a", "b", "c"]);
    }

    #[test]
    fn insert_keeps_position() {
        let mut m = HostMap::new().with("x", json!(1)).with("y", json!(2));
        m.insert("x", json!(3));
        assert_eq!(m.keys(), vec!["x", "y"]);
        assert_eq!(HostObject::get(&m, "x").and_then(|b| b.as_data().cloned()), Some(json!(3)));
    }

    #[test]
    fn identity_is_stable_across_clones() {
        let obj  = Binding::from(HostMap::new());
        let copy = obj.clone();
        assert_eq!(obj.identity(), copy.identity());
        assert!(Binding::data(1).identity().is_none());
    }

    #[test]
    fn functions_without_bodies_throw() {
        let f = NativeFunction::new("Klass");
        assert_eq!(f.call(vec![]).unwrap_err(), HostError::NotCallable("Klass".into()));
        assert_eq!(f.construct(vec![]).unwrap_err(), HostError::NotConstructible("Klass".into()));
    }

    #[tokio::test]
    async fn settle_flattens_nested_promises() {
        let inner = Promise::resolved(json!("done"));
        let outer = Binding::from(Promise::resolved(inner));
        let v = outer.settle().await.unwrap();
        assert_eq!(v.as_data(), Some(&json!("done")));
    }

    #[tokio::test]
    async fn settle_surfaces_rejection() {
        let p = Binding::from(Promise::rejected(HostError::thrown("boom")));
        assert_eq!(p.settle().await.unwrap_err(), HostError::thrown("boom"));
    }
}
