//! Finding the TDLib module among the page's globals.

use serde_json::Value;

use crate::host::{Binding, GlobalScope};

/// A module found under one of the candidate names.
#[derive(Clone, Debug)]
pub struct LocatedModule {
    /// The global name it was found under.
    pub name:   String,
    pub module: Binding,
}

/// Probes a fixed, ordered list of global names.
#[derive(Clone, Debug)]
pub struct ModuleLocator {
    candidates: Vec<String>,
}

impl ModuleLocator {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { candidates: candidates.into_iter().map(Into::into).collect() }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Return the first candidate that resolves.
    ///
    /// Thenables are awaited; a rejection is logged and the next candidate is
    /// tried. A resolved value with a `default` property yields that property.
    pub async fn locate(&self, scope: &dyn GlobalScope) -> Option<LocatedModule> {
        for name in &self.candidates {
            let Some(value) = scope.lookup(name).filter(|b| !b.is_absent()) else {
                continue;
            };

            let resolved = match value.settle().await {
                Ok(v) if v.is_absent() => {
                    tracing::warn!("[layer-tdweb] {name} resolved to {}, skipping", v.kind());
                    continue;
                }
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!("[layer-tdweb] awaiting {name} failed ({e}), trying next candidate");
                    continue;
                }
            };

            let module = match unwrap_default(&resolved) {
                Some(inner) => {
                    tracing::debug!("[layer-tdweb] {name}: using default export");
                    inner
                }
                None => resolved,
            };
            tracing::debug!("[layer-tdweb] module found under {name}: {module:?}");
            return Some(LocatedModule { name: name.clone(), module });
        }
        None
    }
}

/// The `default` export of an object-shaped module. Functions keep their
/// static members; a class with a `default` property is still the class.
fn unwrap_default(module: &Binding) -> Option<Binding> {
    match module {
        Binding::Object(_) | Binding::Data(Value::Object(_)) => module.get("default"),
        _ => None,
    }
}
