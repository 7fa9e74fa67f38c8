//! Getting a client instance out of whatever the module exports.
//!
//! Strategies, in order, at each level:
//!
//! 1. the module already is a client instance;
//! 2. `new module.TdClient(options)` / `new module.TdClient()`, then the same
//!    on `module.default.TdClient`;
//! 3. `module.createClient(options)`, awaited if it returns a promise;
//! 4. `new module(options)` / `new module()`, then `module(options)`;
//! 5. descend into `module.default` and start over.
//!
//! Descent is bounded by `max_default_depth` and never revisits a value, so a
//! module whose `default` points back at itself terminates.

use std::sync::Arc;

use crate::config::Config;
use crate::errors::{Attempt, InstantiationFailure, Strategy};
use crate::host::{Binding, HostFunction};
use crate::invoker::looks_like_client;

/// Property a module may expose its client class under.
pub const NESTED_CONSTRUCTOR: &str = "TdClient";
/// Property a module may expose its client factory under.
pub const FACTORY: &str = "createClient";

#[derive(Clone, Debug)]
pub struct ClientFactory {
    max_default_depth: usize,
    key_sample_limit:  usize,
}

impl Default for ClientFactory {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ClientFactory {
    pub fn new(max_default_depth: usize, key_sample_limit: usize) -> Self {
        Self { max_default_depth, key_sample_limit }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_default_depth, config.key_sample_limit)
    }

    /// Produce a client handle from `module`, passing `options` to whatever
    /// constructor or factory is found.
    pub async fn instantiate(
        &self,
        module:  &Binding,
        options: &Binding,
    ) -> Result<Binding, InstantiationFailure> {
        let mut run = Run { options, attempts: Vec::new(), levels: Vec::new(), constructed: Vec::new() };
        let mut current = module.clone();
        let mut path    = String::from("module");

        for depth in 0..=self.max_default_depth {
            if let Some(id) = current.identity() {
                run.levels.push(id);
            }
            if let Some(client) = run.try_level(&current, &path).await {
                return Ok(client);
            }

            let Some(next) = current.get("default") else { break };
            let target = format!("{path}.default");
            if next.identity().is_some_and(|id| run.levels.contains(&id)) {
                run.fail(Strategy::DefaultExport, &target, "refers back to an enclosing module".into());
                break;
            }
            if depth == self.max_default_depth {
                run.fail(Strategy::DefaultExport, &target, format!("nesting limit of {depth} reached"));
                break;
            }
            tracing::debug!("[layer-tdweb] retrying with {target}");
            path    = target;
            current = next;
        }

        Err(InstantiationFailure {
            attempts:    run.attempts,
            sample_keys: module.sample_keys(self.key_sample_limit),
        })
    }
}

/// State of one `instantiate` call.
struct Run<'a> {
    options:     &'a Binding,
    attempts:    Vec<Attempt>,
    /// Identities of the levels descended through.
    levels:      Vec<usize>,
    /// Identities of constructors already tried.
    constructed: Vec<usize>,
}

impl Run<'_> {
    async fn try_level(&mut self, module: &Binding, path: &str) -> Option<Binding> {
        if looks_like_client(module) {
            tracing::debug!("[layer-tdweb] {path} already is a client instance");
            return Some(module.clone());
        }

        // one level into `default`, counted from the located module
        let inner = if path.ends_with(".default") { None } else { module.get("default") };
        for (owner, owner_path) in [
            (Some(module.clone()), path.to_string()),
            (inner, format!("{path}.default")),
        ] {
            let Some(ctor) = owner.and_then(|o| o.get(NESTED_CONSTRUCTOR)) else { continue };
            let target = format!("{owner_path}.{NESTED_CONSTRUCTOR}");
            if let Some(client) = self.construct(&ctor, &target, Strategy::NestedConstructor) {
                return Some(client);
            }
        }

        if let Some(factory) = module.method(FACTORY) {
            let target = format!("{path}.{FACTORY}");
            if let Some(client) = self.call(&factory, &target, Strategy::Factory).await {
                return Some(client);
            }
        }

        if let Binding::Function(f) = module {
            if let Some(client) = self.construct(module, path, Strategy::Construct) {
                return Some(client);
            }
            if let Some(client) = self.call(f, path, Strategy::Call).await {
                return Some(client);
            }
        }

        None
    }

    /// `new ctor(options)`, then `new ctor()`. Anything object-shaped counts.
    fn construct(&mut self, ctor: &Binding, target: &str, strategy: Strategy) -> Option<Binding> {
        let Binding::Function(f) = ctor else { return None };
        if let Some(id) = ctor.identity() {
            if self.constructed.contains(&id) {
                return None;
            }
            self.constructed.push(id);
        }

        for args in [vec![self.options.clone()], Vec::new()] {
            let label = if args.is_empty() { "()" } else { "(options)" };
            match f.construct(args) {
                Ok(v @ Binding::Object(_)) => {
                    tracing::debug!("[layer-tdweb] new {target}{label} ✓");
                    return Some(v);
                }
                Ok(v)  => self.fail(strategy, target, format!("new{label} produced {}", v.kind())),
                Err(e) => self.fail(strategy, target, format!("new{label} threw: {e}")),
            }
        }
        None
    }

    /// `f(options)`, awaited; accepted only if the result is client-shaped.
    async fn call(&mut self, f: &Arc<dyn HostFunction>, target: &str, strategy: Strategy) -> Option<Binding> {
        let settled = match f.call(vec![self.options.clone()]) {
            Ok(v)  => v.settle().await,
            Err(e) => Err(e),
        };
        match settled {
            Ok(v) if looks_like_client(&v) => {
                tracing::debug!("[layer-tdweb] {target}(options) ✓");
                Some(v)
            }
            Ok(v) => {
                self.fail(strategy, target, format!("returned {}, not a client", v.kind()));
                None
            }
            Err(e) => {
                self.fail(strategy, target, format!("threw: {e}"));
                None
            }
        }
    }

    fn fail(&mut self, strategy: Strategy, target: &str, error: String) {
        tracing::warn!("[layer-tdweb] {strategy} on {target} failed: {error}");
        self.attempts.push(Attempt { strategy, target: target.to_string(), error });
    }
}
