//! # Decorated Runtime
//!
//! Wraps a runtime so every operation passes through its reentrancy guard.
//!
//! ```text
//! caller ──► DecoratedRuntime ──► guard.enter() ──► R::operation() ──► guard.exit()
//!                  │
//!                  └── owns: inspector registration, guard, runtime
//! ```
//!
//! ## Teardown Order
//!
//! The inspector page refers to the runtime it describes, so it must be
//! gone before the runtime is. `Drop` releases the registration explicitly
//! and the runtime field is declared last, so it is destroyed last.

use crate::error::RuntimeResult;
use crate::guard::ReentrancyGuard;
use crate::inspector::{InspectorRegistration, InspectorRegistry, PageId};
use crate::runtime::{Runtime, Value};

/// A runtime with thread-checking and lifecycle duties attached.
///
/// `DecoratedRuntime<R>` implements [`Runtime`] itself, so it can be handed
/// to anything that expects the plain runtime.
pub struct DecoratedRuntime<R: Runtime> {
    /// Dropped first.
    inspector: Option<InspectorRegistration>,
    guard: ReentrancyGuard,
    /// Dropped last.
    runtime: R,
}

impl<R: Runtime> DecoratedRuntime<R> {
    /// Decorates `runtime` with a fresh guard and no inspector.
    #[must_use]
    pub fn new(runtime: R) -> Self {
        Self {
            inspector: None,
            guard: ReentrancyGuard::new(),
            runtime,
        }
    }

    /// Decorates `runtime` and registers an inspector page titled `title`.
    #[must_use]
    pub fn with_inspector(runtime: R, registry: &InspectorRegistry, title: &str) -> Self {
        let mut decorated = Self::new(runtime);
        let vm = decorated.description();
        decorated.inspector = Some(registry.register(title, vm));
        decorated
    }

    /// The guard protecting this runtime.
    #[inline]
    #[must_use]
    pub fn guard(&self) -> &ReentrancyGuard {
        &self.guard
    }

    /// Id of the registered inspector page, if any.
    #[must_use]
    pub fn inspector_page(&self) -> Option<PageId> {
        self.inspector.as_ref().map(InspectorRegistration::id)
    }

    /// Runs `f` against the raw runtime inside one guard scope.
    ///
    /// Use this for engine-specific operations the [`Runtime`] trait does
    /// not cover.
    pub fn with<T>(&mut self, f: impl FnOnce(&mut R) -> T) -> T {
        let _scope = self.guard.scope();
        f(&mut self.runtime)
    }
}

impl<R: Runtime> Runtime for DecoratedRuntime<R> {
    fn description(&self) -> String {
        let _scope = self.guard.scope();
        self.runtime.description()
    }

    fn global(&self, name: &str) -> Option<Value> {
        let _scope = self.guard.scope();
        self.runtime.global(name)
    }

    fn set_global(&mut self, name: &str, value: Value) {
        let _scope = self.guard.scope();
        self.runtime.set_global(name, value);
    }

    fn evaluate(&mut self, source: &str, source_url: &str) -> RuntimeResult<Value> {
        let _scope = self.guard.scope();
        self.runtime.evaluate(source, source_url)
    }

    fn drain_microtasks(&mut self) -> RuntimeResult<bool> {
        let _scope = self.guard.scope();
        self.runtime.drain_microtasks()
    }
}

impl<R: Runtime> Drop for DecoratedRuntime<R> {
    fn drop(&mut self) {
        // Debugger first, runtime after.
        drop(self.inspector.take());
    }
}

impl<R: Runtime> std::fmt::Debug for DecoratedRuntime<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoratedRuntime")
            .field("inspector_page", &self.inspector_page())
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use std::collections::HashMap;

    #[derive(Default)]
    struct CountingRuntime {
        globals: HashMap<String, Value>,
        calls: usize,
    }

    impl Runtime for CountingRuntime {
        fn description(&self) -> String {
            "counting 0.1".to_owned()
        }

        fn global(&self, name: &str) -> Option<Value> {
            self.globals.get(name).cloned()
        }

        fn set_global(&mut self, name: &str, value: Value) {
            self.calls += 1;
            self.globals.insert(name.to_owned(), value);
        }

        fn evaluate(&mut self, source: &str, source_url: &str) -> RuntimeResult<Value> {
            self.calls += 1;
            match source.strip_prefix("throw ") {
                Some(message) => Err(RuntimeError::Evaluation {
                    source_url: source_url.to_owned(),
                    message: message.to_owned(),
                }),
                None => Ok(Value::from(source)),
            }
        }

        fn drain_microtasks(&mut self) -> RuntimeResult<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_operations_forward() {
        let mut runtime = DecoratedRuntime::new(CountingRuntime::default());

        runtime.set_global("answer", Value::from(42));
        assert_eq!(runtime.global("answer"), Some(Value::from(42)));
        assert_eq!(runtime.evaluate("1 + 1", "test.js"), Ok(Value::from("1 + 1")));
        assert_eq!(runtime.description(), "counting 0.1");
        assert_eq!(runtime.drain_microtasks(), Ok(true));
        assert!(!runtime.guard().is_held());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_nested_access_is_legal() {
        let mut runtime = DecoratedRuntime::new(CountingRuntime::default());
        let guard_depth = {
            let _outer = runtime.guard().scope();
            let _inner = runtime.guard().scope();
            runtime.guard().depth()
        };
        assert_eq!(guard_depth, 2);

        runtime.set_global("after", Value::Null);
        assert_eq!(runtime.guard().depth(), 0);
    }

    #[test]
    fn test_error_leaves_guard_released() {
        let mut runtime = DecoratedRuntime::new(CountingRuntime::default());

        let err = runtime.evaluate("throw boom", "bundle.js").unwrap_err();
        assert_eq!(
            err,
            RuntimeError::Evaluation {
                source_url: "bundle.js".to_owned(),
                message: "boom".to_owned(),
            }
        );
        assert!(!runtime.guard().is_held());

        // Unrelated access still goes through.
        runtime.set_global("ok", Value::from(true));
        assert_eq!(runtime.with(|raw| raw.calls), 2);
    }

    #[test]
    fn test_inspector_page_lifecycle() {
        let registry = InspectorRegistry::new();
        let runtime = DecoratedRuntime::with_inspector(CountingRuntime::default(), &registry, "Tether");

        let id = runtime.inspector_page().unwrap();
        let page = registry.page(id).unwrap();
        assert_eq!(page.title, "Tether");
        assert_eq!(page.vm, "counting 0.1");

        drop(runtime);
        assert!(registry.is_empty());
    }
}
