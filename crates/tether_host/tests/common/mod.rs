//! Scripted runtime shared by the host integration tests.
//!
//! Understands a tiny command language, one statement per `evaluate`:
//! - `name = 1.5` assigns a number and returns it
//! - `name` reads a global
//! - `throw message` fails with an evaluation error
//! - `defer name` queues a microtask that sets `name` to `true`

#![allow(dead_code)]

use std::collections::HashMap;

use tether_core::{Runtime, RuntimeError, RuntimeResult, Value};

#[derive(Debug, Default)]
pub struct ScriptRuntime {
    globals: HashMap<String, Value>,
    microtasks: Vec<String>,
    pub evaluations: usize,
}

impl ScriptRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_microtasks(&self) -> usize {
        self.microtasks.len()
    }
}

impl Runtime for ScriptRuntime {
    fn description(&self) -> String {
        "ScriptRuntime 0.1".to_owned()
    }

    fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }

    fn set_global(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_owned(), value);
    }

    fn evaluate(&mut self, source: &str, source_url: &str) -> RuntimeResult<Value> {
        self.evaluations += 1;
        let source = source.trim();

        if let Some(message) = source.strip_prefix("throw ") {
            return Err(RuntimeError::Evaluation {
                source_url: source_url.to_owned(),
                message: message.trim().to_owned(),
            });
        }

        if let Some(name) = source.strip_prefix("defer ") {
            self.microtasks.push(name.trim().to_owned());
            return Ok(Value::Undefined);
        }

        if let Some((name, number)) = source.split_once('=') {
            let number: f64 = number.trim().parse().map_err(|_| RuntimeError::Evaluation {
                source_url: source_url.to_owned(),
                message: format!("not a number: {}", number.trim()),
            })?;
            let value = Value::from(number);
            self.set_global(name.trim(), value.clone());
            return Ok(value);
        }

        self.global(source)
            .ok_or_else(|| RuntimeError::PropertyNotFound(source.to_owned()))
    }

    fn drain_microtasks(&mut self) -> RuntimeResult<bool> {
        for name in std::mem::take(&mut self.microtasks) {
            self.globals.insert(name, Value::from(true));
        }
        Ok(true)
    }
}
