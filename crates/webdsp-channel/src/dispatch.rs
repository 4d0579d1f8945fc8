//! Name → handler table for functions the host invokes on the UI.
//!
//! Handlers are registered explicitly by name. Once the binary protocol is
//! detected the table is indexed by hash so hashed identifiers resolve to the
//! same handlers.

use crate::codec::FunctionId;
use crate::hash::FunctionKey;
use crate::observer::UiCallbacks;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub type Handler = Arc<dyn Fn(&[Value]) + Send + Sync>;

pub const PARAMETER_CHANGED: &str = "parameterChanged";
pub const STATE_CHANGED: &str = "stateChanged";
pub const SIZE_CHANGED: &str = "sizeChanged";
pub const PROGRAM_LOADED: &str = "programLoaded";
pub const SAMPLE_RATE_CHANGED: &str = "sampleRateChanged";

#[derive(Default, Clone)]
pub struct FunctionTable {
    handlers: HashMap<String, Handler>,
    by_hash: Option<HashMap<FunctionKey, String>>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table routing the standard host notifications to `callbacks`.
    pub fn with_ui_callbacks(callbacks: Arc<dyn UiCallbacks>) -> Self {
        let mut table = Self::new();

        let cb = Arc::clone(&callbacks);
        table.register(PARAMETER_CHANGED, move |args| {
            match (arg_u32(args, 0), arg_f64(args, 1)) {
                (Some(index), Some(value)) => cb.parameter_changed(index, value),
                _ => malformed(PARAMETER_CHANGED, args),
            }
        });

        let cb = Arc::clone(&callbacks);
        table.register(STATE_CHANGED, move |args| {
            match (arg_str(args, 0), arg_str(args, 1)) {
                (Some(key), Some(value)) => cb.state_changed(key, value),
                _ => malformed(STATE_CHANGED, args),
            }
        });

        let cb = Arc::clone(&callbacks);
        table.register(SIZE_CHANGED, move |args| {
            match (arg_f64(args, 0), arg_f64(args, 1)) {
                (Some(width), Some(height)) => cb.size_changed(width, height),
                _ => malformed(SIZE_CHANGED, args),
            }
        });

        let cb = Arc::clone(&callbacks);
        table.register(PROGRAM_LOADED, move |args| match arg_u32(args, 0) {
            Some(index) => cb.program_loaded(index),
            None => malformed(PROGRAM_LOADED, args),
        });

        let cb = callbacks;
        table.register(SAMPLE_RATE_CHANGED, move |args| match arg_f64(args, 0) {
            Some(rate) => cb.sample_rate_changed(rate),
            None => malformed(SAMPLE_RATE_CHANGED, args),
        });

        table
    }

    /// Register or replace the handler for `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&[Value]) + Send + Sync + 'static,
    ) {
        let name = name.into();
        if let Some(by_hash) = &mut self.by_hash {
            by_hash.insert(FunctionKey::of(&name), name.clone());
        }
        self.handlers.insert(name, Arc::new(handler));
    }

    /// Build the hash index. Idempotent.
    pub fn index_by_hash(&mut self) {
        if self.by_hash.is_some() {
            return;
        }
        let index = self
            .handlers
            .keys()
            .map(|name| (FunctionKey::of(name), name.clone()))
            .collect();
        self.by_hash = Some(index);
    }

    pub fn is_indexed_by_hash(&self) -> bool {
        self.by_hash.is_some()
    }

    /// Registered name for an identifier.
    pub fn name_of<'a>(&'a self, id: &'a FunctionId) -> Option<&'a str> {
        match id {
            FunctionId::Name(name) => self.handlers.contains_key(name).then_some(name.as_str()),
            FunctionId::Hash(key) => self.by_hash.as_ref()?.get(key).map(String::as_str),
        }
    }

    pub fn lookup(&self, id: &FunctionId) -> Option<Handler> {
        let name = self.name_of(id)?;
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn malformed(function: &str, args: &[Value]) {
    tracing::warn!("Ignoring {} with unexpected arguments {:?}", function, args);
}

pub(crate) fn arg_f64(args: &[Value], i: usize) -> Option<f64> {
    args.get(i)?.as_f64()
}

pub(crate) fn arg_u32(args: &[Value], i: usize) -> Option<u32> {
    u32::try_from(args.get(i)?.as_i64()?).ok()
}

pub(crate) fn arg_str(args: &[Value], i: usize) -> Option<&str> {
    args.get(i)?.as_str()
}
