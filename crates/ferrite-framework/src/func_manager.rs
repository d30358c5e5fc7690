//! Named subgraph bodies referenced by function and control-flow kernels.

use ferrite_core::{Error, IrGraph, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Holds the bodies of functions that kernels may call into.
#[derive(Default)]
pub struct FuncManager {
    functions: HashMap<String, Arc<IrGraph>>,
}

impl FuncManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, name: impl Into<String>, body: Arc<IrGraph>) -> Result<()> {
        let name = name.into();
        if self.functions.contains_key(&name) {
            return Err(Error::RegistrationConflict(format!(
                "Function '{name}' is already registered"
            )));
        }
        self.functions.insert(name, body);
        Ok(())
    }

    pub fn get_function(&self, name: &str) -> Result<&Arc<IrGraph>> {
        self.functions.get(name).ok_or_else(|| {
            Error::InvalidArgument(format!("Function '{name}' is not registered"))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
