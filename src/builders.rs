//! Builder registry.
//!
//! A builder turns the structural result of a rule into application data, or vetoes it.
//! Returning [`Data::Built`] hands back an opaque value; returning any other variant keeps
//! the result engine-shaped so enclosing builders can keep composing it.
//!
//! ## Usage
//! ```rust
//! use lidy::builders::BuilderRegistry;
//! use lidy::result::Data;
//!
//! let mut builders: BuilderRegistry<u32> = BuilderRegistry::new();
//! builders.register("port", |result| match result.data.as_scalar().and_then(|s| s.as_i64()) {
//!     Some(port) if port > 0 => Ok(Data::Built(port as u32)),
//!     _ => Err("a port must be positive".into()),
//! });
//! assert!(builders.has("port"));
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::result::{Data, LidyResult};

/// Error returned by a builder. A boxed [`CheckError`](crate::errors::CheckError) is
/// reported as is; anything else is wrapped into a builder violation.
pub type BuildError = Box<dyn std::error::Error + Send + Sync>;

pub type Builder<T> = Box<dyn Fn(LidyResult<T>) -> Result<Data<T>, BuildError> + Send + Sync>;

/// Builders keyed by the name of the rule they apply to.
pub struct BuilderRegistry<T> {
    builders: HashMap<String, Builder<T>>,
}

impl<T> BuilderRegistry<T> {
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Registers `builder` for the rule `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, builder: F)
    where
        F: Fn(LidyResult<T>) -> Result<Data<T>, BuildError> + Send + Sync + 'static,
    {
        self.builders.insert(name.into(), Box::new(builder));
    }

    pub fn get(&self, name: &str) -> Option<&Builder<T>> {
        self.builders.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

impl<T> Default for BuilderRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BuilderRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("BuilderRegistry")
            .field("rules", &names)
            .finish()
    }
}
