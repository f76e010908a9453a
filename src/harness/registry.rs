use std::sync::Arc;

use crate::error::ZoomError;

use super::unit::{UnitDescriptor, WorkUnit};

type UnitFactory = Box<dyn Fn() -> Arc<dyn WorkUnit> + Send + Sync>;

/// Ordered mapping from unit name to the factory that builds it.
#[derive(Default)]
pub struct UnitRegistry {
    entries: Vec<(String, UnitFactory)>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit. Names are unique, compared case-insensitively.
    pub fn register<F, U>(&mut self, name: impl Into<String>, factory: F) -> Result<&mut Self, ZoomError>
    where
        F: Fn() -> U + Send + Sync + 'static,
        U: WorkUnit + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ZoomError::InvalidRun("unit names must not be empty".into()));
        }
        if self.position(&name).is_some() {
            return Err(ZoomError::InvalidRun(format!("unit `{name}` is registered twice")));
        }
        let build: UnitFactory = Box::new(move || Arc::new(factory()) as Arc<dyn WorkUnit>);
        self.entries.push((name, build));
        Ok(self)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Instantiates units in registration order.
    ///
    /// An empty `only` selects every unit; otherwise each requested name must exist.
    pub fn build(&self, only: &[String]) -> Result<Vec<UnitDescriptor>, ZoomError> {
        for requested in only {
            if self.position(requested).is_none() {
                return Err(ZoomError::InvalidRun(format!(
                    "unknown unit `{requested}` (available: {})",
                    self.names().collect::<Vec<_>>().join(", ")
                )));
            }
        }

        Ok(self
            .entries
            .iter()
            .filter(|(name, _)| only.is_empty() || only.iter().any(|o| o.eq_ignore_ascii_case(name)))
            .map(|(name, factory)| UnitDescriptor::from_arc(name.clone(), factory()))
            .collect())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }
}
