use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::context::RunContext;

/// One independently runnable suite.
///
/// Implementations must check `ctx.cancel` at their own suspension points;
/// nothing preempts a unit that never looks at it.
#[async_trait]
pub trait WorkUnit: Send + Sync {
    async fn run(&self, ctx: &RunContext, log: &mut LogBuffer) -> anyhow::Result<()>;
}

/// A registered unit and the name it reports under.
#[derive(Clone)]
pub struct UnitDescriptor {
    pub(crate) name: String,
    pub(crate) unit: Arc<dyn WorkUnit>,
}

impl UnitDescriptor {
    pub fn new(name: impl Into<String>, unit: impl WorkUnit + 'static) -> Self {
        Self::from_arc(name, Arc::new(unit))
    }

    pub fn from_arc(name: impl Into<String>, unit: Arc<dyn WorkUnit>) -> Self {
        Self {
            name: name.into(),
            unit,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for UnitDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Text a unit accumulates while it runs. Flushed to the console once, as one block.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    name: String,
    lines: Vec<String>,
}

impl LogBuffer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: Vec::new(),
        }
    }

    pub fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        let mut block = format!("===== {} =====\n", self.name);
        for line in &self.lines {
            block.push_str(line);
            block.push('\n');
        }
        block
    }
}
