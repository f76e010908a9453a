//! Where finished log blocks go.
//!
//! Every block is written while holding the console lock, so blocks from
//! different units never interleave.

use std::io::{self, Write};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use super::unit::LogBuffer;

/// Destination for rendered log blocks.
pub trait ConsoleSink: Send {
    fn write_block(&mut self, block: &str) -> io::Result<()>;
}

/// Plain standard output.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl ConsoleSink for StdoutSink {
    fn write_block(&mut self, block: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{block}")?;
        out.flush()
    }
}

/// Keeps blocks in memory. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    blocks: Arc<std::sync::Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn blocks(&self) -> Vec<String> {
        self.blocks.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

impl ConsoleSink for MemorySink {
    fn write_block(&mut self, block: &str) -> io::Result<()> {
        self.blocks
            .lock()
            .map_err(|_| io::Error::other("memory sink lock poisoned"))?
            .push(block.to_string());
        Ok(())
    }
}

/// Shared, serialized access to a [`ConsoleSink`].
pub struct Console {
    sink: Mutex<Box<dyn ConsoleSink>>,
}

impl Console {
    pub fn new(sink: impl ConsoleSink + 'static) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(StdoutSink)
    }

    /// Writes the whole buffer as one block. Failures are logged, not returned:
    /// losing console output must not change a unit's outcome.
    pub async fn flush(&self, log: &LogBuffer) {
        let block = log.render();
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.write_block(&block) {
            warn!(unit = log.name(), error = %e, "failed to write log block");
        }
    }
}
