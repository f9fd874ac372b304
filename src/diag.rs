use parking_lot::Mutex;

/// Sink for diagnostics emitted while merging pulled events.
pub trait Diagnostics {
    fn error(&self, msg: &str);
    fn debug(&self, msg: &str);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }
}

/// Severity of a recorded diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Debug,
}

/// Keeps every diagnostic line in memory.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded lines of the given level, oldest first.
    pub fn lines(&self, level: Level) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lines(Level::Error)
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn error(&self, msg: &str) {
        self.lines.lock().push((Level::Error, msg.to_owned()));
    }

    fn debug(&self, msg: &str) {
        self.lines.lock().push((Level::Debug, msg.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_diagnostics_split_by_level() {
        let diag = MemoryDiagnostics::new();
        diag.debug("nothing to merge");
        diag.error("tag mismatch");
        diag.error("malformed");

        assert_eq!(diag.errors(), vec!["tag mismatch", "malformed"]);
        assert_eq!(diag.lines(Level::Debug), vec!["nothing to merge"]);
    }
}
