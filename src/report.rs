//! Error-observability sink.
//!
//! The snapshot engine and batch runner push non-fatal and per-share
//! errors here instead of propagating them; the run keeps going. The
//! default sink logs through `tracing`, which the operator ships
//! wherever their collector lives.

use crate::error::Error;

/// Fire-and-forget error sink.
pub trait Reporter {
    /// Report an error with the share or operation it belongs to.
    fn report(&self, context: &str, error: &Error);
}

/// Reporter that emits a structured `tracing` error event.
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, context: &str, error: &Error) {
        tracing::error!(context, error = %error, "backup error");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Reporter;
    use crate::error::Error;
    use std::sync::Mutex;

    /// Reporter that collects `(context, message)` pairs for assertions.
    #[derive(Debug, Default)]
    pub struct MemoryReporter {
        reports: Mutex<Vec<(String, String)>>,
    }

    impl MemoryReporter {
        pub fn reports(&self) -> Vec<(String, String)> {
            self.reports.lock().unwrap().clone()
        }
    }

    impl Reporter for MemoryReporter {
        fn report(&self, context: &str, error: &Error) {
            self.reports
                .lock()
                .unwrap()
                .push((context.to_string(), error.to_string()));
        }
    }
}
