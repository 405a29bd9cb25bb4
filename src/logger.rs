use tracing::{debug, error, info, warn};

use crate::engine::{EngineLogger, Severity};
use crate::error::DecompileError;

/// Forwards engine messages to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl EngineLogger for TracingLogger {
    fn write_message(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Trace => debug!(target: "classview::engine", "{message}"),
            Severity::Info => info!(target: "classview::engine", "{message}"),
            Severity::Warn => warn!(target: "classview::engine", "{message}"),
            Severity::Error => error!(target: "classview::engine", "{message}"),
        }
    }

    fn write_error(&self, message: &str, cause: DecompileError) -> DecompileError {
        cause.into_internal(message)
    }

    fn start_class(&self, class_name: &str) {
        debug!(target: "classview::engine", "processing class {class_name}");
    }

    fn end_class(&self) {
        debug!(target: "classview::engine", "... class processed");
    }

    fn start_write_class(&self, class_name: &str) {
        debug!(target: "classview::engine", "writing class {class_name}");
    }

    fn end_write_class(&self) {
        debug!(target: "classview::engine", "... class written");
    }

    fn start_method(&self, method: &str) {
        debug!(target: "classview::engine", "processing method {method}");
    }

    fn end_method(&self) {
        debug!(target: "classview::engine", "... method processed");
    }
}
