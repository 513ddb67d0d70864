//! Instrumentation boundary of the simulator

/// Receives the events emitted by a simulated dependency call.
///
/// Implementations are shared across concurrent simulations and must be
/// internally synchronized.
pub trait Instrumentation: Send + Sync {
    fn inc_inflight(&self, operation: &str, target: &str);

    fn dec_inflight(&self, operation: &str, target: &str);

    /// Observe the duration of one call and count it, tagged with `status`
    /// (`success` or `error`).
    fn record_query(&self, operation: &str, target: &str, status: &str, seconds: f64);

    fn record_error(&self, operation: &str, target: &str, error_type: &str);

    fn record_rows_affected(&self, operation: &str, target: &str, rows: u32);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInstrumentation;

impl Instrumentation for NoopInstrumentation {
    fn inc_inflight(&self, _operation: &str, _target: &str) {}

    fn dec_inflight(&self, _operation: &str, _target: &str) {}

    fn record_query(&self, _operation: &str, _target: &str, _status: &str, _seconds: f64) {}

    fn record_error(&self, _operation: &str, _target: &str, _error_type: &str) {}

    fn record_rows_affected(&self, _operation: &str, _target: &str, _rows: u32) {}
}

/// Holds an in-flight slot and releases it on drop, on every exit path.
pub(crate) struct InflightGuard<'a> {
    sink: &'a dyn Instrumentation,
    operation: &'a str,
    target: &'a str,
}

impl<'a> InflightGuard<'a> {
    pub(crate) fn acquire(sink: &'a dyn Instrumentation, operation: &'a str, target: &'a str) -> Self {
        sink.inc_inflight(operation, target);
        Self {
            sink,
            operation,
            target,
        }
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.sink.dec_inflight(self.operation, self.target);
    }
}
