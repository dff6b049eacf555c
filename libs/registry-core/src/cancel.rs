/// Lets the controller reach into the health supervisor's probe task
/// fleet without depending on it directly. Implemented by
/// `health_supervisor::Supervisor`; the controller holds a trait object
/// so the two crates don't need to know about each other.
pub trait ProbeCanceller: Send + Sync {
    /// Cancel the probe task for `(name, address)` immediately, instead
    /// of waiting for it to next observe a missing row.
    fn cancel_probe(&self, name: &str, address: &str);
}

/// A canceller that does nothing; used where no supervisor is wired up
/// (tests, or a deployment that runs without health supervision).
pub struct NoopProbeCanceller;

impl ProbeCanceller for NoopProbeCanceller {
    fn cancel_probe(&self, _name: &str, _address: &str) {}
}
