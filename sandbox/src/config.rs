use std::time::Duration;

/// Resource limits for one sandbox execution.
///
/// Mirrors how this lineage shapes runtime configuration for other
/// metered-execution hosts: a plain struct with a `Default` and a couple of
/// named constructors, constructed directly by the caller rather than read
/// from disk or the environment.
#[derive(Debug, Clone, Copy)]
pub struct SandboxConfig {
    /// Hard wall-clock cutoff enforced by the host, independent of the
    /// engine's own iteration/recursion counters.
    pub timeout: Duration,
    /// Engine-level cap on loop iterations per script, the first line of
    /// defense against runaway scripts.
    pub loop_iteration_limit: u64,
    /// Engine-level recursion depth cap.
    pub recursion_limit: usize,
    /// Engine-level stack size cap, in bytes.
    pub stack_size_limit: usize,
    /// Maximum size, in bytes of the `JSON.stringify`-encoded form, of a
    /// contract's captured data snapshot.
    pub max_data_bytes: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::for_production()
    }
}

impl SandboxConfig {
    /// Generous limits suited to real contract workloads.
    pub fn for_production() -> Self {
        Self {
            timeout: Duration::from_millis(500),
            loop_iteration_limit: 10_000_000,
            recursion_limit: 512,
            stack_size_limit: 1024 * 1024,
            max_data_bytes: 64 * 1024,
        }
    }

    /// Tight limits for unit/integration tests: short timeout, small
    /// iteration cap, so a misbehaving fixture doesn't stall the test
    /// process or leak a long-lived worker thread.
    pub fn for_testing() -> Self {
        Self {
            timeout: Duration::from_millis(100),
            loop_iteration_limit: 200_000,
            recursion_limit: 64,
            stack_size_limit: 256 * 1024,
            max_data_bytes: 8 * 1024,
        }
    }
}
