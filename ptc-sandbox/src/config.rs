//! Sandbox resource limits.

/// The two limits a sandboxed run is bound by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxConfig {
    /// Wall-clock budget for one run, in milliseconds.
    pub timeout_ms: u64,
    /// Maximum serialized size of the resulting memory, in bytes.
    pub memory_limit_bytes: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        SandboxConfig {
            timeout_ms: 1_000,
            memory_limit_bytes: 10 * 1024 * 1024,
        }
    }
}
