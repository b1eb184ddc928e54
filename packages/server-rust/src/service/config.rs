use std::collections::HashMap;

/// Server-level configuration for the operation pipeline.
///
/// Controls operation timeouts and concurrency limits.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Unique identifier for this server node, copied into every `RequestContext`.
    pub node_id: String,
    /// Timeout applied to operation calls without an override, in milliseconds.
    pub default_operation_timeout_ms: u64,
    /// Per-operation timeout overrides, keyed by operation name.
    pub operation_timeouts_ms: HashMap<String, u64>,
    /// Maximum number of operation handlers running at once. Calls beyond it
    /// are shed with `Overloaded`.
    pub max_concurrent_operations: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            default_operation_timeout_ms: 30_000,
            operation_timeouts_ms: HashMap::new(),
            max_concurrent_operations: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_defaults() {
        let config = ServerConfig::default();
        assert!(config.node_id.is_empty());
        assert_eq!(config.default_operation_timeout_ms, 30_000);
        assert!(config.operation_timeouts_ms.is_empty());
        assert_eq!(config.max_concurrent_operations, 1000);
    }
}
