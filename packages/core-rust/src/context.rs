/// Per-request context handed to every operation alongside its input.
///
/// Built by the transport for each inbound request. Business functions may
/// read it for logging and correlation; the operation adapter treats it as
/// opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Identifier of the server node handling this request.
    pub node_id: String,
    /// Monotonic per-node call identifier.
    pub call_id: u64,
    /// Name of the operation being invoked.
    pub operation: String,
    /// Distributed trace identifier for observability.
    pub trace_id: String,
}

impl RequestContext {
    #[must_use]
    pub fn new(
        node_id: impl Into<String>,
        call_id: u64,
        operation: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            call_id,
            operation: operation.into(),
            trace_id: trace_id.into(),
        }
    }
}
