use std::error::Error;

/// The error type for a completion gateway.
///
/// Transport failures, non-success upstream statuses and unexpected
/// payload shapes are all normalized into this one kind; callers must
/// not need to distinguish them. An error is fatal to the current
/// request, never to the process.
pub trait GatewayError: Error + Send + Sync + 'static {
    /// Returns the HTTP status reported by the upstream endpoint, when
    /// the failure originated there. Transport-level failures have no
    /// status.
    fn upstream_status(&self) -> Option<u16> {
        None
    }
}
