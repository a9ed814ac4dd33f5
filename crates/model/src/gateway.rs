use crate::error::GatewayError;
use crate::request::CompletionRequest;
use crate::response::{CompletionOutput, FragmentStream};

/// A type that represents a completion gateway, which wraps calls to
/// an external chat-completion endpoint.
///
/// Once the gateway is created, it should behave like a stateless
/// object. It can still have internal state, but callers should not
/// rely on it, and the gateway should be prepared for being dropped
/// anytime.
pub trait CompletionGateway: Send + Sync {
    /// The error type that may be returned by the gateway.
    type Error: GatewayError;

    /// The fragment stream type for streaming requests.
    type Stream: FragmentStream<Error = Self::Error>;

    /// Sends a request to the completion endpoint.
    ///
    /// The request's `stream` flag selects the output: `Full` with the
    /// whole decoded message for single-shot requests, `Stream` with a
    /// live fragment source for streaming ones.
    fn complete(
        &self,
        req: &CompletionRequest,
    ) -> impl Future<Output = Result<CompletionOutput<Self::Stream>, Self::Error>>
    + Send
    + 'static;
}
