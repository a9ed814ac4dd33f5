use std::fmt::{self, Debug, Formatter};
use std::pin::Pin;
use std::task::{self, Poll};

use serde_json::Value;

use crate::error::GatewayError;

/// A fully decoded single-shot completion.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    /// The trimmed message text of the first choice.
    pub text: String,
    /// The raw decoded payload, kept for callers that need more than
    /// the message text.
    pub raw: Value,
}

/// An open stream of partial-content fragments from the endpoint.
pub trait FragmentStream: Sized + Send + 'static {
    /// The error type that may be returned by the stream.
    type Error: GatewayError;

    /// Attempts to pull out the next text fragment from the stream.
    ///
    /// # Return value
    ///
    /// There are several possible return values, each indicating a
    /// distinct stream state:
    ///
    /// - `Poll::Pending` means that this stream is still waiting for
    ///   the next fragment. Implementations will ensure that the
    ///   current task will be notified when the next fragment may be
    ///   ready.
    /// - `Poll::Ready(Ok(Some(fragment)))` means the stream has a
    ///   fragment to deliver, and may produce further fragments on
    ///   subsequent `poll_next_fragment` calls. A fragment carries
    ///   zero or more characters and never carries a completion
    ///   signal.
    /// - `Poll::Ready(Ok(None))` means the stream has completed.
    /// - `Poll::Ready(Err(error))` means an error occurred while
    ///   reading the stream.
    ///
    /// Calling this method after completion should always return
    /// `None`.
    fn poll_next_fragment(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<String>, Self::Error>>;
}

/// The outcome of a completion call, selected by the request's stream
/// flag.
pub enum CompletionOutput<S> {
    /// The full decoded single-shot result.
    Full(Completion),
    /// A live fragment source.
    Stream(S),
}

// Streams are not `Debug`, so this is implemented by hand.
impl<S> Debug for CompletionOutput<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(completion) => {
                f.debug_tuple("Full").field(completion).finish()
            }
            Self::Stream(_) => f.debug_struct("Stream").finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    #[test]
    fn test_output_debug() {
        struct OpaqueStream;

        let output = CompletionOutput::<OpaqueStream>::Full(Completion {
            text: "hi".to_owned(),
            raw: Value::Null,
        });
        assert!(format!("{output:?}").starts_with("Full("));

        let output = CompletionOutput::Stream(OpaqueStream);
        assert_eq!(format!("{output:?}"), "Stream { .. }");
    }
}
