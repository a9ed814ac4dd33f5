use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use taskloom_model::FragmentStream;

use crate::Error;
use crate::io::Sse;
use crate::proto::ChatCompletionChunk;

struct PartialState {
    sse: Sse,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextFragment = Result<(Option<String>, PartialState), Error>;

pin_project! {
    /// A live fragment stream over an SSE response body.
    pub struct OpenAIStream {
        next_fragment_fut: Option<PinnedFuture<NextFragment>>,
    }
}

impl OpenAIStream {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState { sse };
        let next_fragment_fut =
            async move { next_fragment(partial_state).await };
        Self {
            next_fragment_fut: Some(Box::pin(next_fragment_fut)),
        }
    }
}

impl FragmentStream for OpenAIStream {
    type Error = crate::Error;

    fn poll_next_fragment(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<String>, Self::Error>> {
        let this = self.project();
        let Some(next_fragment_fut) = this.next_fragment_fut else {
            // The stream has been exhausted.
            return Poll::Ready(Ok(None));
        };
        let (fragment, partial_state) =
            match ready!(next_fragment_fut.as_mut().poll(cx)) {
                Ok((Some(fragment), partial_state)) => {
                    (fragment, partial_state)
                }
                Ok((None, _)) => {
                    *this.next_fragment_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_fragment_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future
        // for the next fragment.
        let next_fragment_fut =
            async move { next_fragment(partial_state).await };
        *this.next_fragment_fut = Some(Box::pin(next_fragment_fut));

        Poll::Ready(Ok(Some(fragment)))
    }
}

async fn next_fragment(mut partial_state: PartialState) -> NextFragment {
    loop {
        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => return Ok((None, partial_state)),
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), None));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            return Ok((None, partial_state));
        }

        // An individual frame that doesn't match the expected chunk shape
        // is skipped, not fatal to the stream.
        let mut chunk =
            match serde_json::from_str::<ChatCompletionChunk>(&sse_event) {
                Ok(chunk) => chunk,
                Err(err) => {
                    warn!("skipping malformed stream frame: {err}");
                    continue;
                }
            };

        let Some(choice) = chunk.choices.pop() else {
            continue;
        };
        // Some servers attach the final delta to the finishing chunk,
        // so the content is delivered first; the stream ends on the
        // next pull.
        if let Some(content) = choice.delta.content {
            return Ok((Some(content), partial_state));
        }
        if choice.finish_reason.is_some() {
            return Ok((None, partial_state));
        }
    }
}
