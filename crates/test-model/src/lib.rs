//! A local fake completion gateway for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use serde_json::json;
use taskloom_model::{
    Completion, CompletionGateway, CompletionOutput, CompletionRequest,
    FragmentStream, GatewayError,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    status: Option<u16>,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl GatewayError for Error {
    #[inline]
    fn upstream_status(&self) -> Option<u16> {
        self.status
    }
}

pub struct TestFragmentStream {
    fragments: VecDeque<String>,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl FragmentStream for TestFragmentStream {
    type Error = Error;

    fn poll_next_fragment(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<String>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };
        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            return Poll::Ready(Ok(this.fragments.pop_front()));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_fragment(cx)
    }
}

/// A local fake completion gateway for testing purpose.
///
/// Before sending requests, you need to setup the reply script, which
/// is how the gateway should respond to each request, in order. If the
/// script runs out, an error will be returned.
///
/// A `Completed` reply answers a streaming request as one fragment,
/// and a `Fragments` reply answers a single-shot request with the
/// concatenated text, so one script can serve both request modes.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy
/// memory copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestGateway {
    script: Arc<std::sync::Mutex<Vec<PresetReply>>>,
    next_reply: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl TestGateway {
    #[inline]
    pub fn add_reply(&mut self, reply: PresetReply) {
        self.script.lock().unwrap().push(reply);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }
}

impl CompletionGateway for TestGateway {
    type Error = Error;
    type Stream = TestFragmentStream;

    fn complete(
        &self,
        req: &CompletionRequest,
    ) -> impl Future<
        Output = Result<CompletionOutput<Self::Stream>, Self::Error>,
    > + Send
    + 'static {
        let reply_idx = self.next_reply.fetch_add(1, Ordering::Relaxed);
        let reply = self.script.lock().unwrap().get(reply_idx).cloned();
        let delay = self.delay.unwrap_or(Duration::from_millis(1));
        let stream = req.stream;

        let result = match reply {
            None => Err(Error {
                message: "no scripted reply left".to_owned(),
                status: None,
            }),
            Some(PresetReply::Failure { status, message }) => {
                Err(Error { message, status })
            }
            Some(PresetReply::Completed(text)) => {
                if stream {
                    Ok(CompletionOutput::Stream(TestFragmentStream {
                        fragments: VecDeque::from([text]),
                        delay,
                        sleep: None,
                    }))
                } else {
                    Ok(CompletionOutput::Full(full_completion(text)))
                }
            }
            Some(PresetReply::Fragments(fragments)) => {
                if stream {
                    Ok(CompletionOutput::Stream(TestFragmentStream {
                        fragments: fragments.into(),
                        delay,
                        sleep: None,
                    }))
                } else {
                    Ok(CompletionOutput::Full(full_completion(
                        fragments.concat(),
                    )))
                }
            }
        };
        ready(result)
    }
}

fn full_completion(text: String) -> Completion {
    Completion {
        raw: json!({
            "choices": [{ "message": { "content": text } }]
        }),
        text,
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use super::*;

    #[tokio::test]
    async fn test_scripted_replies() {
        let mut gateway = TestGateway::default();
        gateway.add_reply(PresetReply::Completed(
            "1. Book a venue".to_owned(),
        ));
        gateway.add_reply(PresetReply::Fragments(vec![
            "Hel".to_owned(),
            "lo".to_owned(),
        ]));
        gateway.add_reply(PresetReply::upstream_failure(
            500,
            "model overloaded",
        ));

        let single_shot = CompletionRequest::single_shot("decompose", 500);
        let output = gateway.complete(&single_shot).await.unwrap();
        let CompletionOutput::Full(completion) = output else {
            unreachable!("expected a full completion");
        };
        assert_eq!(completion.text, "1. Book a venue");

        let streaming = CompletionRequest::streaming("summarize", 1000);
        let output = gateway.complete(&streaming).await.unwrap();
        let CompletionOutput::Stream(stream) = output else {
            unreachable!("expected a fragment stream");
        };
        let mut stream = pin!(stream);
        let mut text = String::new();
        while let Some(fragment) =
            poll_fn(|cx| stream.as_mut().poll_next_fragment(cx))
                .await
                .unwrap()
        {
            text.push_str(&fragment);
        }
        assert_eq!(text, "Hello");

        let err = gateway.complete(&single_shot).await.unwrap_err();
        assert_eq!(err.upstream_status(), Some(500));

        // The script is exhausted now.
        let err = gateway.complete(&single_shot).await.unwrap_err();
        assert_eq!(err.upstream_status(), None);
    }
}
