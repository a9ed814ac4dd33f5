use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use serde_json::Value;
use taskloom_model::{
    Completion, CompletionGateway, CompletionOutput, CompletionRequest,
    FragmentStream, GatewayError,
};
use tokio::sync::mpsc;
use tracing::Instrument;

/// The error type after the concrete gateway has been erased.
pub type BoxedGatewayError = Box<dyn GatewayError>;

type CompleteResult = Result<GatewayReply, BoxedGatewayError>;
type BoxedCompleteFuture =
    Pin<Box<dyn Future<Output = CompleteResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(CompletionRequest) -> BoxedCompleteFuture + Send + Sync>;

/// How many fragments the pump channel can buffer before the producer
/// has to wait for the consumer.
const FRAGMENT_CHANNEL_CAPACITY: usize = 32;

/// A reply from the gateway client with the gateway type erased.
pub enum GatewayReply {
    /// The gateway answered with a single full completion.
    Full(Completion),
    /// The gateway answered with a live fragment stream, pumped into
    /// this channel by a background task.
    Fragments(mpsc::Receiver<Result<String, BoxedGatewayError>>),
}

/// A wrapper around a completion gateway that maintains an execution
/// environment for the gateway and provides a type-erased interface
/// for the other modules.
#[derive(Clone)]
pub struct GatewayClient {
    handler_fn: HandlerFn,
}

impl GatewayClient {
    #[inline]
    pub(crate) fn new<G: CompletionGateway + 'static>(gateway: G) -> Self {
        // We have to erase the type `G`, since `GatewayClient` doesn't
        // have a generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = gateway.complete(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let output = match fut.await {
                        Ok(output) => output,
                        Err(err) => {
                            error!("got an error: {err:?}");
                            return Err(Box::new(err) as BoxedGatewayError);
                        }
                    };
                    Ok(match output {
                        CompletionOutput::Full(completion) => {
                            GatewayReply::Full(completion)
                        }
                        CompletionOutput::Stream(stream) => {
                            GatewayReply::Fragments(spawn_pump(stream))
                        }
                    })
                }
                .instrument(trace_span!("gateway client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and resolves the reply to a full completion.
    ///
    /// A gateway that answers with a fragment stream anyway gets its
    /// fragments drained and concatenated here, so callers of this
    /// method never see a stream.
    pub async fn complete_text(
        &self,
        req: CompletionRequest,
    ) -> Result<Completion, BoxedGatewayError> {
        match (self.handler_fn)(req).await? {
            GatewayReply::Full(completion) => Ok(completion),
            GatewayReply::Fragments(mut rx) => {
                debug!("draining an unexpected fragment stream");
                let mut text = String::new();
                while let Some(fragment) = rx.recv().await.transpose()? {
                    text.push_str(&fragment);
                }
                Ok(Completion {
                    text,
                    raw: Value::Null,
                })
            }
        }
    }

    /// Sends a request and resolves the reply to a fragment channel.
    ///
    /// A gateway that answers with a full completion anyway is adapted
    /// into a single-fragment channel, so callers of this method
    /// always get a stream.
    ///
    /// # Cancel safety
    ///
    /// Dropping the returned receiver stops the background pump after
    /// at most one buffered batch of fragments.
    pub async fn open_stream(
        &self,
        req: CompletionRequest,
    ) -> Result<mpsc::Receiver<Result<String, BoxedGatewayError>>, BoxedGatewayError>
    {
        match (self.handler_fn)(req).await? {
            GatewayReply::Fragments(rx) => Ok(rx),
            GatewayReply::Full(completion) => {
                debug!("adapting an unexpected full completion to a stream");
                let (tx, rx) = mpsc::channel(1);
                let _ = tx.try_send(Ok(completion.text));
                Ok(rx)
            }
        }
    }
}

/// Spawns a task that pumps the fragment stream into a channel.
///
/// The pump stops pulling from the stream as soon as a send fails,
/// which is how a dropped receiver cancels an in-flight stream.
fn spawn_pump<S: FragmentStream>(
    stream: S,
) -> mpsc::Receiver<Result<String, BoxedGatewayError>> {
    let (tx, rx) = mpsc::channel(FRAGMENT_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        let mut stream = pin!(stream);
        loop {
            let fragment_or_err =
                poll_fn(|cx| stream.as_mut().poll_next_fragment(cx)).await;
            match fragment_or_err {
                Ok(Some(fragment)) => {
                    if tx.send(Ok(fragment)).await.is_err() {
                        trace!("fragment receiver dropped, stopping pump");
                        return;
                    }
                }
                Ok(None) => return,
                Err(err) => {
                    error!("got an error: {err:?}");
                    let _ =
                        tx.send(Err(Box::new(err) as BoxedGatewayError)).await;
                    return;
                }
            }
        }
    });
    rx
}
