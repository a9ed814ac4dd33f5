//! A completion gateway for OpenAI-compatible APIs.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reqwest::{Client, header};
use serde_json::Value;
use taskloom_model::{
    Completion, CompletionGateway, CompletionOutput, CompletionRequest,
    GatewayError,
};

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
use io::{Chunks, Sse};
pub use response::OpenAIStream;

/// Error type for [`OpenAIGateway`].
#[derive(Debug)]
pub struct Error {
    message: String,
    status: Option<u16>,
}

impl Error {
    fn new(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
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

/// OpenAI-compatible completion gateway.
#[derive(Clone, Debug)]
pub struct OpenAIGateway {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIGateway {
    /// Creates a new `OpenAIGateway` with the given configuration.
    #[inline]
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl CompletionGateway for OpenAIGateway {
    type Error = Error;
    type Stream = OpenAIStream;

    fn complete(
        &self,
        req: &CompletionRequest,
    ) -> impl Future<Output = Result<CompletionOutput<OpenAIStream>, Error>>
    + Send
    + 'static {
        let stream = req.stream;
        let payload = proto::create_request(req, &self.config);
        let mut builder = self
            .client
            .post(format!("{}{}", self.config.base_url, "/chat/completions"))
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(self.config.timeout);
        if !self.config.api_key.is_empty() {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            );
        }
        if stream {
            builder = builder.header(header::ACCEPT, "text/event-stream");
        }
        let resp_fut = builder.json(&payload).send();

        async move {
            let resp = match resp_fut.await {
                Ok(resp) => resp,
                Err(err) => {
                    return Err(Error::new(format!("{err}"), None));
                }
            };

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                error!("completion endpoint returned {status}: {text}");
                return Err(Error::new(
                    format!("completion endpoint returned {status}: {text}"),
                    Some(status.as_u16()),
                ));
            }

            if !stream {
                let raw: Value = resp
                    .json()
                    .await
                    .map_err(|err| Error::new(format!("{err}"), None))?;
                return Ok(CompletionOutput::Full(decode_completion(raw)?));
            }

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_event_stream = content_type
                .and_then(|v| v.parse().ok())
                .map(|m: Mime| m.subtype().as_str() == "event-stream")
                .unwrap_or(false);
            if !is_event_stream {
                return Err(Error::new(
                    format!("unexpected content type: {content_type:?}"),
                    None,
                ));
            }

            // Here we got a successful streaming response.
            let chunks = Chunks::from_response(resp);
            let sse = Sse::new(chunks);
            Ok(CompletionOutput::Stream(OpenAIStream::from_sse(sse)))
        }
    }
}

fn decode_completion(raw: Value) -> Result<Completion, Error> {
    let decoded =
        serde_json::from_value::<proto::ChatCompletion>(raw.clone())
            .map_err(|err| Error::new(format!("{err}"), None))?;
    let text = decoded
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| Error::new("missing message content", None))?;
    Ok(Completion {
        text: text.trim().to_owned(),
        raw,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_completion() {
        let raw = json!({
            "choices": [
                { "message": { "content": "  1. Book a venue\n2. Order a cake  " } }
            ]
        });
        let completion = decode_completion(raw.clone()).unwrap();
        assert_eq!(completion.text, "1. Book a venue\n2. Order a cake");
        assert_eq!(completion.raw, raw);
    }

    #[test]
    fn test_decode_completion_missing_content() {
        let err = decode_completion(json!({ "choices": [] })).unwrap_err();
        assert_eq!(err.upstream_status(), None);
        assert_eq!(err.message(), "missing message content");
    }
}
