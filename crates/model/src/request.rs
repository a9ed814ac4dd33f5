/// A request to be sent to the completion endpoint.
///
/// The prompt is a single fully rendered user message; token budgeting
/// happens before the request is built (the gateway forwards
/// `max_tokens` untouched).
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    /// The rendered prompt text.
    pub prompt: String,
    /// Upper bound on the number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Whether the response should be streamed incrementally.
    pub stream: bool,
}

impl CompletionRequest {
    /// Creates a single-shot (non-streaming) request.
    #[inline]
    pub fn single_shot<S: Into<String>>(prompt: S, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            temperature: 0.9,
            stream: false,
        }
    }

    /// Creates a streaming request.
    #[inline]
    pub fn streaming<S: Into<String>>(prompt: S, max_tokens: u32) -> Self {
        Self {
            stream: true,
            ..Self::single_shot(prompt, max_tokens)
        }
    }

    /// Overrides the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}
