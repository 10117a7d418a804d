use base64::Engine;
use futures::future::BoxFuture;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Splits a `provider/model` identifier into its segments. Identifiers
/// without a slash route to the catch-all provider name.
pub fn split_model_id(id: &str) -> (&str, &str) {
    match id.split_once('/') {
        Some((provider, model)) => (provider, model),
        None => ("default", id),
    }
}

/// One chat completion request as a provider adapter sees it. Image bytes
/// stay raw here; adapters encode them for their wire format (base64 data
/// URLs for the OpenAI-compatible shape, see [`image_to_base64`]).
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub images: Vec<Vec<u8>>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub json_response: bool,
    /// Provider-level prompt caching for the shared system prefix. Always
    /// requested where the provider offers it.
    pub enable_prompt_cache: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Per-call provider failures. The gateway's retry discipline branches on
/// these: rate limits back off and retry, everything else skips to the next
/// model in the chain.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// A model provider adapter. Implementations live at the composition root
/// (HTTP SDK wrappers, local inference, test scripts); the gateway only ever
/// sees this trait.
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;

    fn complete<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<ChatResponse, ProviderError>>;

    /// Whether the provider honors prompt-cache hints for this model.
    fn supports_prompt_cache(&self, _model: &str) -> bool {
        false
    }
}

/// Providers are values in a table keyed by the provider segment of the
/// model identifier.
#[derive(Default, Clone)]
pub struct ProviderTable {
    providers: FxHashMap<String, Arc<dyn ModelProvider>>,
}

impl ProviderTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn ModelProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn with(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ModelProvider>> {
        self.providers.get(name)
    }
}

impl std::fmt::Debug for ProviderTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTable")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Encodes image bytes the way OpenAI-compatible adapters ship them.
pub fn image_to_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Deterministic in-process provider driven by a pre-loaded script of
/// responses. Used by the test suites and CLI dry runs; each call pops the
/// next scripted result and records which model was asked.
pub struct ScriptedProvider {
    name: String,
    script: Mutex<std::collections::VecDeque<Result<ChatResponse, ProviderError>>>,
    calls: Mutex<Vec<String>>,
    prompt_cache: bool,
}

impl ScriptedProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(std::collections::VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            prompt_cache: true,
        }
    }

    pub fn without_prompt_cache(mut self) -> Self {
        self.prompt_cache = false;
        self
    }

    pub fn push_ok(&self, content: impl Into<String>, input_tokens: u64, output_tokens: u64) {
        self.script
            .lock()
            .expect("script lock")
            .push_back(Ok(ChatResponse {
                content: content.into(),
                input_tokens,
                output_tokens,
            }));
    }

    pub fn push_err(&self, error: ProviderError) {
        self.script.lock().expect("script lock").push_back(Err(error));
    }

    /// Models asked so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn complete<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<ChatResponse, ProviderError>> {
        Box::pin(async move {
            self.calls
                .lock()
                .expect("calls lock")
                .push(request.model.clone());
            self.script
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or_else(|| {
                    Err(ProviderError::Malformed(
                        "scripted provider exhausted".to_string(),
                    ))
                })
        })
    }

    fn supports_prompt_cache(&self, _model: &str) -> bool {
        self.prompt_cache
    }
}
