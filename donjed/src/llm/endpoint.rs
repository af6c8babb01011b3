use crate::config::LlmConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointMode {
    /// `stream: true`, body read as server-sent events.
    Streaming,
    /// `stream: false`, whole answer in one JSON body.
    NonStreaming,
}

/// One chat completions URL and the way it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmEndpoint {
    pub url: String,
    pub mode: EndpointMode,
}

impl LlmEndpoint {
    pub fn streaming(base_url: &str) -> Self {
        Self {
            url: completions_url(base_url),
            mode: EndpointMode::Streaming,
        }
    }

    pub fn non_streaming(base_url: &str) -> Self {
        Self {
            url: completions_url(base_url),
            mode: EndpointMode::NonStreaming,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.mode == EndpointMode::Streaming
    }
}

/// Endpoints in the order they are tried: the configured base URL with
/// streaming, then each fallback without.
pub fn endpoints_from_config(config: &LlmConfig) -> Vec<LlmEndpoint> {
    std::iter::once(LlmEndpoint::streaming(&config.base_url))
        .chain(
            config
                .fallback_urls
                .iter()
                .map(|url| LlmEndpoint::non_streaming(url)),
        )
        .collect()
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}
