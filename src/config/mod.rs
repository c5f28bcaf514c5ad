use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::cli::Args;
use crate::format::FormatOptions;
use crate::ui::Theme;

pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 512;
pub const DEFAULT_CONTEXT_WINDOW: usize = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid server URL '{0}': {1}")]
    InvalidUrl(String, url::ParseError),

    #[error("Unsupported server URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("{0}")]
    InvalidTheme(String),

    #[error("Context window must hold at least one message")]
    EmptyContextWindow,
}

/// Generation parameters sent with every chat request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: Url,
    pub params: GenerationParams,
    pub context_window: usize,
    pub data_dir: PathBuf,
    pub theme: Option<Theme>,
    pub format: FormatOptions,
    pub typeset_delay: Duration,
    pub toast_duration: Duration,
    pub html_out: Option<PathBuf>,
}

impl ClientConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let server_url = Url::parse(&args.server_url)
            .map_err(|e| ConfigError::InvalidUrl(args.server_url.clone(), e))?;
        if !matches!(server_url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(server_url.scheme().to_string()));
        }
        if args.context_window == 0 {
            return Err(ConfigError::EmptyContextWindow);
        }
        let theme = args.theme
            .as_deref()
            .map(str::parse::<Theme>)
            .transpose()
            .map_err(|e| ConfigError::InvalidTheme(e.to_string()))?;

        Ok(Self {
            server_url,
            params: GenerationParams {
                temperature: args.temperature,
                max_tokens: args.max_tokens,
            },
            context_window: args.context_window,
            data_dir: PathBuf::from(&args.data_dir),
            theme,
            format: FormatOptions {
                highlight_math: !args.no_math,
                escape_html: args.escape_html,
            },
            typeset_delay: Duration::from_millis(args.typeset_delay_ms),
            toast_duration: Duration::from_millis(args.toast_ms),
            html_out: args.html_out.as_ref().map(PathBuf::from),
        })
    }
}
