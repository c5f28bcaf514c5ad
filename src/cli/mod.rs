use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Terminal client for the EduBot tutoring service", long_about = None)]
pub struct Args {
    // --- Backend ---
    /// Base URL of the tutoring backend (serves /health, /chat, /submit-feedback, ...)
    #[arg(long, env = "EDUBOT_SERVER_URL", default_value = "http://localhost:8080")]
    pub server_url: String,

    // --- Generation ---
    /// Sampling temperature sent with every chat request.
    #[arg(long, env = "EDUBOT_TEMPERATURE", default_value = "0.3")]
    pub temperature: f64,

    /// Maximum number of tokens the backend may generate per reply.
    #[arg(long, env = "EDUBOT_MAX_TOKENS", default_value = "512")]
    pub max_tokens: u32,

    /// How many of the most recent messages are sent as context.
    #[arg(long, env = "EDUBOT_CONTEXT_WINDOW", default_value = "3")]
    pub context_window: usize,

    // --- Storage ---
    /// Directory holding the conversation snapshot and theme preference.
    #[arg(long, env = "EDUBOT_DATA_DIR", default_value = ".edubot")]
    pub data_dir: String,

    // --- Display ---
    /// Theme to use (dark, light). Overrides the stored preference when set.
    #[arg(long, env = "EDUBOT_THEME")]
    pub theme: Option<String>,

    /// Disable heuristic highlighting of math-looking text.
    #[arg(long, env = "EDUBOT_NO_MATH", default_value = "false")]
    pub no_math: bool,

    /// HTML-escape message text before rendering. Off by default: markup in
    /// replies is rendered as markup.
    #[arg(long, env = "EDUBOT_ESCAPE_HTML", default_value = "false")]
    pub escape_html: bool,

    /// Delay before math typesetting runs over a newly added message.
    #[arg(long, env = "EDUBOT_TYPESET_DELAY_MS", default_value = "100")]
    pub typeset_delay_ms: u64,

    /// How long notifications stay visible.
    #[arg(long, env = "EDUBOT_TOAST_MS", default_value = "3000")]
    pub toast_ms: u64,

    /// Write the rendered conversation view to this HTML file on exit.
    #[arg(long, env = "EDUBOT_HTML_OUT")]
    pub html_out: Option<String>,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}
