pub mod app;
pub mod cli;
pub mod config;
pub mod format;
pub mod history;
pub mod models;
pub mod session;
pub mod storage;
pub mod transport;
pub mod ui;

use cli::Args;
use config::ClientConfig;
use log::info;
use session::{ ChatSession, SessionOptions };
use std::error::Error;
use std::sync::Arc;
use storage::FileStore;
use transport::HttpTransport;
use ui::{ Fanout, HtmlView, NoopTypesetter, Renderer, TerminalRenderer };

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = ClientConfig::from_args(&args)?;

    info!("--- Client Configuration ---");
    info!("Server URL: {}", config.server_url);
    info!("Data Directory: {}", config.data_dir.display());
    info!("Temperature: {}", config.params.temperature);
    info!("Max Tokens: {}", config.params.max_tokens);
    info!("Context Window: {} message(s)", config.context_window);
    info!("Math Highlighting: {}", config.format.highlight_math);
    info!("Escape HTML: {}", config.format.escape_html);
    if let Some(path) = &config.html_out {
        info!("HTML Export: {}", path.display());
    }
    info!("----------------------------");

    let storage = Arc::new(FileStore::new(&config.data_dir)?);
    let transport = Arc::new(HttpTransport::new(config.server_url.as_str())?);
    let view = HtmlView::new(Arc::new(NoopTypesetter), config.typeset_delay, config.toast_duration);
    let renderer: Arc<dyn Renderer> = Arc::new(
        Fanout::new(vec![Arc::new(TerminalRenderer::new()), Arc::new(view.clone())])
    );

    let session = ChatSession::new(transport, renderer, storage, SessionOptions {
        params: config.params,
        context_window: config.context_window,
        format: config.format,
        theme: config.theme,
    })?;

    session.check_health().await;
    app::run_repl(&session).await?;

    if let Some(path) = &config.html_out {
        tokio::fs::write(path, view.render_page()).await?;
        info!("Wrote conversation view to {}", path.display());
    }

    Ok(())
}
