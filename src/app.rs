use log::{ error, info };
use std::error::Error;
use tokio::io::{ AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines };

use crate::session::{ ChatSession, SessionError, SubmitOutcome };
use crate::ui::Theme;

const HELP: &str = "\
Commands:
  /new               start a new chat
  /list              list saved conversations
  /open <id>         open a saved conversation
  /delete <id>       delete a saved conversation
  /clear             delete all saved conversations
  /theme [dark|light] toggle or set the theme
  /feedback <text>   send feedback
  /bug <text>        report a bug
  /info              show backend model information
  /health            check the backend connection
  /help              show this help
  /quit              exit
Anything else is sent to the tutor.";

#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Send(&'a str),
    New,
    List,
    Open(&'a str),
    Delete(&'a str),
    Clear,
    Theme(Option<&'a str>),
    Feedback(&'a str),
    Bug(&'a str),
    Info,
    Health,
    Help,
    Quit,
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Send(line);
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let opt = if arg.is_empty() { None } else { Some(arg) };
        match name {
            "new" => Command::New,
            "list" => Command::List,
            "open" => Command::Open(arg),
            "delete" => Command::Delete(arg),
            "clear" => Command::Clear,
            "theme" => Command::Theme(opt),
            "feedback" => Command::Feedback(arg),
            "bug" => Command::Bug(arg),
            "info" => Command::Info,
            "health" => Command::Health,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => Command::Unknown(other),
        }
    }
}

async fn say(text: &str) {
    let mut out = tokio::io::stdout();
    let _ = out.write_all(text.as_bytes()).await;
    let _ = out.write_all(b"\n").await;
    let _ = out.flush().await;
}

/// Reads stdin line by line until `/quit` or end of input.
pub async fn run_repl(session: &ChatSession) -> Result<(), Box<dyn Error + Send + Sync>> {
    say("EduBot is ready. Type /help for commands.").await;
    repl(session, BufReader::new(tokio::io::stdin())).await
}

/// Sends one message while still reading input. Lines arriving before the
/// reply completes are dropped, not queued.
async fn send<R>(session: &ChatSession, text: &str, lines: &mut Lines<R>) -> Result<(), Box<dyn Error + Send + Sync>>
    where R: AsyncBufRead + Unpin
{
    let submit = session.submit_user_message(text);
    tokio::pin!(submit);
    let mut input_open = true;

    loop {
        tokio::select! {
            // The submit is polled first so the busy flag is set before any
            // further input is handled.
            biased;
            outcome = &mut submit => {
                outcome?;
                return Ok(());
            }
            next = lines.next_line(), if input_open => match next? {
                Some(line) => match Command::parse(&line) {
                    Command::Send(extra) => {
                        if let SubmitOutcome::IgnoredBusy = session.submit_user_message(extra).await? {
                            say("Still waiting for the previous reply; message dropped.").await;
                        }
                    }
                    _ => say("Still waiting for the previous reply; command ignored.").await,
                },
                None => input_open = false,
            },
        }
    }
}

async fn repl<R>(session: &ChatSession, input: R) -> Result<(), Box<dyn Error + Send + Sync>>
    where R: AsyncBufRead + Unpin
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Send(text) => send(session, text, &mut lines).await?,
            Command::New => {
                session.new_chat();
            }
            Command::List => {
                let conversations = session.conversations();
                if conversations.is_empty() {
                    say("No saved conversations.").await;
                }
                for c in conversations {
                    say(&format!("{}  {}  ({} messages)", c.id, c.title, c.messages.len())).await;
                }
            }
            Command::Open(id) => match session.open_conversation(id) {
                Ok(_) => {}
                Err(SessionError::NotFound(id)) => say(&format!("No conversation with id {}", id)).await,
                Err(e) => return Err(e.into()),
            },
            Command::Delete(id) => {
                if !session.delete_conversation(id)? {
                    say(&format!("No conversation with id {}", id)).await;
                }
            }
            Command::Clear => {
                if !session.clear_history()? {
                    say("Cannot clear history while a reply is pending.").await;
                }
            }
            Command::Theme(None) => {
                let theme = session.toggle_theme()?;
                say(&format!("Theme: {}", theme.as_str())).await;
            }
            Command::Theme(Some(name)) => match name.parse::<Theme>() {
                Ok(theme) => session.set_theme(theme)?,
                Err(e) => say(&e.to_string()).await,
            },
            Command::Feedback(text) => {
                session.submit_feedback(text).await;
            }
            Command::Bug(text) => {
                session.submit_bug_report(text).await;
            }
            Command::Info => match session.model_info().await {
                Ok(info) => {
                    say(&format!(
                        "Primary: {}\nFallback: {}\nContext: {}\nMode: {}",
                        info.primary_model.as_deref().unwrap_or("unknown"),
                        info.fallback_model.as_deref().unwrap_or("unknown"),
                        info.context_window.as_deref().unwrap_or("unknown"),
                        info.mode.as_deref().unwrap_or("unknown")
                    )).await;
                }
                Err(e) => {
                    error!("Model info request failed: {}", e);
                    say("Could not fetch model information.").await;
                }
            },
            Command::Health => {
                if session.check_health().await {
                    say("Backend is online.").await;
                }
            }
            Command::Help => say(HELP).await,
            Command::Quit => break,
            Command::Unknown(name) => say(&format!("Unknown command /{}. Type /help.", name)).await,
        }
    }

    info!("Leaving chat");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::{ Arc, Mutex };
    use std::time::Duration;

    use crate::config::GenerationParams;
    use crate::models::api::{ HealthResponse, ModelInfo, SubmissionResponse };
    use crate::models::chat::Message;
    use crate::session::SessionOptions;
    use crate::storage::MemoryStore;
    use crate::transport::{ ChatTransport, FragmentStream, TransportError };
    use crate::ui::{ HtmlView, NoopTypesetter };

    /// Answers every chat request after a pause.
    #[derive(Default)]
    struct SlowTransport {
        requests: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl ChatTransport for SlowTransport {
        async fn stream_chat(
            &self,
            messages: &[Message],
            _params: &GenerationParams
        ) -> Result<FragmentStream, TransportError> {
            self.requests.lock().unwrap().push(messages.to_vec());
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(Box::pin(stream::iter(vec![Ok("Think it through.".to_string())])))
        }

        async fn health(&self) -> Result<HealthResponse, TransportError> {
            Ok(HealthResponse::default())
        }

        async fn model_info(&self) -> Result<ModelInfo, TransportError> {
            Ok(ModelInfo::default())
        }

        async fn submit_feedback(&self, _feedback: &str) -> Result<SubmissionResponse, TransportError> {
            Ok(SubmissionResponse::default())
        }

        async fn submit_bug_report(&self, _report: &str) -> Result<SubmissionResponse, TransportError> {
            Ok(SubmissionResponse::default())
        }
    }

    #[tokio::test]
    async fn lines_typed_during_a_reply_are_dropped() {
        let transport = Arc::new(SlowTransport::default());
        let view = HtmlView::new(Arc::new(NoopTypesetter), Duration::from_millis(1), Duration::from_secs(60));
        let session = ChatSession::new(
            transport.clone(),
            Arc::new(view),
            Arc::new(MemoryStore::new()),
            SessionOptions::default()
        ).unwrap();

        let input: &[u8] = b"first question\nsecond question\n/clear\n";
        repl(&session, input).await.unwrap();

        assert_eq!(transport.requests.lock().unwrap().len(), 1);
        assert_eq!(session.active_conversation().messages, vec![
            Message::user("first question"),
            Message::assistant("Think it through."),
        ]);
        assert_eq!(session.conversations().len(), 1);
    }

    #[test]
    fn parses_commands_and_messages() {
        assert_eq!(Command::parse("  what is x^2? "), Command::Send("what is x^2?"));
        assert_eq!(Command::parse("/open abc123"), Command::Open("abc123"));
        assert_eq!(Command::parse("/theme"), Command::Theme(None));
        assert_eq!(Command::parse("/theme dark"), Command::Theme(Some("dark")));
        assert_eq!(Command::parse("/feedback  great tutor "), Command::Feedback("great tutor"));
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(Command::parse("/frobnicate"), Command::Unknown("frobnicate"));
    }
}
