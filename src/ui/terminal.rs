use std::collections::HashMap;
use std::io::{ self, Write };
use std::sync::Mutex;

use super::{ ElementId, MessageContent, Renderer, Theme, ToastKind };
use crate::models::chat::Role;

type Sink = Box<dyn Write + Send>;

struct TerminalState {
    out: Sink,
    err: Sink,
    // Raw text already printed per element.
    printed: HashMap<ElementId, String>,
}

/// Prints the conversation as plain text. Streaming updates print only the
/// newly arrived tail of the raw text.
pub struct TerminalRenderer {
    state: Mutex<TerminalState>,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::with_writers(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn with_writers(out: Sink, err: Sink) -> Self {
        Self {
            state: Mutex::new(TerminalState { out, err, printed: HashMap::new() }),
        }
    }

    fn with_state(&self, f: impl FnOnce(&mut TerminalState) -> io::Result<()>) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Terminal output is best effort.
        let _ = f(&mut state);
    }
}

fn label(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "EduBot",
    }
}

impl Renderer for TerminalRenderer {
    fn append_message(&self, id: ElementId, role: Role, content: MessageContent<'_>) {
        self.with_state(|state| {
            write!(state.out, "\n{}: {}", label(role), content.raw)?;
            if role == Role::User {
                writeln!(state.out)?;
            } else {
                state.printed.insert(id, content.raw.to_string());
            }
            state.out.flush()
        });
    }

    fn update_message(&self, id: ElementId, content: MessageContent<'_>) {
        self.with_state(|state| {
            let Some(printed) = state.printed.get_mut(&id) else {
                return Ok(());
            };
            match content.raw.strip_prefix(printed.as_str()) {
                Some(tail) => state.out.write_all(tail.as_bytes())?,
                // Content was replaced rather than extended.
                None => write!(state.out, "\n{}", content.raw)?,
            }
            *printed = content.raw.to_string();
            state.out.flush()
        });
    }

    fn complete_message(&self, id: ElementId) {
        self.with_state(|state| {
            if state.printed.remove(&id).is_some() {
                writeln!(state.out)?;
            }
            state.out.flush()
        });
    }

    fn clear_messages(&self) {
        self.with_state(|state| {
            state.printed.clear();
            writeln!(state.out, "\n----------------------------------------")
        });
    }

    fn set_loading(&self, _loading: bool) {}

    fn show_toast(&self, message: &str, kind: ToastKind) {
        let tag = match kind {
            ToastKind::Info => "info",
            ToastKind::Success => "ok",
            ToastKind::Error => "error",
        };
        self.with_state(|state| writeln!(state.err, "[{}] {}", tag, message));
    }

    fn set_connection_status(&self, online: bool) {
        if !online {
            self.with_state(|state| writeln!(state.err, "[status] backend offline"));
        }
    }

    fn apply_theme(&self, _theme: Theme) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormattedContent;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn content<'a>(raw: &'a str, formatted: &'a FormattedContent) -> MessageContent<'a> {
        MessageContent { raw, formatted }
    }

    #[test]
    fn streams_only_new_text() {
        let out = SharedBuf::default();
        let err = SharedBuf::default();
        let term = TerminalRenderer::with_writers(Box::new(out.clone()), Box::new(err.clone()));
        let empty = FormattedContent::default();

        term.append_message(1, Role::User, content("Hi", &empty));
        term.append_message(2, Role::Assistant, content("", &empty));
        term.update_message(2, content("What ", &empty));
        term.update_message(2, content("What do you think?", &empty));
        term.complete_message(2);

        assert_eq!(out.text(), "\nYou: Hi\n\nEduBot: What do you think?\n");
        term.show_toast("Network error", ToastKind::Error);
        assert_eq!(err.text(), "[error] Network error\n");
    }

    #[test]
    fn replaced_content_is_reprinted_whole() {
        let out = SharedBuf::default();
        let term = TerminalRenderer::with_writers(Box::new(out.clone()), Box::new(SharedBuf::default()));
        let empty = FormattedContent::default();
        let error_text = "Sorry, I encountered an error. Please try again.";

        term.append_message(1, Role::Assistant, content("", &empty));
        term.update_message(1, content("Hello", &empty));
        term.update_message(1, content(error_text, &empty));
        term.complete_message(1);

        assert_eq!(out.text(), format!("\nEduBot: Hello\n{}\n", error_text));
    }
}
