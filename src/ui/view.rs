use log::debug;
use std::collections::HashSet;
use std::sync::{ Arc, Mutex, MutexGuard };
use std::time::Duration;

use super::{ ElementId, MessageContent, Renderer, Theme, ToastKind };
use crate::format::CodeBlock;
use crate::models::chat::Role;

/// External math typesetting, run over one element after it is inserted.
pub trait Typesetter: Send + Sync {
    fn typeset(&self, id: ElementId);
}

pub struct NoopTypesetter;

impl Typesetter for NoopTypesetter {
    fn typeset(&self, id: ElementId) {
        debug!("Typeset requested for message {}", id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageElement {
    pub id: ElementId,
    pub role: Role,
    pub html: String,
    pub code_blocks: Vec<CodeBlock>,
}

impl MessageElement {
    pub fn avatar(&self) -> &'static str {
        match self.role {
            Role::User => "👤",
            Role::Assistant => "🎓",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveToast {
    pub id: u64,
    pub message: String,
    pub kind: ToastKind,
}

#[derive(Debug, Default)]
struct ViewState {
    elements: Vec<MessageElement>,
    loading: bool,
    scrolls: u64,
    // Elements updated since their last typeset.
    changed: HashSet<ElementId>,
    toasts: Vec<ActiveToast>,
    next_toast: u64,
    theme: Theme,
    online: bool,
}

/// Point-in-time copy of what the page shows.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub elements: Vec<MessageElement>,
    pub loading: bool,
    pub input_enabled: bool,
    pub scrolls: u64,
    pub toasts: Vec<ActiveToast>,
    pub theme: Theme,
    pub online: bool,
}

/// In-memory model of the chat page: message elements, busy indicator,
/// toasts, theme and connection status. Renders to a standalone HTML page.
///
/// Timed effects (typesetting, toast dismissal) run on the current tokio
/// runtime. Outside a runtime, typesetting runs immediately and toasts
/// stay until cleared.
#[derive(Clone)]
pub struct HtmlView {
    state: Arc<Mutex<ViewState>>,
    typesetter: Arc<dyn Typesetter>,
    typeset_delay: Duration,
    toast_duration: Duration,
}

impl HtmlView {
    pub fn new(typesetter: Arc<dyn Typesetter>, typeset_delay: Duration, toast_duration: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ViewState { online: true, ..ViewState::default() })),
            typesetter,
            typeset_delay,
            toast_duration,
        }
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let state = self.state();
        ViewSnapshot {
            elements: state.elements.clone(),
            loading: state.loading,
            input_enabled: !state.loading,
            scrolls: state.scrolls,
            toasts: state.toasts.clone(),
            theme: state.theme,
            online: state.online,
        }
    }

    /// Text behind a copy control.
    pub fn copy_code(&self, code_id: &str) -> Option<String> {
        self.state()
            .elements
            .iter()
            .flat_map(|e| e.code_blocks.iter())
            .find(|b| b.id == code_id)
            .map(|b| b.code.clone())
    }

    pub fn dismiss_toast(&self, toast_id: u64) {
        self.state().toasts.retain(|t| t.id != toast_id);
    }

    pub fn render_page(&self) -> String {
        let state = self.state();
        let mut page = format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>EduBot</title></head>\n\
             <body class=\"theme-{}\">\n<div id=\"chat-messages\">\n",
            state.theme.as_str()
        );
        for element in &state.elements {
            page.push_str(&format!(
                "<div class=\"message {}-message\" id=\"message-{}\">\
                 <div class=\"message-avatar\">{}</div>\
                 <div class=\"message-content\">{}</div></div>\n",
                element.role,
                element.id,
                element.avatar(),
                element.html
            ));
        }
        page.push_str("</div>\n</body>\n</html>\n");
        page
    }

    fn schedule_typeset(&self, id: ElementId) {
        let typesetter = self.typesetter.clone();
        let state = self.state.clone();
        let run = move || {
            typesetter.typeset(id);
            let mut state = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            state.scrolls += 1;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let delay = self.typeset_delay;
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    run();
                });
            }
            Err(_) => run(),
        }
    }
}

impl Renderer for HtmlView {
    fn append_message(&self, id: ElementId, role: Role, content: MessageContent<'_>) {
        {
            let mut state = self.state();
            state.elements.push(MessageElement {
                id,
                role,
                html: content.formatted.html.clone(),
                code_blocks: content.formatted.code_blocks.clone(),
            });
            state.scrolls += 1;
        }
        self.schedule_typeset(id);
    }

    fn update_message(&self, id: ElementId, content: MessageContent<'_>) {
        let mut guard = self.state();
        let state = &mut *guard;
        if let Some(element) = state.elements.iter_mut().find(|e| e.id == id) {
            element.html = content.formatted.html.clone();
            element.code_blocks = content.formatted.code_blocks.clone();
            state.changed.insert(id);
        }
        state.scrolls += 1;
    }

    /// Typesets again only if the element changed after it was appended.
    fn complete_message(&self, id: ElementId) {
        if self.state().changed.remove(&id) {
            self.schedule_typeset(id);
        }
    }

    fn clear_messages(&self) {
        let mut state = self.state();
        state.elements.clear();
        state.changed.clear();
    }

    fn set_loading(&self, loading: bool) {
        self.state().loading = loading;
    }

    fn show_toast(&self, message: &str, kind: ToastKind) {
        let toast_id = {
            let mut state = self.state();
            state.next_toast += 1;
            let toast_id = state.next_toast;
            state.toasts.push(ActiveToast { id: toast_id, message: message.to_string(), kind });
            toast_id
        };
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let view = self.clone();
            let duration = self.toast_duration;
            handle.spawn(async move {
                tokio::time::sleep(duration).await;
                view.dismiss_toast(toast_id);
            });
        }
    }

    fn set_connection_status(&self, online: bool) {
        self.state().online = online;
    }

    fn apply_theme(&self, theme: Theme) {
        self.state().theme = theme;
    }
}
