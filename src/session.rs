//! The chat session: active conversation, conversation store, busy flag.
//!
//! One request at a time. A send attempted while another is in flight is
//! dropped, not queued. A failed turn commits nothing: the user message is
//! taken back out of the active conversation and nothing is persisted.

use log::{ debug, error, info, warn };
use std::sync::atomic::{ AtomicBool, AtomicU64, Ordering };
use std::sync::{ Arc, Mutex, MutexGuard };
use thiserror::Error;

use crate::config::{ GenerationParams, DEFAULT_CONTEXT_WINDOW };
use crate::format::{ FormatOptions, FormattedContent, Formatter };
use crate::history::ConversationStore;
use crate::models::api::ModelInfo;
use crate::models::chat::{ Conversation, Message, Role };
use crate::storage::{ self, KeyValueStore, StorageError };
use crate::transport::{ assemble, ChatTransport, TransportError };
use crate::ui::{ ElementId, MessageContent, Renderer, Theme, ToastKind };

pub const REPLY_ERROR_TEXT: &str = "Sorry, I encountered an error. Please try again.";
pub const REQUEST_FAILED_TOAST: &str = "Failed to get a response. Please try again.";
pub const OFFLINE_TOAST: &str = "Unable to connect to the server. Please check your connection.";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Conversation not found: {0}")]
    NotFound(String),
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// The reply was committed and the conversation saved.
    Replied(String),
    /// The request failed; already reported to the user.
    Failed(TransportError),
    IgnoredEmpty,
    IgnoredBusy,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub params: GenerationParams,
    pub context_window: usize,
    pub format: FormatOptions,
    /// Takes precedence over the stored preference; not persisted.
    pub theme: Option<Theme>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            params: GenerationParams::default(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            format: FormatOptions::default(),
            theme: None,
        }
    }
}

pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    renderer: Arc<dyn Renderer>,
    storage: Arc<dyn KeyValueStore>,
    formatter: Formatter,
    params: GenerationParams,
    context_window: usize,
    store: Mutex<ConversationStore>,
    active: Mutex<Conversation>,
    theme: Mutex<Theme>,
    busy: AtomicBool,
    next_element: AtomicU64,
}

struct BusyGuard<'a> {
    session: &'a ChatSession,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.session.busy.store(false, Ordering::SeqCst);
        self.session.renderer.set_loading(false);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ChatSession {
    /// Loads stored conversations and the theme preference, and applies
    /// the theme to the renderer. Starts with a fresh active conversation.
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        renderer: Arc<dyn Renderer>,
        storage: Arc<dyn KeyValueStore>,
        options: SessionOptions
    ) -> Result<Self, SessionError> {
        let store = ConversationStore::load(storage.clone())?;
        let theme = match options.theme {
            Some(theme) => theme,
            None => storage::load_theme(storage.as_ref())?.unwrap_or_default(),
        };
        renderer.apply_theme(theme);

        Ok(Self {
            transport,
            renderer,
            storage,
            formatter: Formatter::new(options.format),
            params: options.params,
            context_window: options.context_window.max(1),
            store: Mutex::new(store),
            active: Mutex::new(Conversation::new()),
            theme: Mutex::new(theme),
            busy: AtomicBool::new(false),
            next_element: AtomicU64::new(1),
        })
    }

    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn active_conversation(&self) -> Conversation {
        lock(&self.active).clone()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        lock(&self.store).list().to_vec()
    }

    pub fn theme(&self) -> Theme {
        *lock(&self.theme)
    }

    fn next_element_id(&self) -> ElementId {
        self.next_element.fetch_add(1, Ordering::SeqCst)
    }

    fn render_message(&self, role: Role, text: &str) -> ElementId {
        let id = self.next_element_id();
        let formatted = self.formatter.format(text);
        self.renderer.append_message(id, role, MessageContent { raw: text, formatted: &formatted });
        self.renderer.complete_message(id);
        id
    }

    pub async fn submit_user_message(&self, text: &str) -> Result<SubmitOutcome, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SubmitOutcome::IgnoredEmpty);
        }
        if self.busy.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            debug!("Send ignored: a request is already in flight");
            return Ok(SubmitOutcome::IgnoredBusy);
        }
        let _busy = BusyGuard { session: self };
        self.renderer.set_loading(true);

        let context = {
            let mut active = lock(&self.active);
            active.push(Message::user(text));
            active.context_window(self.context_window).to_vec()
        };
        self.render_message(Role::User, text);

        let reply_id = self.next_element_id();
        let empty = FormattedContent::default();
        self.renderer.append_message(reply_id, Role::Assistant, MessageContent { raw: "", formatted: &empty });

        let result = match self.transport.stream_chat(&context, &self.params).await {
            Ok(fragments) => {
                assemble(fragments, |so_far| {
                    let formatted = self.formatter.format(so_far);
                    self.renderer.update_message(reply_id, MessageContent {
                        raw: so_far,
                        formatted: &formatted,
                    });
                }).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(reply) => {
                let snapshot = {
                    let mut active = lock(&self.active);
                    active.push(Message::assistant(reply.clone()));
                    if active.is_first_exchange() {
                        active.derive_title();
                    }
                    active.clone()
                };
                self.renderer.complete_message(reply_id);
                lock(&self.store).save(&snapshot)?;
                info!("Saved conversation {} ({} messages)", snapshot.id, snapshot.messages.len());
                Ok(SubmitOutcome::Replied(reply))
            }
            Err(e) => {
                error!("Chat request failed: {}", e);
                {
                    let mut active = lock(&self.active);
                    if active.messages.last().is_some_and(|m| m.role == Role::User && m.content == text) {
                        active.messages.pop();
                    }
                }
                let formatted = self.formatter.format(REPLY_ERROR_TEXT);
                self.renderer.update_message(reply_id, MessageContent {
                    raw: REPLY_ERROR_TEXT,
                    formatted: &formatted,
                });
                self.renderer.complete_message(reply_id);
                self.renderer.show_toast(REQUEST_FAILED_TOAST, ToastKind::Error);
                Ok(SubmitOutcome::Failed(e))
            }
        }
    }

    /// Replaces the active conversation with an empty one. Refused while a
    /// request is in flight.
    pub fn new_chat(&self) -> bool {
        if self.is_busy() {
            return false;
        }
        *lock(&self.active) = Conversation::new();
        self.renderer.clear_messages();
        true
    }

    /// Makes a stored conversation active and re-renders it.
    pub fn open_conversation(&self, id: &str) -> Result<bool, SessionError> {
        if self.is_busy() {
            return Ok(false);
        }
        let conversation = lock(&self.store)
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        self.renderer.clear_messages();
        for message in &conversation.messages {
            self.render_message(message.role, &message.content);
        }
        *lock(&self.active) = conversation;
        Ok(true)
    }

    /// Returns whether an entry was removed. Refused while a request is in
    /// flight, since the pending reply would save the conversation again.
    pub fn delete_conversation(&self, id: &str) -> Result<bool, SessionError> {
        if self.is_busy() {
            debug!("Delete refused: a request is in flight");
            return Ok(false);
        }
        let removed = lock(&self.store).delete(id)?;
        if removed && lock(&self.active).id == id {
            self.new_chat();
        }
        Ok(removed)
    }

    /// Refused while a request is in flight.
    pub fn clear_history(&self) -> Result<bool, SessionError> {
        if self.is_busy() {
            debug!("Clear refused: a request is in flight");
            return Ok(false);
        }
        lock(&self.store).clear()?;
        self.new_chat();
        Ok(true)
    }

    /// Probes the backend and updates the status indicator.
    pub async fn check_health(&self) -> bool {
        match self.transport.health().await {
            Ok(health) => {
                debug!("Backend healthy: {:?}", health.status);
                self.renderer.set_connection_status(true);
                true
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                self.renderer.set_connection_status(false);
                self.renderer.show_toast(OFFLINE_TOAST, ToastKind::Error);
                false
            }
        }
    }

    pub async fn model_info(&self) -> Result<ModelInfo, TransportError> {
        self.transport.model_info().await
    }

    pub async fn submit_feedback(&self, feedback: &str) -> bool {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            self.renderer.show_toast("Please enter your feedback first.", ToastKind::Error);
            return false;
        }
        match self.transport.submit_feedback(feedback).await {
            Ok(_) => {
                self.renderer.show_toast("Thank you for your feedback!", ToastKind::Success);
                true
            }
            Err(e) => {
                error!("Feedback submission failed: {}", e);
                self.renderer.show_toast("Failed to submit feedback. Please try again.", ToastKind::Error);
                false
            }
        }
    }

    pub async fn submit_bug_report(&self, report: &str) -> bool {
        let report = report.trim();
        if report.is_empty() {
            self.renderer.show_toast("Please describe the bug first.", ToastKind::Error);
            return false;
        }
        match self.transport.submit_bug_report(report).await {
            Ok(_) => {
                self.renderer.show_toast("Bug report submitted. Thank you!", ToastKind::Success);
                true
            }
            Err(e) => {
                error!("Bug report submission failed: {}", e);
                self.renderer.show_toast("Failed to submit bug report. Please try again.", ToastKind::Error);
                false
            }
        }
    }

    /// Applies and persists a theme. Independent of the conversation snapshot.
    pub fn set_theme(&self, theme: Theme) -> Result<(), SessionError> {
        storage::save_theme(self.storage.as_ref(), theme)?;
        *lock(&self.theme) = theme;
        self.renderer.apply_theme(theme);
        Ok(())
    }

    pub fn toggle_theme(&self) -> Result<Theme, SessionError> {
        let next = self.theme().toggled();
        self.set_theme(next)?;
        Ok(next)
    }
}
