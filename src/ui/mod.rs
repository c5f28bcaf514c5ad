mod terminal;
mod view;

pub use terminal::TerminalRenderer;
pub use view::{ ActiveToast, HtmlView, MessageElement, NoopTypesetter, Typesetter, ViewSnapshot };

use serde::{ Serialize, Deserialize };
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::format::FormattedContent;
use crate::models::chat::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Light
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseThemeError {
    message: String,
}

impl fmt::Display for ParseThemeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseThemeError {}

impl FromStr for Theme {
    type Err = ParseThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            _ =>
                Err(ParseThemeError {
                    message: format!("Invalid theme: '{}'", s),
                }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

/// Handle for a rendered message, assigned by the session.
pub type ElementId = u64;

/// One message update: the raw text and its formatted HTML.
#[derive(Debug, Clone, Copy)]
pub struct MessageContent<'a> {
    pub raw: &'a str,
    pub formatted: &'a FormattedContent,
}

/// The display surface a chat session drives.
pub trait Renderer: Send + Sync {
    /// Adds a message element and scrolls it into view.
    fn append_message(&self, id: ElementId, role: Role, content: MessageContent<'_>);

    /// Replaces the content of an existing element.
    fn update_message(&self, id: ElementId, content: MessageContent<'_>);

    /// The element will receive no further updates.
    fn complete_message(&self, _id: ElementId) {}

    fn clear_messages(&self);

    fn set_loading(&self, loading: bool);

    fn show_toast(&self, message: &str, kind: ToastKind);

    fn set_connection_status(&self, online: bool);

    fn apply_theme(&self, theme: Theme);
}

/// Forwards every call to each inner renderer in order.
pub struct Fanout {
    renderers: Vec<Arc<dyn Renderer>>,
}

impl Fanout {
    pub fn new(renderers: Vec<Arc<dyn Renderer>>) -> Self {
        Self { renderers }
    }
}

impl Renderer for Fanout {
    fn append_message(&self, id: ElementId, role: Role, content: MessageContent<'_>) {
        self.renderers.iter().for_each(|r| r.append_message(id, role, content));
    }

    fn update_message(&self, id: ElementId, content: MessageContent<'_>) {
        self.renderers.iter().for_each(|r| r.update_message(id, content));
    }

    fn complete_message(&self, id: ElementId) {
        self.renderers.iter().for_each(|r| r.complete_message(id));
    }

    fn clear_messages(&self) {
        self.renderers.iter().for_each(|r| r.clear_messages());
    }

    fn set_loading(&self, loading: bool) {
        self.renderers.iter().for_each(|r| r.set_loading(loading));
    }

    fn show_toast(&self, message: &str, kind: ToastKind) {
        self.renderers.iter().for_each(|r| r.show_toast(message, kind));
    }

    fn set_connection_status(&self, online: bool) {
        self.renderers.iter().for_each(|r| r.set_connection_status(online));
    }

    fn apply_theme(&self, theme: Theme) {
        self.renderers.iter().for_each(|r| r.apply_theme(theme));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_parsing_and_toggle() {
        assert_eq!(" Light ".parse::<Theme>(), Ok(Theme::Light));
        assert!("blue".parse::<Theme>().is_err());
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(Theme::default().as_str(), "light");
    }
}
