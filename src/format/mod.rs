//! Markdown-ish text to HTML fragment.
//!
//! Pipeline: entity un-escape, block/inline parse, optional math
//! annotation, render. The whole input is formatted on every call; while a
//! response streams in, the caller re-formats the accumulated text for
//! each fragment.
//!
//! Text is not HTML-escaped unless [`FormatOptions::escape_html`] is set,
//! so markup inside model output reaches the page as markup.

mod html;
mod math;
mod parser;

pub use html::escape_html;
pub use math::{ MathKind, MathToken };
pub use parser::{ parse, Block, Inline };

use std::borrow::Cow;
use std::sync::Arc;
use uuid::Uuid;

use html::HtmlRenderer;

#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    pub highlight_math: bool,
    pub escape_html: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { highlight_math: true, escape_html: false }
    }
}

/// A fenced block as rendered, so a copy control can find its text by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub id: String,
    pub language: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattedContent {
    pub html: String,
    pub code_blocks: Vec<CodeBlock>,
}

type IdSource = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Clone)]
pub struct Formatter {
    options: FormatOptions,
    next_id: IdSource,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(FormatOptions::default())
    }
}

impl Formatter {
    pub fn new(options: FormatOptions) -> Self {
        Self {
            options,
            next_id: Arc::new(|| format!("code-{}", Uuid::new_v4().simple())),
        }
    }

    /// Replaces the random code block id generator.
    pub fn with_id_source(mut self, next_id: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.next_id = Arc::new(next_id);
        self
    }

    pub fn options(&self) -> FormatOptions {
        self.options
    }

    pub fn format(&self, text: &str) -> FormattedContent {
        let text = unescape_entities(text);
        let mut blocks = parser::parse(&text);
        if self.options.highlight_math {
            math::annotate(&mut blocks);
        }

        let renderer = HtmlRenderer {
            escape: self.options.escape_html,
            next_id: self.next_id.as_ref(),
        };
        let mut code_blocks = Vec::new();
        let html = renderer.render(&blocks, &mut code_blocks);
        FormattedContent { html, code_blocks }
    }
}

const ENTITIES: [(&str, char); 4] = [("&lt;", '<'), ("&gt;", '>'), ("&amp;", '&'), ("&quot;", '"')];

/// Decodes `&lt;`, `&gt;`, `&amp;` and `&quot;` in one left-to-right pass,
/// so `&amp;lt;` becomes `&lt;` and not `<`.
pub fn unescape_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    'scan: while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        for (entity, c) in ENTITIES {
            if let Some(after) = rest.strip_prefix(entity) {
                out.push(c);
                rest = after;
                continue 'scan;
            }
        }
        out.push('&');
        rest = &rest[1..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed() -> Formatter {
        Formatter::default().with_id_source(|| "code-test".to_string())
    }

    #[test]
    fn plain_text_only_gains_line_breaks() {
        let out = fixed().format("Hello there\nHow are you today\n\nBye");
        assert_eq!(out.html, "Hello there<br>How are you today<br><br>Bye");
        assert!(out.code_blocks.is_empty());
    }

    #[test]
    fn fenced_python_block() {
        let out = fixed().format("```python\n print(1)\n```");
        assert_eq!(out.code_blocks, vec![CodeBlock {
            id: "code-test".into(),
            language: Some("python".into()),
            code: " print(1)".into(),
        }]);
        assert!(out.html.contains("<span class=\"code-language\">python</span>"));
        assert!(out.html.contains("<code id=\"code-test\" class=\"language-python\"> print(1)</code>"));
        assert!(out.html.contains("data-code-id=\"code-test\""));
    }

    #[test]
    fn random_ids_are_dom_safe() {
        let out = Formatter::default().format("```\na\n```\n```\nb\n```");
        assert_eq!(out.code_blocks.len(), 2);
        assert_ne!(out.code_blocks[0].id, out.code_blocks[1].id);
        for block in &out.code_blocks {
            assert!(block.id.starts_with("code-"));
            assert!(block.id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
        }
    }

    #[test]
    fn same_input_same_output() {
        let f = fixed();
        let text = "# Title\n- **a**\n- *b*\n> q\nx^2";
        assert_eq!(f.format(text), f.format(text));
    }

    #[test]
    fn block_elements_take_no_breaks() {
        let out = fixed().format("# Steps\n1. Read\n2. Think\nDone");
        assert_eq!(out.html, "<h1>Steps</h1><ol><li>Read</li><li>Think</li></ol>Done");
    }

    #[test]
    fn inline_and_math_markup() {
        let out = fixed().format("**Hint:** what is f(x) when x^2 is `big`?");
        assert_eq!(
            out.html,
            "<strong>Hint:</strong> what is <span class=\"math-function\">f(x)</span> when \
             <span class=\"math-expression\">x<sup>2</sup></span> is <code>big</code>?"
        );
    }

    #[test]
    fn math_pass_can_be_disabled() {
        let f = Formatter::new(FormatOptions { highlight_math: false, escape_html: false });
        assert_eq!(f.format("x^2").html, "x^2");
    }

    #[test]
    fn entities_are_unescaped_before_parsing() {
        let out = fixed().format("&gt; quoted &amp; &quot;kept&quot;");
        assert_eq!(out.html, "<blockquote>quoted & \"kept\"</blockquote>");
    }

    #[test]
    fn unescape_is_single_pass() {
        assert_eq!(unescape_entities("&amp;lt;"), "&lt;");
        assert_eq!(unescape_entities("a & b &nbsp;"), "a & b &nbsp;");
        assert!(matches!(unescape_entities("nothing"), Cow::Borrowed(_)));
    }

    #[test]
    fn html_passes_through_by_default() {
        let out = fixed().format("<b>raw</b>");
        assert_eq!(out.html, "<b>raw</b>");
    }

    #[test]
    fn escape_option_neutralises_markup() {
        let f = Formatter::new(FormatOptions { highlight_math: true, escape_html: true })
            .with_id_source(|| "code-test".to_string());
        assert_eq!(f.format("<b>raw</b>").html, "&lt;b&gt;raw&lt;/b&gt;");
        let code = f.format("```\n<script>\n```");
        assert!(code.html.contains("&lt;script&gt;"));
        assert_eq!(code.code_blocks[0].code, "<script>");
    }
}
