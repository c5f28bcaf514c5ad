use std::fmt::Write;

use super::math::{ MathKind, MathToken };
use super::parser::{ Block, Inline };
use super::CodeBlock;

pub(super) struct HtmlRenderer<'a> {
    pub escape: bool,
    pub next_id: &'a (dyn Fn() -> String + Send + Sync),
}

impl HtmlRenderer<'_> {
    pub fn render(&self, blocks: &[Block], code_blocks: &mut Vec<CodeBlock>) -> String {
        let mut html = String::new();
        let mut prev_text = false;

        for block in blocks {
            let is_text = matches!(block, Block::Text(_));
            if is_text && prev_text {
                html.push_str("<br>");
            }
            prev_text = is_text;

            match block {
                Block::Text(inlines) => self.inlines(&mut html, inlines),
                Block::Heading { level, content } => {
                    let _ = write!(html, "<h{}>", level);
                    self.inlines(&mut html, content);
                    let _ = write!(html, "</h{}>", level);
                }
                Block::List { ordered, items } => {
                    let tag = if *ordered { "ol" } else { "ul" };
                    let _ = write!(html, "<{}>", tag);
                    for item in items {
                        html.push_str("<li>");
                        self.inlines(&mut html, item);
                        html.push_str("</li>");
                    }
                    let _ = write!(html, "</{}>", tag);
                }
                Block::Quote(inlines) => {
                    html.push_str("<blockquote>");
                    self.inlines(&mut html, inlines);
                    html.push_str("</blockquote>");
                }
                Block::Code { language, code } => {
                    let id = (self.next_id)();
                    let label = language.as_deref().unwrap_or("code");
                    let _ = write!(
                        html,
                        "<div class=\"code-block\"><div class=\"code-header\">\
                         <span class=\"code-language\">{label}</span>\
                         <button class=\"copy-button\" data-code-id=\"{id}\">Copy</button></div>\
                         <pre><code id=\"{id}\" class=\"language-{label}\">",
                        label = self.text(label),
                        id = id,
                    );
                    html.push_str(&self.text(code));
                    html.push_str("</code></pre></div>");
                    code_blocks.push(CodeBlock {
                        id,
                        language: language.clone(),
                        code: code.clone(),
                    });
                }
            }
        }

        html
    }

    fn inlines(&self, html: &mut String, inlines: &[Inline]) {
        for inline in inlines {
            match inline {
                Inline::Text(text) => html.push_str(&self.text(text)),
                Inline::Bold(inner) => {
                    html.push_str("<strong>");
                    self.inlines(html, inner);
                    html.push_str("</strong>");
                }
                Inline::Italic(inner) => {
                    html.push_str("<em>");
                    self.inlines(html, inner);
                    html.push_str("</em>");
                }
                Inline::Code(code) => {
                    html.push_str("<code>");
                    html.push_str(&self.text(code));
                    html.push_str("</code>");
                }
                Inline::Math(token) => self.math(html, token),
            }
        }
    }

    fn math(&self, html: &mut String, token: &MathToken) {
        let _ = write!(html, "<span class=\"{}\">", token.kind.css_class());
        match (&token.kind, &token.power) {
            (MathKind::Exponent, Some((base, exp))) => {
                let _ = write!(html, "{}<sup>{}</sup>", self.text(base), self.text(exp));
            }
            _ => html.push_str(&self.text(&token.text)),
        }
        html.push_str("</span>");
    }

    fn text<'t>(&self, text: &'t str) -> std::borrow::Cow<'t, str> {
        if self.escape {
            std::borrow::Cow::Owned(escape_html(text))
        } else {
            std::borrow::Cow::Borrowed(text)
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
