//! Heuristic math highlighting.
//!
//! Purely pattern based: it marks things that look like `f(x)`, `x^2`,
//! `x = 5` and `3x` inside plain text spans. It fires on ordinary prose
//! too ("a = b" in a sentence gets marked), which is accepted. Code spans
//! are never touched.

use once_cell::sync::Lazy;
use regex::Regex;

use super::parser::{ Block, Inline };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathKind {
    Function,
    Exponent,
    Assignment,
    Term,
}

impl MathKind {
    pub fn css_class(self) -> &'static str {
        match self {
            MathKind::Function => "math-function",
            MathKind::Exponent => "math-expression",
            MathKind::Assignment => "math-variable",
            MathKind::Term => "math-term",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathToken {
    pub kind: MathKind,
    pub text: String,
    /// Base and exponent for `MathKind::Exponent`.
    pub power: Option<(String, String)>,
}

// Alternation order is priority order at a given position.
static MATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (?P<func>\b(?:sin|cos|tan|log|ln|sqrt|exp|[a-zA-Z])\([^()\n]{1,40}\))
        | (?P<base>\b[a-zA-Z0-9]+)\^(?P<exp>[a-zA-Z0-9]+)
        | (?P<assign>\b[a-zA-Z]\s*=\s*[^\s,;]+)
        | (?P<term>\b\d+[a-zA-Z]\b)
        "
    ).expect("math pattern is valid")
});

/// Rewrites every text span in the document, splitting out math tokens.
pub fn annotate(blocks: &mut [Block]) {
    for block in blocks.iter_mut() {
        match block {
            Block::Text(inlines) | Block::Quote(inlines) => annotate_inlines(inlines),
            Block::Heading { content, .. } => annotate_inlines(content),
            Block::List { items, .. } => items.iter_mut().for_each(|item| annotate_inlines(item)),
            Block::Code { .. } => {}
        }
    }
}

fn annotate_inlines(inlines: &mut Vec<Inline>) {
    let mut out = Vec::with_capacity(inlines.len());
    for inline in inlines.drain(..) {
        match inline {
            Inline::Text(text) => out.extend(split_text(&text)),
            Inline::Bold(mut inner) => {
                annotate_inlines(&mut inner);
                out.push(Inline::Bold(inner));
            }
            Inline::Italic(mut inner) => {
                annotate_inlines(&mut inner);
                out.push(Inline::Italic(inner));
            }
            other => out.push(other),
        }
    }
    *inlines = out;
}

fn split_text(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut last = 0;

    for caps in MATH.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            out.push(Inline::Text(text[last..whole.start()].to_string()));
        }
        let token = if caps.name("func").is_some() {
            MathToken { kind: MathKind::Function, text: whole.as_str().to_string(), power: None }
        } else if let (Some(base), Some(exp)) = (caps.name("base"), caps.name("exp")) {
            MathToken {
                kind: MathKind::Exponent,
                text: whole.as_str().to_string(),
                power: Some((base.as_str().to_string(), exp.as_str().to_string())),
            }
        } else if caps.name("assign").is_some() {
            MathToken { kind: MathKind::Assignment, text: whole.as_str().to_string(), power: None }
        } else {
            MathToken { kind: MathKind::Term, text: whole.as_str().to_string(), power: None }
        };
        out.push(Inline::Math(token));
        last = whole.end();
    }

    if last < text.len() {
        out.push(Inline::Text(text[last..].to_string()));
    }
    out
}
