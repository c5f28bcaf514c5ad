//! Line-oriented block parser and inline tokenizer.
//!
//! Input is parsed once into a small document tree; nothing produced here
//! is ever scanned again, so markup in one construct cannot be picked up
//! by another.

use super::math::MathToken;

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// A plain line. Empty for blank lines.
    Text(Vec<Inline>),
    Heading { level: u8, content: Vec<Inline> },
    List { ordered: bool, items: Vec<Vec<Inline>> },
    Quote(Vec<Inline>),
    Code { language: Option<String>, code: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Bold(Vec<Inline>),
    Italic(Vec<Inline>),
    Code(String),
    Math(MathToken),
}

const FENCE: &str = "```";

/// Fences are found anywhere in the text, not only at line starts: an
/// opening fence may follow prose on the same line and a closing fence may
/// sit at the end of the last code line. An unterminated fence runs to the
/// end of input.
pub fn parse(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let prose = drop_blank_tail(&rest[..open]);
        if !prose.is_empty() {
            parse_lines(prose, &mut blocks);
        }
        let (code, after) = code_block(&rest[open + FENCE.len()..]);
        blocks.push(code);
        rest = after;
    }

    if !rest.is_empty() || blocks.is_empty() {
        parse_lines(rest, &mut blocks);
    }
    blocks
}

/// Parses everything after an opening fence. Returns the block and the
/// text following its closing fence.
fn code_block(src: &str) -> (Block, &str) {
    let (info, next_line) = match src.find('\n') {
        Some(i) => (&src[..i], &src[i + 1..]),
        None => (src, ""),
    };
    let tag = info.trim();
    let (language, body) = if tag.is_empty() {
        (None, next_line)
    } else if !tag.contains(char::is_whitespace) && !tag.contains(FENCE) {
        (Some(tag.to_string()), next_line)
    } else {
        // Code starts on the fence line itself.
        (None, src)
    };

    match body.find(FENCE) {
        Some(close) => {
            let code = drop_blank_tail(&body[..close]).to_string();
            (Block::Code { language, code }, after_fence(&body[close + FENCE.len()..]))
        }
        None => {
            let code = drop_blank_tail(body).to_string();
            (Block::Code { language, code }, "")
        }
    }
}

/// Text after a closing fence. The rest of the fence line is skipped when
/// blank, otherwise it continues as prose.
fn after_fence(s: &str) -> &str {
    let line_end = s.find('\n');
    let remainder = &s[..line_end.unwrap_or(s.len())];
    if remainder.trim().is_empty() {
        line_end.map_or("", |i| &s[i + 1..])
    } else {
        s.trim_start_matches(' ')
    }
}

/// Drops a final line holding only whitespace, together with its newline.
fn drop_blank_tail(s: &str) -> &str {
    let line_start = s.rfind('\n').map_or(0, |i| i + 1);
    if !s[line_start..].trim().is_empty() {
        return s;
    }
    &s[..line_start.saturating_sub(1)]
}

fn parse_lines(text: &str, blocks: &mut Vec<Block>) {
    for line in text.split('\n') {
        let trimmed = line.trim_start();
        if let Some((level, content)) = heading(trimmed) {
            blocks.push(Block::Heading { level, content: parse_inline(content) });
        } else if let Some((ordered, content)) = list_item(trimmed) {
            let item = parse_inline(content);
            match blocks.last_mut() {
                Some(Block::List { ordered: o, items }) if *o == ordered => items.push(item),
                _ => blocks.push(Block::List { ordered, items: vec![item] }),
            }
        } else if let Some(content) = trimmed.strip_prefix('>') {
            blocks.push(Block::Quote(parse_inline(content.strip_prefix(' ').unwrap_or(content))));
        } else {
            blocks.push(Block::Text(parse_inline(line)));
        }
    }
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if !(1..=3).contains(&hashes) {
        return None;
    }
    line[hashes..].strip_prefix(' ').map(|rest| (hashes as u8, rest))
}

fn list_item(line: &str) -> Option<(bool, &str)> {
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some((false, rest));
        }
    }
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(". ") {
            return Some((true, rest));
        }
    }
    None
}

/// Splits one line into inline spans. Unmatched markers stay literal.
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if c == '`' {
            if let Some(end) = rest[1..].find('`').filter(|&end| end > 0) {
                flush(&mut plain, &mut out);
                out.push(Inline::Code(rest[1..1 + end].to_string()));
                rest = &rest[end + 2..];
                continue;
            }
        } else if rest.starts_with("**") {
            if let Some(end) = rest[2..].find("**").filter(|&end| end > 0) {
                flush(&mut plain, &mut out);
                out.push(Inline::Bold(parse_inline(&rest[2..2 + end])));
                rest = &rest[end + 4..];
                continue;
            }
        } else if c == '*' {
            let inner_ok = |end: &usize| {
                *end > 0 && !rest[1..].starts_with(char::is_whitespace)
            };
            if let Some(end) = rest[1..].find('*').filter(inner_ok) {
                flush(&mut plain, &mut out);
                out.push(Inline::Italic(parse_inline(&rest[1..1 + end])));
                rest = &rest[end + 2..];
                continue;
            }
        }
        plain.push(c);
        rest = &rest[c.len_utf8()..];
    }

    flush(&mut plain, &mut out);
    out
}

fn flush(plain: &mut String, out: &mut Vec<Inline>) {
    if !plain.is_empty() {
        out.push(Inline::Text(std::mem::take(plain)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn fenced_block_keeps_code_verbatim() {
        let blocks = parse("```python\n print(1)\n```");
        assert_eq!(blocks, vec![Block::Code {
            language: Some("python".into()),
            code: " print(1)".into(),
        }]);
    }

    #[test]
    fn fence_without_language() {
        let blocks = parse("```\nls -la\n```\nafter");
        assert_eq!(blocks[0], Block::Code { language: None, code: "ls -la".into() });
        assert_eq!(blocks[1], Block::Text(vec![text("after")]));
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        let blocks = parse("intro\n```rust\nfn main() {");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1], Block::Code {
            language: Some("rust".into()),
            code: "fn main() {".into(),
        });
    }

    #[test]
    fn markdown_inside_code_is_not_parsed() {
        let blocks = parse("```\n# not a heading\n**x**\n```");
        assert_eq!(blocks, vec![Block::Code { language: None, code: "# not a heading\n**x**".into() }]);
    }

    #[test]
    fn headings_up_to_three_levels() {
        let blocks = parse("# One\n### Three\n#### Four\n#nospace");
        assert_eq!(blocks[0], Block::Heading { level: 1, content: vec![text("One")] });
        assert_eq!(blocks[1], Block::Heading { level: 3, content: vec![text("Three")] });
        assert_eq!(blocks[2], Block::Text(vec![text("#### Four")]));
        assert_eq!(blocks[3], Block::Text(vec![text("#nospace")]));
    }

    #[test]
    fn consecutive_items_group_by_kind() {
        let blocks = parse("- a\n* b\n1. c\n2. d\ntail");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], Block::List { ordered: false, items: vec![vec![text("a")], vec![text("b")]] });
        assert_eq!(blocks[1], Block::List { ordered: true, items: vec![vec![text("c")], vec![text("d")]] });
    }

    #[test]
    fn blank_line_splits_lists() {
        let blocks = parse("- a\n\n- b");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1], Block::Text(vec![]));
    }

    #[test]
    fn closing_fence_on_last_code_line() {
        let blocks = parse("```python\nprint(1)```\nAfter the block.");
        assert_eq!(blocks, vec![
            Block::Code { language: Some("python".into()), code: "print(1)".into() },
            Block::Text(vec![text("After the block.")]),
        ]);
    }

    #[test]
    fn opening_fence_after_prose() {
        let blocks = parse("Try this:```js\nlet x = 1;\n```\nThen explain it.");
        assert_eq!(blocks, vec![
            Block::Text(vec![text("Try this:")]),
            Block::Code { language: Some("js".into()), code: "let x = 1;".into() },
            Block::Text(vec![text("Then explain it.")]),
        ]);
    }

    #[test]
    fn single_line_fence() {
        let blocks = parse("Run ```ls -la``` now");
        assert_eq!(blocks, vec![
            Block::Text(vec![text("Run ")]),
            Block::Code { language: None, code: "ls -la".into() },
            Block::Text(vec![text("now")]),
        ]);
    }

    #[test]
    fn indented_fences() {
        let blocks = parse("Steps:\n  ```sh\n  make\n  ```\nDone");
        assert_eq!(blocks, vec![
            Block::Text(vec![text("Steps:")]),
            Block::Code { language: Some("sh".into()), code: "  make".into() },
            Block::Text(vec![text("Done")]),
        ]);
    }

    #[test]
    fn quote_line() {
        assert_eq!(parse("> think about it"), vec![Block::Quote(vec![text("think about it")])]);
    }

    #[test]
    fn inline_spans() {
        let spans = parse_inline("a **b** *c* `d*e*`");
        assert_eq!(spans, vec![
            text("a "),
            Inline::Bold(vec![text("b")]),
            text(" "),
            Inline::Italic(vec![text("c")]),
            text(" "),
            Inline::Code("d*e*".into()),
        ]);
    }

    #[test]
    fn nested_italic_in_bold() {
        let spans = parse_inline("**a *b* c**");
        assert_eq!(spans, vec![Inline::Bold(vec![
            text("a "),
            Inline::Italic(vec![text("b")]),
            text(" c"),
        ])]);
    }

    #[test]
    fn unmatched_markers_are_literal() {
        assert_eq!(parse_inline("2 * 3 * 4"), vec![text("2 * 3 * 4")]);
        assert_eq!(parse_inline("a `b"), vec![text("a `b")]);
        assert_eq!(parse_inline("**open"), vec![text("**open")]);
    }
}
