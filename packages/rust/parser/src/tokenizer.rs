//! Line-oriented tokenizer.
//!
//! Strips `#` comments, splits on whitespace, rejoins two-word quoted phrases,
//! and removes the surrounding quotes from quoted tokens.

use pbrtjson_shared::{ConvertError, Result};

/// A whitespace-delimited piece of a line, before quote reassembly.
#[derive(Debug, Clone, Copy)]
struct Fragment<'a> {
    text: &'a str,
    line: usize,
}

/// Tokenize a whole source file.
pub fn tokenize_str(content: &str) -> Result<Vec<String>> {
    tokenize(content.lines())
}

/// Tokenize an ordered sequence of raw lines.
///
/// Line boundaries only bound comments; tokens flow across lines.
pub fn tokenize<'a, I>(lines: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut fragments = Vec::new();
    for (idx, raw) in lines.into_iter().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        fragments.extend(line.split_whitespace().map(|text| Fragment {
            text,
            line: idx + 1,
        }));
    }

    let assembled = assemble_quoted(fragments)?;
    Ok(assembled.into_iter().map(trim_quotes).collect())
}

/// Cut the line at the first `#` outside a quoted fragment.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut prev_is_space = true;

    for (idx, ch) in line.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '#' => return &line[..idx],
            None if prev_is_space && is_quote(ch) => quote = Some(ch),
            None => {}
        }
        prev_is_space = ch.is_whitespace();
    }
    line
}

fn is_quote(ch: char) -> bool {
    ch == '"' || ch == '\''
}

/// The quote character a fragment opens without closing, if any.
fn opening_quote(text: &str) -> Option<char> {
    let first = text.chars().next().filter(|c| is_quote(*c))?;
    if text.len() == 1 || !text.ends_with(first) {
        Some(first)
    } else {
        None
    }
}

/// Merge each unterminated quoted fragment with exactly the next fragment.
fn assemble_quoted(fragments: Vec<Fragment<'_>>) -> Result<Vec<String>> {
    let mut tokens = Vec::with_capacity(fragments.len());
    let mut iter = fragments.into_iter();

    while let Some(fragment) = iter.next() {
        let Some(quote) = opening_quote(fragment.text) else {
            tokens.push(fragment.text.to_string());
            continue;
        };

        let next = iter.next().ok_or_else(|| {
            ConvertError::lexical(
                fragment.line,
                format!("unterminated quote in {:?} at end of input", fragment.text),
            )
        })?;

        let merged = format!("{} {}", fragment.text, next.text);
        if !merged.ends_with(quote) {
            return Err(ConvertError::lexical(
                fragment.line,
                format!("quoted phrase {merged:?} is not closed by the following word"),
            ));
        }
        tokens.push(merged);
    }

    Ok(tokens)
}

/// Remove one matching pair of surrounding quotes.
fn trim_quotes(token: String) -> String {
    let mut chars = token.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if first == last && is_quote(first) => {
            token[1..token.len() - 1].to_string()
        }
        _ => token,
    }
}
