//! Collapses `[ ... ]` spans into list values.
//!
//! Only sequential groups are supported. An inner `[` before the matching
//! `]` is rejected rather than guessed at.

use pbrtjson_shared::{Block, ConvertError, Element, Result};

const OPEN: &str = "[";
const CLOSE: &str = "]";

/// Replace every bracket group in `block` with a single [`Element::List`].
///
/// `index` is the block's position in its document, used for error reporting.
pub fn flatten(index: usize, block: Block) -> Result<Block> {
    let mut elements = block.0;

    if !elements.iter().any(|e| e.is_token(OPEN)) {
        if elements.iter().any(|e| e.is_token(CLOSE)) {
            return Err(ConvertError::structural(index, "`]` without a preceding `[`"));
        }
        return Ok(Block(elements));
    }

    split_fused_close(&mut elements);

    let mut out = Vec::with_capacity(elements.len());
    let mut group: Option<Vec<String>> = None;

    for element in elements {
        match element {
            Element::Token(t) if t == OPEN => {
                if group.is_some() {
                    return Err(ConvertError::structural(
                        index,
                        "nested bracket groups are not supported",
                    ));
                }
                group = Some(Vec::new());
            }
            Element::Token(t) if t == CLOSE => {
                let items = group.take().ok_or_else(|| {
                    ConvertError::structural(index, "`]` without a preceding `[`")
                })?;
                out.push(Element::List(items));
            }
            Element::Token(t) => match group.as_mut() {
                Some(items) => items.push(t),
                None => out.push(Element::Token(t)),
            },
            Element::List(items) => {
                if group.is_some() {
                    return Err(ConvertError::structural(
                        index,
                        "nested bracket groups are not supported",
                    ));
                }
                out.push(Element::List(items));
            }
        }
    }

    if group.is_some() {
        return Err(ConvertError::structural(index, "`[` is never closed"));
    }

    Ok(Block(out))
}

/// Flatten every block of a document.
pub fn flatten_blocks(blocks: Vec<Block>) -> Result<Vec<Block>> {
    blocks
        .into_iter()
        .enumerate()
        .map(|(idx, block)| flatten(idx, block))
        .collect()
}

/// Split a trailing `value]` into `value` and `]`.
///
/// Some scenes omit the space before the final bracket, e.g. `Scale .1]`.
fn split_fused_close(elements: &mut Vec<Element>) {
    let fused = matches!(
        elements.last(),
        Some(Element::Token(t)) if t != CLOSE && t.ends_with(']')
    );
    if !fused {
        return;
    }
    if let Some(Element::Token(last)) = elements.last_mut() {
        last.pop();
    }
    elements.push(Element::Token(CLOSE.to_string()));
}
