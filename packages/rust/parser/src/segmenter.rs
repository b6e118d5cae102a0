//! Splits a flat token stream into directive blocks.

use std::mem;

use pbrtjson_shared::{Block, Diagnostics, Element};

use crate::keywords::is_keyword;

/// Blocks in source order plus the unrecognized capitalized tokens seen after the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmented {
    pub blocks: Vec<Block>,
    pub diagnostics: Diagnostics,
}

/// Partition `tokens` at keyword boundaries.
///
/// The first token always opens the first block, so a file that does not
/// start with a directive yields a leading preamble block. An empty stream
/// yields a single empty block.
pub fn segment(tokens: Vec<String>) -> Segmented {
    let mut blocks = Vec::new();
    let mut diagnostics = Diagnostics::new();
    let mut current: Vec<Element> = Vec::new();

    for (idx, token) in tokens.into_iter().enumerate() {
        if idx > 0 {
            if is_keyword(&token) {
                blocks.push(Block(mem::take(&mut current)));
            } else if starts_uppercase(&token) {
                diagnostics.record(token.as_str());
            }
        }
        current.push(Element::Token(token));
    }
    blocks.push(Block(current));

    Segmented {
        blocks,
        diagnostics,
    }
}

fn starts_uppercase(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize_str;

    fn seg(content: &str) -> Segmented {
        segment(tokenize_str(content).expect("tokenize"))
    }

    #[test]
    fn splits_at_keywords() {
        let out = seg("LookAt 0 0 1 0 0 0 0 1 0\nCamera \"perspective\"\nWorldBegin");
        assert_eq!(out.blocks.len(), 3);
        assert_eq!(out.blocks[0].len(), 10);
        assert_eq!(out.blocks[1], Block::from_tokens(["Camera", "perspective"]));
        assert_eq!(out.blocks[2], Block::from_tokens(["WorldBegin"]));
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn leading_tokens_form_preamble() {
        let out = seg("0.5 0.5 Scale 2 2 2");
        assert_eq!(out.blocks.len(), 2);
        assert_eq!(out.blocks[0], Block::from_tokens(["0.5", "0.5"]));
        assert_eq!(out.blocks[1].keyword(), Some("Scale"));
    }

    #[test]
    fn only_first_block_may_lack_keyword() {
        let out = seg(
            "junk Film \"rgb\" \"integer xresolution\" [ 400 ]\n\
             AttributeBegin Material \"diffuse\" AttributeEnd",
        );
        for block in &out.blocks[1..] {
            assert!(block.keyword().is_some_and(is_keyword));
        }
    }

    #[test]
    fn empty_stream_yields_one_empty_block() {
        let out = segment(Vec::new());
        assert_eq!(out.blocks, vec![Block::default()]);
    }

    #[test]
    fn unrecognized_capitalized_tokens_are_reported() {
        let out = seg("WorldBegin Foo\nShape \"sphere\" Bar Foo\nTranslate 1 2 3");
        assert_eq!(out.diagnostics.tokens().collect::<Vec<_>>(), vec!["Bar", "Foo"]);
        assert_eq!(out.blocks.len(), 3);
        assert_eq!(out.blocks[0], Block::from_tokens(["WorldBegin", "Foo"]));
    }

    #[test]
    fn first_token_is_never_reported() {
        let out = seg("Unknown 1 WorldBegin");
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.blocks.len(), 2);
        assert_eq!(out.blocks[0], Block::from_tokens(["Unknown", "1"]));

        let out = seg("Unknown 1 WorldBegin Unknown");
        assert_eq!(out.diagnostics.tokens().collect::<Vec<_>>(), vec!["Unknown"]);
    }
}
