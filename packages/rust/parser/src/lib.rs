//! Scene-description parsing: tokens, directive blocks, and bracket groups.
//!
//! The crate is pure; reading files and resolving `Include` directives is
//! the job of `pbrtjson-core`. A conversion runs in three steps:
//! 1. [`parse_blocks`] tokenizes the source and splits it at directive keywords
//! 2. the caller rewrites `Include` blocks
//! 3. [`flatten_blocks`] collapses `[ ... ]` spans into list values

pub mod brackets;
pub mod keywords;
pub mod segmenter;
pub mod tokenizer;

use tracing::{debug, instrument};

use pbrtjson_shared::Result;

pub use brackets::{flatten, flatten_blocks};
pub use keywords::{INCLUDE, KEYWORDS, is_keyword};
pub use segmenter::{Segmented, segment};
pub use tokenizer::{tokenize, tokenize_str};

/// Tokenize `content` and split it into directive blocks (brackets not yet flattened).
#[instrument(skip_all, fields(bytes = content.len()))]
pub fn parse_blocks(content: &str) -> Result<Segmented> {
    let tokens = tokenize_str(content)?;
    let token_count = tokens.len();
    let segmented = segment(tokens);

    debug!(
        tokens = token_count,
        blocks = segmented.blocks.len(),
        unrecognized = segmented.diagnostics.len(),
        "segmentation complete"
    );

    Ok(segmented)
}
