//! Core domain types: parsed elements, blocks, documents, and diagnostics.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Key prefix for each block in a serialized [`Document`].
pub const BLOCK_KEY_PREFIX: &str = "token_";

/// Key holding the block count in a serialized [`Document`].
pub const LENGTH_KEY: &str = "length";

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

/// One value inside a block: a bare token or the flattened contents of a `[ ... ]` span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Element {
    Token(String),
    List(Vec<String>),
}

impl Element {
    /// The token text, if this element is a bare token.
    pub fn as_token(&self) -> Option<&str> {
        match self {
            Self::Token(t) => Some(t),
            Self::List(_) => None,
        }
    }

    /// Whether this element is exactly the given bare token.
    pub fn is_token(&self, text: &str) -> bool {
        self.as_token() == Some(text)
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Self::Token(value.to_string())
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Self::Token(value)
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A directive keyword followed by its arguments, up to the next directive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Block(pub Vec<Element>);

impl Block {
    /// Build a block of bare tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(|t| Element::Token(t.into())).collect())
    }

    /// The leading token, normally the directive keyword.
    pub fn keyword(&self) -> Option<&str> {
        self.0.first().and_then(Element::as_token)
    }

    pub fn elements(&self) -> &[Element] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The argument of a two-element `<keyword> "<file>.<extension>"` block.
    pub fn include_target(&self, keyword: &str, extension: &str) -> Option<&str> {
        match self.0.as_slice() {
            [Element::Token(k), Element::Token(arg)] if k == keyword => {
                has_extension(arg, extension).then_some(arg.as_str())
            }
            _ => None,
        }
    }

    /// Replace the argument of a two-element block.
    pub fn set_argument(&mut self, value: impl Into<String>) {
        if let Some(slot) = self.0.get_mut(1) {
            *slot = Element::Token(value.into());
        }
    }
}

fn has_extension(path: &str, extension: &str) -> bool {
    path.len() > extension.len() + 1
        && path.ends_with(extension)
        && path[..path.len() - extension.len()].ends_with('.')
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The converted form of one source file.
///
/// Serializes as `{"token_0": [...], ..., "token_{N-1}": [...], "length": N}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total number of elements across all blocks.
    pub fn element_count(&self) -> usize {
        self.blocks.iter().map(Block::len).sum()
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.blocks.len() + 1))?;
        for (idx, block) in self.blocks.iter().enumerate() {
            map.serialize_entry(&format!("{BLOCK_KEY_PREFIX}{idx}"), block)?;
        }
        map.serialize_entry(LENGTH_KEY, &self.blocks.len())?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(DocumentVisitor)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Document;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of token_<n> blocks with a length field")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Document, A::Error> {
        let mut entries: BTreeMap<usize, Block> = BTreeMap::new();
        let mut length: Option<usize> = None;

        while let Some(key) = access.next_key::<String>()? {
            if key == LENGTH_KEY {
                length = Some(access.next_value()?);
                continue;
            }
            let idx = key
                .strip_prefix(BLOCK_KEY_PREFIX)
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| de::Error::custom(format!("unexpected key {key:?}")))?;
            if length.is_some_and(|len| idx >= len) {
                return Err(de::Error::custom(format!("{key:?} is out of range")));
            }
            if entries.insert(idx, access.next_value()?).is_some() {
                return Err(de::Error::custom(format!("duplicate key {key:?}")));
            }
        }

        let length = length.ok_or_else(|| de::Error::missing_field(LENGTH_KEY))?;
        if let Some(&last) = entries.keys().next_back().filter(|&&last| last >= length) {
            return Err(de::Error::custom(format!(
                "{BLOCK_KEY_PREFIX}{last} is out of range for length {length}"
            )));
        }
        if entries.len() != length {
            let missing = (0..length).find(|idx| !entries.contains_key(idx)).unwrap_or(length);
            return Err(de::Error::custom(format!(
                "length is {length} but {} blocks are present (missing {BLOCK_KEY_PREFIX}{missing})",
                entries.len()
            )));
        }

        let blocks = entries.into_values().collect();
        Ok(Document { blocks })
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Capitalized tokens that are not recognized directives.
///
/// Advisory only: a non-empty set hints at a gap in the keyword list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    unrecognized: BTreeSet<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, token: impl Into<String>) {
        self.unrecognized.insert(token.into());
    }

    pub fn merge(&mut self, other: &Diagnostics) {
        self.unrecognized.extend(other.unrecognized.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.unrecognized.is_empty()
    }

    pub fn len(&self) -> usize {
        self.unrecognized.len()
    }

    /// Sorted, deduplicated tokens.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.unrecognized.iter().map(String::as_str)
    }

    /// Emit one warning per token.
    pub fn report(&self) {
        for token in &self.unrecognized {
            tracing::warn!(%token, "did you miss parsing {token}?");
        }
    }
}
