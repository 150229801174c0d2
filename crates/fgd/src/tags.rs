//! Tag sets qualifying which variant of a keyvalue, IO or list entry applies.
//!
//! Stored tags are upper-cased and keep their sigil: `!TAG`/`-TAG` must be
//! absent from a query, `+TAG` must be present, and bare tags form an OR group.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

/// Query tag that satisfies every bare tag.
pub const WILDCARD_ALL: &str = "<ALL>";
const WILDCARD_ANY: &str = "<ANY>";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("duplicate tag '{tag}'")]
    Duplicate { tag: String },
    #[error("'{tag}' is reserved and cannot be used as a tag")]
    Reserved { tag: String },
}

/// Order-independent set of upper-cased tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a search set. No validation: sigils are not meaningful here.
    pub fn query<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            tags.into_iter()
                .map(|tag| tag.as_ref().trim().to_uppercase())
                .filter(|tag| !tag.is_empty())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub(crate) fn insert_raw(&mut self, tag: String) {
        self.0.insert(tag);
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, tag) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            f.write_str(tag)?;
        }
        Ok(())
    }
}

fn strip_sigil(tag: &str) -> &str {
    tag.trim_start_matches(['!', '-', '+'])
}

/// Validates a declared tag list and returns the stored form.
pub fn validate_tags<I, S>(tags: I) -> Result<TagSet, TagError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut stripped_seen = BTreeSet::new();
    let mut stored = TagSet::new();
    for raw in tags {
        let upper = raw.as_ref().trim().to_uppercase();
        let stripped = strip_sigil(&upper).to_string();
        if stripped == WILDCARD_ALL || stripped == WILDCARD_ANY {
            return Err(TagError::Reserved { tag: upper });
        }
        if !stripped_seen.insert(stripped) {
            return Err(TagError::Duplicate { tag: upper });
        }
        stored.insert_raw(upper);
    }
    Ok(stored)
}

/// Checks whether `query` satisfies the declared `candidate` tags.
pub fn match_tags(query: &TagSet, candidate: &TagSet) -> bool {
    if candidate.is_empty() {
        return true;
    }

    let has_wildcard = query.contains(WILDCARD_ALL) || query.contains(WILDCARD_ANY);
    // None: no bare tags seen yet.
    let mut matched: Option<bool> = None;
    for tag in candidate.iter() {
        if let Some(rest) = tag.strip_prefix('!').or_else(|| tag.strip_prefix('-')) {
            if query.contains(rest) {
                return false;
            }
        } else if let Some(rest) = tag.strip_prefix('+') {
            if !query.contains(rest) {
                return false;
            }
        } else if has_wildcard || query.contains(tag) {
            matched = Some(true);
        } else if matched.is_none() {
            matched = Some(false);
        }
    }
    matched != Some(false)
}
