//! Source fallback resolution
//!
//! One decision rule for every failure site (initial attach, mid-session
//! attach, unsupported format at play time). The index only ever moves
//! forward within a cascade; only a user retry or a user source selection
//! starts a new one.

use std::sync::Arc;

use crate::error::{Error, Result};

/// Ordered, immutable list of candidate audio sources
///
/// Element 0 is the preferred source.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackSourceList {
    sources: Arc<[String]>,
}

impl FallbackSourceList {
    /// Build a list; an empty list is rejected
    pub fn new(sources: Vec<String>) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::BadRequest(
                "fallback source list must not be empty".to_string(),
            ));
        }
        Ok(Self {
            sources: sources.into(),
        })
    }

    pub fn preferred(&self) -> &str {
        &self.sources[0]
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.sources.get(index).map(String::as_str)
    }

    /// Index of `url` in the list
    pub fn position(&self, url: &str) -> Option<usize> {
        self.sources.iter().position(|s| s == url)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Outcome of a fallback decision
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackDecision<'a> {
    /// Try the candidate at `index`
    Advance { index: usize, url: &'a str },
    /// No candidates left; playback has failed terminally
    Exhausted,
}

/// Decide the next candidate after the source at `current` failed
pub fn next_source(list: &FallbackSourceList, current: usize) -> FallbackDecision<'_> {
    let next = current.saturating_add(1);
    match list.get(next) {
        Some(url) => FallbackDecision::Advance { index: next, url },
        None => FallbackDecision::Exhausted,
    }
}
