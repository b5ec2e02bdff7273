use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Inclusive, 1-based range of positions into the frequency ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankWindow {
    start: usize,
    end: usize,
}

impl RankWindow {
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start == 0 {
            return Err(Error::InvalidParameter(
                "start rank must be at least 1".to_string(),
            ));
        }
        if end < start {
            return Err(Error::InvalidParameter(format!(
                "end rank {end} is before start rank {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedWord {
    /// Position in the full ordering (1-based).
    pub rank: usize,
    pub word: String,
    pub count: usize,
}

/// Count tokens and order them by count descending, then token ascending.
pub fn frequency_table<S: AsRef<str>>(tokens: &[S]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in tokens {
        *counts.entry(t.as_ref()).or_insert(0) += 1;
    }
    let mut table: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(w, c)| (w.to_string(), c))
        .collect();
    table.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    table
}

/// The slice of [`frequency_table`] covered by `window`, clamped to what exists.
pub fn rank<S: AsRef<str>>(tokens: &[S], window: RankWindow) -> Vec<RankedWord> {
    if tokens.is_empty() {
        return Vec::new();
    }
    slice_window(frequency_table(tokens), window)
}

pub(crate) fn slice_window(table: Vec<(String, usize)>, window: RankWindow) -> Vec<RankedWord> {
    table
        .into_iter()
        .enumerate()
        .skip(window.start - 1)
        .take(window.end - window.start + 1)
        .map(|(i, (word, count))| RankedWord {
            rank: i + 1,
            word,
            count,
        })
        .collect()
}
