use crate::rank::{frequency_table, slice_window, RankWindow, RankedWord};
use crate::text::{cleanse, tokenize};
use crate::{Result, TextFetcher};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct WordRanking {
    pub window: RankWindow,
    pub total_words: usize,
    pub distinct_words: usize,
    pub words: Vec<RankedWord>,
}

/// Cleanse, tokenize, and rank an already-fetched document.
pub fn rank_words_in_text(raw: &str, window: RankWindow) -> WordRanking {
    let clean = cleanse(raw);
    let tokens = tokenize(&clean);
    let table = frequency_table(&tokens);
    tracing::debug!(
        raw_chars = raw.len(),
        clean_chars = clean.len(),
        total_words = tokens.len(),
        distinct_words = table.len(),
        "tokenized document"
    );

    let distinct_words = table.len();
    let words = slice_window(table, window);

    WordRanking {
        window,
        total_words: tokens.len(),
        distinct_words,
        words,
    }
}

/// Fetch `url` and rank its words. Stops at the first failing stage.
pub async fn rank_words_from_url<F>(
    fetcher: &F,
    url: &str,
    window: RankWindow,
) -> Result<WordRanking>
where
    F: TextFetcher + ?Sized,
{
    let raw = fetcher.fetch_text(url).await?;
    Ok(rank_words_in_text(&raw, window))
}
