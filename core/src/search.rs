use crate::error::SearchError;
use crate::index::{InvertedIndex, PageTable, PostingList, Url};
use crate::rank::RankTable;
use crate::tokenizer::tokenize;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub url: Url,
    pub score: f64,
}

/// Rank pages for a free-text query. Every query term must exist in the index and
/// appear on a page for that page to qualify; scores are normalized to sum to 1.
pub fn search(query: &str, index: &InvertedIndex, pages: &PageTable, ranks: &RankTable) -> Result<Vec<SearchHit>, SearchError> {
    let tokenized = tokenize(query);
    if tokenized.postings.is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let mut entries: BTreeMap<&str, &PostingList> = BTreeMap::new();
    for term in tokenized.terms() {
        match index.get(term) {
            Some(postings) => { entries.insert(term, postings); }
            None => {
                tracing::debug!(term, "query term not in index");
                return Ok(Vec::new());
            }
        }
    }

    let page_count = pages.len().max(1) as f64;
    // Document-frequency ratio: lower means more distinctive.
    let uniqueness: BTreeMap<&str, f64> = entries
        .iter()
        .map(|(term, postings)| (*term, postings.len() as f64 / page_count))
        .collect();

    let mut hits: Vec<SearchHit> = Vec::new();
    for (url, page) in pages {
        let Some(token_count) = page.token_count.filter(|c| *c > 0) else { continue };
        let mut score = 0.0;
        let mut completeness = 0usize;
        for (term, postings) in &entries {
            if let Some(positions) = postings.get(url) {
                completeness += 1;
                score += (positions.len() as f64 / token_count as f64) * uniqueness[term];
            }
        }
        let rank = ranks.get(url).copied().unwrap_or(0.0);
        score *= rank * (completeness * completeness) as f64;
        if score > 0.0 && completeness == entries.len() {
            hits.push(SearchHit { url: url.clone(), score });
        }
    }

    let total: f64 = hits.iter().map(|h| h.score).sum();
    if total > 0.0 {
        for hit in &mut hits {
            hit.score /= total;
        }
    }
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    tracing::info!(query, hits = hits.len(), "search complete");
    Ok(hits)
}
