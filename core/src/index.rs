use crate::error::SearchError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Normalized absolute URL, the unique key of a page.
pub type Url = String;

/// Positions of one term, per page, in order of occurrence.
pub type PostingList = BTreeMap<Url, Vec<usize>>;

/// Link-graph node. `outgoing` and `token_count` stay `None` until the page is visited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub visited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<usize>,
    #[serde(default)]
    pub incoming: BTreeSet<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outgoing: Option<BTreeSet<Url>>,
}

impl Page {
    pub fn discovered() -> Self { Self::default() }

    pub fn discovered_from(referrer: &str) -> Self {
        let mut page = Self::default();
        page.incoming.insert(referrer.to_string());
        page
    }

    /// Number of outgoing links; unvisited pages count as having none.
    pub fn out_degree(&self) -> usize {
        self.outgoing.as_ref().map_or(0, |o| o.len())
    }
}

pub type PageTable = BTreeMap<Url, Page>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvertedIndex {
    pub terms: BTreeMap<String, PostingList>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    pub fn get(&self, term: &str) -> Option<&PostingList> { self.terms.get(term) }

    /// Number of pages that contain `term`.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.terms.get(term).map_or(0, |p| p.len())
    }
}

/// Fold one page's postings into the index. Re-indexing the same page overwrites
/// its position lists, so a repeated call with identical postings is a no-op.
pub fn index_page(index: &mut InvertedIndex, page_postings: &BTreeMap<String, Vec<usize>>, url: &str) {
    for (term, positions) in page_postings {
        index
            .terms
            .entry(term.clone())
            .or_default()
            .insert(url.to_string(), positions.clone());
    }
    tracing::debug!(url, terms = page_postings.len(), "indexed page");
}

pub fn lookup_term<'a>(term: &str, index: &'a InvertedIndex) -> Result<&'a PostingList, SearchError> {
    let term = term.trim().to_lowercase();
    index.get(&term).ok_or(SearchError::UnknownTerm(term))
}
