use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SearchError {
    #[error("query contains no searchable terms")]
    EmptyQuery,

    /// Returned by lookups only. `search` maps an unknown term to an empty result.
    #[error("no index entry for '{0}'")]
    UnknownTerm(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum RankError {
    #[error("page ranks did not converge within {iterations} iterations")]
    NonConvergence { iterations: usize },

    #[error("page {url} has no outgoing links")]
    DanglingNode { url: String },
}
