pub mod error;
pub mod index;
pub mod persist;
pub mod rank;
pub mod search;
pub mod tokenizer;

pub use error::{RankError, SearchError};
pub use index::{index_page, lookup_term, InvertedIndex, Page, PageTable, PostingList, Url};
pub use rank::{DanglingPolicy, RankConfig, RankTable};
pub use search::{search, SearchHit};
pub use tokenizer::{tokenize, Tokenized};
