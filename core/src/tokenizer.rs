use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

lazy_static! {
    // Words (with inner apostrophes), ellipses, dashes, then any single punctuation mark.
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}_]+(?:'[\p{L}\p{N}_]+)*|\.\.\.|--|[^\s\p{L}\p{N}_]").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","ain","all","am","an","and","any","are","aren","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","couldn","couldn't",
            "d","did","didn","didn't","do","does","doesn","doesn't","doing","don","don't","down","during",
            "each","few","for","from","further",
            "had","hadn","hadn't","has","hasn","hasn't","have","haven","haven't","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","isn","isn't","it","it's","its","itself",
            "just","ll","m","ma","me","mightn","mightn't","more","most","mustn","mustn't","my","myself",
            "needn","needn't","no","nor","not","now",
            "o","of","off","on","once","only","or","other","our","ours","ourselves","out","over","own",
            "re","s","same","shan","shan't","she","she's","should","should've","shouldn","shouldn't","so","some","such",
            "t","than","that","that'll","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","ve","very",
            "was","wasn","wasn't","we","were","weren","weren't","what","when","where","which","while","who","whom","why","will","with","won","won't","wouldn","wouldn't",
            "y","you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

const CLITICS: &[&str] = &["'s", "'m", "'d", "'re", "'ve", "'ll"];

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Postings for a single text plus the length of its unfiltered token stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tokenized {
    pub postings: BTreeMap<String, Vec<usize>>,
    pub token_count: usize,
}

impl Tokenized {
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }
}

/// Lowercased token stream with contractions split off ("don't" -> "do", "n't").
pub fn split_tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut tokens = Vec::new();
    for mat in RE.find_iter(&lowered) {
        let token = mat.as_str();
        if let Some(stem) = token.strip_suffix("n't").filter(|s| !s.is_empty()) {
            tokens.push(stem.to_string());
            tokens.push("n't".to_string());
            continue;
        }
        match CLITICS.iter().find(|c| token.len() > c.len() && token.ends_with(*c)) {
            Some(clitic) => {
                let cut = token.len() - clitic.len();
                tokens.push(token[..cut].to_string());
                tokens.push(token[cut..].to_string());
            }
            None => tokens.push(token.to_string()),
        }
    }
    tokens
}

/// Tokenize text into per-term positions, dropping stop words.
/// Positions index the unfiltered stream, and `token_count` is its length.
pub fn tokenize(text: &str) -> Tokenized {
    let tokens = split_tokens(text);
    let mut postings: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (pos, token) in tokens.iter().enumerate() {
        if is_stopword(token) { continue; }
        postings.entry(token.clone()).or_default().push(pos);
    }
    Tokenized { postings, token_count: tokens.len() }
}
