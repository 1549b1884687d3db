use crate::index::{InvertedIndex, PageTable};
use crate::rank::{rank, RankConfig, RankTable};
use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub seed: String,
    pub num_pages: usize,
    pub num_visited: usize,
    pub num_terms: usize,
    pub created_at: String,
    pub version: u32,
}

impl MetaFile {
    pub fn describe(seed: &str, index: &InvertedIndex, pages: &PageTable) -> Self {
        Self {
            seed: seed.to_string(),
            num_pages: pages.len(),
            num_visited: pages.values().filter(|p| p.visited).count(),
            num_terms: index.len(),
            created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            version: FORMAT_VERSION,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn index(&self) -> PathBuf { self.root.join("index.json") }
    fn pages(&self) -> PathBuf { self.root.join("pages.json") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn ranks(&self) -> PathBuf { self.root.join("ranks.bin") }

    pub fn has_ranks(&self) -> bool { self.ranks().is_file() }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, value)?;
    w.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let value = serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parsing {}", path.display()))?;
    Ok(value)
}

pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_json(&paths.index(), index)
}

pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    read_json(&paths.index())
}

pub fn save_pages(paths: &IndexPaths, pages: &PageTable) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_json(&paths.pages(), pages)
}

pub fn load_pages(paths: &IndexPaths) -> Result<PageTable> {
    read_json(&paths.pages())
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    read_json(&paths.meta())
}

pub fn save_ranks(paths: &IndexPaths, ranks: &RankTable) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.ranks())?;
    let bytes = bincode::serialize(ranks)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_ranks(paths: &IndexPaths) -> Result<RankTable> {
    let mut f = File::open(paths.ranks())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let ranks = bincode::deserialize(&buf)?;
    Ok(ranks)
}

/// Stored ranks if present, otherwise computed from the page table with default settings.
pub fn load_or_compute_ranks(paths: &IndexPaths, pages: &PageTable) -> Result<RankTable> {
    if paths.has_ranks() {
        return load_ranks(paths);
    }
    tracing::warn!(dir = %paths.root.display(), "no stored ranks, computing with defaults");
    Ok(rank(pages, &RankConfig::default())?)
}

/// Overwrite the index, page table and meta file in one go.
pub fn save_checkpoint(paths: &IndexPaths, seed: &str, index: &InvertedIndex, pages: &PageTable) -> Result<()> {
    save_index(paths, index)?;
    save_pages(paths, pages)?;
    save_meta(paths, &MetaFile::describe(seed, index, pages))?;
    Ok(())
}

/// Load only the structures required to search: index and page table.
pub fn load_corpus(paths: &IndexPaths) -> Result<(InvertedIndex, PageTable)> {
    Ok((load_index(paths)?, load_pages(paths)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{index_page, Page};
    use crate::tokenizer::tokenize;
    use tempfile::tempdir;

    #[test]
    fn checkpoint_overwrites_previous_snapshot() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut index = InvertedIndex::new();
        let mut pages = PageTable::new();
        pages.insert("http://a/".into(), Page::discovered());
        save_checkpoint(&paths, "http://a/", &index, &pages).unwrap();

        let tokenized = tokenize("quotes about life");
        index_page(&mut index, &tokenized.postings, "http://a/");
        let page = pages.get_mut("http://a/").unwrap();
        page.visited = true;
        page.token_count = Some(tokenized.token_count);
        page.outgoing = Some(Default::default());
        save_checkpoint(&paths, "http://a/", &index, &pages).unwrap();

        let (loaded_index, loaded_pages) = load_corpus(&paths).unwrap();
        assert_eq!(loaded_index, index);
        assert_eq!(loaded_pages, pages);
        let meta = load_meta(&paths).unwrap();
        assert_eq!((meta.num_pages, meta.num_visited, meta.num_terms), (1, 1, 2));
    }

    #[test]
    fn index_document_is_term_url_positions() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut index = InvertedIndex::new();
        index_page(&mut index, &tokenize("cat mat cat").postings, "http://a/");
        save_index(&paths, &index).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(dir.path().join("index.json")).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"cat": {"http://a/": [0, 2]}, "mat": {"http://a/": [1]}}));
    }

    #[test]
    fn ranks_round_trip_through_bincode() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        assert!(!paths.has_ranks());
        let ranks: RankTable = [("http://a/".to_string(), 0.25), ("http://b/".to_string(), 0.75)].into_iter().collect();
        save_ranks(&paths, &ranks).unwrap();
        assert!(paths.has_ranks());
        assert_eq!(load_ranks(&paths).unwrap(), ranks);
    }

    #[test]
    fn missing_ranks_are_computed() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut pages = PageTable::new();
        for (url, target) in [("http://a/", "http://b/"), ("http://b/", "http://a/")] {
            let page = pages.entry(url.to_string()).or_default();
            page.visited = true;
            page.outgoing = Some([target.to_string()].into_iter().collect());
            pages.entry(target.to_string()).or_default().incoming.insert(url.to_string());
        }
        let ranks = load_or_compute_ranks(&paths, &pages).unwrap();
        assert!((ranks["http://a/"] - 0.5).abs() < 1e-9);
    }
}
