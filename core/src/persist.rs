use crate::builder::BuildReport;
use crate::error::{Result, SearchError};
use crate::index::IndexStore;
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub collection: String,
    pub num_docs: u32,
    pub num_terms: usize,
    pub skipped: usize,
    pub created_at: String,
    pub version: u32,
}

/// On-disk layout: `<root>/<collection>/{store.bin, meta.json}`.
///
/// A save stages both files in `<root>/.<collection>.staging` and swaps that
/// directory in for the live one, so readers see either the old pair or the
/// new pair.
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn collection_dir(&self, collection: &str) -> PathBuf { self.root.join(collection) }
    fn staging_dir(&self, collection: &str) -> PathBuf { self.root.join(format!(".{collection}.staging")) }
    fn retired_dir(&self, collection: &str) -> PathBuf { self.root.join(format!(".{collection}.old")) }
    fn store(&self, collection: &str) -> PathBuf { self.collection_dir(collection).join(STORE_FILE) }
    fn meta(&self, collection: &str) -> PathBuf { self.collection_dir(collection).join(META_FILE) }

    pub fn exists(&self, collection: &str) -> bool {
        self.meta(collection).is_file() && self.store(collection).is_file()
    }
}

const STORE_FILE: &str = "store.bin";
const META_FILE: &str = "meta.json";

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut f = File::create(path)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    Ok(())
}

/// Best-effort removal of a leftover directory.
fn discard(dir: &Path) {
    if dir.exists() {
        if let Err(err) = fs::remove_dir_all(dir) {
            tracing::warn!(path = %dir.display(), error = %err, "failed to remove directory");
        }
    }
}

pub fn save_store(paths: &IndexPaths, store: &IndexStore, report: &BuildReport) -> Result<MetaFile> {
    let collection = store.collection();
    let meta = MetaFile {
        collection: collection.to_string(),
        num_docs: store.num_docs(),
        num_terms: store.num_terms(),
        skipped: report.skipped.len(),
        created_at: time::OffsetDateTime::now_utc().format(&Rfc3339)?,
        version: FORMAT_VERSION,
    };
    let bytes = bincode::serialize(store)?;
    let json = serde_json::to_string_pretty(&meta)?;

    create_dir_all(&paths.root)?;
    let staging = paths.staging_dir(collection);
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir(&staging)?;
    let staged = write_synced(&staging.join(STORE_FILE), &bytes)
        .and_then(|_| write_synced(&staging.join(META_FILE), json.as_bytes()))
        .and_then(|_| swap_in(paths, collection, &staging));
    if let Err(err) = staged {
        discard(&staging);
        return Err(err);
    }
    tracing::info!(collection, path = %paths.collection_dir(collection).display(), "index persisted");
    Ok(meta)
}

/// Replaces the live collection directory with `staging`. On failure the
/// previous directory is put back.
fn swap_in(paths: &IndexPaths, collection: &str, staging: &Path) -> Result<()> {
    let live = paths.collection_dir(collection);
    let retired = paths.retired_dir(collection);
    discard(&retired);
    let had_live = live.exists();
    if had_live {
        fs::rename(&live, &retired)?;
    }
    if let Err(err) = fs::rename(staging, &live) {
        if had_live {
            if let Err(restore) = fs::rename(&retired, &live) {
                tracing::error!(collection, error = %restore, "failed to restore previous snapshot");
            }
        }
        return Err(err.into());
    }
    discard(&retired);
    Ok(())
}

pub fn load_meta(paths: &IndexPaths, collection: &str) -> Result<MetaFile> {
    let mut f = File::open(paths.meta(collection))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

pub fn load_store(paths: &IndexPaths, collection: &str) -> Result<IndexStore> {
    let meta = load_meta(paths, collection)?;
    if meta.version != FORMAT_VERSION {
        return Err(codec_error(format!("unsupported index version {} (expected {FORMAT_VERSION})", meta.version)));
    }
    let mut f = File::open(paths.store(collection))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let store: IndexStore = bincode::deserialize(&buf)?;
    if store.collection() != collection {
        return Err(codec_error(format!("store under `{collection}` holds collection `{}`", store.collection())));
    }
    if store.num_docs() != meta.num_docs || store.num_terms() != meta.num_terms {
        return Err(codec_error(format!(
            "store for `{collection}` has {} docs / {} terms, meta.json says {} / {}",
            store.num_docs(),
            store.num_terms(),
            meta.num_docs,
            meta.num_terms
        )));
    }
    Ok(store)
}

/// Collections with a complete snapshot under `root`, sorted by name.
pub fn list_collections(paths: &IndexPaths) -> Result<Vec<String>> {
    if !paths.root.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(&paths.root)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') && paths.exists(name) {
                out.push(name.to_string());
            }
        }
    }
    out.sort();
    Ok(out)
}

fn codec_error(msg: String) -> SearchError {
    SearchError::Codec(Box::new(bincode::ErrorKind::Custom(msg)))
}
