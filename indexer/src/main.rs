use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use search_core::persist::{load_store, save_store, IndexPaths};
use search_core::records::{Article, Figure, Table};
use search_core::{build, report, Catalog, Document, EngineConfig, Schema};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build, query and inspect per-collection search indexes", long_about = None)]
struct Cli {
    /// JSON engine configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Index root directory (overrides the config file)
    #[arg(long, global = true)]
    index: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one collection from JSON/JSONL document files or a directory of them
    Build {
        /// Collection key: articles, tables, figures, or a custom one with --schema
        #[arg(long)]
        collection: String,
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Schema JSON file for collections without a built-in schema
        #[arg(long)]
        schema: Option<PathBuf>,
    },
    /// Run a query against one or more collections
    Search {
        query: String,
        /// Comma-separated collection keys; defaults to every configured collection
        #[arg(long, value_delimiter = ',')]
        collections: Vec<String>,
        /// Scope bare words to this field instead of the default fields
        #[arg(long)]
        field: Option<String>,
        #[arg(short, long)]
        k: Option<usize>,
        /// Judge the hits and log NDCG, reciprocal rank and precision
        #[arg(long, default_value_t = false)]
        metrics: bool,
    },
    /// Print a stored document as JSON
    Get {
        #[arg(long)]
        collection: String,
        id: String,
    },
    /// Print term and document counts for a collection
    Stats {
        #[arg(long)]
        collection: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("reading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(index) = cli.index {
        config.index_root = index;
    }

    match cli.command {
        Commands::Build { collection, input, schema } => build_collection(&config, &collection, &input, schema.as_deref()),
        Commands::Search { query, collections, field, k, metrics } => {
            let keys = if collections.is_empty() { config.collections.clone() } else { collections };
            let k = k.unwrap_or(config.top_k);
            run_search(Catalog::open(config), &query, &keys, field.as_deref(), k, metrics)
        }
        Commands::Get { collection, id } => {
            let catalog = Catalog::open(config);
            match catalog.document(&collection, &id)? {
                Some(doc) => println!("{}", serde_json::to_string_pretty(&doc)?),
                None => bail!("document `{id}` not found in `{collection}`"),
            }
            Ok(())
        }
        Commands::Stats { collection } => {
            let store = load_store(&IndexPaths::new(&config.index_root), &collection)?;
            print!("{}", report(&store));
            Ok(())
        }
    }
}

fn build_collection(config: &EngineConfig, collection: &str, input: &Path, schema_path: Option<&Path>) -> Result<()> {
    let schema = match schema_path {
        Some(path) => Schema::load(path)?,
        None => Schema::builtin(collection).with_context(|| format!("no built-in schema for `{collection}`; pass --schema"))?,
    };
    if schema.collection != collection {
        bail!("schema describes `{}`, not `{collection}`", schema.collection);
    }

    let ingest = read_documents(collection, input)?;
    tracing::info!(collection, num_docs = ingest.docs.len(), rejected = ingest.rejected, "ingested documents");

    let out = build(schema, ingest.docs);
    let meta = save_store(&IndexPaths::new(&config.index_root), &out.store, &out.report)?;
    for skipped in &out.report.skipped {
        println!("skipped {}: {}", skipped.id, skipped.reason);
    }
    println!(
        "{}: {} documents, {} terms, {} skipped, {} unreadable ({})",
        meta.collection, meta.num_docs, meta.num_terms, meta.skipped, ingest.rejected, meta.created_at
    );
    Ok(())
}

#[derive(Default)]
struct Ingest {
    docs: Vec<Document>,
    /// Records that could not be read as documents.
    rejected: usize,
}

impl Ingest {
    fn push(&mut self, collection: &str, value: serde_json::Value, origin: &str) {
        match to_document(collection, value) {
            Ok(doc) => self.docs.push(doc),
            Err(err) => self.reject(origin, &err),
        }
    }

    fn reject(&mut self, origin: &str, err: &serde_json::Error) {
        tracing::warn!(origin, error = %err, "skipping unreadable record");
        self.rejected += 1;
    }
}

/// Built-in collections take crawler records; anything else takes generic documents.
fn to_document(collection: &str, value: serde_json::Value) -> serde_json::Result<Document> {
    Ok(match collection {
        "articles" => serde_json::from_value::<Article>(value)?.into(),
        "tables" => serde_json::from_value::<Table>(value)?.into(),
        "figures" => serde_json::from_value::<Figure>(value)?.into(),
        _ => serde_json::from_value(value)?,
    })
}

fn read_documents(collection: &str, input: &Path) -> Result<Ingest> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input {} does not exist", input.display());
    }

    let mut ingest = Ingest::default();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(collection, &file, &mut ingest)?;
        } else {
            read_json(collection, &file, &mut ingest)?;
        }
    }
    Ok(ingest)
}

fn read_jsonl(collection: &str, file: &Path, ingest: &mut Ingest) -> Result<()> {
    let reader = BufReader::new(File::open(file).with_context(|| file.display().to_string())?);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let origin = format!("{}:{}", file.display(), lineno + 1);
        match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(value) => ingest.push(collection, value, &origin),
            Err(err) => ingest.reject(&origin, &err),
        }
    }
    Ok(())
}

fn read_json(collection: &str, file: &Path, ingest: &mut Ingest) -> Result<()> {
    let reader = BufReader::new(File::open(file).with_context(|| file.display().to_string())?);
    let origin = file.display().to_string();
    let json: serde_json::Value = match serde_json::from_reader(reader) {
        Ok(json) => json,
        Err(err) => {
            ingest.reject(&origin, &err);
            return Ok(());
        }
    };
    match json {
        serde_json::Value::Array(arr) => {
            for (i, v) in arr.into_iter().enumerate() {
                ingest.push(collection, v, &format!("{origin}[{i}]"));
            }
        }
        serde_json::Value::Object(_) => ingest.push(collection, json, &origin),
        _ => tracing::warn!(file = %origin, "ignoring non-document JSON"),
    }
    Ok(())
}

fn run_search(catalog: Catalog, query: &str, keys: &[String], field: Option<&str>, k: usize, metrics: bool) -> Result<()> {
    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
    let output = if metrics {
        catalog
            .search_with_metrics(query, &keys, field, k)
            .into_iter()
            .map(|(key, res)| {
                let value = match res {
                    Ok((hits, m)) => serde_json::json!({ "hits": hits, "metrics": m }),
                    Err(err) => serde_json::json!({ "error": err.to_string() }),
                };
                (key, value)
            })
            .collect::<serde_json::Map<_, _>>()
    } else {
        catalog
            .search(query, &keys, field, k)
            .into_iter()
            .map(|(key, res)| {
                let value = match res {
                    Ok(hits) => serde_json::json!({ "hits": hits }),
                    Err(err) => serde_json::json!({ "error": err.to_string() }),
                };
                (key, value)
            })
            .collect::<serde_json::Map<_, _>>()
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untitled_and_unreadable_records_do_not_abort_build() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.jsonl");
        std::fs::write(
            &input,
            concat!(
                r#"{"id":"PMC1","title":"Kidney stones"}"#, "\n",
                r#"{"id":"PMC2","articleAbstract":"no title here"}"#, "\n",
                r#"{"id":"PMC3","title":"#, "\n",
                r#"{"id":"PMC4","title":["not","a","string"]}"#, "\n",
            ),
        )
        .unwrap();

        let ingest = read_documents("articles", &input).unwrap();
        assert_eq!(ingest.docs.len(), 2);
        assert_eq!(ingest.rejected, 2);

        let out = build(Schema::articles(), ingest.docs);
        assert_eq!(out.report.indexed, 1);
        assert_eq!(out.report.skipped.len(), 1);
        assert_eq!(out.report.skipped[0].id, "PMC2");
    }

    #[test]
    fn build_persists_valid_records_next_to_skipped_ones() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        std::fs::write(&input, r#"[{"id":"PMC1","title":"Kidney stones"},{"id":"PMC2"}]"#).unwrap();
        let config = EngineConfig { index_root: dir.path().join("index"), ..EngineConfig::default() };

        build_collection(&config, "articles", &input, None).unwrap();
        let store = load_store(&IndexPaths::new(&config.index_root), "articles").unwrap();
        assert_eq!(store.num_docs(), 1);
        assert!(store.lookup("PMC1").is_some());
    }
}
