//! Subcommand execution
//!
//! Every command writes its single output record to `out` and nothing else;
//! progress and diagnostics are logged.

use std::io::Write;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing::info;

use shard_filters::domain::codec;
use shard_filters::{
    build_filters, BreachFilterApi, CorpusFile, FsShardStore, QueryEngine, ShardKey, ShardStore,
};

use crate::cli::{BuildArgs, Command, InspectArgs, QueryArgs};
use crate::request::{parse_request, InspectReport, QueryResponse};

/// Run one subcommand
pub fn run(command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Build(args) => run_build(&args),
        Command::Query(args) => run_query(&args, out),
        Command::Inspect(args) => run_inspect(&args, out),
    }
}

/// Build and persist all shard filters. Prints nothing on success.
pub fn run_build(args: &BuildArgs) -> Result<()> {
    let config = args.config().context("invalid build configuration")?;
    let sources: Vec<CorpusFile> = args.files.iter().map(CorpusFile::new).collect();
    let store = FsShardStore::new(&args.output);

    info!(
        "Building shard filters from {} file(s) into {}",
        sources.len(),
        args.output.display()
    );
    let start = Instant::now();

    let built = build_filters(&config, &sources).context("failed to build filters")?;
    let manifest = built
        .persist(&store)
        .with_context(|| format!("failed to write filters to {}", args.output.display()))?;

    info!(
        "Bloom filters written: {} shards, {} digests in {:?}",
        manifest.shards.len(),
        manifest.total_elements(),
        start.elapsed()
    );
    Ok(())
}

/// Answer one query, printing `{"found":...}`
pub fn run_query(args: &QueryArgs, out: &mut impl Write) -> Result<()> {
    let request = parse_request(&args.request)?;
    if !args.filters.is_dir() {
        bail!("filter directory {} does not exist", args.filters.display());
    }

    let engine = QueryEngine::with_config(FsShardStore::new(&args.filters), &args.query_config());
    let found = engine
        .check_secret(request.secret.as_bytes())
        .context("query failed")?;

    serde_json::to_writer(&mut *out, &QueryResponse { found })?;
    writeln!(out)?;
    Ok(())
}

/// Decode one shard and print its statistics
pub fn run_inspect(args: &InspectArgs, out: &mut impl Write) -> Result<()> {
    let key = ShardKey::parse(&args.shard)?;
    let store = FsShardStore::new(&args.filters);

    let bytes = store.get(key)?;
    let filter = codec::decode(&bytes).with_context(|| format!("shard {} is corrupt", key))?;
    let elements = store
        .manifest()?
        .and_then(|manifest| manifest.shard(key).map(|summary| summary.elements));

    let report = InspectReport::new(key, &filter, bytes.len(), elements);
    serde_json::to_writer(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    use shard_filters::Digest;

    fn build_into(dir: &Path, secrets: &[&str]) -> std::path::PathBuf {
        let corpus = dir.join("corpus.txt");
        let lines: Vec<String> = secrets
            .iter()
            .map(|s| Digest::of(s.as_bytes()).to_string())
            .collect();
        fs::write(&corpus, lines.join("\n")).unwrap();

        let output = dir.join("bloom_filters");
        let args = BuildArgs {
            output: output.clone(),
            expected_elements: 100,
            fpr: Some(0.001),
            hash_count: None,
            per_shard_sizing: false,
            files: vec![corpus],
        };
        run_build(&args).unwrap();
        output
    }

    fn query(filters: &Path, request: &str, cache: bool) -> Result<String> {
        let args = QueryArgs {
            filters: filters.to_path_buf(),
            cache,
            request: request.to_string(),
        };
        let mut out = Vec::new();
        run_query(&args, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_query_found_and_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let filters = build_into(dir.path(), &["hunter2"]);

        assert_eq!(
            query(&filters, r#"{"secret":"hunter2"}"#, false).unwrap(),
            "{\"found\":true}\n"
        );
        assert_eq!(
            query(&filters, r#"{"password":"not in the corpus at all"}"#, true).unwrap(),
            "{\"found\":false}\n"
        );
    }

    #[test]
    fn test_query_without_secret_prints_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let filters = build_into(dir.path(), &["hunter2"]);

        let args = QueryArgs {
            filters,
            cache: false,
            request: r#"{"user":"alice"}"#.to_string(),
        };
        let mut out = Vec::new();
        let err = run_query(&args, &mut out).unwrap_err();

        assert!(out.is_empty(), "no success record on failure");
        assert!(matches!(
            err.downcast_ref::<shard_filters::FilterError>(),
            Some(shard_filters::FilterError::Input(_))
        ));
    }

    #[test]
    fn test_query_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(query(&dir.path().join("nope"), r#"{"secret":"x"}"#, false).is_err());
    }

    #[test]
    fn test_inspect_reports_manifest_count() {
        let dir = tempfile::tempdir().unwrap();
        let filters = build_into(dir.path(), &["hunter2"]);
        let key = ShardKey::for_digest(&Digest::of(b"hunter2"));

        let args = InspectArgs {
            filters,
            shard: key.to_string(),
        };
        let mut out = Vec::new();
        run_inspect(&args, &mut out).unwrap();

        let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(report["shard"], key.to_string());
        assert_eq!(report["elements"], 1);
        assert!(report["bits_set"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_inspect_rejects_bad_shard_name() {
        let dir = tempfile::tempdir().unwrap();
        let args = InspectArgs {
            filters: dir.path().to_path_buf(),
            shard: "zz".to_string(),
        };
        assert!(run_inspect(&args, &mut Vec::new()).is_err());
    }
}
