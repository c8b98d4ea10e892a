//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shard_filters::{
    BuildConfig, BuildConfigBuilder, FilterError, QueryConfig, ShardSizing, Sizing,
};

/// Default shard directory
pub const DEFAULT_FILTER_DIR: &str = "bloom_filters";

/// Breach-Check: compromised-credential lookups backed by sharded bloom filters
#[derive(Parser, Debug)]
#[command(name = "breach-check")]
#[command(about = "Build and query sharded bloom filters of compromised credential digests")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build all 256 shard filters from SHA-1 corpus files
    Build(BuildArgs),
    /// Check one secret; prints {"found":true|false}
    Query(QueryArgs),
    /// Print parameters and fill statistics of one shard
    Inspect(InspectArgs),
}

#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    /// Directory the shard files are written to
    #[arg(short, long, default_value = DEFAULT_FILTER_DIR)]
    pub output: PathBuf,

    /// Expected number of digests per shard
    #[arg(long, default_value_t = BuildConfig::default().expected_elements)]
    pub expected_elements: usize,

    /// Target false-positive rate per shard
    #[arg(long, conflicts_with = "hash_count")]
    pub fpr: Option<f64>,

    /// Fixed hash count; the bit count is chosen so it is optimal
    #[arg(long)]
    pub hash_count: Option<usize>,

    /// Count the corpus first and size every shard from its actual count
    #[arg(long)]
    pub per_shard_sizing: bool,

    /// Corpus files, one hex SHA-1 digest per line
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

impl BuildArgs {
    /// Validated build configuration for these flags
    pub fn config(&self) -> Result<BuildConfig, FilterError> {
        let defaults = BuildConfig::default();
        let sizing = match (self.fpr, self.hash_count) {
            (_, Some(k)) => Sizing::HashCount(k),
            (Some(p), None) => Sizing::TargetFpr(p),
            (None, None) => defaults.sizing,
        };
        let strategy = if self.per_shard_sizing {
            ShardSizing::PerShard
        } else {
            ShardSizing::Uniform
        };

        BuildConfigBuilder::new()
            .expected_elements(self.expected_elements)
            .sizing(sizing)
            .strategy(strategy)
            .build()
    }
}

#[derive(clap::Args, Debug)]
pub struct QueryArgs {
    /// Directory holding the shard files
    #[arg(short, long, default_value = DEFAULT_FILTER_DIR)]
    pub filters: PathBuf,

    /// Keep decoded shards in a bounded cache
    #[arg(long)]
    pub cache: bool,

    /// JSON request, e.g. {"secret":"hunter2"}
    pub request: String,
}

impl QueryArgs {
    pub fn query_config(&self) -> QueryConfig {
        QueryConfig {
            cache_capacity: if self.cache { 16 } else { 0 },
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct InspectArgs {
    /// Directory holding the shard files
    #[arg(short, long, default_value = DEFAULT_FILTER_DIR)]
    pub filters: PathBuf,

    /// Shard name, two hex characters (e.g. "aa")
    pub shard: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("breach-check").chain(args.iter().copied()))
    }

    fn build_args(args: &[&str]) -> BuildArgs {
        match parse(args).unwrap().command {
            Command::Build(build) => build,
            other => panic!("expected build, got {:?}", other),
        }
    }

    #[test]
    fn test_build_defaults() {
        let args = build_args(&["build", "corpus.txt"]);

        assert_eq!(args.output, PathBuf::from(DEFAULT_FILTER_DIR));
        assert_eq!(args.config().unwrap(), BuildConfig::default());
    }

    #[test]
    fn test_build_requires_a_file() {
        assert!(parse(&["build"]).is_err());
    }

    #[test]
    fn test_build_flags_map_to_config() {
        let args = build_args(&[
            "build",
            "--expected-elements",
            "1000",
            "--hash-count",
            "7",
            "--per-shard-sizing",
            "a.txt",
            "b.txt",
        ]);
        let config = args.config().unwrap();

        assert_eq!(args.files.len(), 2);
        assert_eq!(config.expected_elements, 1000);
        assert_eq!(config.sizing, Sizing::HashCount(7));
        assert_eq!(config.strategy, ShardSizing::PerShard);
    }

    #[test]
    fn test_fpr_and_hash_count_conflict() {
        assert!(parse(&["build", "--fpr", "0.01", "--hash-count", "7", "a.txt"]).is_err());
    }

    #[test]
    fn test_invalid_fpr_rejected_by_config() {
        let args = build_args(&["build", "--fpr", "1.5", "a.txt"]);
        assert!(matches!(
            args.config(),
            Err(FilterError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_query_cache_flag() {
        let Command::Query(query) = parse(&["query", "--cache", "{}"]).unwrap().command else {
            panic!("expected query");
        };

        assert_eq!(query.filters, PathBuf::from(DEFAULT_FILTER_DIR));
        assert!(query.query_config().cache_capacity > 0);
    }
}
