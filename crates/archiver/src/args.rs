use crate::{
    config::{DEFAULT_BATCH_SIZE, DEFAULT_EXTRACTION_CONCURRENCY},
    ArchiverConfig,
};
use std::time::Duration;

/// The command line arguments for the archiver.
#[derive(Debug, Clone, clap::Args)]
pub struct ArchiverArgs {
    /// The amount of L2 blocks targeted per L1 query.
    #[arg(
        long = "archiver.batch-size",
        id = "archiver_batch_size",
        value_name = "ARCHIVER_BATCH_SIZE",
        default_value_t = DEFAULT_BATCH_SIZE
    )]
    pub batch_size: u64,
    /// The interval between two sync passes, in milliseconds.
    #[arg(
        long = "archiver.polling-interval-ms",
        id = "archiver_polling_interval_ms",
        value_name = "ARCHIVER_POLLING_INTERVAL_MS",
        default_value_t = 1000
    )]
    pub polling_interval_ms: u64,
    /// The amount of blocks processed concurrently during entity extraction.
    #[arg(
        long = "archiver.extraction-concurrency",
        id = "archiver_extraction_concurrency",
        value_name = "ARCHIVER_EXTRACTION_CONCURRENCY",
        default_value_t = DEFAULT_EXTRACTION_CONCURRENCY
    )]
    pub extraction_concurrency: usize,
    /// The maximum amount of blocks walked back when looking for a common ancestor with L1.
    #[arg(
        long = "archiver.max-reorg-depth",
        id = "archiver_max_reorg_depth",
        value_name = "ARCHIVER_MAX_REORG_DEPTH"
    )]
    pub max_reorg_depth: Option<u64>,
}

impl Default for ArchiverArgs {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            polling_interval_ms: 1000,
            extraction_concurrency: DEFAULT_EXTRACTION_CONCURRENCY,
            max_reorg_depth: None,
        }
    }
}

impl From<ArchiverArgs> for ArchiverConfig {
    fn from(args: ArchiverArgs) -> Self {
        Self {
            batch_size: args.batch_size,
            polling_interval: Duration::from_millis(args.polling_interval_ms),
            extraction_concurrency: args.extraction_concurrency.max(1),
            max_reorg_depth: args.max_reorg_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        archiver: ArchiverArgs,
    }

    #[test]
    fn test_should_parse_archiver_args() -> eyre::Result<()> {
        let cli = Cli::try_parse_from([
            "archiver",
            "--archiver.batch-size",
            "20",
            "--archiver.polling-interval-ms",
            "250",
            "--archiver.max-reorg-depth",
            "64",
        ])?;

        let config = ArchiverConfig::from(cli.archiver);

        assert_eq!(config.batch_size, 20);
        assert_eq!(config.polling_interval, Duration::from_millis(250));
        assert_eq!(config.extraction_concurrency, DEFAULT_EXTRACTION_CONCURRENCY);
        assert_eq!(config.max_reorg_depth, Some(64));
        Ok(())
    }
}
