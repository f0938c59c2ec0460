use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "trellis",
    version,
    about = "Trellis: task-board state engine",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Override a config key, e.g. -c sync.interval_secs=5
    #[arg(
        short = 'c',
        long = "override",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a task
    Add {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        assignee: String,
        #[arg(long, default_value = "")]
        client: String,
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
        #[arg(long, default_value = "")]
        status: String,
        #[arg(long = "sub-status", default_value = "")]
        sub_status: String,
        #[arg(long = "tag", action = ArgAction::Append)]
        tags: Vec<String>,
    },

    /// List tasks through the filter pipeline
    List {
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long = "sub-status")]
        sub_status: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        overdue: bool,
        /// Progress bucket: all, not-started, in-progress, completed
        #[arg(long)]
        progress: Option<String>,
        /// Date range preset: today, week, month, year, all
        #[arg(long)]
        range: Option<String>,
    },

    /// Patch fields on an existing task
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        progress: Option<u8>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long = "sub-status")]
        sub_status: Option<String>,
    },

    /// Delete a task
    Remove { id: String },

    /// Reorder a task within the collection
    Move { id: String, to_index: usize },

    /// Show the board grouped by sub-status
    Board,

    /// Aggregate counts plus sync freshness
    Stats,

    /// Run one sync tick against the snapshot source
    Sync,

    /// Invoice totals for the sample line items
    Invoice {
        #[arg(long = "discount-percent")]
        discount_percent: Option<f64>,
        #[arg(long = "discount-fixed")]
        discount_fixed: Option<f64>,
        #[arg(long, default_value_t = 18.0)]
        tax: f64,
    },
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Command, GlobalCli, KeyVal};

    #[test]
    fn key_val_requires_an_equals_sign() {
        assert!("sync.realtime=off".parse::<KeyVal>().is_ok());
        assert!("sync.realtime".parse::<KeyVal>().is_err());
    }

    #[test]
    fn list_flags_parse() {
        let cli = GlobalCli::parse_from([
            "trellis",
            "list",
            "--client",
            "Acme Media",
            "--overdue",
            "--range",
            "week",
        ]);
        match cli.command {
            Command::List {
                client,
                overdue,
                range,
                ..
            } => {
                assert_eq!(client.as_deref(), Some("Acme Media"));
                assert!(overdue);
                assert_eq!(range.as_deref(), Some("week"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn overrides_accumulate() {
        let cli = GlobalCli::parse_from([
            "trellis",
            "-c",
            "color=off",
            "-c",
            "sync.interval_secs=5",
            "stats",
        ]);
        assert_eq!(cli.overrides.len(), 2);
        assert_eq!(cli.overrides[1].value, "5");
    }
}
