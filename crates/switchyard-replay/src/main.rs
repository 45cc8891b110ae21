//! # Switchyard replay
//!
//! Replays newline-delimited JSON events through a router with the stock
//! chat handlers, then prints the resulting state tree.
//!
//! ## Usage
//!
//! ```bash
//! # Replay a log file
//! switchyard events.ndjson
//!
//! # Replay from stdin with a custom config
//! cat events.ndjson | switchyard --config /path/to/switchyard.toml
//!
//! # Force diagnostics on
//! SWITCHYARD_DIAGNOSTICS=1 switchyard events.ndjson
//! ```

mod chat;
mod config;
mod replay;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::PathBuf;
use switchyard_core::Switchyard;
use tokio::io::{AsyncBufRead, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments.
#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    config: Option<PathBuf>,
    input: Option<PathBuf>,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = args.next().context("--config requires a path")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "-" => parsed.input = None,
                flag if flag.starts_with('-') => bail!("Unknown argument: {flag}"),
                path => {
                    if parsed.input.is_some() {
                        bail!("Only one input file may be given");
                    }
                    parsed.input = Some(PathBuf::from(path));
                }
            }
        }

        Ok(parsed)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "switchyard=info,switchyard_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse(std::env::args().skip(1))?;

    // Load configuration
    let config = match &args.config {
        Some(path) => config::Config::from_file(path)?,
        None => config::Config::load()?,
    };

    switchyard_core::metrics::describe();

    let yard = Switchyard::with_config(config.router.clone());
    chat::install(&yard)?;
    let mut outbound = yard.router().send_channel();

    let input: Box<dyn AsyncBufRead + Unpin> = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let show_outbound = config.output.show_outbound;
    let summary = replay::replay(&yard, input, &mut outbound, |args| {
        if show_outbound {
            println!("-> {}", Value::Array(args));
        }
    })
    .await?;

    tracing::info!(
        routed = summary.routed,
        rejected = summary.rejected,
        unparsable = summary.unparsable,
        "Replay finished"
    );

    let state = Value::Object(yard.router().state());
    if config.output.pretty {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        println!("{state}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_no_args() {
        assert_eq!(parse(&[]).unwrap(), Args::default());
    }

    #[test]
    fn test_parse_config_and_input() {
        let args = parse(&["--config", "yard.toml", "events.ndjson"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("yard.toml")));
        assert_eq!(args.input, Some(PathBuf::from("events.ndjson")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
        assert!(parse(&["a.ndjson", "b.ndjson"]).is_err());
    }
}
