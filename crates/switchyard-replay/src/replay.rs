//! NDJSON replay.
//!
//! Reads one event per line, feeds each to the router and collects what the
//! handlers send back out.

use anyhow::{Context, Result};
use serde_json::Value;
use switchyard_core::{Event, Switchyard};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Totals for one replay run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Lines that parsed and were routed.
    pub routed: usize,
    /// Lines that parsed but the router rejected.
    pub rejected: usize,
    /// Lines that did not parse as an event.
    pub unparsable: usize,
}

/// Feed every line of `input` to the router.
///
/// `on_outbound` is called with each outbound message, in order, as soon as
/// the event that produced it has been dispatched.
///
/// # Errors
///
/// Returns an error only if reading the input fails.
pub async fn replay<R, F>(
    yard: &Switchyard,
    input: R,
    outbound: &mut mpsc::UnboundedReceiver<Vec<Value>>,
    mut on_outbound: F,
) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(Vec<Value>),
{
    let mut summary = ReplaySummary::default();
    let mut lines = input.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines
        .next_line()
        .await
        .with_context(|| format!("Failed to read input after line {line_no}"))?
    {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: Event = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, "Skipping unparsable event: {}", e);
                summary.unparsable += 1;
                continue;
            }
        };

        match yard.router().receive(event) {
            Ok(()) => summary.routed += 1,
            Err(e) => {
                debug!(line = line_no, "Event rejected: {}", e);
                summary.rejected += 1;
            }
        }

        while let Ok(args) = outbound.try_recv() {
            on_outbound(args);
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat;
    use serde_json::json;
    use switchyard_core::RouterConfig;

    #[tokio::test]
    async fn test_replay_log() {
        let yard = Switchyard::with_config(RouterConfig { diagnostics: false });
        chat::install(&yard).unwrap();
        let mut outbound = yard.router().send_channel();

        let input = concat!(
            r#"{"event":"nick","network":"libera","nick":"ferris"}"#, "\n",
            "\n",
            r##"{"event":"join","network":"libera","name":"#rust","user":"ferris"}"##, "\n",
            "not json\n",
            r#"{"event":"ping","network":"libera","server":"irc"}"#, "\n",
            r#"{"event":"unknown","network":"libera"}"#, "\n",
            r#"{"network":"libera"}"#, "\n",
        );

        let mut sent = Vec::new();
        let summary = replay(&yard, input.as_bytes(), &mut outbound, |args| sent.push(args))
            .await
            .unwrap();

        assert_eq!(
            summary,
            ReplaySummary {
                routed: 3,
                rejected: 2,
                unparsable: 1,
            }
        );
        assert_eq!(sent, vec![vec![json!("PONG"), json!("irc")]]);
        assert_eq!(
            Value::Object(yard.router().state()),
            json!({
                "libera": {
                    "nick": "ferris",
                    "_$#rust": { "join": ["ferris"] }
                }
            })
        );
    }
}
