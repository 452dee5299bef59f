//! Live relay of one run's raw feed to a client channel.

pub mod translator;

pub use translator::StreamEventTranslator;

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time;

use crate::engine::RawEventStream;
use crate::error::ConductorError;
use crate::types::StreamEvent;

/// How a translated run ended.
#[derive(Debug)]
pub enum TurnStatus {
    Completed,
    /// The raw feed yielded an error or went idle.
    Failed(ConductorError),
    /// The client dropped its receiver.
    Disconnected,
}

/// Result of relaying one run.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Assistant text accumulated from deltas.
    pub output: String,
    /// Agent holding control when the feed ended.
    pub last_agent: String,
    pub status: TurnStatus,
}

impl TurnOutcome {
    pub fn produced_output(&self) -> bool {
        !self.output.is_empty()
    }
}

/// Drive `raw` through `translator`, forwarding events to `tx` in arrival
/// order.
///
/// Terminal events (`Done`/`Error`) are left to the caller so persistence
/// can happen first. The loop ends when the feed ends, fails, stays silent
/// for `idle_timeout_ms` (0 disables), or the receiver is dropped. Dropping
/// `raw` is the only signal the engine gets; the run itself is not
/// cancelled.
pub async fn translate_run(
    mut translator: StreamEventTranslator,
    mut raw: RawEventStream,
    tx: &mpsc::Sender<StreamEvent>,
    idle_timeout_ms: u64,
) -> TurnOutcome {
    let idle = (idle_timeout_ms > 0).then(|| Duration::from_millis(idle_timeout_ms));
    let mut forwarded = 0usize;

    let status = loop {
        tokio::select! {
            biased;
            _ = tx.closed() => break TurnStatus::Disconnected,
            next = raw.next() => {
                let Some(next) = next else { break TurnStatus::Completed; };
                match next {
                    Ok(event) => {
                        let Some(event) = translator.translate(event) else { continue; };
                        if tx.send(event).await.is_err() {
                            break TurnStatus::Disconnected;
                        }
                        forwarded += 1;
                    }
                    Err(err) => break TurnStatus::Failed(err),
                }
            }
            _ = idle_wait(idle) => break TurnStatus::Failed(ConductorError::Timeout(idle_timeout_ms)),
        }
    };

    let (output, last_agent) = translator.finish();
    tracing::debug!(
        forwarded,
        output_len = output.len(),
        agent = %last_agent,
        status = ?status,
        "raw feed finished"
    );
    TurnOutcome {
        output,
        last_agent,
        status,
    }
}

async fn idle_wait(idle: Option<Duration>) {
    match idle {
        Some(duration) => time::sleep(duration).await,
        None => std::future::pending().await,
    }
}
