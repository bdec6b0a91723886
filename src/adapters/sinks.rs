//! Trade sinks
//!
//! - `DryRunSink`: logs the intent and returns a fabricated tx hash
//! - `ChannelSink`: hands the intent to a downstream executor over mpsc
//! - `JournalSink`: appends the intent as one JSON line to a file

use async_trait::async_trait;
use rand::RngCore;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::domain::{SinkReceipt, TradeIntent};
use crate::error::SinkError;
use crate::poller::TradeSink;

/// Accepts everything, executes nothing
#[derive(Debug, Default)]
pub struct DryRunSink {
    submitted: AtomicU64,
}

impl DryRunSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }
}

fn fabricated_tx_hash() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("0x{}", hex::encode(bytes))
}

#[async_trait]
impl TradeSink for DryRunSink {
    async fn submit(&self, intent: &TradeIntent) -> Result<SinkReceipt, SinkError> {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let reference = fabricated_tx_hash();
        info!(
            instrument = %intent.instrument,
            side = %intent.side,
            size = %intent.size,
            metric = %intent.metric,
            tx_hash = %reference,
            "[DRY RUN] would submit trade"
        );
        Ok(SinkReceipt {
            reference,
            simulated: true,
        })
    }
}

/// Forwards intents to whoever holds the receiver
pub struct ChannelSink {
    tx: mpsc::Sender<TradeIntent>,
}

impl ChannelSink {
    /// Returns the sink and the executor side of the channel
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<TradeIntent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl TradeSink for ChannelSink {
    async fn submit(&self, intent: &TradeIntent) -> Result<SinkReceipt, SinkError> {
        // Never wait on a slow executor; a full queue is a failed submission
        self.tx.try_send(intent.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                SinkError::Unavailable("executor queue full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })?;

        debug!(instrument = %intent.instrument, intent_id = %intent.intent_id, "intent queued for executor");
        Ok(SinkReceipt {
            reference: intent.intent_id.to_string(),
            simulated: false,
        })
    }
}

/// Append-only JSON Lines journal of fired intents
pub struct JournalSink {
    path: PathBuf,
    // Serializes appends so lines never interleave
    write_lock: Mutex<()>,
}

impl JournalSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TradeSink for JournalSink {
    async fn submit(&self, intent: &TradeIntent) -> Result<SinkReceipt, SinkError> {
        let mut line = serde_json::to_string(intent)
            .map_err(|e| SinkError::Rejected(format!("unserializable intent: {}", e)))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| SinkError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| SinkError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        file.flush()
            .await
            .map_err(|e| SinkError::Unavailable(format!("{}: {}", self.path.display(), e)))?;

        Ok(SinkReceipt {
            reference: intent.intent_id.to_string(),
            simulated: true,
        })
    }
}
