//! Elasticsearch-backed terminal sink for `audittrail`.
//! Bring your own `elasticsearch::Elasticsearch` client; entries are
//! indexed as JSON, using the entry's own id as the document ID so
//! retries never produce duplicate documents.

use async_trait::async_trait;
use audittrail::{ClosedSignal, Context, Entry, Sink, SinkError};
use elasticsearch::IndexParts;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

pub struct IndexSink {
    index: String,
    client: elasticsearch::Elasticsearch,
    closed: AtomicBool,
    closed_tx: watch::Sender<bool>,
    closed_rx: watch::Receiver<bool>,
}

impl IndexSink {
    /// Create a sink with an existing Elasticsearch client and target index.
    pub fn new(client: elasticsearch::Elasticsearch, index: impl Into<String>) -> Result<Self, String> {
        let index = index.into();
        if index.is_empty() {
            return Err("index name cannot be empty".to_string());
        }
        let (closed_tx, closed_rx) = watch::channel(false);
        Ok(Self { index, client, closed: AtomicBool::new(false), closed_tx, closed_rx })
    }
}

#[async_trait]
impl Sink for IndexSink {
    async fn log(&self, _ctx: &Context, entry: Entry) -> Result<(), SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }

        let doc_id = entry.idempotency_id.to_string();
        let body = serde_json::to_value(&entry)
            .map_err(|e| SinkError::Dispatch(format!("failed to encode entry: {}", e)))?;

        self.client
            .index(IndexParts::IndexId(&self.index, &doc_id))
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(index = %self.index, error = %e, "failed to index audit entry");
                SinkError::Dispatch(e.to_string())
            })?;

        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.closed_tx.send(true);
        }
        Ok(())
    }

    fn closed_signal(&self) -> ClosedSignal {
        ClosedSignal::new(self.closed_rx.clone())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
