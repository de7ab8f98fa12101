//! Kafka-backed terminal sink for `audittrail`.
//! Bring your own `rdkafka::producer::FutureProducer`; entries are sent as
//! JSON payloads, keyed by module so a given module's entries land on a
//! single partition and preserve order.
//!
//! Gated behind the `client` feature so crates that don't need Kafka
//! aren't forced to build `rdkafka`.

#[cfg(feature = "client")]
mod sink {
    use async_trait::async_trait;
    use audittrail::{ClosedSignal, Context, Entry, Sink, SinkError};
    use rdkafka::producer::{FutureProducer, FutureRecord};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::watch;

    pub struct StreamSink {
        topic: String,
        producer: FutureProducer,
        closed: AtomicBool,
        closed_tx: watch::Sender<bool>,
        closed_rx: watch::Receiver<bool>,
    }

    impl StreamSink {
        /// Create a sink with an existing Kafka producer and target topic.
        pub fn new(producer: FutureProducer, topic: impl Into<String>) -> Result<Self, String> {
            let topic = topic.into();
            if topic.is_empty() {
                return Err("topic name cannot be empty".to_string());
            }
            let (closed_tx, closed_rx) = watch::channel(false);
            Ok(Self { topic, producer, closed: AtomicBool::new(false), closed_tx, closed_rx })
        }
    }

    #[async_trait]
    impl Sink for StreamSink {
        async fn log(&self, _ctx: &Context, entry: Entry) -> Result<(), SinkError> {
            if self.closed.load(Ordering::Acquire) {
                return Err(SinkError::Closed);
            }

            let key = entry.module.clone();
            let payload = serde_json::to_vec(&entry)
                .map_err(|e| SinkError::Dispatch(format!("failed to encode entry: {}", e)))?;

            let record = FutureRecord::to(&self.topic).payload(&payload).key(&key);
            self.producer.send(record, Duration::from_secs(5)).await.map_err(|(e, _)| {
                tracing::error!(topic = %self.topic, error = %e, "failed to publish audit entry to kafka");
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
}

#[cfg(feature = "client")]
pub use sink::StreamSink;
