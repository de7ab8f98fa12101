//! Attaches HTTP request details from [`Context`] onto each logged entry.

use crate::entry::Entry;
use crate::error::SinkError;
use crate::sink::{ClosedSignal, Context, Sink};
use async_trait::async_trait;
use std::sync::Arc;

/// Wraps a [`Sink`], merging `ctx.http` into the entry's `details["http"]`
/// field before forwarding. A no-op when `ctx.http` is `None`, mirroring
/// the original decorator's zero-value check.
pub struct HttpDecorator {
    inner: Arc<dyn Sink>,
}

impl HttpDecorator {
    pub fn new(inner: Arc<dyn Sink>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Sink for HttpDecorator {
    async fn log(&self, ctx: &Context, mut entry: Entry) -> Result<(), SinkError> {
        if let Some(http) = &ctx.http {
            let value = serde_json::to_value(http)
                .map_err(|e| SinkError::Dispatch(format!("failed to encode http details: {}", e)))?;
            entry.set_detail_if_absent("http", value);
        }
        self.inner.log(ctx, entry).await
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.inner.close().await
    }

    fn closed_signal(&self) -> ClosedSignal {
        self.inner.closed_signal()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
