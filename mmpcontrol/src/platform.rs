//! Trait seams for the host-platform collaborators.
//!
//! The core never reimplements these services; it only consumes them:
//! template evaluation, raw topic subscription, action execution, and the
//! platform's state-refresh sink. Tests and the demo provide in-memory
//! implementations.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::model::{ActionBinding, CallerContext};

/// Stream of evaluated template results.
pub type ValueStream = BoxStream<'static, Value>;

/// Stream of raw, opaque topic payloads.
pub type PayloadStream = BoxStream<'static, Vec<u8>>;

/// Named parameters handed to an action execution. Recognized names are
/// exactly `volume` (0-100 numeric) and `source` (string).
pub type ActionParams = serde_json::Map<String, Value>;

/// Host template evaluator.
///
/// Delivery is at-least-once and in-order per expression; no ordering is
/// guaranteed across different expressions.
pub trait TemplateEngine: Send + Sync {
    fn track(&self, expression: &str) -> ValueStream;
}

/// Raw pub/sub transport. Payloads are opaque; the reconciler parses them
/// itself (base64 for album art, UTF-8 tokens otherwise).
pub trait TopicBroker: Send + Sync {
    fn subscribe(&self, topic: &str) -> PayloadStream;
}

/// Executes a named external action sequence.
///
/// Timeouts and retries are the executor's own concern; the router awaits a
/// single completion and propagates failure as-is.
#[async_trait]
pub trait ActionRunner: Send + Sync {
    async fn run(
        &self,
        binding: &ActionBinding,
        params: ActionParams,
        caller: &CallerContext,
    ) -> anyhow::Result<()>;
}

/// Asks the platform to re-read and publish entity state.
///
/// Must not block the caller. With `forced`, the platform republishes even if
/// its own change detection believes nothing changed.
pub trait RefreshSink: Send + Sync {
    fn request_refresh(&self, forced: bool);
}
