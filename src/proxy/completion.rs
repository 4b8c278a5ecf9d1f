use std::sync::Arc;

use tracing::trace;

use crate::analytics::{AnalyticsEvent, AnalyticsQueue, BandwidthDelta};
use crate::storage::RoutingTarget;

/// Fires the analytics events of one forwarded request when dropped.
///
/// Dropping happens when the streamed body ends, when the client goes away
/// mid-stream, or immediately when the upstream could not be reached. The
/// access record and the daily hit are submitted in every case; bandwidth
/// only when bytes reached the client and the target has an owner.
pub struct CompletionGuard {
    queue: Arc<AnalyticsQueue>,
    target: RoutingTarget,
    client_ip: String,
    user_agent: String,
    bytes: u64,
}

impl CompletionGuard {
    pub fn new(
        queue: Arc<AnalyticsQueue>,
        target: RoutingTarget,
        client_ip: String,
        user_agent: String,
    ) -> Self {
        Self {
            queue,
            target,
            client_ip,
            user_agent,
            bytes: 0,
        }
    }

    pub fn add_bytes(&mut self, n: u64) {
        self.bytes += n;
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        trace!(
            "Request to routing target {} finished, {} bytes",
            self.target.id, self.bytes
        );

        self.queue.submit(AnalyticsEvent::Access {
            routing_target_id: self.target.id,
            client_ip: std::mem::take(&mut self.client_ip),
            user_agent: std::mem::take(&mut self.user_agent),
        });
        self.queue.submit(AnalyticsEvent::daily_hit());

        if self.bytes > 0 && self.target.owner_user_id != 0 {
            let bytes = i64::try_from(self.bytes).unwrap_or(i64::MAX);
            self.queue.submit(AnalyticsEvent::bandwidth(BandwidthDelta::download(
                self.target.owner_user_id,
                bytes,
            )));
        }
    }
}
