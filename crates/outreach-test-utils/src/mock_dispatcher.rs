// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock touch dispatcher that records every touch it is handed.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use outreach_core::types::{Channel, DispatchReceipt, Enrollment, TouchTemplate};
use outreach_core::{OutreachError, TouchDispatcher};

/// One recorded dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    pub lead_id: String,
    pub campaign_id: String,
    pub step: u32,
    pub channel: Channel,
}

/// A dispatcher that records touches and can be told to fail.
#[derive(Default)]
pub struct MockDispatcher {
    dispatched: Arc<Mutex<Vec<DispatchRecord>>>,
    failures_remaining: AtomicU32,
    always_fail: AtomicBool,
    delay: Option<Duration>,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every dispatch, to widen race windows.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Fail the next `count` dispatches.
    pub fn fail_next(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    pub fn fail_always(&self, fail: bool) {
        self.always_fail.store(fail, Ordering::SeqCst);
    }

    pub async fn dispatched(&self) -> Vec<DispatchRecord> {
        self.dispatched.lock().await.clone()
    }

    pub async fn dispatch_count(&self) -> usize {
        self.dispatched.lock().await.len()
    }

    fn should_fail(&self) -> bool {
        if self.always_fail.load(Ordering::SeqCst) {
            return true;
        }
        self.failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl TouchDispatcher for MockDispatcher {
    async fn dispatch(
        &self,
        enrollment: &Enrollment,
        template: &TouchTemplate,
    ) -> Result<DispatchReceipt, OutreachError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail() {
            return Err(OutreachError::Dispatch {
                message: format!("mock dispatch failure for {}", enrollment.key()),
                source: None,
            });
        }
        let mut dispatched = self.dispatched.lock().await;
        dispatched.push(DispatchRecord {
            lead_id: enrollment.lead_id.clone(),
            campaign_id: enrollment.campaign_id.clone(),
            step: template.sequence_order,
            channel: template.channel,
        });
        Ok(DispatchReceipt {
            provider_id: Some(format!("mock-{}", dispatched.len())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_next_counts_down() {
        let dispatcher = MockDispatcher::new();
        dispatcher.fail_next(2);
        assert!(dispatcher.should_fail());
        assert!(dispatcher.should_fail());
        assert!(!dispatcher.should_fail());
    }
}
