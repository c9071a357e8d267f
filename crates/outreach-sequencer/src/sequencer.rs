// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The campaign sequencer.
//!
//! One tick reads a snapshot of due enrollments and handles each one
//! independently:
//!
//! 1. claim the row at the step that was read (lost claim: skip);
//! 2. look up the template for the next step and the one after it;
//! 3. dispatch the touch;
//! 4. advance with a compare-and-set on the same step.
//!
//! A failure in steps 2-4 releases the claim and counts an attempt, leaving
//! the step and due time untouched for the next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use outreach_config::model::SequencerConfig;
use outreach_core::types::{
    latest_timestamp, Enrollment, EnrollmentKey, ReleaseOutcome, StepUpdate,
};
use outreach_core::{EnrollmentStore, OutreachError, TemplateCatalog, TouchDispatcher};

/// Shortest gap between an advance and the next touch.
const MIN_TOUCH_GAP_SECS: i64 = 1;

/// What happened to one enrollment during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Touch dispatched; more steps follow.
    Advanced { step: u32 },
    /// The sequence ended. `dispatched` is false when no template existed
    /// for the next step.
    Completed { step: u32, dispatched: bool },
    /// Another sequencer claimed or advanced the row first.
    Stale,
    /// The attempt failed and will be retried on a later tick.
    Retrying { attempts: u32 },
    /// The attempt failed and the retry cap was reached.
    Failed { attempts: u32 },
}

/// Tally of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// True when another tick was still running and this one did nothing.
    pub skipped: bool,
    pub due: usize,
    pub advanced: usize,
    pub completed: usize,
    pub stale: usize,
    pub retrying: usize,
    pub failed: usize,
}

impl TickReport {
    fn record(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Advanced { .. } => self.advanced += 1,
            StepOutcome::Completed { .. } => self.completed += 1,
            StepOutcome::Stale => self.stale += 1,
            StepOutcome::Retrying { .. } => self.retrying += 1,
            StepOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Shape of a campaign's template sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceReport {
    pub campaign_id: String,
    pub template_count: usize,
    /// Sequence orders missing between 1 and the highest defined order.
    pub gaps: Vec<u32>,
}

impl SequenceReport {
    /// A sequence is runnable end to end when it has no gaps.
    pub fn is_contiguous(&self) -> bool {
        self.gaps.is_empty()
    }
}

/// `at + delay`, saturating at the latest time storage can hold.
fn offset(at: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    let latest = latest_timestamp();
    at.checked_add_signed(delay)
        .map_or(latest, |due| due.min(latest))
}

/// Clears the running flag when a tick ends, including on early return.
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Advances enrollments through their campaign's touch sequence.
pub struct CampaignSequencer {
    store: Arc<dyn EnrollmentStore>,
    catalog: Arc<dyn TemplateCatalog>,
    dispatcher: Arc<dyn TouchDispatcher>,
    claim_timeout: Duration,
    max_attempts: u32,
    running: AtomicBool,
}

impl CampaignSequencer {
    pub fn new(
        config: &SequencerConfig,
        store: Arc<dyn EnrollmentStore>,
        catalog: Arc<dyn TemplateCatalog>,
        dispatcher: Arc<dyn TouchDispatcher>,
    ) -> Self {
        let claim_timeout_secs = i64::try_from(config.claim_timeout_secs).unwrap_or(i64::MAX);
        Self {
            store,
            catalog,
            dispatcher,
            claim_timeout: Duration::try_seconds(claim_timeout_secs)
                .unwrap_or(Duration::MAX),
            max_attempts: config.max_attempts,
            running: AtomicBool::new(false),
        }
    }

    /// Run one poll cycle at `now`.
    ///
    /// Returns a skipped report if a tick is already running on this
    /// sequencer. Per-enrollment failures are logged and counted; only a
    /// failure to read the due set fails the tick.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, OutreachError> {
        if self.running.swap(true, Ordering::AcqRel) {
            debug!("previous tick still running, skipping");
            return Ok(TickReport {
                skipped: true,
                ..TickReport::default()
            });
        }
        let _guard = TickGuard(&self.running);

        let due = self.store.due_enrollments(now).await?;
        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };

        for enrollment in due {
            let outcome = self.process(&enrollment, now).await;
            report.record(outcome);
        }

        if report.due > 0 {
            info!(
                due = report.due,
                advanced = report.advanced,
                completed = report.completed,
                stale = report.stale,
                retrying = report.retrying,
                failed = report.failed,
                "sequencer tick finished"
            );
        }
        Ok(report)
    }

    /// Claim, dispatch, and advance one enrollment.
    pub async fn process(&self, enrollment: &Enrollment, now: DateTime<Utc>) -> StepOutcome {
        let key = enrollment.key();
        let step = enrollment.current_step;

        let lease_until = offset(now, self.claim_timeout);
        let claimed = match self.store.claim(&key, step, now, lease_until).await {
            Ok(claimed) => claimed,
            Err(e) => {
                // Nothing was written, so there is no claim to release.
                warn!(enrollment = %key, error = %e, "failed to claim enrollment");
                return StepOutcome::Retrying {
                    attempts: enrollment.attempts,
                };
            }
        };
        if !claimed {
            debug!(enrollment = %key, step, "enrollment claimed elsewhere, skipping");
            return StepOutcome::Stale;
        }

        match self.attempt(enrollment, now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(enrollment = %key, step, error = %e, "touch attempt failed");
                self.release(&key, step).await
            }
        }
    }

    async fn attempt(
        &self,
        enrollment: &Enrollment,
        now: DateTime<Utc>,
    ) -> Result<StepOutcome, OutreachError> {
        let key = enrollment.key();
        let step = enrollment.current_step;
        let next_step = step + 1;

        let Some(template) = self
            .catalog
            .get_template(&enrollment.campaign_id, next_step)
            .await?
        else {
            // Nothing left to send: finish without moving the step.
            let outcome = if self.commit(&key, step, StepUpdate::completed(step)).await? {
                StepOutcome::Completed {
                    step,
                    dispatched: false,
                }
            } else {
                StepOutcome::Stale
            };
            return Ok(outcome);
        };

        let following = self
            .catalog
            .get_template(&enrollment.campaign_id, next_step + 1)
            .await?;

        let receipt = self.dispatcher.dispatch(enrollment, &template).await?;
        debug!(
            enrollment = %key,
            step = next_step,
            channel = %template.channel,
            provider_id = receipt.provider_id.as_deref().unwrap_or("-"),
            "touch dispatched"
        );

        let (update, outcome) = match following {
            Some(following) => {
                let gap = following.delay().max(Duration::seconds(MIN_TOUCH_GAP_SECS));
                let next_at = offset(now, gap);
                (
                    StepUpdate::scheduled(next_step, next_at),
                    StepOutcome::Advanced { step: next_step },
                )
            }
            None => (
                StepUpdate::completed(next_step),
                StepOutcome::Completed {
                    step: next_step,
                    dispatched: true,
                },
            ),
        };

        if !self.commit(&key, step, update).await? {
            warn!(enrollment = %key, step, "enrollment moved during dispatch");
            return Ok(StepOutcome::Stale);
        }
        Ok(outcome)
    }

    async fn commit(
        &self,
        key: &EnrollmentKey,
        expected_step: u32,
        update: StepUpdate,
    ) -> Result<bool, OutreachError> {
        let advanced = self.store.advance(key, expected_step, &update).await?;
        if advanced && update.status().is_terminal() {
            info!(enrollment = %key, step = update.current_step(), "enrollment completed");
        }
        Ok(advanced)
    }

    async fn release(&self, key: &EnrollmentKey, step: u32) -> StepOutcome {
        match self.store.release(key, step, self.max_attempts).await {
            Ok(ReleaseOutcome::Retry { attempts }) => StepOutcome::Retrying { attempts },
            Ok(ReleaseOutcome::Failed { attempts }) => {
                warn!(enrollment = %key, step, attempts, "retry limit reached, enrollment failed");
                StepOutcome::Failed { attempts }
            }
            Ok(ReleaseOutcome::Stale) => StepOutcome::Stale,
            Err(e) => {
                // The claim lapses on its own after the claim timeout.
                warn!(enrollment = %key, error = %e, "failed to release claim");
                StepOutcome::Retrying { attempts: 0 }
            }
        }
    }

    /// Enroll a lead in a campaign at step 0, first due after template 1's delay.
    pub async fn enroll(
        &self,
        lead_id: &str,
        campaign_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Enrollment, OutreachError> {
        let first = self
            .catalog
            .get_template(campaign_id, 1)
            .await?
            .ok_or_else(|| OutreachError::NotFound {
                entity: "touch template",
                id: format!("{campaign_id}#1"),
            })?;

        let enrollment = Enrollment::new(lead_id, campaign_id, offset(now, first.delay()), now);
        self.store.create_enrollment(&enrollment).await?;
        info!(
            lead_id,
            campaign_id,
            next_touch_at = ?enrollment.next_touch_at,
            "lead enrolled"
        );
        Ok(enrollment)
    }

    /// Report gaps in a campaign's sequence orders.
    ///
    /// Gaps do not stop the sequencer; an enrollment simply completes when it
    /// reaches one.
    pub async fn validate_sequence(
        &self,
        campaign_id: &str,
    ) -> Result<SequenceReport, OutreachError> {
        let templates = self.catalog.list_templates(campaign_id).await?;
        let mut orders: Vec<u32> = templates.iter().map(|t| t.sequence_order).collect();
        orders.sort_unstable();
        orders.dedup();

        let highest = orders.last().copied().unwrap_or(0);
        let gaps = (1..=highest)
            .filter(|order| orders.binary_search(order).is_err())
            .collect::<Vec<_>>();

        if !gaps.is_empty() {
            warn!(campaign_id, ?gaps, "campaign sequence has gaps");
        }
        Ok(SequenceReport {
            campaign_id: campaign_id.to_string(),
            template_count: templates.len(),
            gaps,
        })
    }
}

impl std::fmt::Debug for CampaignSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampaignSequencer")
            .field("claim_timeout", &self.claim_timeout)
            .field("max_attempts", &self.max_attempts)
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}
