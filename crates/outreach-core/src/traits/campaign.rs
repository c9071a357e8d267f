// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Traits consumed by the campaign sequencer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::OutreachError;
use crate::types::{
    DispatchReceipt, Enrollment, EnrollmentKey, ReleaseOutcome, StepUpdate, TouchTemplate,
};

/// Durable table of (lead, campaign) enrollments.
///
/// Every mutating call is conditioned on the step the caller read, so two
/// sequencer instances racing on one row cannot both advance it.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Inserts a new enrollment. Fails with [`OutreachError::Conflict`] if the
    /// (lead, campaign) key already exists.
    async fn create_enrollment(&self, enrollment: &Enrollment) -> Result<(), OutreachError>;

    /// Fetches one enrollment by key.
    async fn get_enrollment(&self, key: &EnrollmentKey)
    -> Result<Option<Enrollment>, OutreachError>;

    /// Returns every in-progress enrollment whose next touch is at or before
    /// `now` and whose claim (if any) has expired.
    async fn due_enrollments(&self, now: DateTime<Utc>) -> Result<Vec<Enrollment>, OutreachError>;

    /// Takes a lease on the enrollment until `until`.
    ///
    /// Succeeds only if the row is still in progress at `expected_step` and
    /// holds no unexpired claim at `now`. Returns `false` on a stale read.
    async fn claim(
        &self,
        key: &EnrollmentKey,
        expected_step: u32,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<bool, OutreachError>;

    /// Applies a step advance if the row is still at `expected_step`.
    ///
    /// Clears the claim and resets the attempt counter. Returns `false` when
    /// the row has moved on.
    async fn advance(
        &self,
        key: &EnrollmentKey,
        expected_step: u32,
        update: &StepUpdate,
    ) -> Result<bool, OutreachError>;

    /// Releases a claim after a failed attempt, leaving step and due time alone.
    ///
    /// Increments the attempt counter; once it reaches `max_attempts`
    /// (0 = unlimited) the enrollment is marked failed.
    async fn release(
        &self,
        key: &EnrollmentKey,
        expected_step: u32,
        max_attempts: u32,
    ) -> Result<ReleaseOutcome, OutreachError>;
}

/// Ordered per-campaign touch definitions.
#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    /// Looks up the template at `sequence_order` (1-based) for a campaign.
    async fn get_template(
        &self,
        campaign_id: &str,
        sequence_order: u32,
    ) -> Result<Option<TouchTemplate>, OutreachError>;

    /// All templates of a campaign ordered by `sequence_order`.
    async fn list_templates(&self, campaign_id: &str) -> Result<Vec<TouchTemplate>, OutreachError>;
}

/// Hands a touch to the channel sender (email provider, SMS gateway, ...).
#[async_trait]
pub trait TouchDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        enrollment: &Enrollment,
        template: &TouchTemplate,
    ) -> Result<DispatchReceipt, OutreachError>;
}
