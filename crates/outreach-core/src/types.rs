// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the sequencer, the chat engine, and storage.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Timestamp format used for every persisted timestamp.
///
/// Fixed width with a `Z` suffix so that lexicographic order equals time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// 9999-12-31T23:59:59.999Z, the last instant with a four digit year.
const LATEST_TIMESTAMP_MILLIS: i64 = 253_402_300_799_999;

/// Latest instant the persisted format can represent.
pub fn latest_timestamp() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(LATEST_TIMESTAMP_MILLIS)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Render a timestamp in the persisted format.
///
/// Instants past [`latest_timestamp`] are written as that instant, so stored
/// values always sort and parse.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    (*ts).min(latest_timestamp()).format(TIMESTAMP_FORMAT).to_string()
}

/// The current time truncated to the persisted millisecond precision.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Parse a timestamp written by [`format_timestamp`] (or any RFC 3339 string).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Communication channel a lead is reached through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Chat,
}

// --- Campaign sequencing ---

/// Lifecycle status of an enrollment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    InProgress,
    Completed,
    Failed,
}

impl EnrollmentStatus {
    /// Completed and failed enrollments never become due again.
    pub fn is_terminal(self) -> bool {
        matches!(self, EnrollmentStatus::Completed | EnrollmentStatus::Failed)
    }
}

/// Unique key of an enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrollmentKey {
    pub lead_id: String,
    pub campaign_id: String,
}

impl EnrollmentKey {
    pub fn new(lead_id: impl Into<String>, campaign_id: impl Into<String>) -> Self {
        Self {
            lead_id: lead_id.into(),
            campaign_id: campaign_id.into(),
        }
    }
}

impl std::fmt::Display for EnrollmentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.lead_id, self.campaign_id)
    }
}

/// One lead's progress through one campaign's touch sequence.
///
/// `next_touch_at` is `None` exactly when `status` is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub lead_id: String,
    pub campaign_id: String,
    /// Number of touches already sent. Only ever increases.
    pub current_step: u32,
    pub status: EnrollmentStatus,
    pub next_touch_at: Option<DateTime<Utc>>,
    /// Consecutive failed attempts at the current step.
    pub attempts: u32,
    /// Lease held by a sequencer instance that is dispatching the next step.
    pub claimed_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    /// A fresh enrollment at step 0, first due at `first_touch_at`.
    pub fn new(
        lead_id: impl Into<String>,
        campaign_id: impl Into<String>,
        first_touch_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            lead_id: lead_id.into(),
            campaign_id: campaign_id.into(),
            current_step: 0,
            status: EnrollmentStatus::InProgress,
            next_touch_at: Some(first_touch_at),
            attempts: 0,
            claimed_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> EnrollmentKey {
        EnrollmentKey::new(self.lead_id.clone(), self.campaign_id.clone())
    }

    /// Whether a tick at `now` should pick this enrollment up.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == EnrollmentStatus::InProgress
            && self.next_touch_at.is_some_and(|at| at <= now)
            && self.claimed_until.is_none_or(|until| until <= now)
    }
}

/// The values a step advance writes back to an enrollment.
///
/// Constructed only through [`StepUpdate::scheduled`] and
/// [`StepUpdate::completed`] so the terminal/next-touch invariant holds.
#[derive(Debug, Clone, PartialEq)]
pub struct StepUpdate {
    current_step: u32,
    status: EnrollmentStatus,
    next_touch_at: Option<DateTime<Utc>>,
}

impl StepUpdate {
    /// More touches follow; the next one is due at `next_touch_at`.
    pub fn scheduled(current_step: u32, next_touch_at: DateTime<Utc>) -> Self {
        Self {
            current_step,
            status: EnrollmentStatus::InProgress,
            next_touch_at: Some(next_touch_at),
        }
    }

    /// No template follows `current_step`.
    pub fn completed(current_step: u32) -> Self {
        Self {
            current_step,
            status: EnrollmentStatus::Completed,
            next_touch_at: None,
        }
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    pub fn status(&self) -> EnrollmentStatus {
        self.status
    }

    pub fn next_touch_at(&self) -> Option<DateTime<Utc>> {
        self.next_touch_at
    }
}

/// Result of releasing a claim after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The enrollment stays due and will be retried on the next tick.
    Retry { attempts: u32 },
    /// The attempt cap was reached; the enrollment is now `failed`.
    Failed { attempts: u32 },
    /// The row moved on since it was read; nothing was changed.
    Stale,
}

/// A single step of a campaign's touch sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchTemplate {
    pub campaign_id: String,
    /// 1-based position in the sequence.
    pub sequence_order: u32,
    /// Wait before this touch, measured from the previous one.
    pub delay_hours: f64,
    pub channel: Channel,
    #[serde(default)]
    pub subject: Option<String>,
    pub content: String,
}

impl TouchTemplate {
    /// The template delay as a duration, rounded to the millisecond.
    ///
    /// Negative or non-finite delays count as zero.
    pub fn delay(&self) -> Duration {
        if !self.delay_hours.is_finite() || self.delay_hours <= 0.0 {
            return Duration::zero();
        }
        Duration::try_milliseconds((self.delay_hours * 3_600_000.0).round() as i64)
            .unwrap_or(Duration::MAX)
    }
}

/// Provider-side receipt for a dispatched touch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub provider_id: Option<String>,
}

// --- Leads and conversations ---

/// Lead source tag for leads created by the chat widget.
pub const CHAT_WIDGET_SOURCE: &str = "chat_widget";

/// A prospective customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a lead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewLead {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: String,
    pub metadata: serde_json::Value,
}

/// Author of a conversation message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// The message history between one lead and one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub lead_id: String,
    pub channel: Channel,
    pub agent_type: String,
    pub messages: Vec<ConversationMessage>,
    pub created_at: DateTime<Utc>,
}

// --- Audit ---

/// Direction of a communication relative to the platform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Fields for a new communication audit entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCommunication {
    pub lead_id: String,
    pub channel: Channel,
    pub direction: Direction,
    pub content: String,
    pub status: String,
    pub provider_id: Option<String>,
    pub metadata: serde_json::Value,
}

/// A write-once audit entry for one message in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationRecord {
    pub id: String,
    pub lead_id: String,
    pub channel: Channel,
    pub direction: Direction,
    pub content: String,
    pub status: String,
    pub provider_id: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A per-user dashboard notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
