// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default touch dispatcher.
//!
//! Provider delivery (SMTP, SMS gateways) lives outside this workspace; the
//! default dispatcher records each touch as a sent outbound communication so
//! campaign and chat history share one audit log.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use outreach_core::types::{
    Direction, DispatchReceipt, Enrollment, NewCommunication, TouchTemplate,
};
use outreach_core::{CommunicationRepository, OutreachError, TouchDispatcher};

/// Writes an outbound [`CommunicationRecord`](outreach_core::CommunicationRecord) per touch.
pub struct CommunicationDispatcher {
    communications: Arc<dyn CommunicationRepository>,
}

impl CommunicationDispatcher {
    pub fn new(communications: Arc<dyn CommunicationRepository>) -> Self {
        Self { communications }
    }
}

#[async_trait]
impl TouchDispatcher for CommunicationDispatcher {
    async fn dispatch(
        &self,
        enrollment: &Enrollment,
        template: &TouchTemplate,
    ) -> Result<DispatchReceipt, OutreachError> {
        let record = self
            .communications
            .create(NewCommunication {
                lead_id: enrollment.lead_id.clone(),
                channel: template.channel,
                direction: Direction::Outbound,
                content: template.content.clone(),
                status: "sent".to_string(),
                provider_id: None,
                metadata: json!({
                    "kind": "campaign_touch",
                    "campaignId": template.campaign_id,
                    "step": template.sequence_order,
                    "subject": template.subject,
                }),
            })
            .await
            .map_err(|e| OutreachError::Dispatch {
                message: format!("failed to record touch for lead {}", enrollment.lead_id),
                source: Some(Box::new(e)),
            })?;

        debug!(
            lead_id = %enrollment.lead_id,
            campaign_id = %template.campaign_id,
            step = template.sequence_order,
            record_id = %record.id,
            "touch recorded"
        );
        Ok(DispatchReceipt {
            provider_id: Some(record.id),
        })
    }
}
