//! Architect: behavioral anomaly detection
//!
//! Compares the email against the acting user's historical baseline.
//! A user with no profile gets one seeded from this email and
//! contributes zero risk on the same call.

use super::ModuleFindings;
use crate::config::BehavioralConfig;
use crate::store::BehaviorProfileStore;
use crate::types::{BehaviorProfile, EmailAnalysisRequest, ThreatType};
use serde_json::json;

pub struct BehavioralAnalyzer {
    config: BehavioralConfig,
}

impl BehavioralAnalyzer {
    pub fn new(config: BehavioralConfig) -> Self {
        Self { config }
    }

    /// Profile store failures propagate; the caller decides fail-open or
    /// fail-closed.
    pub fn analyze(
        &self,
        request: &EmailAnalysisRequest,
        profiles: &dyn BehaviorProfileStore,
        hour_of_day: u32,
    ) -> anyhow::Result<ModuleFindings> {
        let mut findings = ModuleFindings::default();
        let recipient = request.to_address.to_lowercase();

        match profiles.profile(&request.user_id)? {
            None => {
                let profile = BehaviorProfile::seeded(&recipient, hour_of_day);
                profiles.upsert_profile(&request.user_id, &profile)?;
                log::debug!(
                    "seeded behavior profile for user {} (contact {}, hour {})",
                    request.user_id,
                    recipient,
                    hour_of_day
                );
                findings
                    .metadata
                    .insert("profile_created".to_string(), json!(true));
            }
            Some(profile) => {
                if !profile.common_contacts.contains(&recipient) {
                    findings.flag(
                        self.config.unusual_recipient_risk,
                        ThreatType::UnusualRecipient,
                        format!(
                            "User {} has no history of emailing {}",
                            request.user_id, request.to_address
                        ),
                    );
                }
                if !profile.typical_send_hours.contains(&hour_of_day) {
                    findings.flag(
                        self.config.unusual_send_time_risk,
                        ThreatType::UnusualSendTime,
                        format!("Sent at hour {} outside the user's typical hours", hour_of_day),
                    );
                }
            }
        }

        Ok(findings)
    }
}
