//! Guardian: misdirected email detection
//!
//! Flags confidential content addressed outside the sender's domain and
//! recipients on personal webmail providers. The two checks fire
//! independently; the module risk is the max of the two.

use super::ModuleFindings;
use crate::config::MisdirectionConfig;
use crate::domain_utils::DomainUtils;
use crate::types::{EmailAnalysisRequest, ThreatType};
use serde_json::json;

pub struct MisdirectionAnalyzer {
    config: MisdirectionConfig,
}

impl MisdirectionAnalyzer {
    pub fn new(config: MisdirectionConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, request: &EmailAnalysisRequest) -> ModuleFindings {
        let mut findings = ModuleFindings::default();
        let combined_text =
            format!("{} {}", request.subject, request.body).to_lowercase();

        if DomainUtils::is_external_recipient(&request.from_address, &request.to_address) {
            if let Some(keyword) = self
                .config
                .confidential_keywords
                .iter()
                .find(|k| combined_text.contains(k.to_lowercase().as_str()))
            {
                findings.flag(
                    self.config.confidential_external_risk,
                    ThreatType::MisdirectedEmail,
                    format!(
                        "Confidential content (\"{}\") addressed to external recipient {}",
                        keyword, request.to_address
                    ),
                );
                findings
                    .metadata
                    .insert("confidential_keyword".to_string(), json!(keyword));
            }
        }

        if let Some(to_domain) = DomainUtils::extract_domain(&request.to_address) {
            if DomainUtils::matches_domain_list(&to_domain, &self.config.personal_webmail_domains)
            {
                findings.flag(
                    self.config.personal_webmail_risk,
                    ThreatType::PersonalEmailRisk,
                    format!("Recipient {} uses a personal webmail provider", request.to_address),
                );
                findings
                    .metadata
                    .insert("personal_webmail_domain".to_string(), json!(to_domain));
            }
        }

        findings
    }
}
