//! Defender: phishing and impersonation detection
//!
//! Checks the sender against known-bad domains, looks for urgency
//! language combined with executive title tokens, and consults the
//! tenant's threat intelligence feed. Intel matches score with the
//! indicator's own confidence rather than a fixed constant.

use super::ModuleFindings;
use crate::config::PhishingConfig;
use crate::domain_utils::DomainUtils;
use crate::store::ThreatIntelSource;
use crate::types::{EmailAnalysisRequest, ThreatType};
use serde_json::json;

pub struct PhishingAnalyzer {
    config: PhishingConfig,
}

impl PhishingAnalyzer {
    pub fn new(config: PhishingConfig) -> Self {
        Self { config }
    }

    /// Intel lookup failures propagate; the caller decides fail-open or
    /// fail-closed.
    pub fn analyze(
        &self,
        request: &EmailAnalysisRequest,
        intel: &dyn ThreatIntelSource,
    ) -> anyhow::Result<ModuleFindings> {
        let mut findings = ModuleFindings::default();

        if let Some(from_domain) = DomainUtils::extract_domain(&request.from_address) {
            if DomainUtils::matches_domain_list(&from_domain, &self.config.malicious_domains) {
                findings.flag(
                    self.config.malicious_domain_risk,
                    ThreatType::Phishing,
                    format!("Sender domain {} is on the malicious domain list", from_domain),
                );
                findings
                    .metadata
                    .insert("malicious_domain".to_string(), json!(from_domain));
            }
        }

        // Urgency language plus an executive title token in the sender
        // address or subject.
        let sender_and_subject =
            format!("{} {}", request.from_address, request.subject).to_lowercase();
        let urgent = self
            .config
            .urgency_keywords
            .iter()
            .any(|k| sender_and_subject.contains(k.to_lowercase().as_str()));
        let executive_title = self
            .config
            .executive_titles
            .iter()
            .find(|t| sender_and_subject.contains(t.to_lowercase().as_str()));

        if let (true, Some(title)) = (urgent, executive_title) {
            findings.flag(
                self.config.impersonation_risk,
                ThreatType::ExecutiveImpersonation,
                format!("Urgency language combined with executive title \"{}\"", title),
            );
            findings
                .metadata
                .insert("impersonated_title".to_string(), json!(title));
        }

        let haystack = format!(
            "{} {} {}",
            request.from_address, request.subject, request.body
        )
        .to_lowercase();
        for indicator in intel.indicators_for_tenant(&request.tenant_id)? {
            if haystack.contains(indicator.value.to_lowercase().as_str()) {
                log::debug!(
                    "threat intel indicator {} matched (confidence {:.2})",
                    indicator.value,
                    indicator.confidence
                );
                // Indicator confidence is collaborator-supplied and not
                // validated upstream; keep the risk score inside [0, 1].
                findings.flag(
                    indicator.confidence.clamp(0.0, 1.0),
                    ThreatType::KnownThreat,
                    format!(
                        "Matches known threat indicator \"{}\" reported by {}",
                        indicator.value, indicator.source
                    ),
                );
                findings
                    .metadata
                    .insert("indicator_source".to_string(), json!(indicator.source));
                findings.metadata.insert(
                    "indicator_type".to_string(),
                    json!(indicator.indicator_type.as_str()),
                );
            }
        }

        Ok(findings)
    }
}
