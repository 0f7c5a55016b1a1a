//! Enforcer: data exfiltration detection
//!
//! Flags sensitive-data keywords in the message content headed to
//! competitor domains, plus a crude large-transfer heuristic on the
//! literal words "attachment" and "large" appearing together. Both
//! checks inspect the body only; subject-line mentions are the guardian
//! module's concern.

use super::ModuleFindings;
use crate::config::ExfiltrationConfig;
use crate::domain_utils::DomainUtils;
use crate::types::{EmailAnalysisRequest, ThreatType};
use serde_json::json;

pub struct ExfiltrationAnalyzer {
    config: ExfiltrationConfig,
}

impl ExfiltrationAnalyzer {
    pub fn new(config: ExfiltrationConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, request: &EmailAnalysisRequest) -> ModuleFindings {
        let mut findings = ModuleFindings::default();
        let content = request.body.to_lowercase();

        let sensitive_keyword = self
            .config
            .sensitive_data_keywords
            .iter()
            .find(|k| content.contains(k.to_lowercase().as_str()));

        let competitor_recipient = DomainUtils::extract_domain(&request.to_address)
            .map(|d| DomainUtils::matches_domain_list(&d, &self.config.competitor_domains))
            .unwrap_or(false);

        if let (Some(keyword), true) = (sensitive_keyword, competitor_recipient) {
            findings.flag(
                self.config.exfiltration_risk,
                ThreatType::DataExfiltration,
                format!(
                    "Sensitive data (\"{}\") addressed to competitor domain via {}",
                    keyword, request.to_address
                ),
            );
            findings
                .metadata
                .insert("sensitive_keyword".to_string(), json!(keyword));
        }

        if content.contains("attachment") && content.contains("large") {
            findings.flag(
                self.config.large_transfer_risk,
                ThreatType::LargeDataTransfer,
                "Message references a large attachment".to_string(),
            );
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(to: &str, subject: &str, body: &str) -> EmailAnalysisRequest {
        EmailAnalysisRequest {
            from_address: "alice@acme.com".to_string(),
            to_address: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            tenant_id: "t1".to_string(),
            user_id: "u1".to_string(),
            user_role: None,
        }
    }

    fn analyzer() -> ExfiltrationAnalyzer {
        ExfiltrationAnalyzer::new(crate::config::ExfiltrationConfig::default())
    }

    #[test]
    fn test_sensitive_data_to_competitor() {
        let findings = analyzer().analyze(&request(
            "recruiter@competitor.com",
            "as discussed",
            "the customer list you asked about",
        ));
        assert_eq!(findings.risk_score, 0.95);
        assert!(findings.threat_types.contains(&ThreatType::DataExfiltration));
    }

    #[test]
    fn test_sensitive_data_to_non_competitor_is_clean() {
        let findings = analyzer().analyze(&request(
            "bob@partner.com",
            "migration",
            "database runbook enclosed",
        ));
        assert!(!findings.threat_types.contains(&ThreatType::DataExfiltration));
    }

    #[test]
    fn test_subject_only_keywords_do_not_fire() {
        // Both checks inspect the body; subject-line mentions alone
        // contribute nothing even with a competitor recipient.
        let findings = analyzer().analyze(&request(
            "recruiter@competitor.com",
            "customer list in a large attachment",
            "call me when free",
        ));
        assert_eq!(findings.risk_score, 0.0);
        assert!(findings.threat_types.is_empty());
    }

    #[test]
    fn test_large_attachment_heuristic() {
        let findings = analyzer().analyze(&request(
            "bob@acme.com",
            "files",
            "sending a large attachment with the export",
        ));
        assert_eq!(findings.risk_score, 0.5);
        assert_eq!(
            findings.threat_types,
            vec![ThreatType::LargeDataTransfer]
        );
    }

    #[test]
    fn test_both_checks_take_max() {
        let findings = analyzer().analyze(&request(
            "x@rival-corp.com",
            "follow up",
            "trade secret details in the large attachment",
        ));
        assert_eq!(findings.risk_score, 0.95);
        assert!(findings.threat_types.contains(&ThreatType::DataExfiltration));
        assert!(findings.threat_types.contains(&ThreatType::LargeDataTransfer));
    }

    #[test]
    fn test_large_without_attachment_is_clean() {
        let findings = analyzer().analyze(&request(
            "bob@acme.com",
            "status",
            "a large backlog this sprint",
        ));
        assert_eq!(findings.risk_score, 0.0);
    }
}
