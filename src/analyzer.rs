//! Email risk analyzer
//!
//! Runs the four detection modules over one email's metadata and
//! aggregates their findings into a single result. Aggregation is an
//! explicit reduction: risk is the max across modules (a single strong
//! signal dominates instead of being diluted by weak ones), threat tags
//! are unioned, warnings concatenate in module order, and metadata is
//! shallow-merged with later modules overwriting earlier keys.

use crate::config::AnalyzerConfig;
use crate::detection::behavioral::BehavioralAnalyzer;
use crate::detection::exfiltration::ExfiltrationAnalyzer;
use crate::detection::misdirection::MisdirectionAnalyzer;
use crate::detection::phishing::PhishingAnalyzer;
use crate::detection::{attribute_module, ModuleFindings};
use crate::store::{BehaviorProfileStore, ThreatIntelSource};
use crate::types::{EmailAnalysisRequest, EmailAnalysisResult};
use chrono::{DateTime, Timelike, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct EmailRiskAnalyzer {
    thresholds: crate::config::ActionThresholds,
    guardian: MisdirectionAnalyzer,
    enforcer: ExfiltrationAnalyzer,
    defender: PhishingAnalyzer,
    architect: BehavioralAnalyzer,
    intel: Arc<dyn ThreatIntelSource>,
    profiles: Arc<dyn BehaviorProfileStore>,
}

impl EmailRiskAnalyzer {
    pub fn new(
        config: AnalyzerConfig,
        intel: Arc<dyn ThreatIntelSource>,
        profiles: Arc<dyn BehaviorProfileStore>,
    ) -> Self {
        EmailRiskAnalyzer {
            thresholds: config.thresholds,
            guardian: MisdirectionAnalyzer::new(config.misdirection),
            enforcer: ExfiltrationAnalyzer::new(config.exfiltration),
            defender: PhishingAnalyzer::new(config.phishing),
            architect: BehavioralAnalyzer::new(config.behavioral),
            intel,
            profiles,
        }
    }

    /// Analyze one email against the current clock. Collaborator
    /// failures propagate; recoverable heuristic misses never error.
    pub fn analyze(&self, request: &EmailAnalysisRequest) -> anyhow::Result<EmailAnalysisResult> {
        self.analyze_at(request, Utc::now())
    }

    /// Same as `analyze` with an injected clock, so callers and tests
    /// control the hour used for behavioral baselines.
    pub fn analyze_at(
        &self,
        request: &EmailAnalysisRequest,
        now: DateTime<Utc>,
    ) -> anyhow::Result<EmailAnalysisResult> {
        // Module order is fixed: guardian, enforcer, defender, architect.
        // Warning order and metadata merge order both depend on it.
        let findings = [
            self.guardian.analyze(request),
            self.enforcer.analyze(request),
            self.defender.analyze(request, self.intel.as_ref())?,
            self.architect
                .analyze(request, self.profiles.as_ref(), now.hour())?,
        ];

        let result = aggregate(&findings, &self.thresholds);
        log::info!(
            "analyzed email from {} to {}: risk {:.2}, action {}, source {}",
            request.from_address,
            request.to_address,
            result.risk_score,
            result.action_recommended,
            result.module_source
        );
        Ok(result)
    }
}

/// The reduction step, kept separate from the sub-analyses so it stays
/// auditable and testable in isolation.
fn aggregate(
    findings: &[ModuleFindings],
    thresholds: &crate::config::ActionThresholds,
) -> EmailAnalysisResult {
    let risk_score = findings
        .iter()
        .map(|f| f.risk_score)
        .fold(0.0_f64, f64::max);

    let mut threat_types = BTreeSet::new();
    let mut warnings = Vec::new();
    let mut metadata = crate::types::Metadata::new();
    for f in findings {
        threat_types.extend(f.threat_types.iter().copied());
        warnings.extend(f.warnings.iter().cloned());
        for (key, value) in &f.metadata {
            metadata.insert(key.clone(), value.clone());
        }
    }

    EmailAnalysisResult {
        risk_score,
        module_source: attribute_module(&threat_types),
        action_recommended: thresholds.action_for(risk_score),
        threat_types,
        warnings,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{
        BehaviorProfile, DetectionModule, IndicatorType, PolicyAction, ThreatCategory,
        ThreatIndicator, ThreatType,
    };
    use crate::store::BehaviorProfileStore as _;
    use chrono::TimeZone;

    fn request(from: &str, to: &str, subject: &str, body: &str) -> EmailAnalysisRequest {
        EmailAnalysisRequest {
            from_address: from.to_string(),
            to_address: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            tenant_id: "t1".to_string(),
            user_id: "u1".to_string(),
            user_role: None,
        }
    }

    fn analyzer_with_store() -> (EmailRiskAnalyzer, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let analyzer = EmailRiskAnalyzer::new(
            AnalyzerConfig::default(),
            store.clone(),
            store.clone(),
        );
        (analyzer, store)
    }

    fn at_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, hour, 30, 0).unwrap()
    }

    #[test]
    fn test_risk_is_max_across_modules_not_sum() {
        let (analyzer, store) = analyzer_with_store();
        // Existing profile so the behavioral module also fires.
        store
            .upsert_profile("u1", &BehaviorProfile::seeded("peer@acme.com", 10))
            .unwrap();

        // Guardian fires twice (0.8, 0.6) and architect fires twice
        // (0.3, 0.2); a sum would exceed 1.0.
        let result = analyzer
            .analyze_at(
                &request(
                    "alice@acme.com",
                    "user@gmail.com",
                    "Quarterly confidential financials",
                    "see attached",
                ),
                at_hour(3),
            )
            .unwrap();

        assert_eq!(result.risk_score, 0.8);
        assert!(result.threat_types.contains(&ThreatType::MisdirectedEmail));
        assert!(result.threat_types.contains(&ThreatType::PersonalEmailRisk));
        assert!(result.threat_types.contains(&ThreatType::UnusualRecipient));
        assert!(result.threat_types.contains(&ThreatType::UnusualSendTime));
        assert_eq!(result.module_source, DetectionModule::Guardian);
        assert_eq!(result.action_recommended, PolicyAction::Block);
    }

    #[test]
    fn test_clean_email_allows() {
        let (analyzer, store) = analyzer_with_store();
        store
            .upsert_profile("u1", &BehaviorProfile::seeded("bob@acme.com", 10))
            .unwrap();

        let result = analyzer
            .analyze_at(
                &request("alice@acme.com", "bob@acme.com", "standup", "notes attached"),
                at_hour(10),
            )
            .unwrap();
        assert_eq!(result.risk_score, 0.0);
        assert!(result.threat_types.is_empty());
        assert_eq!(result.action_recommended, PolicyAction::Allow);
        assert_eq!(result.module_source, DetectionModule::Guardian);
    }

    #[test]
    fn test_first_call_seeds_profile_without_risk() {
        let (analyzer, store) = analyzer_with_store();

        let result = analyzer
            .analyze_at(
                &request("alice@acme.com", "bob@acme.com", "hi", "hello"),
                at_hour(15),
            )
            .unwrap();
        assert_eq!(result.risk_score, 0.0);
        assert_eq!(store.profile_count(), 1);

        let profile = store.profile("u1").unwrap().unwrap();
        assert!(profile.common_contacts.contains("bob@acme.com"));
        assert!(profile.typical_send_hours.contains(&15));
    }

    #[test]
    fn test_executive_impersonation_example() {
        let (analyzer, _store) = analyzer_with_store();

        let result = analyzer
            .analyze_at(
                &request(
                    "ceo@acme.com",
                    "finance@acme.com",
                    "Urgent: verify account now",
                    "wire the funds today",
                ),
                at_hour(11),
            )
            .unwrap();
        assert!(result
            .threat_types
            .contains(&ThreatType::ExecutiveImpersonation));
        assert_eq!(result.risk_score, 0.85);
        assert_eq!(result.action_recommended, PolicyAction::Block);
        // executive_impersonation is not in the attribution precedence
        // table, so attribution falls back to the guardian default even
        // though the defender module raised the tag.
        assert_eq!(result.module_source, DetectionModule::Guardian);
    }

    #[test]
    fn test_intel_confidence_dominates_and_attributes_defender() {
        let (analyzer, store) = analyzer_with_store();
        store
            .add_indicator(
                "t1",
                ThreatIndicator {
                    indicator_type: IndicatorType::Domain,
                    value: "dropzone.evil".to_string(),
                    threat_category: ThreatCategory::C2,
                    confidence: 0.93,
                    source: "partner-feed".to_string(),
                    last_seen: Utc::now(),
                    metadata: Default::default(),
                },
            )
            .unwrap();

        let result = analyzer
            .analyze_at(
                &request(
                    "alice@acme.com",
                    "user@gmail.com",
                    "Confidential export",
                    "upload to dropzone.evil",
                ),
                at_hour(12),
            )
            .unwrap();

        // 0.93 from intel beats 0.8 from guardian; attribution prefers
        // defender over guardian regardless of score order.
        assert_eq!(result.risk_score, 0.93);
        assert_eq!(result.module_source, DetectionModule::Defender);
        assert_eq!(result.action_recommended, PolicyAction::Quarantine);
    }

    #[test]
    fn test_threat_types_deduplicated() {
        let (analyzer, store) = analyzer_with_store();
        // Two indicators matching the same email both raise known_threat.
        for (value, confidence) in [("evil-a.example", 0.6), ("evil-b.example", 0.7)] {
            store
                .add_indicator(
                    "t1",
                    ThreatIndicator {
                        indicator_type: IndicatorType::Domain,
                        value: value.to_string(),
                        threat_category: ThreatCategory::Spam,
                        confidence,
                        source: "feed".to_string(),
                        last_seen: Utc::now(),
                        metadata: Default::default(),
                    },
                )
                .unwrap();
        }

        let result = analyzer
            .analyze_at(
                &request(
                    "alice@acme.com",
                    "bob@acme.com",
                    "links",
                    "evil-a.example and evil-b.example",
                ),
                at_hour(12),
            )
            .unwrap();

        let known = result
            .threat_types
            .iter()
            .filter(|t| **t == ThreatType::KnownThreat)
            .count();
        assert_eq!(known, 1);
        assert_eq!(result.risk_score, 0.7);
    }

    #[test]
    fn test_warnings_follow_module_order() {
        let (analyzer, store) = analyzer_with_store();
        store
            .upsert_profile("u1", &BehaviorProfile::seeded("peer@acme.com", 10))
            .unwrap();

        let result = analyzer
            .analyze_at(
                &request(
                    "alice@acme.com",
                    "x@competitor.com",
                    "confidential summary",
                    "customer list in the large attachment enclosed",
                ),
                at_hour(3),
            )
            .unwrap();

        // Guardian warning first, then enforcer, then architect.
        assert!(result.warnings[0].contains("external recipient"));
        assert!(result.warnings.iter().any(|w| w.contains("competitor")));
        let last = result.warnings.last().unwrap();
        assert!(last.contains("hour") || last.contains("history"));
        assert_eq!(result.risk_score, 0.95);
        assert_eq!(result.module_source, DetectionModule::Enforcer);
    }

    #[test]
    fn test_risk_score_stays_within_unit_interval() {
        let (analyzer, store) = analyzer_with_store();
        store
            .upsert_profile("u1", &BehaviorProfile::seeded("peer@acme.com", 10))
            .unwrap();
        store
            .add_indicator(
                "t1",
                ThreatIndicator {
                    indicator_type: IndicatorType::Domain,
                    value: "phishing-site.com".to_string(),
                    threat_category: ThreatCategory::Phishing,
                    confidence: 1.0,
                    source: "feed".to_string(),
                    last_seen: Utc::now(),
                    metadata: Default::default(),
                },
            )
            .unwrap();

        // Every module fires at once; max aggregation keeps the score at 1.0.
        let result = analyzer
            .analyze_at(
                &request(
                    "ceo@phishing-site.com",
                    "x@competitor.com",
                    "Urgent: verify account, confidential",
                    "trade secret in a large attachment from phishing-site.com",
                ),
                at_hour(3),
            )
            .unwrap();
        assert!(result.risk_score <= 1.0);
        assert_eq!(result.risk_score, 1.0);
        assert_eq!(result.action_recommended, PolicyAction::Quarantine);
    }
}
