use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Open key/value bag attached to analysis results and indicators.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One email event submitted for analysis. Built once per message and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAnalysisRequest {
    pub from_address: String,
    pub to_address: String,
    pub subject: String,
    pub body: String,
    pub tenant_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
}

/// Enforcement action. Variants are ordered by severity so callers can
/// combine actions with a plain max.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    Allow,
    Warn,
    Block,
    Quarantine,
}

impl PolicyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyAction::Allow => "allow",
            PolicyAction::Warn => "warn",
            PolicyAction::Block => "block",
            PolicyAction::Quarantine => "quarantine",
        }
    }
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detected threat pattern tags. The analyzer is the only producer, so
/// the set is closed and typed; serialization uses the canonical
/// snake_case strings the reporting layer expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatType {
    MisdirectedEmail,
    PersonalEmailRisk,
    DataExfiltration,
    LargeDataTransfer,
    Phishing,
    ExecutiveImpersonation,
    KnownThreat,
    UnusualRecipient,
    UnusualSendTime,
}

impl ThreatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatType::MisdirectedEmail => "misdirected_email",
            ThreatType::PersonalEmailRisk => "personal_email_risk",
            ThreatType::DataExfiltration => "data_exfiltration",
            ThreatType::LargeDataTransfer => "large_data_transfer",
            ThreatType::Phishing => "phishing",
            ThreatType::ExecutiveImpersonation => "executive_impersonation",
            ThreatType::KnownThreat => "known_threat",
            ThreatType::UnusualRecipient => "unusual_recipient",
            ThreatType::UnusualSendTime => "unusual_send_time",
        }
    }
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detection sub-analysis credited as the primary source of a finding.
/// Attribution only; does not affect scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionModule {
    Guardian,
    Enforcer,
    Defender,
    Architect,
}

impl DetectionModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionModule::Guardian => "guardian",
            DetectionModule::Enforcer => "enforcer",
            DetectionModule::Defender => "defender",
            DetectionModule::Architect => "architect",
        }
    }
}

impl fmt::Display for DetectionModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated output of the risk analyzer for one email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAnalysisResult {
    /// Maximum risk across the sub-analyses, in [0, 1]. Never a sum.
    pub risk_score: f64,
    pub threat_types: BTreeSet<ThreatType>,
    pub module_source: DetectionModule,
    pub action_recommended: PolicyAction,
    pub warnings: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorType {
    Domain,
    Ip,
    Email,
    Hash,
}

impl IndicatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorType::Domain => "domain",
            IndicatorType::Ip => "ip",
            IndicatorType::Email => "email",
            IndicatorType::Hash => "hash",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatCategory {
    Malware,
    Phishing,
    Spam,
    C2,
}

/// Known-bad indicator supplied by the threat intelligence collaborator.
/// Read-only during scoring; `confidence` may be refreshed by
/// re-enrichment between calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatIndicator {
    pub indicator_type: IndicatorType,
    pub value: String,
    pub threat_category: ThreatCategory,
    pub confidence: f64,
    pub source: String,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Per-user historical communication baseline. At most one per user;
/// created lazily on the first analysis that finds none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorProfile {
    pub common_contacts: BTreeSet<String>,
    pub typical_send_hours: BTreeSet<u32>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

impl BehaviorProfile {
    /// Baseline profile seeded from the first observed email.
    pub fn seeded(contact: &str, hour: u32) -> Self {
        let mut profile = BehaviorProfile::default();
        profile.common_contacts.insert(contact.to_lowercase());
        profile.typical_send_hours.insert(hour);
        profile
    }
}

/// Population a policy applies to: everyone in the tenant, or an
/// explicit list of user IDs and roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TargetUsersRepr", into = "TargetUsersRepr")]
pub enum TargetUsers {
    All,
    Listed(Vec<String>),
}

impl Default for TargetUsers {
    fn default() -> Self {
        TargetUsers::All
    }
}

impl TargetUsers {
    /// Applicability gate: "all", or the list names the user or role.
    pub fn applies_to(&self, user_id: &str, user_role: Option<&str>) -> bool {
        match self {
            TargetUsers::All => true,
            TargetUsers::Listed(targets) => targets.iter().any(|t| {
                t == "all" || t == user_id || user_role.map(|r| t == r).unwrap_or(false)
            }),
        }
    }

    /// Whether the user ID is explicitly listed. The "all" sentinel does
    /// not count; executive protection requires a named target.
    pub fn lists_user(&self, user_id: &str) -> bool {
        match self {
            TargetUsers::All => false,
            TargetUsers::Listed(targets) => targets.iter().any(|t| t == user_id),
        }
    }
}

/// Wire shape for `TargetUsers`: either the literal string "all" or an
/// array of IDs/roles.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TargetUsersRepr {
    Sentinel(String),
    Listed(Vec<String>),
}

impl From<TargetUsersRepr> for TargetUsers {
    fn from(repr: TargetUsersRepr) -> Self {
        match repr {
            TargetUsersRepr::Sentinel(s) if s == "all" => TargetUsers::All,
            TargetUsersRepr::Sentinel(s) => TargetUsers::Listed(vec![s]),
            TargetUsersRepr::Listed(list) => TargetUsers::Listed(list),
        }
    }
}

impl From<TargetUsers> for TargetUsersRepr {
    fn from(targets: TargetUsers) -> Self {
        match targets {
            TargetUsers::All => TargetUsersRepr::Sentinel("all".to_string()),
            TargetUsers::Listed(list) => TargetUsersRepr::Listed(list),
        }
    }
}

/// Per-policy-type rule shapes. Unknown `type` tags deserialize to
/// `Unrecognized`, which always evaluates to a non-matching result, so
/// one bad policy cannot block evaluation of the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyRules {
    Dlp {
        #[serde(default)]
        actions: Vec<PolicyAction>,
    },
    PhishingProtection,
    ExecutiveProtection,
    BehavioralAnalysis,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Normal,
    High,
}

impl Default for Sensitivity {
    fn default() -> Self {
        Sensitivity::Normal
    }
}

/// Tuning knobs written by dynamic policy authoring. Kept beside the
/// typed rules so every policy type can carry them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyTuning {
    #[serde(default)]
    pub sensitivity: Sensitivity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_threshold: Option<f64>,
}

/// Tenant-scoped enforcement policy. Authored by administrators (or by
/// `create_dynamic_policy`); read-only to the policy engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    #[serde(default)]
    pub target_users: TargetUsers,
    pub rules: PolicyRules,
    #[serde(default)]
    pub tuning: PolicyTuning,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Template passed to dynamic policy creation. The engine fills in the
/// identity fields and may tighten the tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyTemplate {
    pub name: String,
    pub rules: PolicyRules,
    #[serde(default)]
    pub tuning: PolicyTuning,
}

/// Input to policy evaluation: the original email metadata combined with
/// the analyzer's output. This is the coupling point between the risk
/// analyzer and the policy engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEvaluationContext {
    pub tenant_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
    pub from_address: String,
    pub to_address: String,
    pub subject: String,
    pub content: String,
    pub risk_score: f64,
    pub threat_types: BTreeSet<ThreatType>,
}

impl PolicyEvaluationContext {
    pub fn from_analysis(request: &EmailAnalysisRequest, analysis: &EmailAnalysisResult) -> Self {
        PolicyEvaluationContext {
            tenant_id: request.tenant_id.clone(),
            user_id: request.user_id.clone(),
            user_role: request.user_role.clone(),
            from_address: request.from_address.clone(),
            to_address: request.to_address.clone(),
            subject: request.subject.clone(),
            content: request.body.clone(),
            risk_score: analysis.risk_score,
            threat_types: analysis.threat_types.clone(),
        }
    }
}

/// Outcome of evaluating a single policy against one email context.
/// The engine returns one of these per active policy, matched or not;
/// callers filter for `matched` themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEvaluationResult {
    pub policy_id: String,
    pub policy_name: String,
    pub matched: bool,
    pub action: PolicyAction,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl PolicyEvaluationResult {
    pub fn not_matched(policy: &SecurityPolicy, reason: &str) -> Self {
        PolicyEvaluationResult {
            policy_id: policy.id.clone(),
            policy_name: policy.name.clone(),
            matched: false,
            action: PolicyAction::Allow,
            reason: reason.to_string(),
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_severity_ordering() {
        assert!(PolicyAction::Quarantine > PolicyAction::Block);
        assert!(PolicyAction::Block > PolicyAction::Warn);
        assert!(PolicyAction::Warn > PolicyAction::Allow);
    }

    #[test]
    fn test_threat_type_serializes_snake_case() {
        let json = serde_json::to_string(&ThreatType::MisdirectedEmail).unwrap();
        assert_eq!(json, "\"misdirected_email\"");
        let json = serde_json::to_string(&ThreatType::ExecutiveImpersonation).unwrap();
        assert_eq!(json, "\"executive_impersonation\"");
    }

    #[test]
    fn test_target_users_sentinel_and_list() {
        let all: TargetUsers = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(all, TargetUsers::All);
        assert!(all.applies_to("42", None));
        assert!(!all.lists_user("42"));

        let listed: TargetUsers = serde_json::from_str("[\"7\", \"admin\"]").unwrap();
        assert!(listed.applies_to("7", None));
        assert!(listed.applies_to("99", Some("admin")));
        assert!(!listed.applies_to("99", Some("viewer")));
        assert!(listed.lists_user("7"));
        assert!(!listed.lists_user("admin2"));
    }

    #[test]
    fn test_target_users_list_containing_all_applies_to_everyone() {
        let listed: TargetUsers = serde_json::from_str("[\"all\"]").unwrap();
        assert!(listed.applies_to("anyone", None));
    }

    #[test]
    fn test_unknown_policy_rules_deserialize_to_unrecognized() {
        let yaml = "type: ransomware_shield\n";
        let rules: PolicyRules = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rules, PolicyRules::Unrecognized);
    }

    #[test]
    fn test_dlp_rules_default_actions_empty() {
        let yaml = "type: dlp\n";
        let rules: PolicyRules = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rules, PolicyRules::Dlp { actions: vec![] });
    }

    #[test]
    fn test_seeded_profile_has_single_baseline() {
        let profile = BehaviorProfile::seeded("Bob@Partner.com", 14);
        assert_eq!(profile.common_contacts.len(), 1);
        assert!(profile.common_contacts.contains("bob@partner.com"));
        assert_eq!(profile.typical_send_hours.len(), 1);
        assert!(profile.typical_send_hours.contains(&14));
    }
}
