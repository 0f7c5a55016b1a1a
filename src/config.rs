//! Analyzer configuration
//!
//! Every threshold, keyword list, and domain list used by the detection
//! modules lives here so scoring stays explainable and tests can assert
//! on named values instead of literals scattered through the logic.

use crate::types::PolicyAction;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzerConfig {
    pub misdirection: MisdirectionConfig,
    pub exfiltration: ExfiltrationConfig,
    pub phishing: PhishingConfig,
    pub behavioral: BehavioralConfig,
    pub thresholds: ActionThresholds,
}

/// Guardian module: confidential content leaving the organization and
/// personal webmail recipients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MisdirectionConfig {
    pub confidential_keywords: Vec<String>,
    pub personal_webmail_domains: Vec<String>,
    pub confidential_external_risk: f64,
    pub personal_webmail_risk: f64,
}

/// Enforcer module: sensitive data headed to competitors and crude bulk
/// transfer signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExfiltrationConfig {
    pub sensitive_data_keywords: Vec<String>,
    pub competitor_domains: Vec<String>,
    pub exfiltration_risk: f64,
    pub large_transfer_risk: f64,
}

/// Defender module: known-bad sender domains and urgency/executive
/// impersonation patterns. Threat-intel indicator matches score with the
/// indicator's own confidence, so no constant is configured for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhishingConfig {
    pub malicious_domains: Vec<String>,
    pub urgency_keywords: Vec<String>,
    pub executive_titles: Vec<String>,
    pub malicious_domain_risk: f64,
    pub impersonation_risk: f64,
}

/// Architect module: deviations from the per-user behavior baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BehavioralConfig {
    pub unusual_recipient_risk: f64,
    pub unusual_send_time_risk: f64,
}

/// Risk score boundaries mapping to recommended actions. Each boundary
/// is inclusive of its own tier: exactly 0.9 quarantines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionThresholds {
    pub quarantine: f64,
    pub block: f64,
    pub warn: f64,
}

impl ActionThresholds {
    /// Pure mapping from risk score to recommended action, evaluated
    /// high to low.
    pub fn action_for(&self, risk_score: f64) -> PolicyAction {
        if risk_score >= self.quarantine {
            PolicyAction::Quarantine
        } else if risk_score >= self.block {
            PolicyAction::Block
        } else if risk_score >= self.warn {
            PolicyAction::Warn
        } else {
            PolicyAction::Allow
        }
    }
}

fn string_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for MisdirectionConfig {
    fn default() -> Self {
        MisdirectionConfig {
            confidential_keywords: string_vec(&[
                "confidential",
                "secret",
                "internal",
                "proprietary",
                "financial results",
            ]),
            personal_webmail_domains: string_vec(&["gmail.com", "yahoo.com"]),
            confidential_external_risk: 0.8,
            personal_webmail_risk: 0.6,
        }
    }
}

impl Default for ExfiltrationConfig {
    fn default() -> Self {
        ExfiltrationConfig {
            sensitive_data_keywords: string_vec(&[
                "source code",
                "database",
                "customer list",
                "financial data",
                "trade secret",
            ]),
            competitor_domains: string_vec(&["competitor.com", "rival-corp.com"]),
            exfiltration_risk: 0.95,
            large_transfer_risk: 0.5,
        }
    }
}

impl Default for PhishingConfig {
    fn default() -> Self {
        PhishingConfig {
            malicious_domains: string_vec(&[
                "phishing-site.com",
                "malicious-domain.net",
                "spoofed-bank.com",
            ]),
            urgency_keywords: string_vec(&[
                "urgent",
                "immediate",
                "expires today",
                "act now",
                "verify account",
            ]),
            executive_titles: string_vec(&["ceo", "cfo", "president", "director"]),
            malicious_domain_risk: 0.9,
            impersonation_risk: 0.85,
        }
    }
}

impl Default for BehavioralConfig {
    fn default() -> Self {
        BehavioralConfig {
            unusual_recipient_risk: 0.3,
            unusual_send_time_risk: 0.2,
        }
    }
}

impl Default for ActionThresholds {
    fn default() -> Self {
        ActionThresholds {
            quarantine: 0.9,
            block: 0.7,
            warn: 0.4,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            misdirection: MisdirectionConfig::default(),
            exfiltration: ExfiltrationConfig::default(),
            phishing: PhishingConfig::default(),
            behavioral: BehavioralConfig::default(),
            thresholds: ActionThresholds::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: AnalyzerConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self).context("failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Sanity checks on risk constants and threshold ordering.
    pub fn validate(&self) -> anyhow::Result<()> {
        let risks = [
            ("misdirection.confidential_external_risk", self.misdirection.confidential_external_risk),
            ("misdirection.personal_webmail_risk", self.misdirection.personal_webmail_risk),
            ("exfiltration.exfiltration_risk", self.exfiltration.exfiltration_risk),
            ("exfiltration.large_transfer_risk", self.exfiltration.large_transfer_risk),
            ("phishing.malicious_domain_risk", self.phishing.malicious_domain_risk),
            ("phishing.impersonation_risk", self.phishing.impersonation_risk),
            ("behavioral.unusual_recipient_risk", self.behavioral.unusual_recipient_risk),
            ("behavioral.unusual_send_time_risk", self.behavioral.unusual_send_time_risk),
            ("thresholds.quarantine", self.thresholds.quarantine),
            ("thresholds.block", self.thresholds.block),
            ("thresholds.warn", self.thresholds.warn),
        ];
        for (name, value) in risks {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{} must be within [0, 1], got {}", name, value);
            }
        }

        if self.thresholds.quarantine < self.thresholds.block
            || self.thresholds.block < self.thresholds.warn
        {
            anyhow::bail!(
                "action thresholds must be ordered quarantine >= block >= warn, got {} / {} / {}",
                self.thresholds.quarantine,
                self.thresholds.block,
                self.thresholds.warn
            );
        }

        if self.misdirection.confidential_keywords.is_empty() {
            anyhow::bail!("misdirection.confidential_keywords must not be empty");
        }
        if self.phishing.urgency_keywords.is_empty() {
            anyhow::bail!("phishing.urgency_keywords must not be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalyzerConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_action_threshold_boundaries() {
        let thresholds = ActionThresholds::default();
        assert_eq!(thresholds.action_for(0.9), PolicyAction::Quarantine);
        assert_eq!(thresholds.action_for(0.95), PolicyAction::Quarantine);
        assert_eq!(thresholds.action_for(0.89), PolicyAction::Block);
        assert_eq!(thresholds.action_for(0.7), PolicyAction::Block);
        assert_eq!(thresholds.action_for(0.4), PolicyAction::Warn);
        assert_eq!(thresholds.action_for(0.39), PolicyAction::Allow);
        assert_eq!(thresholds.action_for(0.0), PolicyAction::Allow);
    }

    #[test]
    fn test_yaml_round_trip_preserves_thresholds() {
        let config = AnalyzerConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: AnalyzerConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.thresholds.quarantine, 0.9);
        assert_eq!(parsed.exfiltration.exfiltration_risk, 0.95);
        assert_eq!(
            parsed.misdirection.confidential_keywords,
            config.misdirection.confidential_keywords
        );
    }

    #[test]
    fn test_validate_rejects_out_of_range_risk() {
        let mut config = AnalyzerConfig::default();
        config.phishing.malicious_domain_risk = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = AnalyzerConfig::default();
        config.thresholds.warn = 0.95;
        assert!(config.validate().is_err());
    }
}
