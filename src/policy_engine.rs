//! Policy engine
//!
//! Evaluates every active tenant policy against one email context and
//! returns one result per policy, matched or not. A malformed or
//! unrecognized policy degrades to a non-matching result so it cannot
//! block evaluation of the others.

use crate::domain_utils::DomainUtils;
use crate::store::{PolicyStore, ThreatIntelSource};
use crate::types::{
    PolicyAction, PolicyEvaluationContext, PolicyEvaluationResult, PolicyRules, PolicyTemplate,
    SecurityPolicy, Sensitivity, TargetUsers, ThreatType,
};
use anyhow::Context;
use chrono::{Duration, Utc};
use regex::Regex;
use std::sync::Arc;

/// Indicator volume over the trailing window that makes dynamically
/// created policies start out tightened.
const DYNAMIC_INTEL_WINDOW_DAYS: i64 = 7;
const DYNAMIC_INTEL_VOLUME: usize = 10;
const DYNAMIC_RISK_THRESHOLD: f64 = 0.6;

/// Risk bars used by the per-type evaluators.
const PHISHING_RISK_BAR: f64 = 0.7;
const PHISHING_QUARANTINE_BAR: f64 = 0.9;
const EXECUTIVE_RISK_BAR: f64 = 0.5;
const BEHAVIORAL_RISK_BAR: f64 = 0.3;

pub struct PolicyEngine {
    policies: Arc<dyn PolicyStore>,
    intel: Arc<dyn ThreatIntelSource>,
    credit_card_pattern: Regex,
    ssn_pattern: Regex,
    confidential_pattern: Regex,
}

impl PolicyEngine {
    /// Patterns are compiled once up front, like rule patterns in the
    /// filter engine.
    pub fn new(
        policies: Arc<dyn PolicyStore>,
        intel: Arc<dyn ThreatIntelSource>,
    ) -> anyhow::Result<Self> {
        Ok(PolicyEngine {
            policies,
            intel,
            credit_card_pattern: Regex::new(r"\b(?:\d[ -]?){13,16}\b")
                .context("failed to compile credit card pattern")?,
            ssn_pattern: Regex::new(r"\b\d{3}-\d{2}-\d{4}\b")
                .context("failed to compile SSN pattern")?,
            // Substring alternation on purpose: derived forms such as
            // "secrets" or "internally" must still match.
            confidential_pattern: Regex::new(r"(?i)confidential|proprietary|internal|secret")
                .context("failed to compile confidential pattern")?,
        })
    }

    /// Evaluate all active policies for the context's tenant. Returns
    /// one result per evaluated policy; callers filter for `matched`.
    pub fn evaluate_all_policies(
        &self,
        context: &PolicyEvaluationContext,
    ) -> anyhow::Result<Vec<PolicyEvaluationResult>> {
        let all = self.policies.policies_for_tenant(&context.tenant_id)?;
        let active: Vec<SecurityPolicy> = all.into_iter().filter(|p| p.is_active).collect();
        log::debug!(
            "evaluating {} active policies for tenant {} (user {})",
            active.len(),
            context.tenant_id,
            context.user_id
        );

        let results = active
            .iter()
            .map(|policy| self.evaluate_policy(policy, context))
            .collect();
        Ok(results)
    }

    fn evaluate_policy(
        &self,
        policy: &SecurityPolicy,
        context: &PolicyEvaluationContext,
    ) -> PolicyEvaluationResult {
        if !policy
            .target_users
            .applies_to(&context.user_id, context.user_role.as_deref())
        {
            return PolicyEvaluationResult::not_matched(
                policy,
                "Policy does not target this user",
            );
        }

        let result = match &policy.rules {
            PolicyRules::Dlp { actions } => self.evaluate_dlp(policy, actions, context),
            PolicyRules::PhishingProtection => self.evaluate_phishing_protection(policy, context),
            PolicyRules::ExecutiveProtection => {
                self.evaluate_executive_protection(policy, context)
            }
            PolicyRules::BehavioralAnalysis => self.evaluate_behavioral(policy, context),
            PolicyRules::Unrecognized => {
                log::warn!(
                    "policy {} ({}) has unrecognized rules; skipping",
                    policy.id,
                    policy.name
                );
                PolicyEvaluationResult::not_matched(policy, "Unrecognized policy type")
            }
        };

        if result.matched {
            log::debug!(
                "policy {} matched for user {}: {} -> {}",
                policy.name,
                context.user_id,
                result.reason,
                result.action
            );
        }
        result
    }

    fn evaluate_dlp(
        &self,
        policy: &SecurityPolicy,
        actions: &[PolicyAction],
        context: &PolicyEvaluationContext,
    ) -> PolicyEvaluationResult {
        let text = format!("{} {}", context.subject, context.content);
        let pattern_hit = self.credit_card_pattern.is_match(&text)
            || self.ssn_pattern.is_match(&text)
            || self.confidential_pattern.is_match(&text);
        let external =
            DomainUtils::is_external_recipient(&context.from_address, &context.to_address);

        if pattern_hit && external {
            let action = if actions.contains(&PolicyAction::Block) {
                PolicyAction::Block
            } else {
                PolicyAction::Warn
            };
            PolicyEvaluationResult {
                policy_id: policy.id.clone(),
                policy_name: policy.name.clone(),
                matched: true,
                action,
                reason: "Sensitive content pattern detected in email to external recipient"
                    .to_string(),
                metadata: None,
            }
        } else {
            PolicyEvaluationResult::not_matched(policy, "No sensitive content leaving the tenant")
        }
    }

    fn evaluate_phishing_protection(
        &self,
        policy: &SecurityPolicy,
        context: &PolicyEvaluationContext,
    ) -> PolicyEvaluationResult {
        let tagged = context.threat_types.contains(&ThreatType::Phishing)
            || context
                .threat_types
                .contains(&ThreatType::ExecutiveImpersonation);

        if tagged || context.risk_score > PHISHING_RISK_BAR {
            let action = if context.risk_score > PHISHING_QUARANTINE_BAR {
                PolicyAction::Quarantine
            } else {
                PolicyAction::Block
            };
            PolicyEvaluationResult {
                policy_id: policy.id.clone(),
                policy_name: policy.name.clone(),
                matched: true,
                action,
                reason: format!(
                    "Phishing indicators present (risk score {:.2})",
                    context.risk_score
                ),
                metadata: None,
            }
        } else {
            PolicyEvaluationResult::not_matched(policy, "No phishing indicators")
        }
    }

    /// Executive protection deliberately uses a lower risk bar than the
    /// general policies: high-value targets get elevated protection.
    fn evaluate_executive_protection(
        &self,
        policy: &SecurityPolicy,
        context: &PolicyEvaluationContext,
    ) -> PolicyEvaluationResult {
        let is_protected_user = policy.target_users.lists_user(&context.user_id);
        let elevated = context.risk_score > EXECUTIVE_RISK_BAR
            || context
                .threat_types
                .contains(&ThreatType::ExecutiveImpersonation);

        if is_protected_user && elevated {
            PolicyEvaluationResult {
                policy_id: policy.id.clone(),
                policy_name: policy.name.clone(),
                matched: true,
                action: PolicyAction::Quarantine,
                reason: format!(
                    "Elevated risk ({:.2}) against protected executive account",
                    context.risk_score
                ),
                metadata: None,
            }
        } else {
            PolicyEvaluationResult::not_matched(policy, "No elevated risk for protected user")
        }
    }

    fn evaluate_behavioral(
        &self,
        policy: &SecurityPolicy,
        context: &PolicyEvaluationContext,
    ) -> PolicyEvaluationResult {
        const BEHAVIORAL_TAGS: [ThreatType; 3] = [
            ThreatType::UnusualRecipient,
            ThreatType::UnusualSendTime,
            ThreatType::LargeDataTransfer,
        ];
        let anomalous = BEHAVIORAL_TAGS
            .iter()
            .any(|t| context.threat_types.contains(t));

        if anomalous && context.risk_score > BEHAVIORAL_RISK_BAR {
            PolicyEvaluationResult {
                policy_id: policy.id.clone(),
                policy_name: policy.name.clone(),
                matched: true,
                action: PolicyAction::Warn,
                reason: "Behavior deviates from the user's historical baseline".to_string(),
                metadata: None,
            }
        } else {
            PolicyEvaluationResult::not_matched(policy, "No behavioral anomaly")
        }
    }

    /// Policy-authoring helper, not part of the per-email hot path.
    /// When the tenant has seen a burst of fresh threat intelligence,
    /// the new policy starts out tightened: high sensitivity and a
    /// lowered risk threshold.
    pub fn create_dynamic_policy(
        &self,
        tenant_id: &str,
        user_id: &str,
        template: PolicyTemplate,
    ) -> anyhow::Result<SecurityPolicy> {
        let cutoff = Utc::now() - Duration::days(DYNAMIC_INTEL_WINDOW_DAYS);
        let recent = self
            .intel
            .indicators_for_tenant(tenant_id)?
            .iter()
            .filter(|i| i.last_seen >= cutoff)
            .count();

        let mut tuning = template.tuning;
        if recent > DYNAMIC_INTEL_VOLUME {
            log::info!(
                "tenant {} has {} recent indicators; tightening dynamic policy \"{}\"",
                tenant_id,
                recent,
                template.name
            );
            tuning.sensitivity = Sensitivity::High;
            tuning.risk_threshold = Some(DYNAMIC_RISK_THRESHOLD);
        }

        let policy = SecurityPolicy {
            id: format!("dynamic-{}-{}", tenant_id, Utc::now().timestamp_millis()),
            tenant_id: tenant_id.to_string(),
            name: template.name,
            target_users: TargetUsers::Listed(vec![user_id.to_string()]),
            rules: template.rules,
            tuning,
            is_active: true,
        };
        self.policies.insert_policy(&policy)?;
        Ok(policy)
    }
}
