//! Final decision aggregation
//!
//! The route layer combines the analyzer's recommendation with the
//! per-policy decisions into one enforcement action. Provided here so
//! every caller combines them the same way: the most severe action wins.

use crate::types::{EmailAnalysisResult, PolicyAction, PolicyEvaluationResult};

#[derive(Debug, Clone)]
pub struct FinalDecision {
    pub action: PolicyAction,
    pub risk_score: f64,
    pub reasoning: String,
    /// Names of the policies that matched, in evaluation order.
    pub matched_policies: Vec<String>,
}

/// Combine the analyzer output with policy results. Severity order is
/// quarantine > block > warn > allow; non-matching policies contribute
/// nothing.
pub fn aggregate_decision(
    analysis: &EmailAnalysisResult,
    policy_results: &[PolicyEvaluationResult],
) -> FinalDecision {
    let mut action = analysis.action_recommended;
    let mut matched_policies = Vec::new();

    for result in policy_results.iter().filter(|r| r.matched) {
        action = action.max(result.action);
        matched_policies.push(result.policy_name.clone());
    }

    let reasoning = if matched_policies.is_empty() {
        format!(
            "{}: analyzer recommendation (risk {:.2}, source {})",
            action.as_str().to_uppercase(),
            analysis.risk_score,
            analysis.module_source
        )
    } else {
        format!(
            "{}: risk {:.2} via {}; matched policies: {}",
            action.as_str().to_uppercase(),
            analysis.risk_score,
            analysis.module_source,
            matched_policies.join(", ")
        )
    };

    FinalDecision {
        action,
        risk_score: analysis.risk_score,
        reasoning,
        matched_policies,
    }
}
