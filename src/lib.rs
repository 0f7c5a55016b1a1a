pub mod analyzer;
pub mod config;
pub mod decision;
pub mod detection;
pub mod domain_utils;
pub mod policy_engine;
pub mod store;
pub mod types;

pub use analyzer::EmailRiskAnalyzer;
pub use config::AnalyzerConfig;
pub use decision::{aggregate_decision, FinalDecision};
pub use domain_utils::DomainUtils;
pub use policy_engine::PolicyEngine;
pub use store::{BehaviorProfileStore, MemoryStore, PolicyStore, ThreatIntelSource};
pub use types::{
    EmailAnalysisRequest, EmailAnalysisResult, PolicyAction, PolicyEvaluationContext,
    PolicyEvaluationResult, PolicyTemplate, SecurityPolicy, ThreatIndicator, ThreatType,
};
