//! Detection modules
//!
//! Four independent heuristic sub-analyses over one email's metadata.
//! Each produces `ModuleFindings`; the analyzer aggregates them.

pub mod behavioral;
pub mod exfiltration;
pub mod misdirection;
pub mod phishing;

use crate::types::{DetectionModule, Metadata, ThreatType};

/// Common result produced by every detection module.
#[derive(Debug, Clone, Default)]
pub struct ModuleFindings {
    pub risk_score: f64,
    pub threat_types: Vec<ThreatType>,
    pub warnings: Vec<String>,
    pub metadata: Metadata,
}

impl ModuleFindings {
    /// Record one fired check. Independent checks within a module each
    /// contribute their own tag and warning, but the module risk is the
    /// max of the fired checks, never their sum.
    pub fn flag(&mut self, risk: f64, threat_type: ThreatType, warning: String) {
        self.risk_score = self.risk_score.max(risk);
        self.threat_types.push(threat_type);
        self.warnings.push(warning);
    }
}

/// Tag-to-module attribution, first match wins. An ordered table rather
/// than nested conditionals so priorities can be edited without touching
/// control flow.
pub const ATTRIBUTION_PRECEDENCE: &[(ThreatType, DetectionModule)] = &[
    (ThreatType::Phishing, DetectionModule::Defender),
    (ThreatType::KnownThreat, DetectionModule::Defender),
    (ThreatType::DataExfiltration, DetectionModule::Enforcer),
    (ThreatType::MisdirectedEmail, DetectionModule::Guardian),
    (ThreatType::UnusualRecipient, DetectionModule::Architect),
];

/// Credit a single module as the primary source of the finding, using
/// the fixed precedence order regardless of scores.
pub fn attribute_module<'a, I>(threat_types: I) -> DetectionModule
where
    I: IntoIterator<Item = &'a ThreatType> + Copy,
{
    for (tag, module) in ATTRIBUTION_PRECEDENCE {
        if threat_types.into_iter().any(|t| t == tag) {
            return *module;
        }
    }
    DetectionModule::Guardian
}
