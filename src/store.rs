//! Collaborator interfaces
//!
//! The core consumes threat intelligence, behavior profiles, and tenant
//! policies through these traits; the route/storage layers own the
//! implementations. `MemoryStore` is the in-process implementation used
//! by the demo binary and tests.

use crate::types::{BehaviorProfile, SecurityPolicy, ThreatIndicator};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// Known malicious indicators for a tenant. Read-only during scoring.
pub trait ThreatIntelSource: Send + Sync {
    fn indicators_for_tenant(&self, tenant_id: &str) -> Result<Vec<ThreatIndicator>>;
}

/// Per-user historical communication baselines.
pub trait BehaviorProfileStore: Send + Sync {
    fn profile(&self, user_id: &str) -> Result<Option<BehaviorProfile>>;
    fn upsert_profile(&self, user_id: &str, profile: &BehaviorProfile) -> Result<()>;
}

/// Tenant policy sets.
pub trait PolicyStore: Send + Sync {
    fn policies_for_tenant(&self, tenant_id: &str) -> Result<Vec<SecurityPolicy>>;
    fn insert_policy(&self, policy: &SecurityPolicy) -> Result<()>;
}

/// In-memory store backing all three collaborator traits. Each map is
/// guarded by its own mutex; an upsert is atomic, but the analyzer's
/// read-then-create of a profile is not serialized across callers
/// (last writer wins, matching the upstream system).
#[derive(Default)]
pub struct MemoryStore {
    indicators: Mutex<HashMap<String, Vec<ThreatIndicator>>>,
    profiles: Mutex<HashMap<String, BehaviorProfile>>,
    policies: Mutex<HashMap<String, Vec<SecurityPolicy>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn add_indicator(&self, tenant_id: &str, indicator: ThreatIndicator) -> Result<()> {
        let mut indicators = self
            .indicators
            .lock()
            .map_err(|_| anyhow!("threat intel store lock poisoned"))?;
        indicators
            .entry(tenant_id.to_string())
            .or_default()
            .push(indicator);
        Ok(())
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl ThreatIntelSource for MemoryStore {
    fn indicators_for_tenant(&self, tenant_id: &str) -> Result<Vec<ThreatIndicator>> {
        let indicators = self
            .indicators
            .lock()
            .map_err(|_| anyhow!("threat intel store lock poisoned"))?;
        Ok(indicators.get(tenant_id).cloned().unwrap_or_default())
    }
}

impl BehaviorProfileStore for MemoryStore {
    fn profile(&self, user_id: &str) -> Result<Option<BehaviorProfile>> {
        let profiles = self
            .profiles
            .lock()
            .map_err(|_| anyhow!("behavior profile store lock poisoned"))?;
        Ok(profiles.get(user_id).cloned())
    }

    fn upsert_profile(&self, user_id: &str, profile: &BehaviorProfile) -> Result<()> {
        let mut profiles = self
            .profiles
            .lock()
            .map_err(|_| anyhow!("behavior profile store lock poisoned"))?;
        profiles.insert(user_id.to_string(), profile.clone());
        Ok(())
    }
}

impl PolicyStore for MemoryStore {
    fn policies_for_tenant(&self, tenant_id: &str) -> Result<Vec<SecurityPolicy>> {
        let policies = self
            .policies
            .lock()
            .map_err(|_| anyhow!("policy store lock poisoned"))?;
        Ok(policies.get(tenant_id).cloned().unwrap_or_default())
    }

    fn insert_policy(&self, policy: &SecurityPolicy) -> Result<()> {
        let mut policies = self
            .policies
            .lock()
            .map_err(|_| anyhow!("policy store lock poisoned"))?;
        policies
            .entry(policy.tenant_id.clone())
            .or_default()
            .push(policy.clone());
        Ok(())
    }
}
