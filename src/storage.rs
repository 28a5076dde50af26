/* src/storage.rs */

use crate::error::Result;
use crate::zone::{Zone, ZoneKind, normalize_name, validate_fqdn};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fields accepted by `ZoneStorage::update_zone`. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZonePatch {
    pub nameservers: Option<Vec<String>>,
    pub kind: Option<ZoneKind>,
    pub account: Option<String>,
    pub dnssec: Option<bool>,
}

impl ZonePatch {
    pub fn nameservers(nameservers: Vec<String>) -> Self {
        ZonePatch {
            nameservers: Some(nameservers),
            ..Default::default()
        }
    }
}

/// Everything needed to create a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub name: String,
    pub kind: ZoneKind,
    pub nameservers: Vec<String>,
    pub primary_ns: String,
    /// Display form, `hostmaster@example.com`.
    pub admin_email: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum_ttl: u32,
    pub default_ttl: u32,
    pub dnssec: bool,
    pub account: String,
}

/// The zone storage collaborator. Every call may fail with a backend error.
#[async_trait]
pub trait ZoneStorage: Send + Sync {
    async fn list_zones(&self) -> Result<Vec<Zone>>;

    /// Returns the zone including its records.
    async fn get_zone(&self, id: &str) -> Result<Zone>;

    async fn delete_zone(&self, id: &str) -> Result<()>;

    async fn update_zone(&self, id: &str, patch: ZonePatch) -> Result<()>;

    async fn create_zone(&self, spec: ZoneSpec) -> Result<Zone>;

    /// Cheap availability probe used by the health task.
    async fn ping(&self) -> Result<()> {
        self.list_zones().await.map(|_| ())
    }
}

/// Read-only queries over a zone snapshot.
pub trait ZoneDirectory {
    fn get_all(&self) -> &[Zone];

    /// Case-insensitive, trailing dot optional.
    fn get_by_name(&self, name: &str) -> Option<&Zone>;
}

/// An immutable zone list indexed by normalized name.
///
/// Zones whose names fail FQDN validation stay in `get_all` but are never
/// returned by `get_by_name`, matching their exclusion from the hierarchy.
#[derive(Debug, Clone, Default)]
pub struct ZoneSnapshot {
    zones: Vec<Zone>,
    by_name: HashMap<String, usize>,
}

impl ZoneSnapshot {
    pub fn new(zones: Vec<Zone>) -> Self {
        let mut by_name = HashMap::with_capacity(zones.len());
        for (idx, zone) in zones.iter().enumerate() {
            let Ok(normalized) = validate_fqdn(&zone.name) else {
                continue;
            };
            // First valid occurrence wins for duplicate names.
            by_name.entry(normalized).or_insert(idx);
        }
        ZoneSnapshot { zones, by_name }
    }

    /// Fetches a fresh snapshot from storage.
    pub async fn load(storage: &dyn ZoneStorage) -> Result<Self> {
        Ok(Self::new(storage.list_zones().await?))
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl ZoneDirectory for ZoneSnapshot {
    fn get_all(&self) -> &[Zone] {
        &self.zones
    }

    fn get_by_name(&self, name: &str) -> Option<&Zone> {
        self.by_name
            .get(&normalize_name(name))
            .map(|&idx| &self.zones[idx])
    }
}
