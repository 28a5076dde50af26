/* src/file_store.rs */

use crate::error::{Result, ZoneError};
use crate::storage::{ZonePatch, ZoneSpec, ZoneStorage};
use crate::zone::{Record, Soa, Zone, normalize_name, validate_fqdn};
use async_trait::async_trait;
use fancy_log::{LogLevel, log};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_ZONES_TEMPLATE: &str = r#"
# Zones known to zone-tree. Names must be fully qualified (dot-terminated).
# SOA content: "<primary ns> <admin mailbox> <serial> <refresh> <retry> <expire> <minimum>"

[[zones]]
name = "example.com."
kind = "master"
nameservers = ["ns1.example.com.", "ns2.example.com."]

[[zones.records]]
name = "example.com."
type = "SOA"
ttl = 3600
content = "ns1.example.com. hostmaster.example.com. 2024010100 10800 3600 604800 3600"

# A delegated child; shows up nested under example.com.
[[zones]]
name = "sub.example.com."
kind = "master"
nameservers = ["ns1.example.com.", "ns2.example.com."]

[[zones.records]]
name = "sub.example.com."
type = "SOA"
ttl = 3600
content = "ns1.example.com. hostmaster.example.com. 2024010100 10800 3600 604800 3600"
"#;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ZoneFile {
    #[serde(default)]
    zones: Vec<Zone>,
}

/// Zone storage kept in a TOML file. Every mutation rewrites the file.
pub struct FileStorage {
    path: PathBuf,
    zones: RwLock<Vec<Zone>>,
}

impl FileStorage {
    /// Opens `path`, writing an example zone file first if it does not exist.
    pub fn load_or_create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            log(
                LogLevel::Warn,
                &format!("Zone file not found. Creating default at {:?}", path),
            );
            if let Some(parent_dir) = path.parent() {
                fs::create_dir_all(parent_dir)?;
            }
            fs::write(&path, DEFAULT_ZONES_TEMPLATE)?;
        }
        Self::open(path)
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let zones = read_zone_file(&path)?;
        log(
            LogLevel::Info,
            &format!("Loaded {} zones from {:?}", zones.len(), path),
        );
        if zones.is_empty() {
            log(LogLevel::Warn, "Zone file loaded, but no zones are defined.");
        }
        Ok(Self {
            path,
            zones: RwLock::new(zones),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, zones: &[Zone]) -> Result<()> {
        let file = ZoneFile {
            zones: zones.to_vec(),
        };
        fs::write(&self.path, toml::to_string(&file)?)?;
        Ok(())
    }
}

fn read_zone_file(path: &Path) -> Result<Vec<Zone>> {
    let raw = fs::read_to_string(path)?;
    let file: ZoneFile = toml::from_str(&raw)?;
    Ok(file
        .zones
        .into_iter()
        .map(|mut zone| {
            if zone.id.is_empty() {
                zone.id = zone.name.clone();
            }
            zone.record_count = zone.records.len();
            zone
        })
        .collect())
}

fn position(zones: &[Zone], id: &str) -> Option<usize> {
    zones.iter().position(|z| z.id == id).or_else(|| {
        let wanted = normalize_name(id);
        zones.iter().position(|z| z.normalized_name() == wanted)
    })
}

fn is_apex_ns(record: &Record, zone_name: &str) -> bool {
    record.is_type("NS") && normalize_name(&record.name) == normalize_name(zone_name)
}

#[async_trait]
impl ZoneStorage for FileStorage {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        Ok(self.zones.read().iter().map(Zone::listing).collect())
    }

    async fn get_zone(&self, id: &str) -> Result<Zone> {
        let zones = self.zones.read();
        position(&zones, id)
            .map(|idx| zones[idx].clone())
            .ok_or_else(|| ZoneError::NotFound(id.to_string()))
    }

    async fn delete_zone(&self, id: &str) -> Result<()> {
        let mut zones = self.zones.write();
        let idx = position(&zones, id).ok_or_else(|| ZoneError::NotFound(id.to_string()))?;
        let mut next = zones.clone();
        next.remove(idx);
        self.save(&next)?;
        *zones = next;
        Ok(())
    }

    async fn update_zone(&self, id: &str, patch: ZonePatch) -> Result<()> {
        let mut zones = self.zones.write();
        let idx = position(&zones, id).ok_or_else(|| ZoneError::NotFound(id.to_string()))?;
        // Memory only changes once the file write has gone through.
        let mut next = zones.clone();
        let zone = &mut next[idx];

        if let Some(nameservers) = patch.nameservers {
            for ns in &nameservers {
                validate_fqdn(ns)?;
            }
            let ttl = zone
                .records
                .iter()
                .find(|r| is_apex_ns(r, &zone.name))
                .map(|r| r.ttl)
                .or_else(|| zone.default_ttl())
                .unwrap_or(crate::inheritance::DEFAULT_ZONE_TTL);
            let zone_name = zone.name.clone();
            zone.records.retain(|r| !is_apex_ns(r, &zone_name));
            zone.records.extend(nameservers.iter().map(|ns| Record {
                name: zone_name.clone(),
                rtype: "NS".to_string(),
                ttl,
                content: ns.clone(),
            }));
            zone.nameservers = nameservers;
        }
        if let Some(kind) = patch.kind {
            zone.kind = kind;
        }
        if let Some(account) = patch.account {
            zone.account = account;
        }
        if let Some(dnssec) = patch.dnssec {
            zone.dnssec = dnssec;
        }
        zone.record_count = zone.records.len();
        self.save(&next)?;
        *zones = next;
        Ok(())
    }

    async fn create_zone(&self, spec: ZoneSpec) -> Result<Zone> {
        validate_fqdn(&spec.name)?;
        let mut zones = self.zones.write();
        if position(&zones, &spec.name).is_some() {
            return Err(ZoneError::validation(format!(
                "zone {} already exists",
                spec.name
            )));
        }

        let soa = Soa {
            primary_ns: spec.primary_ns.clone(),
            admin_email: spec.admin_email.clone(),
            serial: spec.serial,
            refresh: spec.refresh,
            retry: spec.retry,
            expire: spec.expire,
            minimum_ttl: spec.minimum_ttl,
        };
        let mut records = vec![Record {
            name: spec.name.clone(),
            rtype: "SOA".to_string(),
            ttl: spec.default_ttl,
            content: soa.to_content(),
        }];
        records.extend(spec.nameservers.iter().map(|ns| Record {
            name: spec.name.clone(),
            rtype: "NS".to_string(),
            ttl: spec.default_ttl,
            content: ns.clone(),
        }));

        let zone = Zone {
            id: spec.name.clone(),
            name: spec.name,
            kind: spec.kind,
            nameservers: spec.nameservers,
            dnssec: spec.dnssec,
            account: spec.account,
            serial: spec.serial,
            record_count: records.len(),
            records,
        };
        let mut next = zones.clone();
        next.push(zone.clone());
        self.save(&next)?;
        *zones = next;
        Ok(zone)
    }

    async fn ping(&self) -> Result<()> {
        fs::metadata(&self.path)
            .map(|_| ())
            .map_err(|e| ZoneError::backend(format!("{:?} unavailable: {}", self.path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inheritance::ZoneDraft;

    #[tokio::test]
    async fn creates_template_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStorage::load_or_create(dir.path().join("zones.toml")).unwrap();
        let zones = store.list_zones().await.unwrap();
        assert_eq!(zones.len(), 2);
        assert!(zones.iter().all(|z| z.records.is_empty()));
        assert_eq!(zones[0].record_count, 1);

        let full = store.get_zone("example.com.").await.unwrap();
        assert_eq!(full.soa().unwrap().admin_email, "hostmaster@example.com");
    }

    #[tokio::test]
    async fn mutations_are_written_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones.toml");
        let store = FileStorage::load_or_create(&path).unwrap();

        let mut draft = ZoneDraft::new("new.example.com.");
        draft.nameservers = vec!["ns9.example.net.".into()];
        store.create_zone(draft.into_spec().unwrap()).await.unwrap();
        store
            .update_zone(
                "example.com.",
                ZonePatch::nameservers(vec!["ns3.example.org.".into()]),
            )
            .await
            .unwrap();
        store.delete_zone("sub.example.com.").await.unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        let ids: Vec<_> = reopened
            .list_zones()
            .await
            .unwrap()
            .into_iter()
            .map(|z| z.id)
            .collect();
        assert_eq!(ids, vec!["example.com.", "new.example.com."]);

        let parent = reopened.get_zone("example.com.").await.unwrap();
        assert_eq!(parent.nameservers, vec!["ns3.example.org."]);
        let ns: Vec<_> = parent.records.iter().filter(|r| r.is_type("NS")).collect();
        assert_eq!(ns.len(), 1);
        assert_eq!(ns[0].content, "ns3.example.org.");

        let created = reopened.get_zone("new.example.com.").await.unwrap();
        assert_eq!(created.soa().unwrap().admin_email, "hostmaster@new.example.com");
        assert_eq!(created.record_count, 2);
    }

    #[tokio::test]
    async fn missing_zone_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStorage::load_or_create(dir.path().join("zones.toml")).unwrap();
        assert!(matches!(
            store.delete_zone("nope.com.").await,
            Err(ZoneError::NotFound(_))
        ));
        assert!(matches!(
            store.get_zone("nope.com.").await,
            Err(ZoneError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStorage::load_or_create(dir.path().join("zones.toml")).unwrap();
        let mut draft = ZoneDraft::new("example.com.");
        draft.nameservers = vec!["ns1.example.com.".into()];
        assert!(matches!(
            store.create_zone(draft.into_spec().unwrap()).await,
            Err(ZoneError::Validation(_))
        ));
    }

    async fn ids(store: &FileStorage) -> Vec<String> {
        store
            .list_zones()
            .await
            .unwrap()
            .into_iter()
            .map(|z| z.id)
            .collect()
    }

    #[tokio::test]
    async fn failed_write_leaves_zones_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones.toml");
        let store = FileStorage::load_or_create(&path).unwrap();

        // A directory in place of the file makes every save fail.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(matches!(
            store.delete_zone("sub.example.com.").await,
            Err(ZoneError::Io(_))
        ));
        assert_eq!(ids(&store).await, vec!["example.com.", "sub.example.com."]);

        assert!(
            store
                .update_zone(
                    "example.com.",
                    ZonePatch::nameservers(vec!["ns3.example.org.".into()]),
                )
                .await
                .is_err()
        );
        let parent = store.get_zone("example.com.").await.unwrap();
        assert_eq!(
            parent.nameservers,
            vec!["ns1.example.com.", "ns2.example.com."]
        );

        let mut draft = ZoneDraft::new("new.example.com.");
        draft.nameservers = vec!["ns9.example.net.".into()];
        assert!(store.create_zone(draft.into_spec().unwrap()).await.is_err());
        assert_eq!(ids(&store).await, vec!["example.com.", "sub.example.com."]);
    }

    #[tokio::test]
    async fn ping_fails_once_file_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones.toml");
        let store = FileStorage::load_or_create(&path).unwrap();
        assert!(store.ping().await.is_ok());
        fs::remove_file(&path).unwrap();
        assert!(matches!(store.ping().await, Err(ZoneError::Backend(_))));
    }
}
