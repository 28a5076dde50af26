/* src/inheritance.rs */

use crate::error::{Result, ZoneError};
use crate::hierarchy::ancestor_candidates;
use crate::storage::{ZoneDirectory, ZoneSpec, ZoneStorage};
use crate::zone::{Zone, ZoneKind, normalize_name, validate_fqdn};
use chrono::Utc;
use fancy_log::{LogLevel, log};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REFRESH: u32 = 10800;
pub const DEFAULT_RETRY: u32 = 3600;
pub const DEFAULT_EXPIRE: u32 = 604800;
pub const DEFAULT_MINIMUM_TTL: u32 = 3600;
pub const DEFAULT_ZONE_TTL: u32 = 3600;

/// Which groups of values to copy from the ancestor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceToggles {
    pub nameservers: bool,
    pub soa: bool,
    pub ttl: bool,
}

impl InheritanceToggles {
    pub fn all() -> Self {
        Self {
            nameservers: true,
            soa: true,
            ttl: true,
        }
    }

    pub fn any(&self) -> bool {
        self.nameservers || self.soa || self.ttl
    }
}

/// Values for a zone that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDraft {
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

impl ZoneDraft {
    /// Draft with stock timers and a `YYYYMMDD01` serial for today.
    pub fn new(name: &str) -> Self {
        let serial = Utc::now()
            .format("%Y%m%d01")
            .to_string()
            .parse()
            .unwrap_or(1);
        ZoneDraft {
            name: name.to_string(),
            kind: ZoneKind::Master,
            nameservers: Vec::new(),
            primary_ns: String::new(),
            admin_email: format!("hostmaster@{}", normalize_name(name)),
            serial,
            refresh: DEFAULT_REFRESH,
            retry: DEFAULT_RETRY,
            expire: DEFAULT_EXPIRE,
            minimum_ttl: DEFAULT_MINIMUM_TTL,
            default_ttl: DEFAULT_ZONE_TTL,
            dnssec: false,
            account: String::new(),
        }
    }

    /// Checks the draft and turns it into a create request.
    ///
    /// An empty primary nameserver falls back to the first listed nameserver.
    pub fn into_spec(self) -> Result<ZoneSpec> {
        validate_fqdn(&self.name)?;
        if self.nameservers.is_empty() {
            return Err(ZoneError::validation(format!(
                "zone {} needs at least one nameserver",
                self.name
            )));
        }
        for ns in &self.nameservers {
            validate_fqdn(ns)?;
        }
        let primary_ns = if self.primary_ns.is_empty() {
            self.nameservers[0].clone()
        } else {
            self.primary_ns
        };
        validate_fqdn(&primary_ns)?;
        if !self.admin_email.contains('@') {
            return Err(ZoneError::validation(format!(
                "admin email {:?} has no '@'",
                self.admin_email
            )));
        }

        Ok(ZoneSpec {
            name: self.name,
            kind: self.kind,
            nameservers: self.nameservers,
            primary_ns,
            admin_email: self.admin_email,
            serial: self.serial,
            refresh: self.refresh,
            retry: self.retry,
            expire: self.expire,
            minimum_ttl: self.minimum_ttl,
            default_ttl: self.default_ttl,
            dnssec: self.dnssec,
            account: self.account,
        })
    }
}

/// The inheritance decision for one create-zone session.
///
/// Immutable; moving between steps produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct InheritanceChoice {
    toggles: InheritanceToggles,
    ancestor: Zone,
}

impl InheritanceChoice {
    pub fn new(toggles: InheritanceToggles, ancestor: Zone) -> Self {
        Self { toggles, ancestor }
    }

    pub fn toggles(&self) -> InheritanceToggles {
        self.toggles
    }

    pub fn ancestor(&self) -> &Zone {
        &self.ancestor
    }

    pub fn with_toggles(self, toggles: InheritanceToggles) -> Self {
        Self { toggles, ..self }
    }
}

/// Applies `choice` on top of `draft`. Toggles left off keep the draft's values.
pub fn resolve(draft: &ZoneDraft, choice: &InheritanceChoice) -> Result<ZoneDraft> {
    let toggles = choice.toggles();
    let ancestor = choice.ancestor();
    let mut out = draft.clone();

    if toggles.soa {
        let soa = ancestor.soa()?;
        out.primary_ns = soa.primary_ns;
        out.admin_email = soa.admin_email;
        out.refresh = soa.refresh;
        out.retry = soa.retry;
        out.expire = soa.expire;
        out.minimum_ttl = soa.minimum_ttl;
    }
    if toggles.ttl {
        out.default_ttl = ancestor.default_ttl().ok_or_else(|| {
            ZoneError::validation(format!("zone {} has no SOA record", ancestor.id))
        })?;
    }
    if toggles.nameservers {
        out.nameservers = ancestor.nameservers.clone();
    }
    Ok(out)
}

/// Outcome of a pre-fill attempt. `error` is informational; `draft` is
/// always usable.
#[derive(Debug)]
pub struct Prefill {
    pub draft: ZoneDraft,
    pub choice: Option<InheritanceChoice>,
    pub error: Option<ZoneError>,
}

pub struct InheritanceResolver<'a> {
    storage: &'a dyn ZoneStorage,
}

impl<'a> InheritanceResolver<'a> {
    pub fn new(storage: &'a dyn ZoneStorage) -> Self {
        Self { storage }
    }

    /// Loads the ancestor and applies the toggles. Never fails: on any error
    /// the draft comes back untouched with the error attached.
    pub async fn prefill(
        &self,
        draft: &ZoneDraft,
        ancestor_id: &str,
        toggles: InheritanceToggles,
    ) -> Prefill {
        if !toggles.any() {
            return Prefill {
                draft: draft.clone(),
                choice: None,
                error: None,
            };
        }

        let ancestor = match self.storage.get_zone(ancestor_id).await {
            Ok(zone) => zone,
            Err(e) => {
                log(
                    LogLevel::Warn,
                    &format!(
                        "Could not load {} to inherit settings, keeping defaults: {}",
                        ancestor_id, e
                    ),
                );
                return Prefill {
                    draft: draft.clone(),
                    choice: None,
                    error: Some(e),
                };
            }
        };

        let choice = InheritanceChoice::new(toggles, ancestor);
        match resolve(draft, &choice) {
            Ok(resolved) => Prefill {
                draft: resolved,
                choice: Some(choice),
                error: None,
            },
            Err(e) => {
                log(
                    LogLevel::Warn,
                    &format!(
                        "Could not inherit from {}, keeping defaults: {}",
                        ancestor_id, e
                    ),
                );
                Prefill {
                    draft: draft.clone(),
                    choice: None,
                    error: Some(e),
                }
            }
        }
    }
}

/// Nearest existing zone a new zone named `name` would sit under.
pub fn suggest_ancestor<'d>(name: &str, directory: &'d impl ZoneDirectory) -> Option<&'d Zone> {
    let normalized = normalize_name(name);
    ancestor_candidates(&normalized).find_map(|(_, candidate)| directory.get_by_name(&candidate))
}
