/* src/zone.rs */

use crate::error::{Result, ZoneError};
use hickory_proto::rr::Name;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of whitespace-separated fields in SOA record content.
const SOA_FIELD_COUNT: usize = 7;

/// Lowercases a zone name and strips one trailing dot.
pub fn normalize_name(name: &str) -> String {
    let name = name.trim();
    name.strip_suffix('.').unwrap_or(name).to_lowercase()
}

/// Counts the labels of an already normalized name.
pub fn label_count(normalized: &str) -> usize {
    if normalized.is_empty() {
        0
    } else {
        normalized.split('.').count()
    }
}

/// Checks that `name` is a dot-terminated FQDN and returns its normalized form.
pub fn validate_fqdn(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed == "." {
        return Err(ZoneError::validation("zone name is empty"));
    }
    if !trimmed.ends_with('.') {
        return Err(ZoneError::validation(format!(
            "zone name {trimmed:?} is not dot-terminated"
        )));
    }
    let normalized = normalize_name(trimmed);
    if normalized.split('.').any(str::is_empty) {
        return Err(ZoneError::validation(format!(
            "zone name {trimmed:?} has an empty label"
        )));
    }
    Name::from_ascii(trimmed)
        .map_err(|e| ZoneError::validation(format!("zone name {trimmed:?}: {e}")))?;
    Ok(normalized)
}

/// `hostmaster.example.com.` -> `hostmaster@example.com`
///
/// Only the first dot is replaced, so local parts containing dots come out
/// wrong. Existing SOA data is written this way, so the transform is kept.
pub fn admin_email_to_display(dotted: &str) -> String {
    let dotted = dotted.strip_suffix('.').unwrap_or(dotted);
    dotted.replacen('.', "@", 1)
}

/// `hostmaster@example.com` -> `hostmaster.example.com.`
pub fn admin_email_to_dotted(display: &str) -> String {
    let dotted = display.replacen('@', ".", 1);
    if dotted.ends_with('.') {
        dotted
    } else {
        format!("{dotted}.")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    #[default]
    Master,
    Slave,
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneKind::Master => write!(f, "master"),
            ZoneKind::Slave => write!(f, "slave"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    #[serde(rename = "type")]
    pub rtype: String,
    pub ttl: u32,
    pub content: String,
}

impl Record {
    pub fn is_type(&self, rtype: &str) -> bool {
        self.rtype.eq_ignore_ascii_case(rtype)
    }
}

/// Parsed SOA content, with the admin mailbox in display form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Soa {
    pub primary_ns: String,
    pub admin_email: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum_ttl: u32,
}

impl Soa {
    /// Parses `<mname> <rname> <serial> <refresh> <retry> <expire> <minimum>`.
    pub fn parse(content: &str) -> Result<Self> {
        let fields: Vec<&str> = content.split_whitespace().collect();
        if fields.len() != SOA_FIELD_COUNT {
            return Err(ZoneError::validation(format!(
                "SOA content must have {SOA_FIELD_COUNT} fields, got {}: {content:?}",
                fields.len()
            )));
        }
        let number = |idx: usize, what: &str| -> Result<u32> {
            fields[idx].parse::<u32>().map_err(|_| {
                ZoneError::validation(format!("SOA {what} {:?} is not a number", fields[idx]))
            })
        };

        Ok(Soa {
            primary_ns: fields[0].to_string(),
            admin_email: admin_email_to_display(fields[1]),
            serial: number(2, "serial")?,
            refresh: number(3, "refresh")?,
            retry: number(4, "retry")?,
            expire: number(5, "expire")?,
            minimum_ttl: number(6, "minimum")?,
        })
    }

    pub fn to_content(&self) -> String {
        format!(
            "{} {} {} {} {} {} {}",
            self.primary_ns,
            admin_email_to_dotted(&self.admin_email),
            self.serial,
            self.refresh,
            self.retry,
            self.expire,
            self.minimum_ttl
        )
    }
}

/// A zone as handed out by storage. Never mutated in place once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Equal to the zone's FQDN.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: ZoneKind,
    #[serde(default)]
    pub nameservers: Vec<String>,
    #[serde(default)]
    pub dnssec: bool,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub serial: u32,
    #[serde(default)]
    pub record_count: usize,
    /// Empty in listings, filled by `get_zone`.
    #[serde(default)]
    pub records: Vec<Record>,
}

impl Zone {
    pub fn new(name: &str) -> Self {
        Zone {
            id: name.to_string(),
            name: name.to_string(),
            kind: ZoneKind::default(),
            nameservers: Vec::new(),
            dnssec: false,
            account: String::new(),
            serial: 0,
            record_count: 0,
            records: Vec::new(),
        }
    }

    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn soa_record(&self) -> Option<&Record> {
        self.records.iter().find(|r| r.is_type("SOA"))
    }

    pub fn soa(&self) -> Result<Soa> {
        let record = self
            .soa_record()
            .ok_or_else(|| ZoneError::validation(format!("zone {} has no SOA record", self.id)))?;
        Soa::parse(&record.content)
    }

    /// TTL of the SOA record, used as the zone's default TTL.
    pub fn default_ttl(&self) -> Option<u32> {
        self.soa_record().map(|r| r.ttl)
    }

    /// Copy without records, as returned by zone listings.
    pub fn listing(&self) -> Zone {
        Zone {
            record_count: self.records.len(),
            records: Vec::new(),
            ..self.clone()
        }
    }
}
