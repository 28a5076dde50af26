/* src/cascade.rs */

use crate::error::{Result, ZoneError};
use crate::storage::{ZoneDirectory, ZonePatch, ZoneStorage};
use crate::zone::{Zone, label_count, normalize_name};
use fancy_log::{LogLevel, log};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CascadeScope {
    #[default]
    SelfOnly,
    SelfAndDescendants,
}

/// True when `name` sits anywhere below `ancestor`, whether or not the zones
/// in between exist.
pub fn is_descendant(name: &str, ancestor: &str) -> bool {
    let name = normalize_name(name);
    let ancestor = normalize_name(ancestor);
    name != ancestor && name.ends_with(&format!(".{ancestor}"))
}

/// The concrete targets of a cascade, root first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeSelection {
    pub root_id: String,
    pub scope: CascadeScope,
    pub ids: Vec<String>,
}

impl CascadeSelection {
    /// Expands `root_id` against the snapshot.
    ///
    /// Descendants are ordered deepest first, then by name, so children go
    /// before the zones they were delegated from.
    pub fn select(
        directory: &impl ZoneDirectory,
        root_id: &str,
        scope: CascadeScope,
    ) -> Result<Self> {
        let root = directory
            .get_all()
            .iter()
            .find(|z| z.id == root_id)
            .or_else(|| directory.get_by_name(root_id))
            .ok_or_else(|| ZoneError::NotFound(root_id.to_string()))?;

        let mut ids = vec![root.id.clone()];
        if scope == CascadeScope::SelfAndDescendants {
            let mut descendants: Vec<&Zone> = directory
                .get_all()
                .iter()
                .filter(|z| z.id != root.id && is_descendant(&z.name, &root.name))
                .collect();
            // Deepest first, then by name.
            descendants.sort_by_cached_key(|z| {
                let name = z.normalized_name();
                (Reverse(label_count(&name)), name)
            });
            ids.extend(descendants.into_iter().map(|z| z.id.clone()));
        }

        Ok(CascadeSelection {
            root_id: root.id.clone(),
            scope,
            ids,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CascadeOperation {
    Delete,
    Export,
    ReplaceNameservers(Vec<String>),
}

impl fmt::Display for CascadeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeOperation::Delete => write!(f, "delete"),
            CascadeOperation::Export => write!(f, "export"),
            CascadeOperation::ReplaceNameservers(_) => write!(f, "nameserver replace"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CascadeProgress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub succeeded_ids: Vec<String>,
    pub failed_items: Vec<FailedItem>,
    /// Zones fetched by an export, in execution order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exported: Vec<Zone>,
}

impl CascadeReport {
    pub fn total(&self) -> usize {
        self.succeeded_ids.len() + self.failed_items.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed_items.is_empty()
    }

    /// `Err(PartialCascadeFailure)` when any item failed.
    pub fn into_result(self) -> Result<Self> {
        if self.failed_items.is_empty() {
            Ok(self)
        } else {
            Err(ZoneError::PartialCascadeFailure {
                failed: self.failed_items.len(),
                total: self.total(),
            })
        }
    }
}

/// Runs one operation over a target list, strictly one item at a time.
///
/// Items are independent: a failure is recorded and the next item runs.
/// There is no rollback and no way to stop a run once it has started.
pub struct CascadeExecutor<'a> {
    storage: &'a dyn ZoneStorage,
}

impl<'a> CascadeExecutor<'a> {
    pub fn new(storage: &'a dyn ZoneStorage) -> Self {
        Self { storage }
    }

    pub async fn execute(&self, operation: &CascadeOperation, ids: &[String]) -> CascadeReport {
        self.execute_with_progress(operation, ids, |_| {}).await
    }

    /// Like `execute`, calling `on_progress` after every item.
    pub async fn execute_with_progress<F>(
        &self,
        operation: &CascadeOperation,
        ids: &[String],
        mut on_progress: F,
    ) -> CascadeReport
    where
        F: FnMut(CascadeProgress),
    {
        let total = ids.len();
        let mut report = CascadeReport::default();

        for (idx, id) in ids.iter().enumerate() {
            match self.apply(operation, id).await {
                Ok(exported) => {
                    report.succeeded_ids.push(id.clone());
                    if let Some(zone) = exported {
                        report.exported.push(zone);
                    }
                }
                Err(e) => {
                    log(
                        LogLevel::Warn,
                        &format!("Cascade {} failed for {}: {}", operation, id, e),
                    );
                    report.failed_items.push(FailedItem {
                        id: id.clone(),
                        error: e.to_string(),
                    });
                }
            }
            on_progress(CascadeProgress {
                completed: idx + 1,
                total,
            });
        }

        log(
            LogLevel::Info,
            &format!(
                "Cascade {} finished: {} succeeded, {} failed",
                operation,
                report.succeeded_ids.len(),
                report.failed_items.len()
            ),
        );
        report
    }

    async fn apply(&self, operation: &CascadeOperation, id: &str) -> Result<Option<Zone>> {
        match operation {
            CascadeOperation::Delete => self.storage.delete_zone(id).await.map(|_| None),
            CascadeOperation::Export => self.storage.get_zone(id).await.map(Some),
            CascadeOperation::ReplaceNameservers(nameservers) => self
                .storage
                .update_zone(id, ZonePatch::nameservers(nameservers.clone()))
                .await
                .map(|_| None),
        }
    }
}
