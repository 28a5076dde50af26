use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use zone_tree::{
    CascadeExecutor, CascadeOperation, CascadeProgress, CascadeScope, CascadeSelection, Result,
    Zone, ZoneError, ZonePatch, ZoneSnapshot, ZoneSpec, ZoneStorage,
};

/// Records every call and fails the ones listed in `failing`.
struct RecordingStorage {
    zones: Vec<Zone>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl RecordingStorage {
    fn new(names: &[&str], failing: &[&str]) -> Self {
        Self {
            zones: names.iter().map(|n| Zone::new(n)).collect(),
            failing: failing.iter().map(|s| s.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn check(&self, op: &str, id: &str) -> Result<()> {
        self.calls.lock().push(format!("{op} {id}"));
        if self.failing.contains(id) {
            Err(ZoneError::backend(format!("{op} {id} refused")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ZoneStorage for RecordingStorage {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        Ok(self.zones.clone())
    }

    async fn get_zone(&self, id: &str) -> Result<Zone> {
        self.check("get", id)?;
        self.zones
            .iter()
            .find(|z| z.id == id)
            .cloned()
            .ok_or_else(|| ZoneError::NotFound(id.to_string()))
    }

    async fn delete_zone(&self, id: &str) -> Result<()> {
        self.check("delete", id)
    }

    async fn update_zone(&self, id: &str, patch: ZonePatch) -> Result<()> {
        let ns = patch.nameservers.unwrap_or_default().join(",");
        self.check(&format!("update[{ns}]"), id)
    }

    async fn create_zone(&self, spec: ZoneSpec) -> Result<Zone> {
        Err(ZoneError::backend(format!("create {} unsupported", spec.name)))
    }
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn delete_with_one_failure_completes_every_item() {
    let storage = RecordingStorage::new(&[], &["b.example.com."]);
    let targets = ids(&["a.example.com.", "b.example.com.", "c.example.com."]);

    let report = CascadeExecutor::new(&storage)
        .execute(&CascadeOperation::Delete, &targets)
        .await;

    assert_eq!(report.succeeded_ids, ids(&["a.example.com.", "c.example.com."]));
    assert_eq!(report.failed_items.len(), 1);
    assert_eq!(report.failed_items[0].id, "b.example.com.");
    assert!(report.failed_items[0].error.contains("refused"));
    assert_eq!(storage.calls.lock().len(), 3);
    assert!(matches!(
        report.into_result(),
        Err(ZoneError::PartialCascadeFailure { failed: 1, total: 3 })
    ));
}

#[tokio::test]
async fn progress_is_reported_after_each_item_in_order() {
    let storage = RecordingStorage::new(&[], &["a."]);
    let targets = ids(&["a.", "b.", "c."]);
    let mut seen: Vec<CascadeProgress> = Vec::new();

    CascadeExecutor::new(&storage)
        .execute_with_progress(&CascadeOperation::Delete, &targets, |p| seen.push(p))
        .await;

    let completed: Vec<_> = seen.iter().map(|p| p.completed).collect();
    assert_eq!(completed, vec![1, 2, 3]);
    assert!(seen.iter().all(|p| p.total == 3));
    assert_eq!(
        *storage.calls.lock(),
        vec!["delete a.", "delete b.", "delete c."]
    );
}

#[tokio::test]
async fn replace_nameservers_sends_same_list_to_every_target() {
    let storage = RecordingStorage::new(&[], &[]);
    let op = CascadeOperation::ReplaceNameservers(ids(&["ns1.example.net.", "ns2.example.net."]));

    let report = CascadeExecutor::new(&storage)
        .execute(&op, &ids(&["example.com.", "sub.example.com."]))
        .await;

    assert!(report.is_complete_success());
    assert_eq!(
        *storage.calls.lock(),
        vec![
            "update[ns1.example.net.,ns2.example.net.] example.com.",
            "update[ns1.example.net.,ns2.example.net.] sub.example.com.",
        ]
    );
}

#[tokio::test]
async fn export_collects_zones_and_records_missing_targets() {
    let storage = RecordingStorage::new(&["example.com.", "a.example.com."], &[]);
    let snapshot = ZoneSnapshot::load(&storage).await.unwrap();
    let mut selection =
        CascadeSelection::select(&snapshot, "example.com.", CascadeScope::SelfAndDescendants)
            .unwrap();
    // Target removed between selection and execution.
    selection.ids.push("gone.example.com.".to_string());

    let report = CascadeExecutor::new(&storage)
        .execute(&CascadeOperation::Export, &selection.ids)
        .await;

    let exported: Vec<_> = report.exported.iter().map(|z| z.id.as_str()).collect();
    assert_eq!(exported, vec!["example.com.", "a.example.com."]);
    assert_eq!(report.failed_items.len(), 1);
    assert!(report.failed_items[0].error.contains("not found"));
}

#[tokio::test]
async fn empty_target_list_is_a_success() {
    let storage = RecordingStorage::new(&[], &[]);
    let report = CascadeExecutor::new(&storage)
        .execute(&CascadeOperation::Delete, &[])
        .await;
    assert_eq!(report.total(), 0);
    assert!(report.into_result().is_ok());
}
