/* src/expansion.rs */

use crate::error::Result;
use crate::storage::ZoneDirectory;
use fancy_log::{LogLevel, log};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Expand/collapse flags keyed by zone id. Unknown ids read as collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpansionState(BTreeMap<String, bool>);

impl ExpansionState {
    pub fn get(&self, id: &str) -> bool {
        self.0.get(id).copied().unwrap_or(false)
    }

    pub fn set(&mut self, id: &str, expanded: bool) {
        if expanded {
            self.0.insert(id.to_string(), true);
        } else {
            self.0.remove(id);
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// On-disk preference document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub expanded: ExpansionState,
    /// Whether zone lists are shown as a tree rather than flat.
    #[serde(default = "default_hierarchy_view")]
    pub hierarchy_view: bool,
}

fn default_hierarchy_view() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            expanded: ExpansionState::default(),
            hierarchy_view: default_hierarchy_view(),
        }
    }
}

/// Persists expansion flags across sessions. Every change is written through.
///
/// Ids are never checked against the current zone list; flags for removed
/// zones just sit in the file.
pub struct ExpansionStateStore {
    path: Option<PathBuf>,
    prefs: Mutex<Preferences>,
}

impl ExpansionStateStore {
    /// Opens the preference file, starting empty when it is missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let prefs = match load_preferences(&path) {
            Ok(Some(prefs)) => prefs,
            Ok(None) => Preferences::default(),
            Err(e) => {
                log(
                    LogLevel::Warn,
                    &format!(
                        "Could not read preferences from {:?}, starting fresh: {}",
                        path, e
                    ),
                );
                Preferences::default()
            }
        };
        Self {
            path: Some(path),
            prefs: Mutex::new(prefs),
        }
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            prefs: Mutex::new(Preferences::default()),
        }
    }

    pub fn get_expansion(&self, id: &str) -> bool {
        self.prefs.lock().expanded.get(id)
    }

    pub fn set_expansion(&self, id: &str, expanded: bool) -> Result<()> {
        let mut prefs = self.prefs.lock();
        prefs.expanded.set(id, expanded);
        self.persist(&prefs)
    }

    /// Flips the flag and returns the new value.
    pub fn toggle(&self, id: &str) -> Result<bool> {
        let mut prefs = self.prefs.lock();
        let expanded = !prefs.expanded.get(id);
        prefs.expanded.set(id, expanded);
        self.persist(&prefs)?;
        Ok(expanded)
    }

    pub fn expand_all<I, S>(&self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefs = self.prefs.lock();
        for id in ids {
            prefs.expanded.set(id.as_ref(), true);
        }
        self.persist(&prefs)
    }

    pub fn collapse_all(&self) -> Result<()> {
        let mut prefs = self.prefs.lock();
        prefs.expanded.clear();
        self.persist(&prefs)
    }

    pub fn hierarchy_view(&self) -> bool {
        self.prefs.lock().hierarchy_view
    }

    pub fn set_hierarchy_view(&self, enabled: bool) -> Result<()> {
        let mut prefs = self.prefs.lock();
        prefs.hierarchy_view = enabled;
        self.persist(&prefs)
    }

    /// Copy of the current flags, for building view models.
    pub fn state(&self) -> ExpansionState {
        self.prefs.lock().expanded.clone()
    }

    fn persist(&self, prefs: &Preferences) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent_dir) = path.parent() {
            fs::create_dir_all(parent_dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(prefs)?)?;
        Ok(())
    }
}

/// Maps user-typed zone names onto stored zone ids.
///
/// An exact id wins; otherwise the name is looked up case-insensitively with
/// the trailing dot optional. Names matching no zone are logged and skipped.
pub fn resolve_zone_ids<I, S>(directory: &impl ZoneDirectory, names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter_map(|name| {
            let name = name.as_ref();
            let found = directory
                .get_all()
                .iter()
                .find(|z| z.id == name)
                .or_else(|| directory.get_by_name(name));
            if found.is_none() {
                log(LogLevel::Warn, &format!("No zone matches {:?}, skipping", name));
            }
            found.map(|z| z.id.clone())
        })
        .collect()
}

fn load_preferences(path: &Path) -> Result<Option<Preferences>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ZoneSnapshot;
    use crate::zone::Zone;

    #[test]
    fn unknown_ids_default_to_collapsed() {
        let store = ExpansionStateStore::in_memory();
        assert!(!store.get_expansion("example.com."));
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = ExpansionStateStore::in_memory();
        store.set_expansion("example.com.", true).unwrap();
        assert!(store.get_expansion("example.com."));
        store.set_expansion("example.com.", false).unwrap();
        assert!(!store.get_expansion("example.com."));
    }

    #[test]
    fn collapse_all_resets_everything() {
        let store = ExpansionStateStore::in_memory();
        store.expand_all(["a.com.", "b.com.", "c.com."]).unwrap();
        assert!(store.get_expansion("b.com."));
        store.collapse_all().unwrap();
        for id in ["a.com.", "b.com.", "c.com.", "never-seen.com."] {
            assert!(!store.get_expansion(id));
        }
    }

    #[test]
    fn toggle_flips_flag() {
        let store = ExpansionStateStore::in_memory();
        assert!(store.toggle("a.com.").unwrap());
        assert!(!store.toggle("a.com.").unwrap());
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("preferences.json");

        let store = ExpansionStateStore::open(&path);
        store.set_expansion("example.com.", true).unwrap();
        store.set_expansion("gone.example.com.", true).unwrap();
        store.set_hierarchy_view(false).unwrap();
        drop(store);

        let reopened = ExpansionStateStore::open(&path);
        assert!(reopened.get_expansion("example.com."));
        assert!(reopened.get_expansion("gone.example.com."));
        assert!(!reopened.hierarchy_view());
    }

    #[test]
    fn typed_names_resolve_to_stored_ids() {
        let snapshot = ZoneSnapshot::new(vec![
            Zone::new("example.com."),
            Zone::new("Sub.Example.com."),
        ]);
        let ids = resolve_zone_ids(
            &snapshot,
            ["example.com", "SUB.example.com.", "missing.com."],
        );
        assert_eq!(ids, vec!["example.com.", "Sub.Example.com."]);

        let store = ExpansionStateStore::in_memory();
        store.expand_all(&ids).unwrap();
        assert!(store.get_expansion("Sub.Example.com."));
        assert!(!store.get_expansion("missing.com."));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "{ not json").unwrap();

        let store = ExpansionStateStore::open(&path);
        assert!(!store.get_expansion("example.com."));
        assert!(store.hierarchy_view());
        store.set_expansion("example.com.", true).unwrap();
        assert!(ExpansionStateStore::open(&path).get_expansion("example.com."));
    }
}
