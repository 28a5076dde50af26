/* src/lib.rs */

//! Hierarchy, inheritance and cascade logic over a flat list of DNS zones.
//!
//! Zones are stored flat; parent/child relationships are derived from their
//! names every time a snapshot is loaded. Storage is reached only through
//! [`storage::ZoneStorage`].

pub mod cascade;
pub mod config;
pub mod error;
pub mod expansion;
pub mod failover;
pub mod file_store;
pub mod hierarchy;
pub mod inheritance;
pub mod storage;
pub mod zone;

pub use cascade::{
    CascadeExecutor, CascadeOperation, CascadeProgress, CascadeReport, CascadeScope,
    CascadeSelection, FailedItem, is_descendant,
};
pub use error::{Result, ZoneError};
pub use expansion::{ExpansionState, ExpansionStateStore};
pub use hierarchy::{Hierarchy, HierarchyNode, ZoneViewModel};
pub use inheritance::{InheritanceChoice, InheritanceResolver, InheritanceToggles, ZoneDraft};
pub use storage::{ZoneDirectory, ZonePatch, ZoneSnapshot, ZoneSpec, ZoneStorage};
pub use zone::{Record, Soa, Zone, ZoneKind};
