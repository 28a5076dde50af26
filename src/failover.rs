/* src/failover.rs */

use crate::error::Result;
use crate::storage::{ZonePatch, ZoneSpec, ZoneStorage};
use crate::zone::Zone;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fancy_log::{LogLevel, log};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Primary,
    Fallback,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Primary => write!(f, "primary"),
            Backend::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendStatus {
    pub active: Backend,
    pub last_checked: Option<DateTime<Utc>>,
}

/// Routes storage calls to the primary backend, or to the fallback while the
/// primary's health probe is failing.
pub struct FailoverStorage {
    primary: Arc<dyn ZoneStorage>,
    fallback: Option<Arc<dyn ZoneStorage>>,
    status: Arc<RwLock<BackendStatus>>,
}

impl FailoverStorage {
    pub fn new(primary: Arc<dyn ZoneStorage>, fallback: Option<Arc<dyn ZoneStorage>>) -> Self {
        Self {
            primary,
            fallback,
            status: Arc::new(RwLock::new(BackendStatus {
                active: Backend::Primary,
                last_checked: None,
            })),
        }
    }

    pub fn status(&self) -> BackendStatus {
        *self.status.read()
    }

    fn active(&self) -> &dyn ZoneStorage {
        match (self.status.read().active, &self.fallback) {
            (Backend::Fallback, Some(fallback)) => fallback.as_ref(),
            _ => self.primary.as_ref(),
        }
    }

    /// Probes the primary once and updates the routing status.
    pub async fn check_now(&self) -> Backend {
        probe(&self.primary, self.fallback.is_some(), &self.status).await
    }

    /// Spawns the periodic health probe. Runs until the runtime shuts down.
    pub fn start_health_task(&self, interval: Duration) -> JoinHandle<()> {
        let primary = self.primary.clone();
        let has_fallback = self.fallback.is_some();
        let status = self.status.clone();
        tokio::spawn(async move {
            loop {
                probe(&primary, has_fallback, &status).await;
                sleep(interval).await;
            }
        })
    }
}

async fn probe(
    primary: &Arc<dyn ZoneStorage>,
    has_fallback: bool,
    status: &RwLock<BackendStatus>,
) -> Backend {
    let outcome = primary.ping().await;
    let mut current = status.write();
    current.last_checked = Some(Utc::now());
    match outcome {
        Ok(()) => {
            if current.active != Backend::Primary {
                log(
                    LogLevel::Info,
                    "Primary zone backend is available again, switching back.",
                );
                current.active = Backend::Primary;
            }
        }
        Err(e) if has_fallback => {
            if current.active == Backend::Primary {
                log(
                    LogLevel::Warn,
                    &format!(
                        "Primary zone backend unavailable ({}). Routing to fallback.",
                        e
                    ),
                );
                current.active = Backend::Fallback;
            }
        }
        Err(e) => {
            log(
                LogLevel::Warn,
                &format!("Primary zone backend unavailable and no fallback is configured: {}", e),
            );
        }
    }
    current.active
}

#[async_trait]
impl ZoneStorage for FailoverStorage {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        self.active().list_zones().await
    }

    async fn get_zone(&self, id: &str) -> Result<Zone> {
        self.active().get_zone(id).await
    }

    async fn delete_zone(&self, id: &str) -> Result<()> {
        self.active().delete_zone(id).await
    }

    async fn update_zone(&self, id: &str, patch: ZonePatch) -> Result<()> {
        self.active().update_zone(id, patch).await
    }

    async fn create_zone(&self, spec: ZoneSpec) -> Result<Zone> {
        self.active().create_zone(spec).await
    }

    async fn ping(&self) -> Result<()> {
        self.active().ping().await
    }
}
