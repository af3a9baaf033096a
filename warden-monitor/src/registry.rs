//! Service registry
//!
//! Holds the last known state of every service. The registry is a plain
//! owned value handed to the poller and the controller; it performs no
//! network calls of its own.
//!
//! Every write replaces the whole view at once, so readers never see a
//! service assembled from two different points in time. Writers tag each
//! replacement with a sequence number taken when their network call was
//! issued; a replacement older than the current view is discarded.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::debug;
use warden_core::domain::health::HealthSnapshot;
use warden_core::domain::service::Service;

/// An immutable view of the registry at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    /// Sequence number of the write that produced this view (0 = never written)
    pub sequence: u64,

    /// Services ordered by name
    pub services: Vec<Service>,

    /// Overall status label from the last health snapshot
    pub status: Option<String>,

    /// Overall health flag from the last health snapshot
    pub all_healthy: Option<bool>,

    /// When this view was applied
    pub updated_at: Option<DateTime<Utc>>,
}

impl RegistrySnapshot {
    pub fn get(&self, name: &str) -> Option<&Service> {
        self.services
            .binary_search_by(|service| service.name.as_str().cmp(name))
            .ok()
            .map(|index| &self.services[index])
    }
}

/// Client-side view of every service reported by the control plane
#[derive(Debug)]
pub struct ServiceRegistry {
    current: watch::Sender<Arc<RegistrySnapshot>>,
    next_sequence: AtomicU64,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            current: watch::Sender::new(Arc::new(RegistrySnapshot::default())),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Issues the sequence number for a write whose network call starts now
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Atomically replaces every service
    ///
    /// Returns `false` (and leaves the registry untouched) when a write with
    /// an equal or newer sequence number has already been applied.
    pub fn replace_all(&self, sequence: u64, services: Vec<Service>) -> bool {
        self.apply(sequence, services, None, None)
    }

    /// Atomically replaces every service with the contents of a health snapshot
    pub fn apply_snapshot(&self, sequence: u64, snapshot: &HealthSnapshot) -> bool {
        self.apply(
            sequence,
            snapshot.to_services(),
            Some(snapshot.status.clone()),
            Some(snapshot.all_healthy),
        )
    }

    fn apply(
        &self,
        sequence: u64,
        services: Vec<Service>,
        status: Option<String>,
        all_healthy: Option<bool>,
    ) -> bool {
        // Last record wins when a name repeats
        let services: Vec<Service> = services
            .into_iter()
            .map(|service| (service.name.clone(), service))
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .collect();

        let applied = self.current.send_if_modified(|current| {
            if sequence <= current.sequence {
                return false;
            }

            *current = Arc::new(RegistrySnapshot {
                sequence,
                services,
                status,
                all_healthy,
                updated_at: Some(Utc::now()),
            });
            true
        });

        if !applied {
            debug!("Discarding out-of-order registry write #{}", sequence);
        }

        applied
    }

    /// Current view of the registry
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.borrow().clone()
    }

    /// Every service, ordered by name
    pub fn get_all(&self) -> Vec<Service> {
        self.snapshot().services.clone()
    }

    /// A single service, `None` when it is not in the current view
    pub fn get(&self, name: &str) -> Option<Service> {
        self.snapshot().get(name).cloned()
    }

    /// Receiver woken on every applied replacement
    pub fn subscribe(&self) -> watch::Receiver<Arc<RegistrySnapshot>> {
        self.current.subscribe()
    }

    /// `(service, dependency)` pairs whose dependency is absent from the current view
    pub fn unresolved_dependencies(&self) -> Vec<(String, String)> {
        let snapshot = self.snapshot();
        let view: &RegistrySnapshot = &snapshot;

        view.services
            .iter()
            .flat_map(|service| {
                service
                    .depends_on
                    .iter()
                    .filter(move |dependency| view.get(dependency).is_none())
                    .map(move |dependency| (service.name.clone(), dependency.clone()))
            })
            .collect()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeSet;

    pub(crate) fn service(name: &str, running: bool, healthy: bool) -> Service {
        Service {
            name: name.to_string(),
            status: if running { "running" } else { "stopped" }.to_string(),
            running,
            healthy,
            uptime_seconds: if running { 60 } else { 0 },
            last_error: None,
            depends_on: BTreeSet::new(),
        }
    }

    fn names(registry: &ServiceRegistry) -> Vec<String> {
        registry.get_all().into_iter().map(|s| s.name).collect()
    }

    #[test]
    fn test_empty_registry() {
        let registry = ServiceRegistry::new();
        assert!(registry.get_all().is_empty());
        assert!(registry.get("db").is_none());
        assert_eq!(registry.snapshot().sequence, 0);
    }

    #[test]
    fn test_replace_all_keeps_nothing_from_previous_view() {
        let registry = ServiceRegistry::new();

        let seq = registry.next_sequence();
        assert!(registry.replace_all(seq, vec![service("db", true, true), service("api", true, false)]));

        let seq = registry.next_sequence();
        assert!(registry.replace_all(seq, vec![service("worker", false, false)]));

        assert_eq!(names(&registry), vec!["worker"]);
        assert!(registry.get("db").is_none());
    }

    #[test]
    fn test_get_all_is_ordered_by_name() {
        let registry = ServiceRegistry::new();
        let seq = registry.next_sequence();
        registry.replace_all(
            seq,
            vec![service("worker", false, false), service("api", true, true), service("db", true, true)],
        );

        assert_eq!(names(&registry), vec!["api", "db", "worker"]);
        assert!(registry.get("db").unwrap().running);
    }

    #[test]
    fn test_out_of_order_write_is_rejected() {
        let registry = ServiceRegistry::new();

        // A slow poll issued first, then a fast command-triggered refresh
        let slow = registry.next_sequence();
        let fast = registry.next_sequence();

        assert!(registry.replace_all(fast, vec![service("api", false, false)]));
        assert!(!registry.replace_all(slow, vec![service("api", true, true)]));

        assert!(!registry.get("api").unwrap().running);
        assert_eq!(registry.snapshot().sequence, fast);
    }

    #[test]
    fn test_final_state_follows_sequence_order() {
        let registry = ServiceRegistry::new();
        let sequences: Vec<u64> = (0..4).map(|_| registry.next_sequence()).collect();

        // Arrival order 3, 1, 4, 2
        for &index in &[2usize, 0, 3, 1] {
            registry.replace_all(
                sequences[index],
                vec![service(&format!("svc-{}", index), true, true)],
            );
        }

        assert_eq!(names(&registry), vec!["svc-3"]);
    }

    #[test]
    fn test_apply_snapshot_records_overall_status() {
        let registry = ServiceRegistry::new();
        let snapshot: HealthSnapshot = serde_json::from_str(
            r#"{"status": "warning", "all_healthy": false, "services": {
                "db": {"running": true, "healthy": true, "uptime": 5}
            }}"#,
        )
        .unwrap();

        let seq = registry.next_sequence();
        assert!(registry.apply_snapshot(seq, &snapshot));

        let view = registry.snapshot();
        assert_eq!(view.status.as_deref(), Some("warning"));
        assert_eq!(view.all_healthy, Some(false));
        assert!(view.updated_at.is_some());
        assert_eq!(view.services.len(), 1);
    }

    #[test]
    fn test_subscribers_see_applied_writes_only() {
        let registry = ServiceRegistry::new();
        let mut rx = registry.subscribe();

        let stale = registry.next_sequence();
        let fresh = registry.next_sequence();
        registry.replace_all(fresh, vec![service("db", true, true)]);
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();

        registry.replace_all(stale, vec![]);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_unresolved_dependencies() {
        let registry = ServiceRegistry::new();
        let mut api = service("api", true, true);
        api.depends_on.insert("db".to_string());
        api.depends_on.insert("cache".to_string());

        let seq = registry.next_sequence();
        registry.replace_all(seq, vec![api, service("db", true, true)]);

        assert_eq!(
            registry.unresolved_dependencies(),
            vec![("api".to_string(), "cache".to_string())]
        );
    }
}
