//! Pod-to-job tracking store
//!
//! Process-wide map of pod UID to scheduler job id. One entry is created
//! per successful submission and removed only by cleanup or the deletion
//! path. Concurrent submissions share this store, so it is backed by a
//! DashMap; everything else in a submission is scoped to one pod.

use dashmap::DashMap;
use std::sync::Arc;

/// Concurrency-safe pod UID -> job id store
#[derive(Debug, Clone, Default)]
pub struct JobTable {
    inner: Arc<DashMap<String, String>>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a job id for a pod. Returns false if the pod already has
    /// one, in which case the existing entry is left untouched.
    pub fn insert_if_absent(&self, pod_uid: &str, job_id: &str) -> bool {
        match self.inner.entry(pod_uid.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(v) => {
                v.insert(job_id.to_string());
                true
            }
        }
    }

    pub fn get(&self, pod_uid: &str) -> Option<String> {
        self.inner.get(pod_uid).map(|e| e.value().clone())
    }

    /// Remove a pod's entry, returning the job id it mapped to
    pub fn remove(&self, pod_uid: &str) -> Option<String> {
        self.inner.remove(pod_uid).map(|(_, jid)| jid)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_if_absent_rejects_duplicates() {
        let table = JobTable::new();
        assert!(table.insert_if_absent("pod-1", "100"));
        assert!(!table.insert_if_absent("pod-1", "200"));
        assert_eq!(table.get("pod-1").as_deref(), Some("100"));
    }

    #[test]
    fn test_remove_returns_job_id() {
        let table = JobTable::new();
        table.insert_if_absent("pod-1", "100");
        assert_eq!(table.remove("pod-1").as_deref(), Some("100"));
        assert_eq!(table.remove("pod-1"), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let table = JobTable::new();
        let other = table.clone();
        table.insert_if_absent("pod-1", "100");
        assert_eq!(other.get("pod-1").as_deref(), Some("100"));
        assert_eq!(other.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_keep_one_entry_per_pod() {
        let table = JobTable::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let t = table.clone();
            handles.push(tokio::spawn(async move {
                t.insert_if_absent("pod-1", &i.to_string());
                t.insert_if_absent(&format!("pod-{}", i), &i.to_string());
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        // pod-1 inserted by the winner plus 15 distinct pods (pod-0..pod-15
        // includes pod-1 itself)
        assert_eq!(table.len(), 16);
        assert!(table.get("pod-1").is_some());
    }
}
