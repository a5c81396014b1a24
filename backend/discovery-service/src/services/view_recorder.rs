//! Best-effort view counting

use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::db::CatalogStore;
use crate::metrics;

pub struct ViewRecorder {
    store: Arc<dyn CatalogStore>,
}

impl ViewRecorder {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Increments view counters on a detached task. Failures are logged and
    /// dropped; callers never await the handle on the request path.
    pub fn record<I>(&self, pack_ids: I, viewer_id: Option<String>) -> JoinHandle<()>
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = HashSet::new();
        let pack_ids: Vec<String> = pack_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        let store = Arc::clone(&self.store);

        tokio::spawn(async move {
            if pack_ids.is_empty() {
                return;
            }

            match store.increment_views(&pack_ids, viewer_id.clone()).await {
                Ok(updated) => {
                    debug!(
                        requested = pack_ids.len(),
                        updated = updated,
                        viewer_id = ?viewer_id,
                        "Recorded pack views"
                    );
                    metrics::record_view_recording("success");
                }
                Err(e) => {
                    warn!(
                        count = pack_ids.len(),
                        error = %e,
                        "Failed to record pack views"
                    );
                    metrics::record_view_recording("error");
                }
            }
        })
    }
}
