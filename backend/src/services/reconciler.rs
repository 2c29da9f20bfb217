use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::constants::RECONCILE_DELAY_SECS;
use crate::services::gateway::{InterestStore, StoreError};
use crate::services::notify::NotificationSink;

/// Deferred second chance for the mutuality check.
///
/// When the inline check after an interest write cannot complete (store
/// flapping, read-after-write lag), the coordinator schedules exactly one
/// re-check here. It fires once after a fixed delay; if it fails too, we
/// log and stop, and the next mutual action re-triggers the check naturally.
#[derive(Clone)]
pub struct MatchReconciler {
    store: Arc<dyn InterestStore>,
    notifier: Arc<dyn NotificationSink>,
    delay: Duration,
}

impl MatchReconciler {
    pub fn new(store: Arc<dyn InterestStore>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            store,
            notifier,
            delay: Duration::from_secs(RECONCILE_DELAY_SECS),
        }
    }

    /// Spawns the one-shot re-check. Never blocks the caller; the handle is
    /// returned so tests can await completion, request paths drop it.
    pub fn schedule(&self, from_user_id: &str, to_user_id: &str) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let delay = self.delay;
        let from = from_user_id.to_string();
        let to = to_user_id.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if let Err(e) = recheck(store.as_ref(), notifier.as_ref(), &from, &to).await {
                error!(
                    "❌ Deferred mutuality re-check for {} -> {} failed: {}",
                    from, to, e
                );
            }
        })
    }
}

async fn recheck(
    store: &dyn InterestStore,
    notifier: &dyn NotificationSink,
    from: &str,
    to: &str,
) -> Result<(), StoreError> {
    // The actor may have withdrawn the request during the delay, so unlike
    // the inline check this one reads both directions.
    if !store.interest_exists(from, to).await? {
        info!("Request {} -> {} withdrawn, nothing to reconcile", from, to);
        return Ok(());
    }

    if !store.interest_exists(to, from).await? {
        return Ok(());
    }

    if store.find_match(from, to).await?.is_none() {
        let created = store.create_match(from, to).await?;
        info!(
            "🎯 Reconciliation created match {} for {} <-> {}",
            created.id, created.user_a, created.user_b
        );
        notifier.match_created(&created.user_a, &created.user_b);
    }

    Ok(())
}
