use tracing::{error, info};

/// Fire-and-forget sink for user-facing outcomes. The coordinator never
/// waits on these or depends on them succeeding; an implementation that
/// pushes to a device should spawn its own task.
pub trait NotificationSink: Send + Sync {
    fn interest_recorded(&self, from_user_id: &str, to_user_id: &str);
    fn match_created(&self, user_a: &str, user_b: &str);
    fn operation_failed(&self, operation: &str, reason: &str);
}

/// Default sink: structured log events only.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn interest_recorded(&self, from_user_id: &str, to_user_id: &str) {
        info!("💌 Interest recorded: {} -> {}", from_user_id, to_user_id);
    }

    fn match_created(&self, user_a: &str, user_b: &str) {
        info!("👫 Match created: {} <-> {}", user_a, user_b);
    }

    fn operation_failed(&self, operation: &str, reason: &str) {
        error!("❌ Operation {} failed: {}", operation, reason);
    }
}
