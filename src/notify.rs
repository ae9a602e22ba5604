use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

/// Side-effect hooks fired by the webhook state machine. Implementations
/// own delivery (calendar booking, follow-up email); the core only decides
/// when to fire them.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// A meeting/booking was agreed during the call.
    async fn booking_confirmed(&self, lead_id: Uuid, meeting_time: &str);

    /// A hot lead left an email address and should receive a follow-up.
    async fn follow_up_email(&self, lead_id: Uuid, email: &str);
}

/// Default implementation: log and move on. Calendar and email integrations
/// plug in here.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn booking_confirmed(&self, lead_id: Uuid, meeting_time: &str) {
        info!(%lead_id, meeting_time, "booking confirmed for lead");
    }

    async fn follow_up_email(&self, lead_id: Uuid, email: &str) {
        info!(%lead_id, email, "follow-up email requested for hot lead");
    }
}
