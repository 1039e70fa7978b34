use paso_core::types::ChangeDescriptor;
use paso_ipc::{EventClient, EventEnvelope};

/// Best-effort publish of a change to the daemon's event fabric. Never
/// fails the calling command: the database is the source of truth, and a
/// missed event is reconciled by the next full reload.
pub async fn publish_best_effort(change: ChangeDescriptor) {
    let client = EventClient::connect(paso_core::logging::socket_path());
    client.publish(EventEnvelope::unsequenced(change));
    // Give the background task a brief window to connect and flush before
    // the short-lived CLI process exits.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    client.close().await;
}
