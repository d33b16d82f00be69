use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::session::SessionClient;

/// Runs [`SessionClient::heartbeat_tick`] every `period` until the client is dropped.
///
/// Only a weak reference is held, so the task never keeps the client alive;
/// it ends on the first tick after the last strong handle goes away.
pub(crate) fn spawn(
    handle: &tokio::runtime::Handle,
    client: Weak<SessionClient>,
    period: Duration,
) -> JoinHandle<()> {
    handle.spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(client) = client.upgrade() else {
                tracing::debug!("Session client dropped, stopping heartbeat");
                break;
            };
            client.heartbeat_tick().await;
        }
    })
}
