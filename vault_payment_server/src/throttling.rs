use std::{ops::Deref, sync::Arc, time::Duration};

use log::*;
use tokio::task::JoinHandle;
use vault_payment_engine::ThrottleGuard;

/// Throttles web orders by remote IP, on top of the ledger's per-requester limit.
///
/// Web requester ids are generated by the browser, so a client can mint a fresh one for every request. The IP limit
/// catches that.
#[derive(Debug, Clone)]
pub struct IpThrottle(Arc<ThrottleGuard>);

impl IpThrottle {
    pub fn new(guard: Arc<ThrottleGuard>) -> Self {
        Self(guard)
    }

    pub fn guard(&self) -> Arc<ThrottleGuard> {
        Arc::clone(&self.0)
    }
}

impl Deref for IpThrottle {
    type Target = ThrottleGuard;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Starts the throttle janitor. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `period`, closed windows are dropped from each guard so that keys which have gone quiet do not pile up.
pub fn start_throttle_janitor(guards: Vec<Arc<ThrottleGuard>>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(period);
        info!("🕰️ Throttle janitor started");
        loop {
            timer.tick().await;
            let removed = guards.iter().map(|g| g.purge_expired()).sum::<usize>();
            let remaining = guards.iter().map(|g| g.tracked_keys()).sum::<usize>();
            debug!("🕰️ Throttle janitor removed {removed} idle windows. {remaining} still active.");
        }
    })
}
