use crate::api::{Client, Error};
use crate::cycle;
use crate::entity::EntitySet;
use crate::model::Snapshot;
use crate::settings::Settings;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Everything one running account needs: the client, the published snapshot and the entities
/// enumerated from it.
///
/// The client lock is held for a whole cycle, so cycles never overlap and teardown waits for an
/// in-flight cycle before logging out.
pub struct Context {
    client: Mutex<Client>,
    snapshot: RwLock<Arc<Snapshot>>,
    entities: EntitySet,
    last_refresh_ok: AtomicBool,
}

impl Context {
    /// Log in, run the first cycle and enumerate entities. Fails when the credentials are
    /// rejected or the first cycle cannot reach the backend.
    pub async fn setup(settings: &Settings) -> Result<Context, Error> {
        let client = Client::new(&settings.api_url, settings.credentials(), settings.timeout())?;
        Context::with_client(client).await
    }

    pub async fn with_client(mut client: Client) -> Result<Context, Error> {
        if !client.login().await? {
            return Err(Error::Login(format!(
                "credentials for {} were rejected",
                client.display_name()
            )));
        }
        log::info!("Logged in as {}", client.display_name());

        let snapshot = cycle::refresh(&mut client).await?;
        let entities = EntitySet::enumerate(&snapshot);
        log::info!(
            "Exposing {} stations and {} inverters",
            entities.stations.len(),
            entities.inverters.len()
        );

        Ok(Context {
            client: Mutex::new(client),
            snapshot: RwLock::new(Arc::new(snapshot)),
            entities,
            last_refresh_ok: AtomicBool::new(true),
        })
    }

    /// Currently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn entities(&self) -> &EntitySet {
        &self.entities
    }

    pub fn last_refresh_ok(&self) -> bool {
        self.last_refresh_ok.load(Ordering::Relaxed)
    }

    fn publish(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    /// Run one cycle and publish its result. On failure the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<(), Error> {
        let mut client = self.client.lock().await;

        match cycle::refresh(&mut client).await {
            Ok(snapshot) => {
                self.publish(snapshot);
                self.last_refresh_ok.store(true, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.last_refresh_ok.store(false, Ordering::Relaxed);
                log::error!("Refresh failed, keeping previous snapshot: {}", e);
                Err(e)
            }
        }
    }

    /// Refresh every `interval` until the task is dropped. The first tick comes one interval
    /// after the start since setup already ran a cycle.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticks = time::interval_at(Instant::now() + interval, interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticks.tick().await;
            let _ = self.refresh().await;
        }
    }

    /// Log out if a session is still held.
    pub async fn teardown(&self) {
        let mut client = self.client.lock().await;
        match client.logout().await {
            Ok(true) => log::info!("Logged out"),
            Ok(false) => log::warn!("Logout was rejected by the backend"),
            Err(e) => log::warn!("Error while logging out: {}", e),
        }
    }
}
