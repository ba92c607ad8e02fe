#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate prometheus;
#[macro_use]
extern crate rocket;

use invertechs_rs::settings::read_settings;
use invertechs_rs::{Context, Error};
use rocket::http::ContentType;
use rocket::State;
use std::sync::{Arc, Mutex};

mod metrics;

/// Structure containing state for API handlers.
pub struct StateData {
    context: Arc<Context>,
    /// Serializes gauge rebuilds so concurrent scrapes never see a half-reset registry.
    scrape: Mutex<()>,
}

#[get("/metrics")]
fn metrics_route(state: &State<StateData>) -> Result<String, Error> {
    let _scrape = state
        .scrape
        .lock()
        .map_err(|_| Error::Internal("metrics lock poisoned".to_string()))?;

    let snapshot = state.context.snapshot();
    metrics::update(
        state.context.entities(),
        &snapshot,
        state.context.last_refresh_ok(),
    );
    metrics::read()
}

#[get("/entities")]
fn entities_route(state: &State<StateData>) -> Result<(ContentType, String), Error> {
    let snapshot = state.context.snapshot();
    let states = state.context.entities().states(&snapshot);

    serde_json::to_string_pretty(&states)
        .map(|body| (ContentType::JSON, body))
        .map_err(|e| Error::Format(e.to_string()))
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = read_settings()?;
    let context = match Context::setup(&settings).await {
        Ok(context) => Arc::new(context),
        Err(e) => {
            log::error!("Failed to set up Invertechs account: {}", e);
            return Err(e);
        }
    };
    let refresher = tokio::spawn(Arc::clone(&context).run(settings.interval()));

    let launched = rocket::build()
        .manage(StateData {
            context: Arc::clone(&context),
            scrape: Mutex::new(()),
        })
        .mount("/", routes![metrics_route, entities_route])
        .launch()
        .await;

    refresher.abort();
    context.teardown().await;

    launched
        .map(|_| ())
        .map_err(|e| Error::Internal(e.to_string()))
}
