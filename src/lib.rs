//! # Vault Siege
//!
//! Battle/economy engine for a gamified learning platform: per-player vaults
//! holding Power Points (PP), shield and health pools, unlockable moves and
//! consumable cards, and a siege mechanic where damaging another player's
//! vault transfers currency.
//!
//! ## Architecture
//!
//! The pure engine (damage resolution, daily cycles, upgrade curves,
//! reconciliation) lives under [`engine`] and computes against explicitly
//! loaded vault snapshots; a single transactional commit through [`store`]
//! applies the result. The API is built on the Rocket web framework with
//! OpenAPI documentation, and shared state is held behind an async mutex for
//! concurrent request access.

#[macro_use]
extern crate rocket;

use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::{make_swagger_ui, SwaggerUIConfig};

pub mod api;
pub mod engine;
pub mod error;
pub mod status_messages;
pub mod store;

/// Initializes and configures the Rocket web server with all routes and
/// OpenAPI documentation.
///
/// # Example
///
/// ```no_run
/// use vault_siege::rocket_initialize;
///
/// #[rocket::main]
/// async fn main() {
///     rocket_initialize().launch().await.expect("Failed to launch rocket");
/// }
/// ```
pub fn rocket_initialize() -> rocket::Rocket<rocket::Build> {
    use crate::api::okapi_add_operation_for_get_vault_;
    use crate::api::okapi_add_operation_for_list_attack_log_;
    use crate::api::okapi_add_operation_for_list_cards_;
    use crate::api::okapi_add_operation_for_list_moves_;
    use crate::api::{get_vault, list_attack_log, list_cards, list_moves};

    #[allow(clippy::no_effect_underscore_binding)]
    let _ = env_logger::try_init();

    use rocket::fairing::AdHoc;

    let engine = std::sync::Arc::new(rocket::futures::lock::Mutex::new(
        engine::EngineState::new(),
    ));

    rocket::build()
        .mount(
            "/",
            openapi_get_routes![get_vault, list_moves, list_cards, list_attack_log],
        )
        .mount("/swagger", make_swagger_ui(&get_docs()))
        .mount(
            "/",
            rocket::routes![
                api::register_player,
                api::siege,
                api::upgrade,
                api::collect,
                api::restore,
                api::set_seed,
            ],
        )
        .manage(engine.clone())
        .attach(AdHoc::on_liftoff("attacklog-shutdown", |rocket| {
            Box::pin(async move {
                // When the process receives SIGINT/SIGTERM (or ctrl-c), flush
                // the attack log writer.
                if let Some(state) = rocket.state::<api::Engine>().cloned() {
                    rocket::tokio::spawn(async move {
                        #[cfg(unix)]
                        {
                            use rocket::tokio::signal::unix::{signal, SignalKind};
                            let mut sigterm = signal(SignalKind::terminate())
                                .expect("failed to set SIGTERM handler");
                            let mut sigint = signal(SignalKind::interrupt())
                                .expect("failed to set SIGINT handler");
                            rocket::tokio::select! {
                                _ = sigterm.recv() => {},
                                _ = sigint.recv() => {},
                            }
                        }
                        #[cfg(not(unix))]
                        {
                            let _ = rocket::tokio::signal::ctrl_c().await;
                        }

                        let engine = state.lock().await;
                        engine.shutdown();
                    });
                }
            })
        }))
}

fn get_docs() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/openapi.json".to_string(),
        ..Default::default()
    }
}
