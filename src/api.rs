//! HTTP surface for the engine. Read endpoints carry OpenAPI docs; mutating
//! endpoints are mounted as plain routes.

use std::sync::Arc;

use chrono::Utc;
use rocket::http::Status as HttpStatus;
use rocket::response::status::{Created, Custom, NotFound};
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::State;
use rocket_okapi::openapi;
use schemars::JsonSchema;

use crate::engine::types::{ActionCard, AttackRecord, ConsumptionStamp, Move, Vault};
use crate::engine::{EngineState, ItemRef, SiegeCommand, UpgradeReceipt};
use crate::error::EngineError;
use crate::status_messages::{new_status, Status};

/// Shared engine state managed by Rocket.
pub type Engine = Arc<rocket::futures::lock::Mutex<EngineState>>;

fn to_response(e: &EngineError) -> Custom<Json<Status>> {
    let code = match e {
        EngineError::ItemNotFound { .. } => HttpStatus::NotFound,
        EngineError::ConcurrentWriteConflict => HttpStatus::Conflict,
        _ => HttpStatus::BadRequest,
    };
    Custom(code, new_status(e.to_string()))
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct RegisterRequest {
    pub owner_id: String,
    /// The player's authoritative currency balance at registration.
    pub balance: i64,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct SiegeRequest {
    pub attacker_id: String,
    pub target_id: String,
    pub item: ItemRef,
    /// Equipped-modifier multiplier; defaults to 1.0.
    pub modifier: Option<f64>,
    /// Replayed offline events reuse their original stamp.
    pub stamp: Option<ConsumptionStamp>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct UpgradeRequest {
    pub owner_id: String,
    pub item: ItemRef,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct CollectRequest {
    pub owner_id: String,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct CollectResponse {
    pub collected: i64,
    pub vault: Option<Vault>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct SeedRequest {
    pub seed: u64,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct RestoreRequest {
    pub owner_id: String,
}

/// Vault snapshot; stale daily allowances roll over on read.
#[openapi]
#[get("/vault/<owner>")]
pub async fn get_vault(
    engine: &State<Engine>,
    owner: &str,
) -> Result<Json<Vault>, NotFound<Json<Status>>> {
    let mut state = engine.lock().await;
    state
        .vault_refreshed(owner, Utc::now())
        .map(Json)
        .ok_or_else(|| NotFound(new_status(format!("No vault for {owner}"))))
}

/// The player's move collection.
#[openapi]
#[get("/moves/<owner>")]
pub async fn list_moves(
    engine: &State<Engine>,
    owner: &str,
) -> Result<Json<Vec<Move>>, NotFound<Json<Status>>> {
    let state = engine.lock().await;
    state
        .moves_of(owner)
        .cloned()
        .map(Json)
        .ok_or_else(|| NotFound(new_status(format!("No collection for {owner}"))))
}

/// The player's action cards.
#[openapi]
#[get("/cards/<owner>")]
pub async fn list_cards(
    engine: &State<Engine>,
    owner: &str,
) -> Result<Json<Vec<ActionCard>>, NotFound<Json<Status>>> {
    let state = engine.lock().await;
    state
        .cards_of(owner)
        .cloned()
        .map(Json)
        .ok_or_else(|| NotFound(new_status(format!("No collection for {owner}"))))
}

/// Append-only attack stream, oldest first.
#[openapi]
#[get("/attack-log")]
pub async fn list_attack_log(engine: &State<Engine>) -> Json<Vec<AttackRecord>> {
    let state = engine.lock().await;
    Json(state.attack_log.entries())
}

#[post("/players", format = "json", data = "<req>")]
pub async fn register_player(
    engine: &State<Engine>,
    req: Json<RegisterRequest>,
) -> Created<Json<Vault>> {
    let mut state = engine.lock().await;
    let vault = state.ensure_player(&req.owner_id, req.balance, Utc::now());
    Created::new(format!("/vault/{}", req.owner_id)).body(Json(vault))
}

#[post("/siege", format = "json", data = "<req>")]
pub async fn siege(
    engine: &State<Engine>,
    req: Json<SiegeRequest>,
) -> Result<Json<AttackRecord>, Custom<Json<Status>>> {
    let req = req.into_inner();
    let cmd = SiegeCommand {
        attacker_id: req.attacker_id,
        target_id: req.target_id,
        item: req.item,
        modifier: req.modifier.unwrap_or(1.0),
        stamp: req.stamp,
    };
    let mut state = engine.lock().await;
    state
        .attack(&cmd, Utc::now())
        .map(Json)
        .map_err(|e| to_response(&e))
}

#[post("/upgrade", format = "json", data = "<req>")]
pub async fn upgrade(
    engine: &State<Engine>,
    req: Json<UpgradeRequest>,
) -> Result<Json<UpgradeReceipt>, Custom<Json<Status>>> {
    let mut state = engine.lock().await;
    state
        .upgrade(&req.owner_id, &req.item, Utc::now())
        .map(Json)
        .map_err(|e| to_response(&e))
}

#[post("/collect", format = "json", data = "<req>")]
pub async fn collect(
    engine: &State<Engine>,
    req: Json<CollectRequest>,
) -> Result<Json<CollectResponse>, Custom<Json<Status>>> {
    let mut state = engine.lock().await;
    let collected = state
        .collect(&req.owner_id, Utc::now())
        .map_err(|e| to_response(&e))?;
    let vault = state.vault(&req.owner_id);
    Ok(Json(CollectResponse { collected, vault }))
}

#[post("/restore", format = "json", data = "<req>")]
pub async fn restore(
    engine: &State<Engine>,
    req: Json<RestoreRequest>,
) -> Result<Json<Vault>, Custom<Json<Status>>> {
    let mut state = engine.lock().await;
    state
        .restore_vault(&req.owner_id, Utc::now())
        .map(Json)
        .map_err(|e| to_response(&e))
}

#[post("/seed", format = "json", data = "<req>")]
pub async fn set_seed(engine: &State<Engine>, req: Json<SeedRequest>) -> HttpStatus {
    let mut state = engine.lock().await;
    state.set_seed(req.seed);
    HttpStatus::Created
}
