use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;

/// JSON body returned for every rejected request.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct Status {
    pub message: String,
}

pub fn new_status<S: Into<String>>(message: S) -> Json<Status> {
    Json(Status {
        message: message.into(),
    })
}
