use num_derive::FromPrimitive;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Application-level result codes carried in the `code` field of every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum ResponseCode {
    Success = 200,
    Unauthorized = 401,
}

/// `devicesType` discriminator of a station's device list row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum DeviceType {
    Inverter = 0,
}

impl DeviceType {
    pub fn from_value(value: &Value) -> Option<DeviceType> {
        value.as_u64().and_then(num::FromPrimitive::from_u64)
    }
}

/// Rejected response: either the session is no longer accepted or the call failed otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    Unauthorized(String),
    Rejected(String),
}

/// Payload of a successful `user/login`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub token: String,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

/// Inspect the `code` of a decoded (HTTP 200) response and carry the value forward only when
/// it signals success.
pub fn map_response_code(value: Value) -> Result<Value, Failure> {
    let code = value.get("code").and_then(Value::as_u64);

    match code.and_then(num::FromPrimitive::from_u64) {
        Some(ResponseCode::Success) => Ok(value),
        /* {"code":401,"msg":"token expired"} */
        Some(ResponseCode::Unauthorized) => Err(Failure::Unauthorized(value.to_string())),
        None => Err(Failure::Rejected(value.to_string())),
    }
}

/// `data` object of a successful response, empty when missing or not an object.
pub fn data(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Object(data)) => data,
            _ => Map::new(),
        },
        _ => Map::new(),
    }
}

/// `rows` array of a successful paginated response.
pub fn rows(value: Value) -> Vec<Value> {
    match value {
        Value::Object(mut map) => match map.remove("rows") {
            Some(Value::Array(rows)) => rows,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
