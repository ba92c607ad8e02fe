use crate::api::response::DeviceType;
use serde_json::{Map, Value};

/// Raw JSON object as delivered by the vendor backend.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub profile: Record,
}

impl Session {
    pub fn display_name(&self) -> Option<&str> {
        self.profile.get("nickName").and_then(Value::as_str)
    }
}

/// Power plant, keyed by the vendor `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: String,
    pub envelope: Record,
    pub details: Option<Record>,
    pub devices: Vec<Device>,
}

impl Station {
    /// Build a station from a `station/UI2Page` row. Rows without an identifier are skipped.
    pub fn from_row(row: Value) -> Option<Station> {
        let envelope = match row {
            Value::Object(map) => map,
            _ => return None,
        };
        let id = envelope.get("id").and_then(identifier)?;

        Some(Station {
            id,
            envelope,
            details: None,
            devices: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        self.envelope
            .get("stationName")
            .and_then(Value::as_str)
            .unwrap_or(&self.id)
    }

    pub fn inverters(&self) -> impl Iterator<Item = &Inverter> {
        self.devices.iter().filter_map(|d| d.inverter.as_ref())
    }
}

/// Row of a station's device list.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub device_type: Option<i64>,
    pub envelope: Record,
    pub inverter: Option<Inverter>,
}

impl Device {
    /// Inverter-class rows with an embedded `wnStationVo` get their `Inverter` attached.
    pub fn from_row(row: Value) -> Option<Device> {
        let mut envelope = match row {
            Value::Object(map) => map,
            _ => return None,
        };
        let device_type = envelope.get("devicesType").and_then(Value::as_i64);
        let is_inverter = envelope
            .get("devicesType")
            .and_then(DeviceType::from_value)
            .map_or(false, |t| t == DeviceType::Inverter);

        let inverter = if is_inverter {
            match envelope.remove("wnStationVo") {
                Some(Value::Object(vo)) if !vo.is_empty() => Inverter::from_envelope(vo),
                _ => None,
            }
        } else {
            None
        };

        Some(Device {
            device_type,
            envelope,
            inverter,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inverter {
    pub id: String,
    pub envelope: Record,
    pub details: Option<Record>,
}

impl Inverter {
    pub fn from_envelope(envelope: Record) -> Option<Inverter> {
        let id = envelope.get("wnId").and_then(identifier)?;
        Some(Inverter {
            id,
            envelope,
            details: None,
        })
    }

    /// `pdMonth` "YYYYMM" rendered as "YYYY-MM".
    ///
    /// The separator always goes before the last two characters, so this breaks if the
    /// upstream value ever changes width.
    pub fn production_month(&self) -> Option<String> {
        let raw = self.envelope.get("pdMonth").and_then(Value::as_str)?;
        if raw.is_empty() {
            return None;
        }
        let count = raw.chars().count();
        let split = raw
            .char_indices()
            .nth(count.saturating_sub(2))
            .map_or(0, |(i, _)| i);
        Some(format!("{}-{}", &raw[..split], &raw[split..]))
    }
}

/// Stations produced by one aggregation cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub stations: Vec<Station>,
}

/// Vendor identifiers arrive either as strings or as numbers.
pub fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric reading, accepting numbers encoded as JSON strings.
pub fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Binary flags are "on" for `true` or `1`.
pub fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(_) | Value::String(_) => number(value).map(|n| n == 1.0),
        _ => None,
    }
}

/// Loose truthiness: `false`, zero, `null` and empty values are false, anything else true.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
