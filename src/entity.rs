//! Metric descriptors and the entities enumerated from the first snapshot.
//!
//! Entities are fixed at setup; their values are re-read against whatever snapshot is current
//! whenever the host asks.

use crate::model::{self, Inverter, Record, Snapshot, Station};
use crate::snapshot::{find_inverter, find_station, read_field};
use serde::Serialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Watt,
    WattHour,
    Volt,
    Ampere,
    Hertz,
    Celsius,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Watt => "W",
            Unit::WattHour => "Wh",
            Unit::Volt => "V",
            Unit::Ampere => "A",
            Unit::Hertz => "Hz",
            Unit::Celsius => "°C",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Power,
    Energy,
    Voltage,
    Current,
    Frequency,
    Temperature,
    Connectivity,
    Problem,
}

impl Classification {
    pub fn name(self) -> &'static str {
        match self {
            Classification::Power => "power",
            Classification::Energy => "energy",
            Classification::Voltage => "voltage",
            Classification::Current => "current",
            Classification::Frequency => "frequency",
            Classification::Temperature => "temperature",
            Classification::Connectivity => "connectivity",
            Classification::Problem => "problem",
        }
    }

    /// Binary classifications resolve to on/off instead of a measurement.
    pub fn is_binary(self) -> bool {
        matches!(self, Classification::Connectivity | Classification::Problem)
    }
}

/// One exposed metric: where to read it and how to present it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDescriptor {
    pub label: &'static str,
    pub key: &'static str,
    pub unit: Option<Unit>,
    pub class: Classification,
    /// Key looked up in the entity envelope when the details record lacks `key`.
    pub fallback_key: Option<&'static str>,
}

const fn sensor(
    label: &'static str,
    key: &'static str,
    unit: Unit,
    class: Classification,
) -> MetricDescriptor {
    MetricDescriptor {
        label,
        key,
        unit: Some(unit),
        class,
        fallback_key: None,
    }
}

const fn binary(label: &'static str, key: &'static str, class: Classification) -> MetricDescriptor {
    MetricDescriptor {
        label,
        key,
        unit: None,
        class,
        fallback_key: Some(key),
    }
}

use Classification::*;

pub const STATION_METRICS: &[MetricDescriptor] = &[
    sensor("Current Power", "power", Unit::Watt, Power),
    sensor("Daily Energy", "dayPowerGeneration", Unit::WattHour, Energy),
    sensor("Monthly Energy", "monthPowerGeneration", Unit::WattHour, Energy),
    sensor("Yearly Energy", "yearPowerGeneration", Unit::WattHour, Energy),
    sensor("Total Energy", "totalPowerGeneration", Unit::WattHour, Energy),
    binary("Connection", "stationOnlineStatus", Connectivity),
    binary("Status", "isHaveAlarm", Problem),
];

pub const INVERTER_METRICS: &[MetricDescriptor] = &[
    sensor("Power", "power", Unit::Watt, Power),
    sensor("Daily Energy", "dayPowerGeneration", Unit::WattHour, Energy),
    sensor("Monthly Energy", "monthPowerGeneration", Unit::WattHour, Energy),
    sensor("Yearly Energy", "yearPowerGeneration", Unit::WattHour, Energy),
    sensor("Total Energy", "totalPowerGeneration", Unit::WattHour, Energy),
    sensor("Temperature", "temp", Unit::Celsius, Temperature),
    sensor("Output Voltage", "outputVoltage", Unit::Volt, Voltage),
    sensor("Output Current", "outputElectricity", Unit::Ampere, Current),
    sensor("Output Frequency", "outputFrequency", Unit::Hertz, Frequency),
    sensor("Output Power", "outputPower", Unit::Watt, Power),
    binary("Connection", "onlineStatus", Connectivity),
    binary("Status", "alarmStatus", Problem),
];

/// DC input channels 1 to 6, each as (voltage, current, power).
pub const INPUT_CHANNELS: [[MetricDescriptor; 3]; 6] = [
    [
        sensor("Input 1 Voltage", "inputVoltage", Unit::Volt, Voltage),
        sensor("Input 1 Current", "inputFirElectricity", Unit::Ampere, Current),
        sensor("Input 1 Power", "inputFirPower", Unit::Watt, Power),
    ],
    [
        sensor("Input 2 Voltage", "inputSecVoltage", Unit::Volt, Voltage),
        sensor("Input 2 Current", "inputSecElectricity", Unit::Ampere, Current),
        sensor("Input 2 Power", "inputSecPower", Unit::Watt, Power),
    ],
    [
        sensor("Input 3 Voltage", "inputThirdVoltage", Unit::Volt, Voltage),
        sensor("Input 3 Current", "inputThirdElectricity", Unit::Ampere, Current),
        sensor("Input 3 Power", "inputThirdPower", Unit::Watt, Power),
    ],
    [
        sensor("Input 4 Voltage", "inputFourVoltage", Unit::Volt, Voltage),
        sensor("Input 4 Current", "inputFourElectricity", Unit::Ampere, Current),
        sensor("Input 4 Power", "inputFourPower", Unit::Watt, Power),
    ],
    [
        sensor("Input 5 Voltage", "fiveVolta", Unit::Volt, Voltage),
        sensor("Input 5 Current", "fiveElect", Unit::Ampere, Current),
        sensor("Input 5 Power", "fivePower", Unit::Watt, Power),
    ],
    [
        sensor("Input 6 Voltage", "sixVolta", Unit::Volt, Voltage),
        sensor("Input 6 Current", "sixElect", Unit::Ampere, Current),
        sensor("Input 6 Power", "sixPower", Unit::Watt, Power),
    ],
];

/// Populated input channels, as given by the `wnType` ordinal of the inverter details.
pub fn channel_count(details: Option<&Record>) -> usize {
    details
        .and_then(|d| d.get("wnType"))
        .and_then(model::number)
        .filter(|n| *n > 0.0)
        .map_or(0, |n| (n as usize).min(INPUT_CHANNELS.len()))
}

/// Resolved state of a metric: `None` when unavailable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Measurement(f64),
    Binary(bool),
}

impl Reading {
    fn resolve(descriptor: &MetricDescriptor, value: Option<&Value>) -> Option<Reading> {
        let value = value?;
        if descriptor.class.is_binary() {
            model::flag(value).map(Reading::Binary)
        } else {
            model::number(value).map(Reading::Measurement)
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Reading::Measurement(v) => v,
            Reading::Binary(true) => 1.0,
            Reading::Binary(false) => 0.0,
        }
    }

    fn to_json(self) -> Value {
        match self {
            Reading::Measurement(v) => json!(v),
            Reading::Binary(b) => json!(b),
        }
    }
}

fn resolve(
    descriptor: &MetricDescriptor,
    details: Option<&Record>,
    envelope: &Record,
) -> Option<Reading> {
    let value = read_field(details, descriptor.key, Some(envelope), descriptor.fallback_key);
    Reading::resolve(descriptor, value)
}

fn text(record: Option<&Record>, key: &str) -> Option<String> {
    record?.get(key).and_then(Value::as_str).map(str::to_owned)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationEntity {
    pub station_id: String,
    pub device_name: String,
    pub metrics: Vec<MetricDescriptor>,
}

impl StationEntity {
    fn from_station(station: &Station) -> Self {
        StationEntity {
            station_id: station.id.clone(),
            device_name: format!("Power Plant {}", station.name()),
            metrics: STATION_METRICS.to_vec(),
        }
    }

    pub fn read(&self, snapshot: &Snapshot, descriptor: &MetricDescriptor) -> Option<Reading> {
        let station = find_station(snapshot, &self.station_id)?;
        resolve(descriptor, station.details.as_ref(), &station.envelope)
    }

    /// Extra attributes of the alarm entity, from the station envelope.
    pub fn attributes(&self, snapshot: &Snapshot) -> Option<Map<String, Value>> {
        let envelope = &find_station(snapshot, &self.station_id)?.envelope;
        let get = |key: &str| envelope.get(key).cloned().unwrap_or(Value::Null);
        let exists = |key: &str| envelope.get(key).map_or(false, model::truthy);

        let mut attributes = Map::new();
        attributes.insert("creation_time".into(), get("createTime"));
        attributes.insert("plant_address".into(), get("stationAddress"));
        attributes.insert("capacity".into(), get("capacity"));
        attributes.insert("inverters_count".into(), get("wnNum"));
        attributes.insert("meter_exists".into(), json!(exists("existsMeter")));
        attributes.insert("battery_exists".into(), json!(exists("existsBattery")));
        Some(attributes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InverterEntity {
    pub station_id: String,
    pub inverter_id: String,
    pub model: String,
    pub sw_version: Option<String>,
    pub hw_version: Option<String>,
    pub device_name: String,
    pub metrics: Vec<MetricDescriptor>,
}

impl InverterEntity {
    fn from_inverter(station: &Station, inverter: &Inverter) -> Self {
        let details = inverter.details.as_ref();
        let model = text(details, "model").unwrap_or_else(|| "Unknown".to_string());

        let mut metrics = INVERTER_METRICS.to_vec();
        for channel in INPUT_CHANNELS.iter().take(channel_count(details)) {
            metrics.extend_from_slice(channel);
        }

        InverterEntity {
            station_id: station.id.clone(),
            inverter_id: inverter.id.clone(),
            device_name: format!("Inver Energy {}", model),
            sw_version: text(details, "softwareVersion"),
            hw_version: text(details, "hardwareVersion"),
            model,
            metrics,
        }
    }

    fn inverter<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a Inverter> {
        find_inverter(snapshot, &self.station_id, &self.inverter_id).map(|(_, _, i)| i)
    }

    pub fn read(&self, snapshot: &Snapshot, descriptor: &MetricDescriptor) -> Option<Reading> {
        let inverter = self.inverter(snapshot)?;
        resolve(descriptor, inverter.details.as_ref(), &inverter.envelope)
    }

    /// Extra attributes of the alarm entity, mixing envelope and details.
    pub fn attributes(&self, snapshot: &Snapshot) -> Option<Map<String, Value>> {
        let inverter = self.inverter(snapshot)?;
        let details = |key: &str| {
            inverter
                .details
                .as_ref()
                .and_then(|d| d.get(key))
                .cloned()
                .unwrap_or(Value::Null)
        };

        let mut attributes = Map::new();
        attributes.insert("plant_name".into(), details("stationName"));
        attributes.insert(
            "production_month".into(),
            json!(inverter.production_month().unwrap_or_default()),
        );
        attributes.insert(
            "valid_thru".into(),
            inverter.envelope.get("validDate").cloned().unwrap_or(Value::Null),
        );
        attributes.insert("rated_power".into(), details("ratedPower"));
        attributes.insert("inverter_type".into(), details("wnType"));
        Some(attributes)
    }
}

/// Host-facing view of one metric of one entity.
#[derive(Debug, Clone, Serialize)]
pub struct EntityState {
    pub unique_id: String,
    pub name: String,
    pub device: String,
    pub unit: Option<&'static str>,
    pub class: Classification,
    pub state: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
}

/// Everything exposed to the host, enumerated once from the first snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitySet {
    pub stations: Vec<StationEntity>,
    pub inverters: Vec<InverterEntity>,
}

impl EntitySet {
    pub fn enumerate(snapshot: &Snapshot) -> EntitySet {
        let mut entities = EntitySet::default();
        for station in &snapshot.stations {
            entities.stations.push(StationEntity::from_station(station));
            for inverter in station.inverters() {
                entities
                    .inverters
                    .push(InverterEntity::from_inverter(station, inverter));
            }
        }
        entities
    }

    /// Current state of every entity against `snapshot`.
    pub fn states(&self, snapshot: &Snapshot) -> Vec<EntityState> {
        let mut states = Vec::new();

        for entity in &self.stations {
            for descriptor in &entity.metrics {
                states.push(EntityState {
                    unique_id: format!("{}_{}", entity.station_id, descriptor.key),
                    name: format!("{} {}", entity.device_name, descriptor.label),
                    device: entity.device_name.clone(),
                    unit: descriptor.unit.map(Unit::symbol),
                    class: descriptor.class,
                    state: entity
                        .read(snapshot, descriptor)
                        .map_or(Value::Null, Reading::to_json),
                    attributes: if descriptor.class == Problem {
                        entity.attributes(snapshot)
                    } else {
                        None
                    },
                });
            }
        }

        for entity in &self.inverters {
            for descriptor in &entity.metrics {
                states.push(EntityState {
                    unique_id: format!("{}_{}", entity.inverter_id, descriptor.key),
                    name: format!("{} {}", entity.device_name, descriptor.label),
                    device: entity.device_name.clone(),
                    unit: descriptor.unit.map(Unit::symbol),
                    class: descriptor.class,
                    state: entity
                        .read(snapshot, descriptor)
                        .map_or(Value::Null, Reading::to_json),
                    attributes: if descriptor.class == Problem {
                        entity.attributes(snapshot)
                    } else {
                        None
                    },
                });
            }
        }

        states
    }
}
