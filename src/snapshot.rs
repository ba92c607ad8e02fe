//! Read-only lookups over a published [`Snapshot`].
//!
//! Every exposed value goes through these functions; nothing caches a reading between cycles.
//! `None` is the "unavailable" marker throughout.

use crate::model::{Device, Inverter, Record, Snapshot, Station};
use serde_json::Value;

pub fn find_station<'a>(snapshot: &'a Snapshot, station_id: &str) -> Option<&'a Station> {
    snapshot.stations.iter().find(|s| s.id == station_id)
}

pub fn find_inverter<'a>(
    snapshot: &'a Snapshot,
    station_id: &str,
    inverter_id: &str,
) -> Option<(&'a Station, &'a Device, &'a Inverter)> {
    let station = find_station(snapshot, station_id)?;
    station.devices.iter().find_map(|device| match &device.inverter {
        Some(inverter) if inverter.id == inverter_id => Some((station, device, inverter)),
        _ => None,
    })
}

/// Look `key` up in `record`, falling back to `fallback_key` in `fallback_record`.
///
/// Either record may be absent (details not fetched this cycle). JSON `null` counts as absent.
pub fn read_field<'a>(
    record: Option<&'a Record>,
    key: &str,
    fallback_record: Option<&'a Record>,
    fallback_key: Option<&str>,
) -> Option<&'a Value> {
    lookup(record, key).or_else(|| lookup(fallback_record, fallback_key?))
}

fn lookup<'a>(record: Option<&'a Record>, key: &str) -> Option<&'a Value> {
    record?.get(key).filter(|v| !v.is_null())
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    fn snapshot() -> Snapshot {
        let station = |id: &str, wn_id: &str| Station {
            id: id.to_string(),
            envelope: record(json!({"id": id})),
            details: None,
            devices: vec![
                Device::from_row(json!({"devicesType": 1})).unwrap(),
                Device::from_row(json!({"devicesType": 0, "wnStationVo": {"wnId": wn_id}})).unwrap(),
            ],
        };
        Snapshot {
            stations: vec![station("st-1", "wn-1"), station("st-2", "wn-2")],
        }
    }

    #[test]
    fn finds_station_by_id() {
        let snapshot = snapshot();
        assert_eq!("st-2", find_station(&snapshot, "st-2").unwrap().id);
        assert!(find_station(&snapshot, "st-3").is_none());
    }

    #[test]
    fn finds_inverter_within_its_station() {
        let snapshot = snapshot();
        let (station, device, inverter) = find_inverter(&snapshot, "st-1", "wn-1").unwrap();
        assert_eq!("st-1", station.id);
        assert_eq!(Some(0), device.device_type);
        assert_eq!("wn-1", inverter.id);

        assert!(find_inverter(&snapshot, "st-1", "wn-2").is_none());
        assert!(find_inverter(&snapshot, "st-9", "wn-1").is_none());
    }

    #[test]
    fn primary_key_wins() {
        let details = record(json!({"onlineStatus": false}));
        let envelope = record(json!({"onlineStatus": true}));
        assert_eq!(
            Some(&json!(false)),
            read_field(Some(&details), "onlineStatus", Some(&envelope), Some("onlineStatus"))
        );
    }

    #[test]
    fn falls_back_when_primary_missing() {
        let details = record(json!({"power": 10}));
        let envelope = record(json!({"onlineStatus": true}));
        assert_eq!(
            Some(&json!(true)),
            read_field(Some(&details), "onlineStatus", Some(&envelope), Some("onlineStatus"))
        );
        assert_eq!(
            Some(&json!(true)),
            read_field(None, "onlineStatus", Some(&envelope), Some("onlineStatus"))
        );
    }

    #[test]
    fn unavailable_when_both_missing() {
        let details = record(json!({"power": null}));
        let envelope = record(json!({}));
        assert_eq!(None, read_field(Some(&details), "power", Some(&envelope), Some("power")));
        assert_eq!(None, read_field(None, "power", None, None));
        assert_eq!(None, read_field(Some(&details), "power", Some(&envelope), None));
    }
}
