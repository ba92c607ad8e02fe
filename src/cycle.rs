use crate::api::{self, Client};
use crate::model::{Device, Record, Snapshot, Station};
use serde_json::Value;
use std::collections::HashSet;

/// Device rows of a `list_devices` payload, duplicate inverters removed.
pub fn devices(payload: Record) -> Vec<Device> {
    let mut seen = HashSet::new();

    api::response::rows(Value::Object(payload))
        .into_iter()
        .filter_map(Device::from_row)
        .filter(|device| match &device.inverter {
            Some(inverter) if !seen.insert(inverter.id.clone()) => {
                log::warn!("Dropping duplicate inverter {}", inverter.id);
                false
            }
            _ => true,
        })
        .collect()
}

fn non_empty(record: Record) -> Option<Record> {
    if record.is_empty() {
        None
    } else {
        Some(record)
    }
}

/// Fails the cycle when the session was lost and could not be renewed.
fn require_session(client: &Client) -> Result<(), api::Error> {
    match client.session() {
        Some(_) => Ok(()),
        None => Err(api::Error::Login(format!(
            "no valid session for {}",
            client.display_name()
        ))),
    }
}

/// Fetch details and devices of one station, then the details of each of its inverters.
async fn populate_station(client: &mut Client, station: &mut Station) -> Result<(), api::Error> {
    station.details = non_empty(client.get_station_details(&station.id).await?);
    if station.details.is_none() {
        log::warn!("No details returned for station {}", station.id);
    }

    station.devices = devices(client.list_devices(&station.id).await?);

    for device in station.devices.iter_mut() {
        if let Some(inverter) = device.inverter.as_mut() {
            inverter.details =
                non_empty(client.get_inverter_details(&inverter.id, &station.id).await?);
            if inverter.details.is_none() {
                log::warn!(
                    "No details returned for inverter {} of station {}",
                    inverter.id,
                    station.id
                );
            }
        }
    }

    Ok(())
}

/// Run one full aggregation cycle.
///
/// Calls are issued sequentially, one station at a time. A failed detail call leaves that
/// sub-record absent. A transport error, or a login that fails even after a retry, aborts the
/// cycle; nothing is returned and the caller keeps serving its previous snapshot.
pub async fn refresh(client: &mut Client) -> Result<Snapshot, api::Error> {
    let mut seen = HashSet::new();
    let mut stations: Vec<Station> = client
        .list_stations()
        .await?
        .into_iter()
        .filter(|station| {
            let fresh = seen.insert(station.id.clone());
            if !fresh {
                log::warn!("Dropping duplicate station {}", station.id);
            }
            fresh
        })
        .collect();
    require_session(client)?;

    for station in stations.iter_mut() {
        populate_station(client, station).await?;
        require_session(client)?;
    }

    log::info!(
        "Refreshed {} stations with {} inverters",
        stations.len(),
        stations.iter().map(|s| s.inverters().count()).sum::<usize>()
    );

    Ok(Snapshot { stations })
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::api::response::test::read_resource;
    use crate::api::test::{client, expire_session, mock_expired, mock_login, TOKEN};
    use crate::snapshot;
    use mockito::{Matcher, Mock, ServerGuard};
    use serde_json::json;

    /// Backend with two stations, one inverter each. `wn-2` details fail when `fail_wn2` is set.
    pub async fn mock_backend(server: &mut ServerGuard, fail_wn2: bool) -> Vec<Mock> {
        let mut mocks = vec![mock_login(server).await];

        mocks.push(
            server
                .mock("POST", "/station/UI2Page")
                .match_header("authorization", TOKEN)
                .with_status(200)
                .with_body(read_resource("stations.json"))
                .expect_at_least(1)
                .create_async()
                .await,
        );

        for (station_id, wn_id) in &[("st-1", "wn-1"), ("st-2", "wn-2")] {
            mocks.push(
                server
                    .mock("POST", "/station/getStationDataDetails")
                    .match_body(Matcher::Json(json!({ "stationId": station_id })))
                    .with_status(200)
                    .with_body(read_resource("station_details.json"))
                    .expect_at_least(1)
                    .create_async()
                    .await,
            );

            let devices = json!({
                "code": 200,
                "total": 1,
                "rows": [{"devicesType": 0, "wnStationVo": {"wnId": wn_id, "onlineStatus": true}}]
            });
            mocks.push(
                server
                    .mock("POST", "/station/getDevicesListInsideStation")
                    .match_body(Matcher::PartialJson(json!({ "powerStationId": station_id })))
                    .with_status(200)
                    .with_body(devices.to_string())
                    .expect_at_least(1)
                    .create_async()
                    .await,
            );

            let body = if *wn_id == "wn-2" && fail_wn2 {
                read_resource("failure.json")
            } else {
                read_resource("inverter_details.json")
            };
            mocks.push(
                server
                    .mock("POST", "/wnData/getWnDataDetails")
                    .match_body(Matcher::Json(json!({ "wnId": wn_id, "stationId": station_id })))
                    .with_status(200)
                    .with_body(body)
                    .expect_at_least(1)
                    .create_async()
                    .await,
            );
        }

        mocks
    }

    #[tokio::test]
    async fn two_stations_one_inverter_each() {
        let mut server = mockito::Server::new_async().await;
        let mocks = mock_backend(&mut server, false).await;

        let mut client = client(&server);
        let snapshot = refresh(&mut client).await.unwrap();

        assert_eq!(2, snapshot.stations.len());
        for station in &snapshot.stations {
            assert_eq!(1, station.inverters().count());
            assert!(station.details.is_some());
            assert!(station.inverters().all(|i| i.details.is_some()));
        }
        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn failed_inverter_details_stay_local() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mock_backend(&mut server, true).await;

        let mut client = client(&server);
        let snapshot = refresh(&mut client).await.unwrap();

        let (_, _, ok) = snapshot::find_inverter(&snapshot, "st-1", "wn-1").unwrap();
        let (_, _, failed) = snapshot::find_inverter(&snapshot, "st-2", "wn-2").unwrap();
        assert!(ok.details.is_some());
        assert!(failed.details.is_none());
        assert_eq!(
            None,
            snapshot::read_field(failed.details.as_ref(), "power", None, None)
        );
    }

    #[tokio::test]
    async fn identical_responses_give_equal_snapshots() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mock_backend(&mut server, false).await;

        let mut client = client(&server);
        let first = refresh(&mut client).await.unwrap();
        let second = refresh(&mut client).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn login_failure_aborts_cycle() {
        let mut server = mockito::Server::new_async().await;
        let _login = server
            .mock("POST", "/user/login")
            .with_status(401)
            .create_async()
            .await;

        let mut client = client(&server);
        let result = refresh(&mut client).await;
        assert!(matches!(result, Err(api::Error::Login(_))));
    }

    #[tokio::test]
    async fn expired_session_is_renewed_mid_cycle() {
        let mut server = mockito::Server::new_async().await;
        let expired = mock_expired(&mut server, "/station/UI2Page").await;
        let mocks = mock_backend(&mut server, false).await;

        let mut client = client(&server);
        expire_session(&mut client);
        let snapshot = refresh(&mut client).await.unwrap();

        assert_eq!(2, snapshot.stations.len());
        let (_, _, inverter) = snapshot::find_inverter(&snapshot, "st-2", "wn-2").unwrap();
        assert!(inverter.details.is_some());
        assert_eq!(TOKEN, client.session().unwrap().token);
        expired.assert_async().await;
        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn rejected_renewal_aborts_cycle() {
        let mut server = mockito::Server::new_async().await;
        let _login = server
            .mock("POST", "/user/login")
            .with_status(200)
            .with_body(read_resource("failure.json"))
            .create_async()
            .await;
        let _expired = mock_expired(&mut server, "/station/UI2Page").await;

        let mut client = client(&server);
        expire_session(&mut client);
        let result = refresh(&mut client).await;
        assert!(matches!(result, Err(api::Error::Login(_))));
    }

    #[test]
    fn duplicate_inverters_dropped() {
        let payload = json!({
            "code": 200,
            "rows": [
                {"devicesType": 0, "wnStationVo": {"wnId": "wn-1"}},
                {"devicesType": 0, "wnStationVo": {"wnId": "wn-1"}},
                {"devicesType": 1}
            ]
        });
        let devices = devices(payload.as_object().unwrap().clone());
        assert_eq!(2, devices.len());
    }
}
