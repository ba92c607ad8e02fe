pub mod endpoint;
pub mod error;
pub mod request;
pub mod response;

use crate::model::{Credentials, Record, Session, Station};
pub use error::Error;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use response::{Failure, LoginData};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const API_URL: &str = "https://appeu.invertechs.com/cniotapi/app/";

const APP_TYPE: &str = "App-Type";
const LANG_TYPE: &str = "Lang-Type";

/// Client of the Invertechs app backend.
///
/// The only state kept between calls is the session token. Calls made without a token log in
/// first; a call rejected as unauthorized drops the token, logs in again and is retried once.
#[derive(Debug)]
pub struct Client {
    api_url: String,
    credentials: Credentials,
    session: Option<Session>,
    http: reqwest::Client,
}

/// Outcome of a single request that did not fail in transport.
enum Reply {
    Data(Value),
    Unauthorized,
    Rejected,
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(APP_TYPE, HeaderValue::from_static("Inver"));
    headers.insert(LANG_TYPE, HeaderValue::from_static("en_US"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

impl Client {
    pub fn new(api_url: &str, credentials: Credentials, timeout: Duration) -> Result<Client, Error> {
        let http = reqwest::ClientBuilder::new()
            .default_headers(default_headers())
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Client {
            api_url: api_url.trim_end_matches('/').to_owned(),
            credentials,
            session: None,
            http,
        })
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Account display name, falling back to the login email.
    pub fn display_name(&self) -> &str {
        self.session
            .as_ref()
            .and_then(Session::display_name)
            .unwrap_or(&self.credentials.email)
    }

    /// POST `body` to `endpoint` once. Every rejection short of a transport error is logged here
    /// and never escalated; an authentication failure also drops the session.
    async fn send<B: Serialize + ?Sized>(
        &mut self,
        endpoint: &endpoint::Endpoint,
        body: Option<&B>,
    ) -> Result<Reply, Error> {
        let url = format!("{}/{}", self.api_url, endpoint);

        let mut request = self.http.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(session) = &self.session {
            request = request.header(AUTHORIZATION, session.token.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        log::trace!("endpoint: {}, status: {}, response_text: {}", endpoint, status, text);

        if status == http::StatusCode::UNAUTHORIZED {
            self.session = None;
            log::warn!("{} rejected the session with status {}", endpoint, status);
            return Ok(Reply::Unauthorized);
        }
        if status != http::StatusCode::OK {
            log::error!("{} failed with status {}", endpoint, status);
            return Ok(Reply::Rejected);
        }

        let value = match serde_json::from_str::<Value>(&text) {
            Ok(value) => value,
            Err(e) => {
                log::error!("{} returned undecodable body ({}): {}", endpoint, e, text);
                return Ok(Reply::Rejected);
            }
        };

        match response::map_response_code(value) {
            Ok(value) => Ok(Reply::Data(value)),
            Err(Failure::Unauthorized(body)) => {
                self.session = None;
                log::warn!("{} rejected the session: {}", endpoint, body);
                Ok(Reply::Unauthorized)
            }
            Err(Failure::Rejected(body)) => {
                log::error!("{} failed: {}", endpoint, body);
                Ok(Reply::Rejected)
            }
        }
    }

    /// Authenticated POST. Logs in first when no session is held, and logs in again and retries
    /// once when the backend rejects the session.
    async fn post<B: Serialize + ?Sized>(
        &mut self,
        endpoint: &endpoint::Endpoint,
        body: &B,
    ) -> Result<Option<Value>, Error> {
        if !self.ensure_session().await? {
            return Ok(None);
        }

        match self.send(endpoint, Some(body)).await? {
            Reply::Data(value) => return Ok(Some(value)),
            Reply::Rejected => return Ok(None),
            Reply::Unauthorized => {}
        }

        log::info!("Session expired, logging in again");
        if !self.login().await? {
            return Ok(None);
        }

        match self.send(endpoint, Some(body)).await? {
            Reply::Data(value) => Ok(Some(value)),
            Reply::Rejected | Reply::Unauthorized => Ok(None),
        }
    }

    /// Exchange the configured credentials for a session token.
    pub async fn login(&mut self) -> Result<bool, Error> {
        self.session = None;
        let credentials = self.credentials.clone();
        let body = request::Login::new(&credentials.email, &credentials.password);

        let value = match self.send(endpoint::LOGIN, Some(&body)).await? {
            Reply::Data(value) => value,
            Reply::Rejected | Reply::Unauthorized => return Ok(false),
        };

        match serde_json::from_value::<LoginData>(Value::Object(response::data(value))) {
            Ok(data) => {
                self.session = Some(Session {
                    token: data.token,
                    profile: data.profile,
                });
                Ok(true)
            }
            Err(e) => {
                log::error!("Login response carried no token: {}", e);
                Ok(false)
            }
        }
    }

    /// Invalidate the session server-side. Without a session this is a no-op.
    pub async fn logout(&mut self) -> Result<bool, Error> {
        if self.session.is_none() {
            return Ok(true);
        }

        match self.send::<()>(endpoint::LOGOUT, None).await? {
            Reply::Data(_) => {
                self.session = None;
                Ok(true)
            }
            Reply::Unauthorized => Ok(true),
            Reply::Rejected => Ok(false),
        }
    }

    async fn ensure_session(&mut self) -> Result<bool, Error> {
        if self.session.is_some() {
            Ok(true)
        } else {
            self.login().await
        }
    }

    /// First page of the account's stations, without details or devices attached.
    pub async fn list_stations(&mut self) -> Result<Vec<Station>, Error> {
        let body = request::StationPage::default();
        let rows = match self.post(endpoint::STATIONS, &body).await? {
            Some(value) => response::rows(value),
            None => return Ok(Vec::new()),
        };

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let station = Station::from_row(row);
                if station.is_none() {
                    log::warn!("Skipping station row without identifier");
                }
                station
            })
            .collect())
    }

    pub async fn get_station_details(&mut self, station_id: &str) -> Result<Record, Error> {
        let body = request::StationDetails { station_id };
        Ok(self
            .post(endpoint::STATION_DETAILS, &body)
            .await?
            .map(response::data)
            .unwrap_or_default())
    }

    /// Raw device list payload of a station, `rows` included.
    pub async fn list_devices(&mut self, station_id: &str) -> Result<Record, Error> {
        let body = request::DevicePage::new(station_id);
        match self.post(endpoint::DEVICES, &body).await? {
            Some(Value::Object(payload)) => Ok(payload),
            _ => Ok(Record::new()),
        }
    }

    pub async fn get_inverter_details(
        &mut self,
        inverter_id: &str,
        station_id: &str,
    ) -> Result<Record, Error> {
        let body = request::InverterDetails {
            wn_id: inverter_id,
            station_id,
        };
        Ok(self
            .post(endpoint::INVERTER_DETAILS, &body)
            .await?
            .map(response::data)
            .unwrap_or_default())
    }
}
