use crate::api::{self, Error};
use crate::model::Credentials;
use config::Config;
use std::time::Duration;

const ENV_PREFIX: &str = "INVERTECHS";
const DEFAULT_INTERVAL_SECS: i64 = 300;
const DEFAULT_TIMEOUT_SECS: i64 = 30;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Settings {
    pub api_url: String,
    pub email: String,
    pub password: String,
    /// Seconds between two aggregation cycles.
    pub interval: u64,
    /// Per-request HTTP timeout in seconds.
    pub timeout: u64,
}

impl Settings {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            email: self.email.to_owned(),
            password: self.password.to_owned(),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Read settings from `INVERTECHS_*` environment variables.
pub fn read_settings() -> Result<Settings, Error> {
    let mut settings = Config::default();
    settings.merge(config::Environment::with_prefix(ENV_PREFIX))?;
    from_config(settings)
}

fn from_config(mut settings: Config) -> Result<Settings, Error> {
    settings
        .set_default("api_url", api::API_URL)?
        .set_default("interval", DEFAULT_INTERVAL_SECS)?
        .set_default("timeout", DEFAULT_TIMEOUT_SECS)?;

    let settings: Settings = settings.try_into()?;

    if settings.email.trim().is_empty() {
        return Err(Error::Config(format!("{}_EMAIL is required", ENV_PREFIX)));
    }
    if settings.password.trim().is_empty() {
        return Err(Error::Config(format!("{}_PASSWORD is required", ENV_PREFIX)));
    }
    if settings.interval == 0 {
        return Err(Error::Config(format!(
            "{}_INTERVAL must be greater than zero",
            ENV_PREFIX
        )));
    }

    Ok(settings)
}

#[cfg(test)]
mod test {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let mut config = Config::default();
        for (key, value) in pairs {
            config.set(key, *value).unwrap();
        }
        config
    }

    #[test]
    fn applies_defaults() {
        let settings =
            from_config(config(&[("email", "owner@example.com"), ("password", "secret")])).unwrap();

        assert_eq!(api::API_URL, settings.api_url);
        assert_eq!(Duration::from_secs(300), settings.interval());
        assert_eq!(Duration::from_secs(30), settings.timeout());
        assert_eq!("owner@example.com", settings.credentials().email);
    }

    #[test]
    fn overrides_defaults() {
        let settings = from_config(config(&[
            ("email", "owner@example.com"),
            ("password", "secret"),
            ("interval", "60"),
            ("api_url", "http://localhost:8000/app/"),
        ]))
        .unwrap();

        assert_eq!(60, settings.interval);
        assert_eq!("http://localhost:8000/app/", settings.api_url);
    }

    #[test]
    fn requires_credentials() {
        assert!(matches!(
            from_config(config(&[("password", "secret")])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            from_config(config(&[("email", " "), ("password", "secret")])),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn requires_password() {
        assert!(matches!(
            from_config(config(&[("email", "owner@example.com")])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            from_config(config(&[("email", "owner@example.com"), ("password", "  ")])),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn rejects_zero_interval() {
        let result = from_config(config(&[
            ("email", "owner@example.com"),
            ("password", "secret"),
            ("interval", "0"),
        ]));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
