use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("login failed: {0}")]
    Login(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unable to format output: {0}")]
    Format(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Error::Transport(format!("request timed out: {}", error))
        } else {
            Error::Transport(error.to_string())
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Error::Config(error.to_string())
    }
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, title) = match self {
            Error::Login(_) => (Status::Forbidden, "403 Forbidden"),
            Error::Transport(_) => (Status::BadGateway, "502 Bad Gateway"),
            _ => (Status::InternalServerError, "500 Internal Server Error"),
        };
        let body = format!(
            "<html><body><h3>{}</h3><code>{}</code></body></html>",
            title, self
        );

        Response::build()
            .status(status)
            .sized_body(body.len(), Cursor::new(body))
            .header(ContentType::HTML)
            .ok()
    }
}
