use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BlueskyClient, Operation};
use crate::error::Result;

/// Authenticated identity for one run.
///
/// The access token is never refreshed, persisted, or printed; `Debug`
/// output shows it redacted.
#[derive(Debug)]
pub struct Session {
    did: String,
    access_jwt: SecretString,
}

impl Session {
    pub fn new(did: String, access_jwt: SecretString) -> Self {
        Self { did, access_jwt }
    }

    /// Account DID, used as `repo` in record calls
    pub fn did(&self) -> &str {
        &self.did
    }

    pub(crate) fn access_jwt(&self) -> &str {
        self.access_jwt.expose_secret()
    }
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct CreateSessionResponse {
    did: String,
    #[serde(rename = "accessJwt")]
    access_jwt: String,
}

impl BlueskyClient {
    /// Exchange the configured credentials for a session.
    ///
    /// Not retried: a rejected login is a configuration problem.
    pub async fn create_session(&self) -> Result<Session> {
        let operation = Operation::CreateSession;
        debug!("Creating Bluesky session for {}", self.identifier);

        let request = self
            .http
            .post(self.endpoint(operation))
            .json(&CreateSessionRequest {
                identifier: &self.identifier,
                password: self.password.expose_secret(),
            });

        let body = self.execute(operation, request).await?;
        let response: CreateSessionResponse = Self::decode(operation, &body)?;

        debug!(did = %response.did, "Bluesky session created");
        Ok(Session::new(
            response.did,
            SecretString::from(response.access_jwt),
        ))
    }
}
