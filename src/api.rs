use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use crate::config::{Endpoint, SessionConfig};
use crate::error::Error;
use crate::types::{Permissions, Profile, Registration};

/// JSON envelope every account service endpoint answers with.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Envelope {
    pub(crate) success: bool,
    pub(crate) error: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) user: Option<Profile>,
    pub(crate) permissions: Option<Permissions>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct EmailOnly<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct VerifyEmail<'a> {
    email: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetPassword<'a> {
    token: &'a str,
    new_password: &'a str,
}

/// Thin HTTP layer over the account service.
///
/// Knows nothing about cached state: every method maps one endpoint to a
/// typed result and normalizes failures into [`Error`].
pub(crate) struct AccountApi {
    config: SessionConfig,
    http: reqwest::Client,
}

impl AccountApi {
    /// Builds an HTTP client with a cookie store, so the session cookie set by
    /// `login` rides along on every later request.
    pub(crate) fn new(config: SessionConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// Use a caller-built HTTP client.
    ///
    /// The client should have a cookie store enabled, otherwise the session
    /// cookie is dropped between calls.
    pub(crate) fn with_http_client(config: SessionConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    pub(crate) fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) async fn me(&self) -> Result<(Profile, Permissions), Error> {
        let envelope = self
            .send("session info", Method::GET, Endpoint::Me, None::<&()>)
            .await?;
        let user = envelope.user.ok_or(Error::Malformed {
            operation: "session info",
            detail: "success response without user".into(),
        })?;
        Ok((user, envelope.permissions.unwrap_or_default()))
    }

    pub(crate) async fn login(&self, email: &str, password: &str) -> Result<Profile, Error> {
        let body = Credentials { email, password };
        let envelope = self
            .send("login", Method::POST, Endpoint::Login, Some(&body))
            .await?;
        envelope.user.ok_or(Error::Malformed {
            operation: "login",
            detail: "success response without user".into(),
        })
    }

    pub(crate) async fn logout(&self) -> Result<(), Error> {
        self.send("logout", Method::POST, Endpoint::Logout, None::<&()>)
            .await
            .map(drop)
    }

    pub(crate) async fn heartbeat(&self) -> Result<(), Error> {
        self.send("presence update", Method::POST, Endpoint::Heartbeat, None::<&()>)
            .await
            .map(drop)
    }

    pub(crate) async fn register(&self, registration: &Registration) -> Result<Option<String>, Error> {
        self.send("registration", Method::POST, Endpoint::Register, Some(registration))
            .await
            .map(|e| e.message)
    }

    pub(crate) async fn verify_email(&self, email: &str, code: &str) -> Result<Option<String>, Error> {
        let body = VerifyEmail { email, code };
        self.send("email verification", Method::POST, Endpoint::VerifyEmail, Some(&body))
            .await
            .map(|e| e.message)
    }

    pub(crate) async fn forgot_password(&self, email: &str) -> Result<Option<String>, Error> {
        let body = EmailOnly { email };
        self.send("forgot password", Method::POST, Endpoint::ForgotPassword, Some(&body))
            .await
            .map(|e| e.message)
    }

    pub(crate) async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<Option<String>, Error> {
        let body = ResetPassword {
            token,
            new_password,
        };
        self.send("password reset", Method::POST, Endpoint::ResetPassword, Some(&body))
            .await
            .map(|e| e.message)
    }

    /// Sends one request and returns the envelope only when `success` is true.
    async fn send<B: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        method: Method,
        endpoint: Endpoint,
        body: Option<&B>,
    ) -> Result<Envelope, Error> {
        let url = self.config.endpoint_url(endpoint)?;

        // Content type goes first: `json()` leaves an existing header alone.
        let mut request = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| Error::Network { operation, source })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| Error::Network { operation, source })?;

        match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) if status.is_success() && envelope.success => Ok(envelope),
            Ok(envelope) => Err(Error::Rejected {
                operation,
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| default_message(status)),
                code: envelope.error,
            }),
            Err(e) if status.is_success() => Err(Error::Malformed {
                operation,
                detail: e.to_string(),
            }),
            Err(_) => Err(Error::Rejected {
                operation,
                status: status.as_u16(),
                code: None,
                message: default_message(status),
            }),
        }
    }
}

fn default_message(status: reqwest::StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string)
}
