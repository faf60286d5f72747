//! Message client orchestration
//!
//! [`MessageClient`] composes the authorization chain — capability probe,
//! key resolution, assertion signing, token exchange — and hands out an
//! [`AuthorizedSession`] for message submission.
//!
//! # State machine
//!
//! ```text
//! Created --can_send_messages() == true--> Probed --authorize()--> Authorized
//!    |                 |                      |
//!    +--- probe error--+----- authorize error-+--> Failed (terminal)
//! ```
//!
//! A client that failed probing or authorization never proceeds to send
//! messages. Submissions require the [`AuthorizedSession`] returned by
//! [`MessageClient::authorize`], so sending before authorization is not
//! representable. The session's bearer header is set exactly once at
//! construction and never mutated afterwards, which keeps concurrent
//! submissions free of shared mutable state.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::auth::assertion;
use crate::auth::discovery::{fetch_smart_configuration, SmartConfiguration};
use crate::auth::keys::{resolve_signing_key, SigningKey};
use crate::auth::token::exchange_token;
use crate::config::ClientConfig;
use crate::error::{CourierError, Result};

// ---------------------------------------------------------------------------
// ClientState
// ---------------------------------------------------------------------------

/// Lifecycle state of a [`MessageClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Constructed; nothing probed yet.
    Created,

    /// Capability probe succeeded and the required scope is advertised.
    Probed,

    /// Token exchange succeeded; an [`AuthorizedSession`] has been issued.
    Authorized,

    /// A probe or authorization step failed. Terminal.
    Failed,
}

// ---------------------------------------------------------------------------
// MessageClient
// ---------------------------------------------------------------------------

/// Orchestrates authorization against a SMART-on-FHIR server.
///
/// The signing key is derived lazily on first use and memoized for the
/// client's lifetime, so a PKCS#12 keystore is parsed at most once.
///
/// # Examples
///
/// ```no_run
/// use fhir_courier::client::MessageClient;
/// use fhir_courier::config::ClientConfig;
///
/// # async fn example(config: ClientConfig) -> fhir_courier::error::Result<()> {
/// let mut client = MessageClient::new(config)?;
///
/// if client.can_send_messages().await? {
///     let session = client.authorize().await?;
///     let response = session.process_message(r#"{"resourceType": "Bundle"}"#).await?;
///     println!("server answered {}", response.status());
/// }
/// # Ok(())
/// # }
/// ```
pub struct MessageClient {
    config: ClientConfig,
    http: reqwest::Client,
    signing_key: OnceLock<SigningKey>,
    smart: Option<SmartConfiguration>,
    state: ClientState,
}

impl MessageClient {
    /// Creates a client from a validated-or-not configuration.
    ///
    /// Field invariants are checked later by
    /// [`can_send_messages`](Self::can_send_messages), before any network
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::Http`] when the HTTP client cannot be
    /// built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = build_http_client(&config, None)?;
        Ok(Self {
            config,
            http,
            signing_key: OnceLock::new(),
            smart: None,
            state: ClientState::Created,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Probes whether messages can be sent to the configured server.
    ///
    /// Configuration is validated first; only when every required field
    /// and a key source are present does the client issue the single
    /// unauthenticated discovery request. An advertised scope list without
    /// `system/$process-message` is a normal `false` and leaves the client
    /// in `Created`; a `true` result moves it to `Probed`.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::Config`] (before any network call) or
    /// [`CourierError::Discovery`]; both transition the client to
    /// [`ClientState::Failed`].
    pub async fn can_send_messages(&mut self) -> Result<bool> {
        if let Err(e) = self.config.validate() {
            return self.fail(e);
        }

        let smart = match fetch_smart_configuration(&self.http, &self.config.base_url).await {
            Ok(smart) => smart,
            Err(e) => return self.fail(e),
        };

        let capable = match smart.supports_process_message() {
            Ok(capable) => capable,
            Err(e) => return self.fail(e),
        };

        self.smart = Some(smart);
        if capable {
            self.state = ClientState::Probed;
            tracing::debug!("server advertises the required scope");
        } else {
            tracing::warn!("server does not advertise the required scope");
        }
        Ok(capable)
    }

    /// Runs the authorization chain and returns an authorized session.
    ///
    /// Resolves the token endpoint (configured override or discovered),
    /// derives the signing key (memoized), signs a fresh assertion and
    /// exchanges it for an access token. Valid exactly once, from the
    /// `Probed` state.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::Config`] when called out of order, and any
    /// of the discovery/signing/token failure modes otherwise. Failures
    /// transition the client to [`ClientState::Failed`].
    pub async fn authorize(&mut self) -> Result<AuthorizedSession> {
        match self.state {
            ClientState::Probed => {}
            ClientState::Authorized => {
                return Err(CourierError::Config(
                    "authorize() may only be called once per client".to_string(),
                )
                .into());
            }
            _ => {
                return Err(CourierError::Config(
                    "authorize() requires a successful capability probe".to_string(),
                )
                .into());
            }
        }

        match self.try_authorize().await {
            Ok(session) => {
                self.state = ClientState::Authorized;
                tracing::info!("authorization complete");
                Ok(session)
            }
            Err(e) => {
                self.state = ClientState::Failed;
                Err(e)
            }
        }
    }

    async fn try_authorize(&self) -> Result<AuthorizedSession> {
        let token_endpoint = self.resolve_token_endpoint()?;

        let key = self.signing_key()?;

        // Audience: configured value wins, else the discovered endpoint.
        let audience = if self.config.aud.trim().is_empty() {
            token_endpoint.clone()
        } else {
            self.config.aud.clone()
        };

        let assertion = assertion::sign_assertion(
            key,
            self.config.alg,
            &self.config.client_id,
            &audience,
            None,
        )?;

        let access_token = exchange_token(&self.http, &token_endpoint, &assertion).await?;

        AuthorizedSession::new(&self.config, &access_token)
    }

    /// Token endpoint: explicit configuration override, else the value
    /// from the probed SMART configuration.
    fn resolve_token_endpoint(&self) -> Result<String> {
        if let Some(ref endpoint) = self.config.token_endpoint {
            return Ok(endpoint.clone());
        }

        self.smart
            .as_ref()
            .and_then(|smart| smart.token_endpoint.clone())
            .ok_or_else(|| {
                CourierError::Discovery(
                    "SMART configuration does not include a token_endpoint".to_string(),
                )
                .into()
            })
    }

    /// The memoized signing key, derived on first use.
    fn signing_key(&self) -> Result<&SigningKey> {
        if let Some(key) = self.signing_key.get() {
            return Ok(key);
        }
        let key = resolve_signing_key(&self.config)?;
        Ok(self.signing_key.get_or_init(|| key))
    }

    fn fail<T>(&mut self, err: anyhow::Error) -> Result<T> {
        self.state = ClientState::Failed;
        Err(err)
    }
}

// ---------------------------------------------------------------------------
// AuthorizedSession
// ---------------------------------------------------------------------------

/// An HTTP session bound to a bearer token.
///
/// The `Authorization` header is installed as a default header exactly
/// once, at construction, and the session is read-only afterwards: any
/// number of submissions may run against it concurrently.
#[derive(Debug)]
pub struct AuthorizedSession {
    http: reqwest::Client,
    submission_url: String,
}

impl AuthorizedSession {
    fn new(config: &ClientConfig, access_token: &str) -> Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|e| CourierError::Token(format!("access token is not a valid header: {e}")))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);

        let http = build_http_client(config, Some(headers))?;

        let path = if config.submission_path.starts_with('/') {
            config.submission_path.clone()
        } else {
            format!("/{}", config.submission_path)
        };
        let submission_url = format!("{}{}", config.base_url.trim_end_matches('/'), path);

        Ok(Self {
            http,
            submission_url,
        })
    }

    /// Full URL messages are posted to.
    pub fn submission_url(&self) -> &str {
        &self.submission_url
    }

    /// Submits one message payload and returns the raw server response.
    ///
    /// The payload is forwarded as an uninterpreted blob. Any HTTP status
    /// is returned as-is; callers decide how to classify non-success
    /// responses (see [`crate::batch::send_batch`]).
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::Submission`] when the request itself fails
    /// (connection error, timeout).
    pub async fn process_message(&self, payload: &str) -> Result<reqwest::Response> {
        self.http
            .post(&self.submission_url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(|e| CourierError::Submission(format!("message POST failed: {e}")).into())
    }
}

// ---------------------------------------------------------------------------
// HTTP client construction
// ---------------------------------------------------------------------------

/// Builds a `reqwest::Client` honouring the configured timeout and TLS
/// policy. Certificates are verified unless `ssl_strict` is explicitly
/// `false`.
fn build_http_client(
    config: &ClientConfig,
    default_headers: Option<HeaderMap>,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(config.timeout());

    if !config.ssl_strict {
        tracing::warn!("TLS certificate verification disabled (ssl_strict = false)");
        builder = builder.danger_accept_invalid_certs(true);
    }

    if let Some(headers) = default_headers {
        builder = builder.default_headers(headers);
    }

    builder.build().map_err(|e| CourierError::Http(e).into())
}
