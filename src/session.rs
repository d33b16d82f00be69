use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::api::AccountApi;
use crate::config::SessionConfig;
use crate::error::Error;
use crate::events::{EventKind, Listener, ListenerRegistry, LogoutCause, SessionEvent};
use crate::heartbeat;
use crate::types::{Permissions, Profile, Registration, Role, Session};

/// Authenticated session client for the admin dashboard.
///
/// Holds the current [`Session`] (profile plus permissions) and keeps it in
/// sync with the account service. One instance is shared per process, usually
/// as an `Arc<SessionClient>` handed to every page that needs it.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use admin_session::{EventKind, SessionClient, SessionConfig, SessionEvent};
///
/// let client = SessionClient::spawn(SessionConfig::from_env()?)?;
/// client.on(EventKind::Logout, Arc::new(|_: &SessionEvent| println!("signed out")));
///
/// client.login("ops@example.com", "s3cret").await?;
/// client.fetch_session_info().await?;
/// if client.has_permission("articles.publish") {
///     // render the publish button
/// }
/// ```
pub struct SessionClient {
    api: AccountApi,
    state: RwLock<SessionSlot>,
    listeners: ListenerRegistry,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

/// Cached session plus a counter bumped on every login and session end.
///
/// A fetch only writes back if the generation it started under is still
/// current, so a response that was in flight across a logout is dropped.
#[derive(Default)]
struct SessionSlot {
    session: Option<Session>,
    generation: u64,
}

impl SessionClient {
    /// Create a client without a heartbeat.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn new(config: SessionConfig) -> Result<Self, Error> {
        Ok(Self::with_api(AccountApi::new(config)?))
    }

    /// Create a client on top of an existing HTTP client (for connection pool
    /// reuse or testing).
    ///
    /// Enable its cookie store, or the session cookie will not be sent back.
    #[must_use]
    pub fn with_http_client(config: SessionConfig, http: reqwest::Client) -> Self {
        Self::with_api(AccountApi::with_http_client(config, http))
    }

    fn with_api(api: AccountApi) -> Self {
        Self {
            api,
            state: RwLock::new(SessionSlot::default()),
            listeners: ListenerRegistry::default(),
            heartbeat: Mutex::new(None),
        }
    }

    /// Create a shared client and start its heartbeat on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built or no
    /// runtime is running.
    pub fn spawn(config: SessionConfig) -> Result<Arc<Self>, Error> {
        let client = Arc::new(Self::new(config)?);
        client.start_heartbeat()?;
        Ok(client)
    }

    /// Start the periodic presence update and session re-check.
    ///
    /// Idempotent: only the first call spawns a task. The task stops by
    /// itself once the last `Arc` to the client is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when called outside a Tokio runtime or with a
    /// zero heartbeat interval.
    pub fn start_heartbeat(self: &Arc<Self>) -> Result<(), Error> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Config(format!("heartbeat needs a Tokio runtime: {e}")))?;
        let period = self.api.config().heartbeat_interval();
        if period.is_zero() {
            return Err(Error::Config("heartbeat interval must be non-zero".into()));
        }
        let mut task = self.heartbeat.lock();
        if task.is_some() {
            return Ok(());
        }
        *task = Some(heartbeat::spawn(&handle, Arc::downgrade(self), period));
        tracing::debug!(period_secs = period.as_secs(), "Session heartbeat started");
        Ok(())
    }

    /// Fetch the current user and permissions from the account service.
    ///
    /// On success the cached session is replaced. If the server says the
    /// session is gone (HTTP 401 or a session error code), the cache is
    /// cleared and `logout` listeners fire. Any other failure leaves the
    /// cache as it was.
    ///
    /// If a login or logout happens while the request is in flight, the
    /// response is not applied to the cache.
    ///
    /// # Errors
    ///
    /// [`Error::SessionInvalid`] when the session ended, otherwise the
    /// request or network failure.
    pub async fn fetch_session_info(&self) -> Result<Session, Error> {
        let generation = self.state.read().generation;
        match self.api.me().await {
            Ok((profile, permissions)) => {
                let session = Session::new(profile, permissions);
                let mut slot = self.state.write();
                if slot.generation == generation {
                    slot.session = Some(session.clone());
                } else {
                    tracing::debug!("Session changed during info fetch, discarding response");
                }
                Ok(session)
            }
            Err(err) => {
                let err = err.into_session_signal();
                if let Error::SessionInvalid { reason } = err {
                    if self.end_session_from(generation, LogoutCause::SessionInvalid(reason)) {
                        tracing::warn!(%reason, "Account service ended the session");
                    }
                } else {
                    tracing::debug!(error = %err, "Session info fetch failed, keeping cached session");
                }
                Err(err)
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// The cached permissions stay empty until the next
    /// [`fetch_session_info`](Self::fetch_session_info).
    ///
    /// # Errors
    ///
    /// Returns the server's rejection (code and message) or the network
    /// failure; cached state is untouched in that case.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Profile, Error> {
        let profile = self.api.login(identifier, secret).await.inspect_err(|e| {
            tracing::info!(error = %e, code = ?e.code(), "Login failed");
        })?;

        {
            let mut slot = self.state.write();
            slot.session = Some(Session::new(profile.clone(), Permissions::default()));
            slot.generation += 1;
        }
        tracing::info!(email = %profile.email, role = %profile.role, "Login successful");
        self.listeners.emit(&SessionEvent::Login(profile.clone()));
        Ok(profile)
    }

    /// Sign out. Local state is cleared and `logout` listeners fire whatever
    /// the server answers.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            tracing::warn!(error = %e, "Logout request failed, clearing local session anyway");
        }
        self.end_session(LogoutCause::Requested);
        tracing::info!("Logged out");
    }

    /// Create a new account. Returns the server's confirmation message.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection or the network failure.
    pub async fn register(&self, registration: &Registration) -> Result<Option<String>, Error> {
        self.api.register(registration).await
    }

    /// Confirm an email address with the code the user received.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection or the network failure.
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<Option<String>, Error> {
        self.api.verify_email(email, code).await
    }

    /// Ask the account service to send a password reset email.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection or the network failure.
    pub async fn forgot_password(&self, email: &str) -> Result<Option<String>, Error> {
        self.api.forgot_password(email).await
    }

    /// Set a new password using a reset token.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection or the network failure.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<Option<String>, Error> {
        self.api.reset_password(token, new_password).await
    }

    /// Whether the cached permission set grants `name`. False without a session.
    #[must_use]
    pub fn has_permission(&self, name: &str) -> bool {
        self.state
            .read()
            .session
            .as_ref()
            .is_some_and(|s| s.permissions.allows(name))
    }

    #[must_use]
    pub fn has_role(&self, role: &Role) -> bool {
        self.state
            .read()
            .session
            .as_ref()
            .is_some_and(|s| s.profile.role == *role)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.read().session.is_some()
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.state.read().session.clone()
    }

    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.state.read().session.as_ref().map(|s| s.profile.clone())
    }

    #[must_use]
    pub fn permissions(&self) -> Option<Permissions> {
        self.state.read().session.as_ref().map(|s| s.permissions.clone())
    }

    /// Register a listener. The same handle may be registered more than once.
    pub fn on(&self, event: EventKind, listener: Listener) {
        self.listeners.on(event, listener);
    }

    /// Remove one registration of exactly this handle. Returns false if none matched.
    pub fn off(&self, event: EventKind, listener: &Listener) -> bool {
        self.listeners.off(event, listener)
    }

    /// Tell the account service the user is still here. Failures are ignored.
    pub async fn send_presence(&self) {
        if let Err(e) = self.api.heartbeat().await {
            tracing::debug!(error = %e, "Presence update failed");
        }
    }

    /// One heartbeat: presence update, then session re-check. No-op when signed out.
    pub(crate) async fn heartbeat_tick(&self) {
        if !self.is_authenticated() {
            return;
        }
        self.send_presence().await;
        // Signed out while the presence update was pending.
        if !self.is_authenticated() {
            return;
        }
        // Failures are already logged and, for session-invalid, acted on.
        let _ = self.fetch_session_info().await;
    }

    fn end_session(&self, cause: LogoutCause) {
        {
            let mut slot = self.state.write();
            slot.session = None;
            slot.generation += 1;
        }
        self.listeners.emit(&SessionEvent::Logout(cause));
    }

    /// Ends the session only if no login or logout happened since `generation`.
    fn end_session_from(&self, generation: u64, cause: LogoutCause) -> bool {
        {
            let mut slot = self.state.write();
            if slot.generation != generation {
                return false;
            }
            slot.session = None;
            slot.generation += 1;
        }
        self.listeners.emit(&SessionEvent::Logout(cause));
        true
    }
}
