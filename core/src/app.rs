//! Session lifecycle around the synchronizer.
//!
//! `TodoApp` owns the session store and, while authenticated, one
//! `TodoSync`. Logging in builds a fresh synchronizer from the base URL and
//! the new token; logging out, or a synchronizer that reached
//! `SessionInvalid`, drops it and forgets the token.

use tracing::{info, warn};

use crate::client::TodoClient;
use crate::config::Config;
use crate::error::{ApiError, AppError};
use crate::http::HttpRequest;
use crate::session::{FileStorage, SessionState, SessionStore, Storage};
use crate::sync::{SyncState, TodoSync};
use crate::transport::Transport;
use crate::types::{LoginRequest, SignupRequest};

const UNEXPECTED_AUTH_ERROR: &str = "An unexpected error occurred";

pub struct TodoApp<S, T> {
    config: Config,
    session: SessionStore<S>,
    transport: T,
    todos: Option<TodoSync<T>>,
}

impl<S: Storage, T: Transport + Clone> TodoApp<S, T> {
    /// Restore any persisted session. Unreadable storage starts anonymous.
    pub fn start(config: Config, storage: S, transport: T) -> Self {
        let mut session = SessionStore::new(storage);
        if let Err(e) = session.load() {
            warn!(error = %e, "could not read persisted session, starting anonymous");
        }
        let mut app = Self {
            config,
            session,
            transport,
            todos: None,
        };
        app.todos = app.session.state().session().map(|s| app.new_sync(&s.token));
        app
    }

    pub fn session(&self) -> &SessionState {
        self.session.state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.state().is_authenticated()
    }

    pub fn username(&self) -> Option<&str> {
        self.session.state().session()?.username.as_deref()
    }

    /// The active synchronizer, if logged in.
    pub fn todos(&mut self) -> Option<&mut TodoSync<T>> {
        self.todos.as_mut()
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), AppError> {
        let client = TodoClient::new(&self.config.api_base);
        let request = client
            .build_login(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .map_err(auth_error)?;
        self.authenticate(client, request, username).await
    }

    pub async fn signup(&mut self, username: &str, password: &str, email: &str) -> Result<(), AppError> {
        let client = TodoClient::new(&self.config.api_base);
        let request = client
            .build_signup(&SignupRequest {
                username: username.to_string(),
                password: password.to_string(),
                email: email.to_string(),
            })
            .map_err(auth_error)?;
        self.authenticate(client, request, username).await
    }

    /// Forget the token. If storage refuses, nothing changes in memory.
    pub fn logout(&mut self) -> Result<(), AppError> {
        self.session.clear()?;
        self.todos = None;
        Ok(())
    }

    /// Log out if the server rejected the session. Returns whether it did.
    pub fn end_invalid_session(&mut self) -> Result<bool, AppError> {
        let invalid = self
            .todos
            .as_ref()
            .is_some_and(|t| t.state() == SyncState::SessionInvalid);
        if invalid {
            info!("ending rejected session");
            self.logout()?;
        }
        Ok(invalid)
    }

    async fn authenticate(&mut self, client: TodoClient, request: HttpRequest, username: &str) -> Result<(), AppError> {
        let result = match self.transport.execute(request).await {
            Ok(response) => client.parse_auth(response),
            Err(e) => Err(e),
        };
        let token = result.map_err(auth_error)?;
        self.session.save(&token, username)?;
        self.todos = Some(self.new_sync(&token));
        Ok(())
    }

    fn new_sync(&self, token: &str) -> TodoSync<T> {
        TodoSync::new(
            TodoClient::authenticated(&self.config.api_base, token),
            self.transport.clone(),
        )
    }
}

impl<T: Transport + Clone> TodoApp<FileStorage, T> {
    /// Keep the session in `config.session_file`.
    pub fn from_config(config: Config, transport: T) -> Self {
        let storage = FileStorage::new(&config.session_file);
        Self::start(config, storage, transport)
    }
}

fn auth_error(err: ApiError) -> AppError {
    warn!(error = %err, "authentication failed");
    match err {
        ApiError::RequestFailed { message, .. } if !message.trim().is_empty() => AppError::Auth(message),
        _ => AppError::Auth(UNEXPECTED_AUTH_ERROR.to_string()),
    }
}
