//! Client core for a personal todo list backed by a REST service.
//!
//! # Overview
//! `TodoClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network (host-does-IO pattern); a `Transport`
//! executes the round-trip. `TodoSync` keeps the local mirror of the server's
//! todos for one session, `SessionStore` persists the bearer token, and
//! `TodoApp` ties login, logout and the synchronizer together.
//!
//! # Design
//! - Base URL and token are explicit values handed to constructors, never
//!   read from ambient state at call sites.
//! - A list response of the wrong shape is a tagged `ListPayload::Malformed`,
//!   not a parse failure.
//! - Synchronizer operations take `&mut self`, serializing requests per
//!   collection.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod sync;
pub mod transport;
pub mod types;

pub use app::TodoApp;
pub use client::TodoClient;
pub use config::Config;
pub use error::{ApiError, AppError, StorageError, SyncError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::{FileStorage, MemoryStorage, Session, SessionState, SessionStore, Storage};
pub use sync::{SyncState, TodoSync, TodoView};
pub use transport::{Transport, UreqTransport};
pub use types::{Filter, ListPayload, LoginRequest, Priority, SignupRequest, Todo, TodoDraft, TodoId, UpdateTodo};
