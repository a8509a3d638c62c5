//! Local mirror of the server's todo collection.
//!
//! # Design
//! `TodoSync` owns the collection for one session and reconciles it with
//! server responses; each operation has its own merge policy:
//! - `add` appends the created todo, falling back to draft values for fields
//!   the response leaves empty.
//! - `toggle` sends the whole record but only adopts the flipped flag.
//! - `update` adopts the server's record wholesale.
//!
//! Every operation takes `&mut self`, so a collection has at most one request
//! in flight. Tasks sharing a synchronizer go through a `tokio::sync::Mutex`,
//! which queues them in order; a refresh can no longer land on top of a
//! pending add.
//!
//! A 401 from any call moves the synchronizer to `SessionInvalid`. From then
//! on every operation fails fast with `SyncError::SessionInvalid` and the
//! collection is frozen until a new login builds a fresh instance.

use std::cmp::Reverse;

use tracing::{debug, info, warn};

use crate::client::TodoClient;
use crate::error::SyncError;
use crate::transport::Transport;
use crate::types::{Filter, ListPayload, Todo, TodoDraft, TodoId, UpdateTodo};

const LOAD_FAILED: &str = "Failed to load your todos. Please try again.";
const ADD_FAILED: &str = "Failed to add todo. Please try again.";
const UPDATE_FAILED: &str = "Failed to update todo. Please try again.";
const DELETE_FAILED: &str = "Failed to delete todo. Please try again.";
const AUTH_FAILED: &str = "Authentication failed. Please log in again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Loading,
    Ready,
    SessionInvalid,
}

#[derive(Debug)]
pub struct TodoSync<T> {
    client: TodoClient,
    transport: T,
    todos: Vec<Todo>,
    state: SyncState,
    last_error: Option<String>,
}

impl<T: Transport> TodoSync<T> {
    /// `client` carries the base URL and bearer token for this session.
    pub fn new(client: TodoClient, transport: T) -> Self {
        Self {
            client,
            transport,
            todos: Vec::new(),
            state: SyncState::Idle,
            last_error: None,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Todos in collection order: server order from the last refresh, then
    /// additions.
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn get(&self, id: TodoId) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    /// User-facing message for the most recent failure. Cleared by a
    /// successful refresh.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// `(active, completed)` counts over the whole collection.
    pub fn counts(&self) -> (usize, usize) {
        let completed = self.todos.iter().filter(|t| t.completed).count();
        (self.todos.len() - completed, completed)
    }

    /// Replace the collection with the server's list.
    pub async fn refresh(&mut self) -> Result<(), SyncError> {
        self.ensure_valid()?;
        let previous = self.state;
        self.state = SyncState::Loading;

        let request = self.client.build_list_todos();
        let result = match self.transport.execute(request).await {
            Ok(response) => self.client.parse_list_todos(response),
            Err(e) => Err(e),
        };

        match result {
            Ok(ListPayload::Todos(todos)) => {
                debug!(count = todos.len(), "todos refreshed");
                self.todos = todos;
                self.state = SyncState::Ready;
                self.last_error = None;
                Ok(())
            }
            Ok(ListPayload::Malformed(raw)) => {
                warn!(body = %raw, "list response is not an array");
                self.todos.clear();
                self.state = SyncState::Ready;
                self.last_error = Some(LOAD_FAILED.to_string());
                Err(SyncError::MalformedList { raw })
            }
            Err(e) => {
                self.state = previous;
                Err(self.fail(e.into(), LOAD_FAILED))
            }
        }
    }

    /// Create `draft` on the server and append the result.
    pub async fn add(&mut self, draft: TodoDraft) -> Result<&Todo, SyncError> {
        self.ensure_valid()?;
        if draft.title.trim().is_empty() {
            return Err(SyncError::Validation("title must not be empty".to_string()));
        }

        let result = match self.client.build_create_todo(&draft) {
            Ok(request) => match self.transport.execute(request).await {
                Ok(response) => self.client.parse_create_todo(response),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(created) => {
                let todo = merge_created(created, draft);
                debug!(id = todo.id, "todo added");
                self.todos.push(todo);
                let index = self.todos.len() - 1;
                Ok(&self.todos[index])
            }
            Err(e) => Err(self.fail(e.into(), ADD_FAILED)),
        }
    }

    /// Flip `completed` on the server, then locally. Only the flag is taken
    /// from the round-trip; the rest of the local record stays as it was.
    pub async fn toggle(&mut self, id: TodoId) -> Result<bool, SyncError> {
        self.ensure_valid()?;
        let index = self.position(id)?;
        let completed = !self.todos[index].completed;

        let mut fields = UpdateTodo::from(&self.todos[index]);
        fields.completed = Some(completed);

        let result = match self.client.build_replace_todo(id, &fields) {
            Ok(request) => match self.transport.execute(request).await {
                Ok(response) => self.client.parse_replace_todo(response),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(_) => {
                // The record may have moved while the request was out.
                if let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) {
                    todo.completed = completed;
                }
                debug!(id, completed, "todo toggled");
                Ok(completed)
            }
            Err(e) => Err(self.fail(e.into(), UPDATE_FAILED)),
        }
    }

    /// Send `fields` to the server and adopt its response as the new record.
    pub async fn update(&mut self, id: TodoId, fields: UpdateTodo) -> Result<(), SyncError> {
        self.ensure_valid()?;
        if fields.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(SyncError::Validation("title must not be empty".to_string()));
        }

        let result = match self.client.build_replace_todo(id, &fields) {
            Ok(request) => match self.transport.execute(request).await {
                Ok(response) => self.client.parse_replace_todo(response),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(updated) => {
                match self.todos.iter_mut().find(|t| t.id == id) {
                    Some(todo) => *todo = updated,
                    None => warn!(id, "updated todo is not in the local collection"),
                }
                debug!(id, "todo updated");
                Ok(())
            }
            Err(e) => Err(self.fail(e.into(), UPDATE_FAILED)),
        }
    }

    /// Delete on the server, then drop the local record.
    pub async fn remove(&mut self, id: TodoId) -> Result<(), SyncError> {
        self.ensure_valid()?;
        let request = self.client.build_delete_todo(id);
        let result = match self.transport.execute(request).await {
            Ok(response) => self.client.parse_delete_todo(response),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.todos.retain(|t| t.id != id);
                debug!(id, "todo removed");
                Ok(())
            }
            Err(e) => Err(self.fail(e.into(), DELETE_FAILED)),
        }
    }

    /// Filtered, sorted projection of the collection. Built eagerly on each
    /// call since sorting needs every matching item.
    pub fn view(&self, filter: Filter) -> TodoView<'_> {
        let mut items: Vec<&Todo> = self.todos.iter().filter(|t| filter.matches(t)).collect();
        // sort_by_key is stable: equal keys keep collection order.
        match filter {
            Filter::Completed => items.sort_by_key(|t| Reverse(t.effective_priority())),
            Filter::All | Filter::Active => items.sort_by_key(|t| (t.completed, Reverse(t.effective_priority()))),
        }
        TodoView { items }
    }

    fn ensure_valid(&self) -> Result<(), SyncError> {
        if self.state == SyncState::SessionInvalid {
            return Err(SyncError::SessionInvalid);
        }
        Ok(())
    }

    fn position(&self, id: TodoId) -> Result<usize, SyncError> {
        self.todos
            .iter()
            .position(|t| t.id == id)
            .ok_or(SyncError::UnknownTodo(id))
    }

    /// Record a failed request. A 401 invalidates the session.
    fn fail(&mut self, err: SyncError, message: &str) -> SyncError {
        if let SyncError::Unauthorized = err {
            info!("session rejected by server");
            self.state = SyncState::SessionInvalid;
            self.last_error = Some(AUTH_FAILED.to_string());
        } else {
            warn!(error = %err, "todo request failed");
            self.last_error = Some(message.to_string());
        }
        err
    }
}

/// Draft values fill in whatever the create response left empty.
fn merge_created(mut created: Todo, draft: TodoDraft) -> Todo {
    if created.title.is_empty() {
        created.title = draft.title;
    }
    if created.description.as_deref().is_none_or(str::is_empty) {
        created.description = draft.description;
    }
    if created.priority.is_none() {
        created.priority = Some(draft.priority);
    }
    created
}

/// Sorted, filtered references into the collection, collected when the view
/// is made. Iterate it as often as needed; it borrows the synchronizer, so
/// no mutation can happen while it is alive.
#[derive(Debug, Clone)]
pub struct TodoView<'a> {
    items: Vec<&'a Todo>,
}

impl<'a> TodoView<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &'a Todo> + '_ {
        self.items.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> Vec<TodoId> {
        self.iter().map(|t| t.id).collect()
    }
}

impl<'a> IntoIterator for TodoView<'a> {
    type Item = &'a Todo;
    type IntoIter = std::vec::IntoIter<&'a Todo>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
