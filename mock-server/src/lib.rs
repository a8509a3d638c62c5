use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub mod error;

use error::AppError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct CreateTodo {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<u8>,
    pub completed: Option<bool>,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct Signup {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

struct Owned {
    owner: String,
    todo: Todo,
}

/// Users, issued tokens and every user's todos.
#[derive(Default)]
pub struct Store {
    passwords: HashMap<String, String>,
    tokens: HashMap<String, String>,
    todos: BTreeMap<i64, Owned>,
    last_id: i64,
}

impl Store {
    fn issue_token(&mut self, username: &str) -> AccessToken {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), username.to_string());
        AccessToken {
            access_token: token,
            token_type: "bearer".to_string(),
        }
    }

    /// Forget every issued token, as if the server restarted its key.
    pub fn revoke_tokens(&mut self) {
        self.tokens.clear();
    }

    fn owned_mut(&mut self, owner: &str, id: i64) -> Result<&mut Todo, AppError> {
        self.todos
            .get_mut(&id)
            .filter(|o| o.owner == owner)
            .map(|o| &mut o.todo)
            .ok_or(AppError::NotFound)
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with_store(Db::default())
}

/// Router over a caller-held store, so tests can reach into server state.
pub fn app_with_store(db: Db) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/todos/", post(create_todo).get(list_todos))
        .route("/todos/{id}", put(update_todo).delete(delete_todo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_store(listener, Db::default()).await
}

pub async fn run_with_store(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_store(db)).await
}

async fn current_user(db: &Db, headers: &HeaderMap) -> Result<String, AppError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;
    db.read().await.tokens.get(token).cloned().ok_or(AppError::Unauthorized)
}

fn check_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Invalid("title must not be empty".to_string()));
    }
    Ok(())
}

fn check_priority(priority: Option<u8>) -> Result<(), AppError> {
    match priority {
        Some(p) if !(1..=3).contains(&p) => Err(AppError::Invalid("priority must be 1, 2 or 3".to_string())),
        _ => Ok(()),
    }
}

async fn signup(State(db): State<Db>, Json(input): Json<Signup>) -> Result<(StatusCode, Json<AccessToken>), AppError> {
    if input.username.trim().is_empty() || input.password.is_empty() {
        return Err(AppError::Invalid("username and password are required".to_string()));
    }
    let mut store = db.write().await;
    if store.passwords.contains_key(&input.username) {
        return Err(AppError::UsernameTaken);
    }
    store.passwords.insert(input.username.clone(), input.password);
    info!(username = %input.username, email = %input.email, "user registered");
    Ok((StatusCode::CREATED, Json(store.issue_token(&input.username))))
}

async fn login(State(db): State<Db>, Json(input): Json<Credentials>) -> Result<Json<AccessToken>, AppError> {
    let mut store = db.write().await;
    match store.passwords.get(&input.username) {
        Some(password) if *password == input.password => {}
        _ => return Err(AppError::BadCredentials),
    }
    info!(username = %input.username, "user logged in");
    Ok(Json(store.issue_token(&input.username)))
}

async fn list_todos(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Vec<Todo>>, AppError> {
    let owner = current_user(&db, &headers).await?;
    let store = db.read().await;
    let todos = store
        .todos
        .values()
        .filter(|o| o.owner == owner)
        .map(|o| o.todo.clone())
        .collect();
    Ok(Json(todos))
}

async fn create_todo(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateTodo>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    let owner = current_user(&db, &headers).await?;
    check_title(&input.title)?;
    check_priority(input.priority)?;

    let mut store = db.write().await;
    store.last_id += 1;
    let todo = Todo {
        id: store.last_id,
        title: input.title,
        description: input.description,
        priority: input.priority,
        completed: input.completed,
    };
    store.todos.insert(
        todo.id,
        Owned {
            owner,
            todo: todo.clone(),
        },
    );
    debug!(id = todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<UpdateTodo>,
) -> Result<Json<Todo>, AppError> {
    let owner = current_user(&db, &headers).await?;
    if let Some(title) = &input.title {
        check_title(title)?;
    }
    check_priority(input.priority)?;

    let mut store = db.write().await;
    let todo = store.owned_mut(&owner, id)?;
    if let Some(title) = input.title {
        todo.title = title;
    }
    if let Some(description) = input.description {
        todo.description = Some(description);
    }
    if let Some(priority) = input.priority {
        todo.priority = Some(priority);
    }
    if let Some(completed) = input.completed {
        todo.completed = completed;
    }
    debug!(id, "todo updated");
    Ok(Json(todo.clone()))
}

async fn delete_todo(State(db): State<Db>, headers: HeaderMap, Path(id): Path<i64>) -> Result<StatusCode, AppError> {
    let owner = current_user(&db, &headers).await?;
    let mut store = db.write().await;
    store.owned_mut(&owner, id)?;
    store.todos.remove(&id);
    debug!(id, "todo deleted");
    Ok(StatusCode::NO_CONTENT)
}
