//! Stateless HTTP request builder and response parser for the todo API.
//!
//! # Design
//! `TodoClient` holds only the `base_url` and an optional bearer token, both
//! handed in by the caller; it never reads ambient state. Each operation is
//! split into a `build_*` method that produces an `HttpRequest` and a
//! `parse_*` method that consumes an `HttpResponse`. A `Transport` executes
//! the round-trip in between, keeping this module deterministic.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{AuthToken, ListPayload, LoginRequest, SignupRequest, Todo, TodoDraft, TodoId, UpdateTodo};

#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
    token: Option<String>,
}

impl TodoClient {
    /// Client without credentials, for the login and signup endpoints.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Client that attaches `token` as a bearer credential to todo requests.
    pub fn authenticated(base_url: &str, token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            ..Self::new(base_url)
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_login(&self, input: &LoginRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, format!("{}/login", self.base_url), input, false)
    }

    pub fn build_signup(&self, input: &SignupRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, format!("{}/signup", self.base_url), input, false)
    }

    pub fn build_list_todos(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}/todos/", self.base_url),
            headers: self.auth_headers(),
            body: None,
        }
    }

    pub fn build_create_todo(&self, input: &TodoDraft) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, format!("{}/todos/", self.base_url), input, true)
    }

    pub fn build_replace_todo(&self, id: TodoId, input: &UpdateTodo) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, format!("{}/todos/{id}", self.base_url), input, true)
    }

    pub fn build_delete_todo(&self, id: TodoId) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            path: format!("{}/todos/{id}", self.base_url),
            headers: self.auth_headers(),
            body: None,
        }
    }

    /// Extract the access token from a login or signup response. A 401 here
    /// means bad credentials, not an expired session, so every failure is
    /// `RequestFailed` carrying the server's message.
    pub fn parse_auth(&self, response: HttpResponse) -> Result<String, ApiError> {
        if !response.is_success() {
            return Err(ApiError::RequestFailed {
                status: response.status,
                message: error_message(&response.body),
            });
        }
        let token: AuthToken =
            serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        if token.access_token.is_empty() {
            return Err(ApiError::DeserializationError("empty access_token".to_string()));
        }
        Ok(token.access_token)
    }

    /// Parse a list response. JSON that is valid but not an array comes back
    /// as `ListPayload::Malformed` rather than an error.
    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<ListPayload, ApiError> {
        check_status(&response)?;
        let value: serde_json::Value =
            serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        if !value.is_array() {
            return Ok(ListPayload::Malformed(response.body));
        }
        serde_json::from_value(value)
            .map(ListPayload::Todos)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json(response)
    }

    pub fn parse_replace_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json(response)
    }

    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    fn auth_headers(&self) -> Vec<(String, String)> {
        match &self.token {
            Some(token) => vec![("authorization".to_string(), format!("Bearer {token}"))],
            None => Vec::new(),
        }
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: String,
        input: &T,
        authorized: bool,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        let mut headers = if authorized { self.auth_headers() } else { Vec::new() };
        headers.push(("content-type".to_string(), "application/json".to_string()));
        Ok(HttpRequest {
            method,
            path,
            headers,
            body: Some(body),
        })
    }
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-2xx status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 401 {
        return Err(ApiError::Unauthorized);
    }
    Err(ApiError::RequestFailed {
        status: response.status,
        message: error_message(&response.body),
    })
}

/// Prefer the `detail` field of a JSON error body; fall back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match v.get("detail")? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;

    fn client() -> TodoClient {
        TodoClient::authenticated("http://localhost:8080", "tok")
    }

    #[test]
    fn build_list_todos_attaches_bearer() {
        let req = client().build_list_todos();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:8080/todos/");
        assert!(req.body.is_none());
        assert_eq!(req.header("Authorization"), Some("Bearer tok"));
    }

    #[test]
    fn anonymous_client_sends_no_authorization() {
        let req = TodoClient::new("http://localhost:8080").build_list_todos();
        assert!(req.headers.is_empty());
    }

    #[test]
    fn build_create_todo_produces_correct_request() {
        let input = TodoDraft::new("Buy milk", "", Priority::Medium);
        let req = client().build_create_todo(&input).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:8080/todos/");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["title"], "Buy milk");
        assert_eq!(body["priority"], 2);
        assert_eq!(body["completed"], false);
    }

    #[test]
    fn build_replace_todo_omits_unset_fields() {
        let input = UpdateTodo {
            title: Some("Updated".to_string()),
            ..UpdateTodo::default()
        };
        let req = client().build_replace_todo(3, &input).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "http://localhost:8080/todos/3");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["title"], "Updated");
        assert!(body.get("completed").is_none());
        assert!(body.get("priority").is_none());
    }

    #[test]
    fn build_login_has_no_bearer() {
        let req = client()
            .build_login(&LoginRequest {
                username: "ana".to_string(),
                password: "pw".to_string(),
            })
            .unwrap();
        assert_eq!(req.path, "http://localhost:8080/login");
        assert!(req.header("authorization").is_none());
    }

    #[test]
    fn parse_list_todos_success() {
        let response = HttpResponse::new(200, r#"[{"id":1,"title":"Test","priority":3,"completed":false}]"#);
        match client().parse_list_todos(response).unwrap() {
            ListPayload::Todos(todos) => {
                assert_eq!(todos.len(), 1);
                assert_eq!(todos[0].priority, Some(Priority::High));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_list_todos_object_is_malformed() {
        let response = HttpResponse::new(200, r#"{"items":[]}"#);
        let payload = client().parse_list_todos(response).unwrap();
        assert_eq!(payload, ListPayload::Malformed(r#"{"items":[]}"#.to_string()));
    }

    #[test]
    fn parse_list_todos_bad_json() {
        let err = client().parse_list_todos(HttpResponse::new(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn unauthorized_is_distinct() {
        let err = client()
            .parse_list_todos(HttpResponse::new(401, r#"{"detail":"Could not validate credentials"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn request_failed_uses_detail() {
        let err = client()
            .parse_create_todo(HttpResponse::new(422, r#"{"detail":"title must not be empty"}"#))
            .unwrap_err();
        match err {
            ApiError::RequestFailed { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "title must not be empty");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn request_failed_falls_back_to_body() {
        let err = client().parse_delete_todo(HttpResponse::new(500, "internal error")).unwrap_err();
        assert!(matches!(err, ApiError::RequestFailed { status: 500, ref message } if message == "internal error"));
    }

    #[test]
    fn any_2xx_is_success() {
        assert!(client().parse_delete_todo(HttpResponse::new(204, "")).is_ok());
        assert!(client().parse_delete_todo(HttpResponse::new(200, "null")).is_ok());
        let todo = client()
            .parse_create_todo(HttpResponse::new(200, r#"{"id":2,"title":"x","completed":false}"#))
            .unwrap();
        assert_eq!(todo.id, 2);
    }

    #[test]
    fn parse_auth_requires_token() {
        let token = client()
            .parse_auth(HttpResponse::new(200, r#"{"access_token":"abc","token_type":"bearer"}"#))
            .unwrap();
        assert_eq!(token, "abc");
        let err = client().parse_auth(HttpResponse::new(200, "{}")).unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn parse_auth_reports_bad_credentials_with_detail() {
        let err = client()
            .parse_auth(HttpResponse::new(401, r#"{"detail":"Incorrect username or password"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::RequestFailed { status: 401, ref message } if message == "Incorrect username or password"));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = TodoClient::new("http://localhost:8080/");
        assert_eq!(client.build_list_todos().path, "http://localhost:8080/todos/");
    }
}
