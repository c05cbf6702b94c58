use std::{sync::Arc, time::Duration};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::AuthTokens,
    error::ApiError,
    protocol::{ApiEnvelope, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse},
};
use tokio::sync::{broadcast, Mutex};
use url::Url;

pub mod config;
pub mod products;
pub mod session;

pub use products::{ProductsApi, ProductsController, ProductsService, ProductsSnapshot};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};

use config::Settings;

type SharedRefresh = Shared<BoxFuture<'static, Result<String, ApiError>>>;

/// Session-level notifications for the embedding application. A surviving
/// authorization failure (refresh denied) means the session is gone and the
/// app should navigate to its login entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedOut,
    SessionExpired,
}

/// Query/body of a request, held in serialized form so a 401-triggered
/// replay reuses the exact original payload.
#[derive(Default)]
struct Payload {
    query: Option<Vec<(String, String)>>,
    body: Option<serde_json::Value>,
}

/// HTTP client owning the Credential Pair. Attaches the bearer token to
/// every call, normalizes all failures into [`ApiError`], and on a 401
/// refreshes the access token (single-flight) and replays the request
/// exactly once.
pub struct ApiClient {
    http: Client,
    base_url: Url,
    store: Arc<dyn SessionStore>,
    refresh_inflight: Mutex<Option<SharedRefresh>>,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    pub fn new(base_url: Url, store: Arc<dyn SessionStore>) -> Arc<Self> {
        Self::with_http(Client::new(), base_url, store)
    }

    pub fn with_http(http: Client, base_url: Url, store: Arc<dyn SessionStore>) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            http,
            base_url,
            store,
            refresh_inflight: Mutex::new(None),
            events,
        })
    }

    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn SessionStore>,
    ) -> Result<Arc<Self>, ApiError> {
        let base_url = Url::parse(&settings.api_base_url)
            .map_err(|err| ApiError::local(format!("invalid api base url: {err}")))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|err| ApiError::local(format!("failed to build http client: {err}")))?;
        Ok(Self::with_http(http, base_url, store))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// POST `/auth/login`. Goes through the unauthenticated path: no bearer
    /// token is attached and a 401 here never triggers a refresh.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest {
            email: email.into(),
            password: password.into(),
        };
        let response = self
            .http
            .post(self.endpoint("/auth/login"))
            .json(&body)
            .send()
            .await
            .map_err(normalize_transport_error)?;
        let session: LoginResponse = decode_data(response).await?;
        self.store.store(&session.tokens);
        Ok(session)
    }

    pub fn logout(&self) {
        self.store.clear();
        let _ = self.events.send(SessionEvent::LoggedOut);
    }

    pub fn set_auth_tokens(&self, tokens: &AuthTokens) {
        self.store.store(tokens);
    }

    pub fn clear_auth_tokens(&self) {
        self.store.clear();
    }

    pub fn is_authenticated(&self) -> bool {
        self.store
            .load()
            .is_some_and(|tokens| !tokens.access_token.is_empty())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, Payload::default()).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let payload = Payload {
            query: Some(query_pairs(query)?),
            body: None,
        };
        self.request(Method::GET, path, payload).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Payload::json(body)?).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, Payload::json(body)?).await
    }

    /// DELETE calls answer with a bare `{success, message?}` envelope, so
    /// this decodes to unit instead of a data payload.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let response = self
            .dispatch(Method::DELETE, path, &Payload::default())
            .await?;
        decode_unit(response).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> Result<T, ApiError> {
        let response = self.dispatch(method, path, &payload).await?;
        decode_data(response).await
    }

    /// Executes with the stored bearer token; on a 401, refreshes and
    /// replays once. A failed refresh clears the session and broadcasts
    /// [`SessionEvent::SessionExpired`] before propagating.
    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        payload: &Payload,
    ) -> Result<Response, ApiError> {
        let bearer = self.store.load().map(|tokens| tokens.access_token);
        let response = self
            .execute(method.clone(), path, payload, bearer.as_deref())
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        match self.refresh_access_token().await {
            Ok(access_token) => {
                self.execute(method, path, payload, Some(&access_token))
                    .await
            }
            Err(refresh_err) => {
                self.handle_auth_error();
                Err(refresh_err)
            }
        }
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        payload: &Payload,
        bearer: Option<&str>,
    ) -> Result<Response, ApiError> {
        let mut builder = self.http.request(method, self.endpoint(path));
        if let Some(query) = &payload.query {
            builder = builder.query(query);
        }
        if let Some(body) = &payload.body {
            builder = builder.json(body);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        builder.send().await.map_err(normalize_transport_error)
    }

    /// Single-flight refresh: concurrent callers all await the same pending
    /// operation; the handle is cleared only after it settles. On success
    /// the new access token is persisted next to the unchanged refresh
    /// token; on failure the Credential Pair is cleared entirely.
    pub async fn refresh_access_token(&self) -> Result<String, ApiError> {
        let shared = {
            let mut slot = self.refresh_inflight.lock().await;
            if let Some(existing) = slot.as_ref() {
                existing.clone()
            } else {
                let refresh_token = self
                    .store
                    .load()
                    .map(|tokens| tokens.refresh_token)
                    .filter(|token| !token.is_empty());
                let Some(refresh_token) = refresh_token else {
                    return Err(ApiError::local("no refresh token available"));
                };
                let fut = perform_token_refresh(
                    self.http.clone(),
                    self.endpoint("/auth/refresh"),
                    Arc::clone(&self.store),
                    refresh_token,
                )
                .boxed()
                .shared();
                *slot = Some(fut.clone());
                fut
            }
        };

        let result = shared.clone().await;

        let mut slot = self.refresh_inflight.lock().await;
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&shared)) {
            *slot = None;
        }
        result
    }

    fn handle_auth_error(&self) {
        self.store.clear();
        let _ = self.events.send(SessionEvent::SessionExpired);
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

impl Payload {
    fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|err| ApiError::local(format!("failed to serialize request body: {err}")))?;
        Ok(Self {
            query: None,
            body: Some(body),
        })
    }
}

async fn perform_token_refresh(
    http: Client,
    endpoint: String,
    store: Arc<dyn SessionStore>,
    refresh_token: String,
) -> Result<String, ApiError> {
    let result = async {
        let response = http
            .post(&endpoint)
            .json(&RefreshRequest {
                refresh_token: refresh_token.clone(),
            })
            .send()
            .await
            .map_err(normalize_transport_error)?;
        let refreshed: RefreshResponse = decode_data(response).await?;
        Ok::<_, ApiError>(refreshed.access_token)
    }
    .await;

    match result {
        Ok(access_token) => {
            store.store(&AuthTokens {
                access_token: access_token.clone(),
                refresh_token,
            });
            Ok(access_token)
        }
        Err(err) => {
            store.clear();
            Err(err)
        }
    }
}

fn normalize_transport_error(err: reqwest::Error) -> ApiError {
    if err.is_builder() {
        ApiError::local(err.to_string())
    } else {
        // send() failed before any server answered
        ApiError::network()
    }
}

async fn decode_data<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_from_response(status, response).await);
    }
    let envelope: ApiEnvelope<T> = response
        .json()
        .await
        .map_err(|err| ApiError::local(format!("failed to decode response body: {err}")))?;
    envelope
        .data
        .ok_or_else(|| ApiError::local("response envelope carried no data"))
}

async fn decode_unit(response: Response) -> Result<(), ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_from_response(status, response).await);
    }
    Ok(())
}

async fn error_from_response(status: StatusCode, response: Response) -> ApiError {
    let (message, code) = match response.json::<ApiEnvelope<serde_json::Value>>().await {
        Ok(envelope) => (
            envelope
                .message
                .unwrap_or_else(|| "An error occurred".into()),
            envelope.code,
        ),
        Err(_) => ("An error occurred".into(), None),
    };
    ApiError::server(status.as_u16(), message, code)
}

fn query_pairs<Q: Serialize + ?Sized>(query: &Q) -> Result<Vec<(String, String)>, ApiError> {
    let value = serde_json::to_value(query)
        .map_err(|err| ApiError::local(format!("failed to serialize query: {err}")))?;
    let serde_json::Value::Object(map) = value else {
        return Err(ApiError::local("query must serialize to an object"));
    };
    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let rendered = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, rendered)
        })
        .collect())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
