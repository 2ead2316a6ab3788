//! API client for communicating with the NeoBarber REST API.
//!
//! This module provides the `ApiClient` struct for authenticating and for
//! fetching barbershop data (services, clients, appointments, tasks and
//! revenue analytics).

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{
    Appointment, Client as ShopClient, LoginRequest, NewAppointment, NewClient, NewTask,
    RegisterRequest, RevenueAnalytics, Service, Task, TokenResponse, User,
};

use super::ApiError;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

// ============================================================================
// Constants
// ============================================================================

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Acknowledgement body returned by mutation endpoints.
#[derive(Debug, Deserialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Everything the agenda view needs for one day.
#[derive(Debug, Clone)]
pub struct Agenda {
    pub date: String,
    pub appointments: Vec<Appointment>,
    pub clients: Vec<ShopClient>,
    pub services: Vec<Service>,
}

/// API client for the NeoBarber backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl ApiClient {
    /// Create a new API client against `base_url` (e.g. `http://localhost:8000/api`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> ApiResult<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a request built by `build`, retrying with exponential backoff on 429.
    async fn send<T, F>(&self, path: &str, build: F) -> ApiResult<T>
    where
        T: DeserializeOwned,
        F: Fn(&Client, String) -> RequestBuilder,
    {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self.authorize(build(&self.client, url.clone())).send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response.json().await.map_err(|e| {
                        ApiError::InvalidResponse(format!("Failed to parse {}: {}", path, e))
                    });
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(path = path, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(path, |client, url| client.get(url)).await
    }

    async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        self.send(path, |client, url| client.get(url).query(query)).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        self.send(path, |client, url| client.post(url).json(body)).await
    }

    async fn put<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(path, |client, url| client.put(url)).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(path, |client, url| client.delete(url)).await
    }

    // ===== Authentication =====

    /// Exchange credentials for a bearer token and the account record.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<TokenResponse> {
        debug!(email = email, "Sending login request");
        self.post("/auth/login", &LoginRequest { email, password }).await
    }

    /// Create an account and receive a bearer token for it.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        barbershop_name: Option<&str>,
    ) -> ApiResult<TokenResponse> {
        debug!(email = email, "Sending registration request");
        let body = RegisterRequest {
            email,
            password,
            name,
            barbershop_name,
        };
        self.post("/auth/register", &body).await
    }

    /// Fetch the account the current token belongs to.
    pub async fn me(&self) -> ApiResult<User> {
        self.get("/auth/me").await
    }

    // ===== Data Fetching Methods =====

    pub async fn fetch_services(&self) -> ApiResult<Vec<Service>> {
        self.get("/services").await
    }

    pub async fn fetch_clients(&self) -> ApiResult<Vec<ShopClient>> {
        self.get("/clients").await
    }

    pub async fn create_client(&self, client: &NewClient) -> ApiResult<ShopClient> {
        self.post("/clients", client).await
    }

    /// Fetch appointments, optionally filtered by day (YYYY-MM-DD) and status.
    pub async fn fetch_appointments(
        &self,
        date: Option<&str>,
        status: Option<&str>,
    ) -> ApiResult<Vec<Appointment>> {
        let mut query = Vec::new();
        if let Some(date) = date {
            query.push(("date", date));
        }
        if let Some(status) = status {
            query.push(("status", status));
        }
        self.get_with_query("/appointments", &query).await
    }

    pub async fn create_appointment(&self, appointment: &NewAppointment) -> ApiResult<Appointment> {
        self.post("/appointments", appointment).await
    }

    pub async fn complete_appointment(&self, id: &str) -> ApiResult<String> {
        let response: MessageResponse = self.put(&format!("/appointments/{}/complete", id)).await?;
        Ok(response.message)
    }

    pub async fn delete_appointment(&self, id: &str) -> ApiResult<String> {
        let response: MessageResponse = self.delete(&format!("/appointments/{}", id)).await?;
        Ok(response.message)
    }

    /// Fetch confirmed appointments for `date` along with the client and
    /// service rosters needed to book new ones.
    pub async fn fetch_agenda(&self, date: &str) -> ApiResult<Agenda> {
        let (appointments, clients, services) = futures::try_join!(
            self.fetch_appointments(Some(date), Some("confirmed")),
            self.fetch_clients(),
            self.fetch_services(),
        )?;
        debug!(
            date = date,
            appointments = appointments.len(),
            clients = clients.len(),
            services = services.len(),
            "Agenda fetched"
        );

        Ok(Agenda {
            date: date.to_string(),
            appointments,
            clients,
            services,
        })
    }

    pub async fn fetch_tasks(&self) -> ApiResult<Vec<Task>> {
        self.get("/tasks").await
    }

    pub async fn create_task(&self, task: &NewTask) -> ApiResult<Task> {
        self.post("/tasks", task).await
    }

    pub async fn toggle_task(&self, id: &str) -> ApiResult<String> {
        let response: MessageResponse = self.put(&format!("/tasks/{}/toggle", id)).await?;
        Ok(response.message)
    }

    pub async fn delete_task(&self, id: &str) -> ApiResult<String> {
        let response: MessageResponse = self.delete(&format!("/tasks/{}", id)).await?;
        Ok(response.message)
    }

    /// Fetch the revenue summary, optionally bounded by inclusive dates.
    pub async fn fetch_revenue(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> ApiResult<RevenueAnalytics> {
        let mut query = Vec::new();
        if let Some(start) = start_date {
            query.push(("start_date", start));
        }
        if let Some(end) = end_date {
            query.push(("end_date", end));
        }
        self.get_with_query("/analytics/revenue", &query).await
    }

    /// Returns true if the backend reports itself healthy.
    pub async fn health(&self) -> ApiResult<bool> {
        let response: HealthResponse = self.get("/health").await?;
        Ok(response.status == "ok")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};

    fn client_for(server: &ServerGuard) -> ApiClient {
        ApiClient::new(server.url(), Duration::from_secs(5)).expect("client builds")
    }

    const USER_JSON: &str = r#"{"id":"1","email":"a@b.com","name":"A","barbershop_name":"Cyber Cuts"}"#;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = ApiClient::new("http://localhost:8000/api/", Duration::from_secs(1))
            .expect("client builds");
        assert_eq!(api.base_url(), "http://localhost:8000/api");
        assert_eq!(api.url("/auth/me"), "http://localhost:8000/api/auth/me");
    }

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/auth/login")
            .match_body(Matcher::Json(serde_json::json!({
                "email": "a@b.com",
                "password": "pw"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"access_token":"T1","token_type":"bearer","user":{}}}"#,
                USER_JSON
            ))
            .create_async()
            .await;

        let api = client_for(&server);
        let response = api.login("a@b.com", "pw").await.expect("login succeeds");
        m.assert_async().await;
        assert_eq!(response.access_token, "T1");
        assert_eq!(response.user.email, "a@b.com");
        assert_eq!(response.user.organization_name.as_deref(), Some("Cyber Cuts"));
    }

    #[tokio::test]
    async fn test_register_forwards_barbershop_name() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/auth/register")
            .match_body(Matcher::Json(serde_json::json!({
                "email": "a@b.com",
                "password": "pw",
                "name": "A",
                "barbershop_name": "Cyber Cuts"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"access_token":"T2","token_type":"bearer","user":{}}}"#, USER_JSON))
            .create_async()
            .await;

        let api = client_for(&server);
        let response = api
            .register("a@b.com", "pw", "A", Some("Cyber Cuts"))
            .await
            .expect("register succeeds");
        m.assert_async().await;
        assert_eq!(response.access_token, "T2");
    }

    #[tokio::test]
    async fn test_me_sends_bearer_token() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/auth/me")
            .match_header("authorization", "Bearer T1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(USER_JSON)
            .create_async()
            .await;

        let api = client_for(&server).with_token("T1".to_string());
        let user = api.me().await.expect("me succeeds");
        m.assert_async().await;
        assert_eq!(user.id, "1");
    }

    #[tokio::test]
    async fn test_unauthorized_carries_detail() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/auth/me")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail":"Invalid authentication credentials"}"#)
            .create_async()
            .await;

        let api = client_for(&server).with_token("stale".to_string());
        let err = api.me().await.expect_err("stale token rejected");
        assert!(err.is_unauthorized());
        assert_eq!(err.detail(), Some("Invalid authentication credentials"));
    }

    #[tokio::test]
    async fn test_fetch_agenda_filters_confirmed_for_date() {
        let mut server = Server::new_async().await;
        let appointments = server
            .mock("GET", Matcher::Regex(r"^/appointments".to_string()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("date".into(), "2024-05-01".into()),
                Matcher::UrlEncoded("status".into(), "confirmed".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":"a1","client_id":"c1","client_name":"Joao","service_id":"s1","service_name":"Cyber Fade","date":"2024-05-01","time":"14:30","price":65.0,"status":"confirmed"}]"#)
            .create_async()
            .await;
        let _clients = server
            .mock("GET", "/clients")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":"c1","name":"Joao","visits":2,"total_spent":130.0}]"#)
            .create_async()
            .await;
        let _services = server
            .mock("GET", "/services")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":"s1","name":"Cyber Fade","price":65.0,"duration":"45min"}]"#)
            .create_async()
            .await;

        let api = client_for(&server).with_token("T1".to_string());
        let agenda = api.fetch_agenda("2024-05-01").await.expect("agenda fetched");
        appointments.assert_async().await;
        assert_eq!(agenda.appointments.len(), 1);
        assert_eq!(agenda.clients[0].visits, 2);
        assert_eq!(agenda.services[0].name, "Cyber Fade");
    }

    #[tokio::test]
    async fn test_toggle_task_returns_message() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("PUT", "/tasks/t1/toggle")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Task toggled successfully"}"#)
            .create_async()
            .await;

        let api = client_for(&server).with_token("T1".to_string());
        let message = api.toggle_task("t1").await.expect("toggle succeeds");
        assert_eq!(message, "Task toggled successfully");
    }

    #[tokio::test]
    async fn test_missing_task_is_not_found() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("DELETE", "/tasks/missing")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail":"Task not found"}"#)
            .create_async()
            .await;

        let api = client_for(&server).with_token("T1".to_string());
        let err = api.delete_task("missing").await.expect_err("missing task");
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.detail(), Some("Task not found"));
    }

    #[tokio::test]
    async fn test_health() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"ok","service":"neobarber-api"}"#)
            .create_async()
            .await;

        let api = client_for(&server);
        assert!(api.health().await.expect("health succeeds"));
    }

    #[tokio::test]
    async fn test_create_client_posts_only_given_fields() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/clients")
            .match_header("authorization", "Bearer T1")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "Joao",
                "phone": "11987654321"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"c9","name":"Joao","phone":"11987654321","email":null,"notes":null,"visits":0,"total_spent":0}"#)
            .create_async()
            .await;

        let api = client_for(&server).with_token("T1".to_string());
        let created = api
            .create_client(&NewClient {
                name: "Joao".to_string(),
                phone: Some("11987654321".to_string()),
                email: None,
                notes: None,
            })
            .await
            .expect("client created");
        m.assert_async().await;
        assert_eq!(created.id, "c9");
        assert_eq!(created.visits, 0);
    }

    #[tokio::test]
    async fn test_create_appointment_returns_confirmed() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/appointments")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "client_id": "c1",
                "service_id": "s1",
                "date": "2024-05-01",
                "time": "09:00",
                "price": 45.0
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"a7","client_id":"c1","client_name":"Joao","service_id":"s1","service_name":"Barba Viking","date":"2024-05-01","time":"09:00","price":45.0,"status":"confirmed","barbershop_id":"u1"}"#)
            .create_async()
            .await;

        let api = client_for(&server).with_token("T1".to_string());
        let client: ShopClient = serde_json::from_str(
            r#"{"id":"c1","name":"Joao","phone":null,"email":null,"notes":null}"#,
        )
        .expect("client json");
        let service: Service = serde_json::from_str(
            r#"{"id":"s1","name":"Barba Viking","price":45.0,"duration":"30 min","description":null}"#,
        )
        .expect("service json");
        let booking = NewAppointment::for_client(&client, &service, "2024-05-01", "09:00");
        let created = api.create_appointment(&booking).await.expect("appointment created");
        m.assert_async().await;
        assert_eq!(created.id, "a7");
        assert_eq!(created.status(), crate::models::AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_complete_and_delete_appointment() {
        let mut server = Server::new_async().await;
        let complete = server
            .mock("PUT", "/appointments/a7/complete")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Appointment completed successfully"}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/appointments/a7")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Appointment deleted successfully"}"#)
            .create_async()
            .await;

        let api = client_for(&server).with_token("T1".to_string());
        let message = api.complete_appointment("a7").await.expect("completed");
        assert_eq!(message, "Appointment completed successfully");
        let message = api.delete_appointment("a7").await.expect("deleted");
        assert_eq!(message, "Appointment deleted successfully");
        complete.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_missing_appointment_is_not_found() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("PUT", "/appointments/gone/complete")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail":"Appointment not found"}"#)
            .create_async()
            .await;

        let api = client_for(&server).with_token("T1".to_string());
        let err = api.complete_appointment("gone").await.expect_err("missing appointment");
        assert_eq!(err.detail(), Some("Appointment not found"));
    }

    #[tokio::test]
    async fn test_create_task_sends_priority() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/tasks")
            .match_body(Matcher::Json(serde_json::json!({
                "title": "Restock pomade",
                "priority": "high"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"t3","title":"Restock pomade","priority":"high","done":false}"#)
            .create_async()
            .await;

        let api = client_for(&server).with_token("T1".to_string());
        let task = api
            .create_task(&NewTask::new("Restock pomade", crate::models::TaskPriority::High))
            .await
            .expect("task created");
        m.assert_async().await;
        assert_eq!(task.id, "t3");
        assert!(!task.done);
    }
}
