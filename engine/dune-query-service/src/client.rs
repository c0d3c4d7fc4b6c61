use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::DuneApiConfig;
use crate::error::{DuneQueryError, Result};
use crate::models::*;

/// Header carrying the Dune API key
pub const API_KEY_HEADER: &str = "X-DUNE-API-KEY";

/// Executes a query remotely and returns its full result table
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn run_query(&self, request: &QueryRequest) -> Result<QueryTable>;
}

/// Dune Analytics API client
pub struct DuneClient {
    config: DuneApiConfig,
    api_key: String,
    client: Client,
}

impl DuneClient {
    /// Create a client, reading the API key from the environment
    pub fn new(config: DuneApiConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: DuneApiConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            config,
            api_key: api_key.into(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Start an execution of `request`, returning the execution id
    pub async fn execute(&self, request: &QueryRequest) -> Result<String> {
        let url = self.url(&format!("query/{}/execute", request.query_id));
        let body = ExecuteRequest {
            query_parameters: request.parameter_map(),
            performance: self.config.performance.clone(),
        };

        info!(
            "Executing query {} ({}) with {} parameters",
            request.name,
            request.query_id,
            request.params.len()
        );

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let execution: ExecuteResponse = parse_response(response).await?;
        debug!(
            "Execution {} started in state {}",
            execution.execution_id, execution.state
        );
        Ok(execution.execution_id)
    }

    pub async fn get_status(&self, execution_id: &str) -> Result<StatusResponse> {
        let url = self.url(&format!("execution/{}/status", execution_id));
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        parse_response(response).await
    }

    pub async fn get_results(&self, execution_id: &str) -> Result<ResultsResponse> {
        let url = self.url(&format!("execution/{}/results", execution_id));
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        parse_response(response).await
    }

    /// Poll until the execution reaches a terminal state
    async fn wait_for_completion(&self, execution_id: &str) -> Result<()> {
        loop {
            let status = self.get_status(execution_id).await?;
            debug!(
                "Execution {} state {} (queue position {:?})",
                status.execution_id, status.state, status.queue_position
            );

            if status.state.is_terminal() {
                if status.state.is_success() {
                    return Ok(());
                }
                return Err(DuneQueryError::ExecutionFailed {
                    execution_id: execution_id.to_string(),
                    state: status.state.to_string(),
                });
            }

            tokio::time::sleep(self.config.ping_frequency()).await;
        }
    }

    async fn execute_and_fetch(&self, request: &QueryRequest) -> Result<QueryTable> {
        let execution_id = self.execute(request).await?;
        self.wait_for_completion(&execution_id).await?;

        let results = self.get_results(&execution_id).await?;
        let result = results
            .result
            .ok_or_else(|| DuneQueryError::ExecutionFailed {
                execution_id: results.execution_id.clone(),
                state: results.state.to_string(),
            })?;

        if results.state == ExecutionState::CompletedPartial {
            warn!("Execution {} returned partial results", execution_id);
        }

        let table = QueryTable::from_records(result.metadata.column_names, result.rows);
        info!(
            "Fetched {} rows for query {}",
            table.row_count(),
            request.name
        );
        Ok(table)
    }
}

#[async_trait]
impl QueryExecutor for DuneClient {
    async fn run_query(&self, request: &QueryRequest) -> Result<QueryTable> {
        let timeout = self.config.request_timeout();
        tokio::time::timeout(timeout, self.execute_and_fetch(request))
            .await
            .map_err(|_| DuneQueryError::Timeout(timeout))?
    }
}

/// Map non-2xx responses to `Api` errors, otherwise decode the JSON body
async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or_else(|_| body.chars().take(200).collect());
        return Err(DuneQueryError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const EXECUTION_ID: &str = "01HKZJ2683PHF9Q9PHHQ8FW4Q1";

    /// Request as seen by the stub Dune server
    #[derive(Debug, Clone)]
    struct StubRequest {
        method: String,
        path: String,
        head: String,
        body: String,
    }

    type Route = dyn Fn(&StubRequest) -> (u16, String) + Send + Sync;

    /// Serve canned responses on a local port, one connection per request
    async fn spawn_stub_server(route: Arc<Route>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind TCP listener");
        let addr = listener.local_addr().expect("Failed to get local address");

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let route = route.clone();
                tokio::spawn(async move {
                    let Some(request) = read_request(&mut socket).await else {
                        return;
                    };
                    let (status, body) = route(&request);
                    let response = format!(
                        "HTTP/1.1 {} Stub\r\n\
                         Content-Type: application/json\r\n\
                         Content-Length: {}\r\n\
                         Connection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    async fn read_request(socket: &mut TcpStream) -> Option<StubRequest> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let mut request_line = head.lines().next()?.split_whitespace();
        let method = request_line.next()?.to_string();
        let path = request_line.next()?.to_string();
        let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

        Some(StubRequest {
            method,
            path,
            head,
            body,
        })
    }

    fn test_config(base_url: &str) -> DuneApiConfig {
        DuneApiConfig {
            base_url: base_url.to_string(),
            ping_frequency_secs: 0,
            ..Default::default()
        }
    }

    fn test_client(base_url: &str) -> DuneClient {
        DuneClient::with_api_key(test_config(base_url), "test-key").unwrap()
    }

    fn test_request() -> QueryRequest {
        QueryRequest {
            query_id: 42,
            name: "mint_burn".to_string(),
            params: Vec::new(),
        }
    }

    fn execute_response(state: &str) -> String {
        json!({"execution_id": EXECUTION_ID, "state": state}).to_string()
    }

    /// Stub that reports each state in `states` in turn, then serves `results`
    fn dune_route(
        states: Vec<&'static str>,
        results: serde_json::Value,
        seen: Arc<Mutex<Vec<StubRequest>>>,
    ) -> Arc<Route> {
        let polls = AtomicUsize::new(0);
        Arc::new(move |request: &StubRequest| {
            seen.lock().unwrap().push(request.clone());

            if request.path.ends_with("/execute") {
                return (200, execute_response("QUERY_STATE_PENDING"));
            }
            if request.path.ends_with("/status") {
                let i = polls.fetch_add(1, Ordering::SeqCst).min(states.len() - 1);
                let body = json!({"execution_id": EXECUTION_ID, "state": states[i]});
                return (200, body.to_string());
            }
            if request.path.ends_with("/results") {
                return (200, results.to_string());
            }
            (404, json!({"error": "not found"}).to_string())
        })
    }

    fn completed_results() -> serde_json::Value {
        json!({
            "execution_id": EXECUTION_ID,
            "state": "QUERY_STATE_COMPLETED",
            "result": {
                "rows": [{"b": "x", "a": 1}],
                "metadata": {"column_names": ["a", "b"], "total_row_count": 1}
            }
        })
    }

    #[test]
    fn test_endpoint_urls() {
        let client = test_client("https://api.dune.com/");
        assert_eq!(
            client.url("query/4842271/execute"),
            "https://api.dune.com/api/v1/query/4842271/execute"
        );
        assert_eq!(
            client.url("execution/01HK/status"),
            "https://api.dune.com/api/v1/execution/01HK/status"
        );
    }

    #[tokio::test]
    async fn test_execute_poll_and_fetch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let route = dune_route(
            vec!["QUERY_STATE_PENDING", "QUERY_STATE_EXECUTING", "QUERY_STATE_COMPLETED"],
            completed_results(),
            seen.clone(),
        );
        let client = test_client(&spawn_stub_server(route).await);

        let mut request = test_request();
        let param = crate::params::Parameter::text("pool_address", "0xabc");
        request.params = vec![param.to_wire_parameter()];
        let table = client.run_query(&request).await.unwrap();

        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.rows, vec![vec![json!(1), json!("x")]]);

        let seen = seen.lock().unwrap();
        let paths: Vec<_> = seen
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect();
        assert_eq!(
            paths,
            vec![
                "POST /api/v1/query/42/execute".to_string(),
                format!("GET /api/v1/execution/{}/status", EXECUTION_ID),
                format!("GET /api/v1/execution/{}/status", EXECUTION_ID),
                format!("GET /api/v1/execution/{}/status", EXECUTION_ID),
                format!("GET /api/v1/execution/{}/results", EXECUTION_ID),
            ]
        );

        for request in seen.iter() {
            let head = request.head.to_ascii_lowercase();
            assert!(head.contains("x-dune-api-key: test-key"), "{}", request.head);
        }

        let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(
            body,
            json!({"query_parameters": {"pool_address": "0xabc"}, "performance": "medium"})
        );
    }

    #[tokio::test]
    async fn test_failed_states_map_to_execution_failed() {
        for state in ["QUERY_STATE_FAILED", "QUERY_STATE_CANCELLED", "QUERY_STATE_EXPIRED"] {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let route = dune_route(
                vec!["QUERY_STATE_PENDING", state],
                completed_results(),
                seen.clone(),
            );
            let client = test_client(&spawn_stub_server(route).await);

            let err = client.run_query(&test_request()).await.unwrap_err();
            match err {
                DuneQueryError::ExecutionFailed {
                    execution_id,
                    state: reported,
                } => {
                    assert_eq!(execution_id, EXECUTION_ID);
                    assert_eq!(reported, state);
                }
                other => panic!("unexpected error for {}: {:?}", state, other),
            }

            // results are never requested for a failed execution
            let seen = seen.lock().unwrap();
            assert!(seen.iter().all(|r| !r.path.ends_with("/results")));
        }
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_api_error() {
        let route: Arc<Route> = Arc::new(|_: &StubRequest| {
            (401, json!({"error": "invalid API Key"}).to_string())
        });
        let client = test_client(&spawn_stub_server(route).await);

        let err = client.run_query(&test_request()).await.unwrap_err();
        assert!(err.is_auth_failure());
        assert!(err.is_remote());
        match err {
            DuneQueryError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid API Key");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body_kept_as_message() {
        let route: Arc<Route> =
            Arc::new(|_: &StubRequest| (502, "upstream unavailable".to_string()));
        let client = test_client(&spawn_stub_server(route).await);

        let err = client.run_query(&test_request()).await.unwrap_err();
        match err {
            DuneQueryError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream unavailable");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_result_is_execution_failure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let results = json!({
            "execution_id": EXECUTION_ID,
            "state": "QUERY_STATE_COMPLETED"
        });
        let route = dune_route(vec!["QUERY_STATE_COMPLETED"], results, seen);
        let client = test_client(&spawn_stub_server(route).await);

        let err = client.run_query(&test_request()).await.unwrap_err();
        assert!(matches!(err, DuneQueryError::ExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn test_pending_forever_times_out() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let route = dune_route(vec!["QUERY_STATE_PENDING"], completed_results(), seen);
        let base_url = spawn_stub_server(route).await;

        let config = DuneApiConfig {
            request_timeout_secs: 1,
            ping_frequency_secs: 1,
            ..test_config(&base_url)
        };
        let client = DuneClient::with_api_key(config, "test-key").unwrap();

        let err = client.run_query(&test_request()).await.unwrap_err();
        assert!(matches!(err, DuneQueryError::Timeout(d) if d.as_secs() == 1));
        assert!(err.is_remote());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_remote_failure() {
        // nothing listens on the discard port
        let client = test_client("http://127.0.0.1:9");

        let err = client.run_query(&test_request()).await.unwrap_err();
        assert!(err.is_remote(), "unexpected error: {:?}", err);
    }
}
