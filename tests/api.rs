use reqwest::{multipart, Client, Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

use cortex_services::{
    app,
    config::Config,
    models::AnalysisStatus,
    services::store::{MemoryStore, Store},
    AppState,
};

const SALES_CSV: &str = "month,sales,units,region\n\
Jan,100,10,North\n\
Feb,120,12,South\n\
Mar,140,11,North\n\
Apr,160,15,East\n\
May,180,14,West\n";

/// A running server on an ephemeral port plus a client pointed at it.
struct TestServer {
    base: String,
    client: Client,
    state: Arc<AppState>,
}

impl TestServer {
    async fn start() -> Self {
        let state = Arc::new(AppState::new(Config::default(), Arc::new(MemoryStore::new())));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            client: Client::new(),
            state,
        }
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = self.client.request(method, format!("{}{}", self.base, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.unwrap();
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, path, Some(token), None).await
    }

    async fn upload(&self, token: &str, filename: &str, mime: &str, content: &str) -> (StatusCode, Value) {
        let part = multipart::Part::text(content.to_string())
            .file_name(filename.to_string())
            .mime_str(mime)
            .unwrap();
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/api/datasets/upload", self.base))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": "Ada", "email": email, "password": "secret123" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }

    async fn upload_sales(&self, token: &str) -> String {
        let (status, body) = self.upload(token, "sales.csv", "text/csv", SALES_CSV).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["dataset"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let response = server
        .client
        .get(format!("{}/health", server.base))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let server = TestServer::start().await;
    let (status, body) = server
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ada", "email": "Ada@Example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Registration successful");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(body["user"].get("passwordHash").is_none());

    let (status, body) = server
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ADA@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = server.get("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Ada");
    assert_eq!(body["stats"]["totalDatasets"], 0);
}

#[tokio::test]
async fn test_register_validation() {
    let server = TestServer::start().await;
    server.register("ada@example.com").await;

    let cases = [
        (json!({ "email": "x@example.com", "password": "secret123" }), StatusCode::BAD_REQUEST),
        (
            json!({ "name": "X", "email": "x@example.com", "password": "short" }),
            StatusCode::BAD_REQUEST,
        ),
        (
            json!({ "name": "X", "email": "not-an-email", "password": "secret123" }),
            StatusCode::BAD_REQUEST,
        ),
        (
            json!({ "name": "X", "email": "ada@example.com", "password": "secret123" }),
            StatusCode::CONFLICT,
        ),
    ];

    for (payload, expected) in cases {
        let (status, body) = server
            .call(Method::POST, "/api/auth/register", None, Some(payload))
            .await;
        assert_eq!(status, expected, "{}", body);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let server = TestServer::start().await;
    server.register("ada@example.com").await;

    let (status, body) = server
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_token_required() {
    let server = TestServer::start().await;

    let (status, body) = server.call(Method::GET, "/api/datasets/list", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization token required");

    let (status, body) = server.get("/api/datasets/list", "bogus").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let server = TestServer::start().await;
    let token = server.register("ada@example.com").await;

    let (status, _) = server
        .call(Method::POST, "/api/auth/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server.get("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_and_list() {
    let server = TestServer::start().await;
    let token = server.register("ada@example.com").await;
    let dataset_id = server.upload_sales(&token).await;

    let (status, body) = server.get("/api/datasets/list", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    let dataset = &body["datasets"][0];
    assert_eq!(dataset["id"], dataset_id.as_str());
    assert_eq!(dataset["rowCount"], 5);
    assert_eq!(dataset["columnCount"], 4);
    assert_eq!(dataset["status"], "uploaded");
}

#[tokio::test]
async fn test_upload_rejects_unknown_type() {
    let server = TestServer::start().await;
    let token = server.register("ada@example.com").await;

    let (status, body) = server.upload(&token, "notes.txt", "text/plain", "hello").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid file type. Allowed: CSV, JSON, Excel");
}

#[tokio::test]
async fn test_upload_rejects_bad_json() {
    let server = TestServer::start().await;
    let token = server.register("ada@example.com").await;

    let (status, body) = server.upload(&token, "rows.json", "application/json", "[{").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON format");
}

#[tokio::test]
async fn test_upload_json_rows_and_analyze() {
    let server = TestServer::start().await;
    let token = server.register("ada@example.com").await;

    let rows = r#"[{"day": "Mon", "visits": 10}, {"day": "Tue", "visits": 30}]"#;
    let (status, body) = server.upload(&token, "visits.json", "application/json", rows).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dataset"]["columns"], json!(["day", "visits"]));
    let dataset_id = body["dataset"]["id"].as_str().unwrap().to_string();

    let (status, body) = server
        .call(Method::POST, &format!("/api/analysis/run/{}", dataset_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let analysis_id = body["analysis"]["id"].as_str().unwrap().to_string();

    let (_, body) = server
        .get(&format!("/api/analysis/results/{}", analysis_id), &token)
        .await;
    let statistics = &body["analysis"]["results"]["statistics"];
    assert_eq!(statistics[0]["column"], "visits");
    assert_eq!(statistics[0]["mean"], 20.0);
}

#[tokio::test]
async fn test_run_analysis_and_fetch_results() {
    let server = TestServer::start().await;
    let token = server.register("ada@example.com").await;
    let dataset_id = server.upload_sales(&token).await;

    let (status, body) = server
        .call(Method::POST, &format!("/api/analysis/run/{}", dataset_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Analysis started");
    assert_eq!(body["analysis"]["status"], "completed");
    assert_eq!(body["analysis"]["progress"], 100);
    let analysis_id = body["analysis"]["id"].as_str().unwrap().to_string();

    let (status, body) = server
        .get(&format!("/api/analysis/results/{}", analysis_id), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let analysis = &body["analysis"];
    assert_eq!(analysis["datasetName"], "sales.csv");

    let results = &analysis["results"];
    assert_eq!(results["summary"]["totalRows"], 5);
    assert_eq!(results["summary"]["numericColumns"], 2);
    assert_eq!(results["summary"]["categoricalColumns"], 2);
    assert_eq!(results["statistics"][0]["column"], "sales");
    assert_eq!(results["statistics"][0]["mean"], 140.0);
    assert_eq!(results["trends"][0]["type"], "Upward Trend");
    assert_eq!(results["insights"].as_array().unwrap().len(), 4);
    assert_eq!(results["chartData"]["values"].as_array().unwrap().len(), 5);

    let (status, body) = server.get(&format!("/api/datasets/{}", dataset_id), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dataset"]["status"], "analyzed");
    assert_eq!(body["analyses"].as_array().unwrap().len(), 1);

    let (_, body) = server.get("/api/analysis/list", &token).await;
    assert_eq!(body["total"], 1);

    let (_, body) = server.get("/api/auth/me", &token).await;
    assert_eq!(body["stats"]["completedAnalyses"], 1);
    assert_eq!(body["stats"]["totalInsights"], 4);
}

#[tokio::test]
async fn test_run_with_missing_file_marks_analysis_error() {
    let server = TestServer::start().await;
    let token = server.register("ada@example.com").await;
    let dataset_id = server.upload_sales(&token).await;

    let store = &server.state.store;
    let dataset = store.get_dataset(&dataset_id).await.unwrap().unwrap();
    assert!(store.delete_file(&dataset.storage_path).await.unwrap());

    let (status, body) = server
        .call(Method::POST, &format!("/api/analysis/run/{}", dataset_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Dataset file not found" }));

    let analyses = store.list_analyses_by_dataset(&dataset_id).await.unwrap();
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].status, AnalysisStatus::Error);
    assert!(analyses[0].results.is_none());

    let (_, body) = server.get(&format!("/api/datasets/{}", dataset_id), &token).await;
    assert_eq!(body["dataset"]["status"], "uploaded");
    assert_eq!(body["analyses"][0]["status"], "error");
}

#[tokio::test]
async fn test_other_users_are_denied() {
    let server = TestServer::start().await;
    let owner = server.register("owner@example.com").await;
    let intruder = server.register("intruder@example.com").await;
    let dataset_id = server.upload_sales(&owner).await;

    let (status, body) = server.get(&format!("/api/datasets/{}", dataset_id), &intruder).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied");

    let (status, _) = server
        .call(
            Method::POST,
            &format!("/api/analysis/run/{}", dataset_id),
            Some(&intruder),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_records() {
    let server = TestServer::start().await;
    let token = server.register("ada@example.com").await;

    let (status, body) = server.get("/api/datasets/dataset_missing", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Dataset not found");

    let (status, body) = server.get("/api/analysis/results/analysis_missing", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Analysis not found");
}

#[tokio::test]
async fn test_delete_dataset() {
    let server = TestServer::start().await;
    let token = server.register("ada@example.com").await;
    let dataset_id = server.upload_sales(&token).await;

    let (status, body) = server
        .call(Method::DELETE, &format!("/api/datasets/{}", dataset_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Dataset deleted successfully");

    let (_, body) = server.get("/api/datasets/list", &token).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_assistant_chat_flow() {
    let server = TestServer::start().await;
    let token = server.register("ada@example.com").await;
    server.upload_sales(&token).await;

    let (status, body) = server
        .call(
            Method::POST,
            "/api/assistant/chat",
            Some(&token),
            Some(json!({ "message": "What datasets do I have?" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let reply = body["response"].as_str().unwrap();
    assert!(reply.starts_with("You have 1 dataset(s) uploaded"));
    assert!(reply.contains("sales.csv (5 rows, 4 columns)"));
    assert_eq!(body["message"]["role"], "assistant");

    let (_, body) = server.get("/api/assistant/chat", &token).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");

    let (status, _) = server
        .call(Method::DELETE, "/api/assistant/chat", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = server.get("/api/assistant/chat", &token).await;
    assert!(body["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_assistant_requires_message() {
    let server = TestServer::start().await;
    let token = server.register("ada@example.com").await;

    for payload in [json!({}), json!({ "message": "" }), json!({ "message": 42 })] {
        let (status, body) = server
            .call(Method::POST, "/api/assistant/chat", Some(&token), Some(payload))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message is required");
    }
}
