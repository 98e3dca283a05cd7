//! Integration tests for the DeptSync backend.

use std::time::Duration;

use chrono::FixedOffset;
use reqwest::{multipart, Client, RequestBuilder};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::{AiConfig, Config};
use crate::{build_state, create_router};

const ADMIN_PASSWORD: &str = "admin-secret";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    admin_token: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_upload_limit(1024 * 1024).await
    }

    async fn with_upload_limit(max_upload_bytes: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let config = Config {
            db_path: temp_dir.path().join("test.sqlite"),
            index_path: temp_dir.path().join("index"),
            upload_dir: temp_dir.path().join("uploads"),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            token_secret: "test-token-secret".to_string(),
            token_ttl: Duration::from_secs(3600),
            admin_password: ADMIN_PASSWORD.to_string(),
            utc_offset: FixedOffset::east_opt(8 * 3600).unwrap(),
            max_upload_bytes,
            ai: AiConfig {
                api_base: "http://127.0.0.1:9".to_string(),
                api_key: None,
                model: "test-model".to_string(),
                timeout: Duration::from_secs(1),
            },
        };

        let state = build_state(config).await.expect("Failed to build state");
        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut fixture = TestFixture {
            client: Client::new(),
            base_url,
            admin_token: String::new(),
            _temp_dir: temp_dir,
        };
        fixture.admin_token = fixture.login("admin", ADMIN_PASSWORD).await;
        fixture
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, job_number: &str, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "jobNumber": job_number, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["accessToken"].as_str().unwrap().to_string()
    }

    /// Register an employee, returning `(user id, token)`.
    async fn register(&self, name: &str, job_number: &str) -> (String, String) {
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "name": name, "jobNumber": job_number, "password": "pass1234" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        (
            body["data"]["user"]["id"].as_str().unwrap().to_string(),
            body["data"]["accessToken"].as_str().unwrap().to_string(),
        )
    }

    fn get(&self, token: &str, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    fn post(&self, token: &str, path: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token)
    }

    fn put(&self, token: &str, path: &str) -> RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(token)
    }

    fn delete(&self, token: &str, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }

    async fn create_project(&self, token: &str, body: Value) -> Value {
        let resp = self.post(token, "/api/projects").json(&body).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }
}

fn data_ids(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_admin_login_and_me() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .get(&fixture.admin_token, "/api/auth/me")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["role"], "ADMIN");
    assert_eq!(body["data"]["jobNumber"], "admin");
}

#[tokio::test]
async fn test_login_wrong_password() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "jobNumber": "admin", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/projects"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = fixture
        .get("not-a-token", "/api/projects")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_register_and_duplicate_job_number() {
    let fixture = TestFixture::new().await;

    let (_, token) = fixture.register("Alice", "1001").await;
    let resp = fixture.get(&token, "/api/auth/me").send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["username"], "Alice(1001)");
    assert_eq!(body["data"]["role"], "EMPLOYEE");

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({ "name": "Another", "jobNumber": "1001", "password": "pass1234" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_user_update_permissions() {
    let fixture = TestFixture::new().await;
    let (alice_id, alice) = fixture.register("Alice", "1001").await;
    let (bob_id, _) = fixture.register("Bob", "1002").await;

    // Own profile
    let resp = fixture
        .put(&alice, &format!("/api/users/{}", alice_id))
        .json(&json!({ "skills": ["Rust", "SQL"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["skills"], json!(["Rust", "SQL"]));

    // Someone else's profile
    let resp = fixture
        .put(&alice, &format!("/api/users/{}", bob_id))
        .json(&json!({ "name": "Mallory" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Self-promotion via role
    let resp = fixture
        .put(&alice, &format!("/api/users/{}", alice_id))
        .json(&json!({ "role": "ADMIN" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Admin promotion
    let resp = fixture
        .post(&fixture.admin_token, &format!("/api/users/{}/promote", bob_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["role"], "ADMIN");
}

#[tokio::test]
async fn test_project_crud_and_version_conflict() {
    let fixture = TestFixture::new().await;
    let token = fixture.admin_token.clone();

    let project = fixture
        .create_project(
            &token,
            json!({ "title": "Apollo", "priority": "HIGH", "startDate": "2024-06-01" }),
        )
        .await;
    let id = project["id"].as_str().unwrap().to_string();
    assert_eq!(project["version"], 1);
    assert_eq!(project["status"], "INITIATION");

    let resp = fixture
        .put(&token, &format!("/api/projects/{}", id))
        .json(&json!({ "status": "EXECUTION", "expectedVersion": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "EXECUTION");
    assert_eq!(body["data"]["version"], 2);

    // Stale version
    let resp = fixture
        .put(&token, &format!("/api/projects/{}", id))
        .json(&json!({ "title": "Stale", "expectedVersion": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VERSION_MISMATCH");
    assert_eq!(body["error"]["details"]["currentVersion"], 2);

    let resp = fixture
        .delete(&token, &format!("/api/projects/{}", id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .get(&token, &format!("/api/projects/{}", id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_project_requires_manager() {
    let fixture = TestFixture::new().await;
    let (_, employee) = fixture.register("Eve", "2001").await;

    let project = fixture
        .create_project(
            &fixture.admin_token,
            json!({ "title": "Locked", "startDate": "2024-06-01" }),
        )
        .await;
    let id = project["id"].as_str().unwrap();

    let resp = fixture
        .put(&employee, &format!("/api/projects/{}", id))
        .json(&json!({ "title": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    // Employees manage projects they create
    let own = fixture
        .create_project(&employee, json!({ "title": "Mine", "startDate": "2024-06-01" }))
        .await;
    let resp = fixture
        .put(&employee, &format!("/api/projects/{}", own["id"].as_str().unwrap()))
        .json(&json!({ "title": "Still mine" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_project_delete_cascades() {
    let fixture = TestFixture::new().await;
    let token = fixture.admin_token.clone();

    let project = fixture
        .create_project(&token, json!({ "title": "Doomed", "startDate": "2024-06-01" }))
        .await;
    let id = project["id"].as_str().unwrap().to_string();

    let resp = fixture
        .post(&token, "/api/tasks")
        .json(&json!({ "projectId": id, "title": "Task", "deadline": "2024-07-01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .post(&token, "/api/events")
        .json(&json!({ "projectId": id, "content": "Kickoff", "type": "MILESTONE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    fixture
        .delete(&token, &format!("/api/projects/{}", id))
        .send()
        .await
        .unwrap();

    let resp = fixture
        .get(&token, &format!("/api/tasks?projectId={}", id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());

    let resp = fixture
        .get(&token, &format!("/api/events?projectId={}", id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_task_board_ordering() {
    let fixture = TestFixture::new().await;
    let token = fixture.admin_token.clone();
    let (worker_id, worker) = fixture.register("Worker", "3001").await;

    let normal = fixture
        .create_project(&token, json!({ "title": "A", "priority": "NORMAL", "startDate": "2024-01-01" }))
        .await;
    let urgent = fixture
        .create_project(&token, json!({ "title": "B", "priority": "URGENT", "startDate": "2024-01-01" }))
        .await;
    let high = fixture
        .create_project(&token, json!({ "title": "C", "priority": "HIGH", "startDate": "2024-01-01" }))
        .await;

    for (project, title) in [(&normal, "task A"), (&urgent, "task B"), (&high, "task C")] {
        let resp = fixture
            .post(&token, "/api/tasks")
            .json(&json!({
                "projectId": project["id"],
                "title": title,
                "assigneeIds": [worker_id],
                "deadline": "2030-01-01"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = fixture.get(&worker, "/api/tasks/board").send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let columns = body["data"]["columns"].as_array().unwrap();
    assert_eq!(columns.len(), 3);
    assert_eq!(columns[0]["status"], "PENDING");

    let titles: Vec<&str> = columns[0]["cards"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["task"]["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["task B", "task C", "task A"]);
    assert_eq!(columns[0]["cards"][0]["projectPriority"], "URGENT");
}

#[tokio::test]
async fn test_task_progress_derives_status() {
    let fixture = TestFixture::new().await;
    let token = fixture.admin_token.clone();
    let (worker_id, worker) = fixture.register("Worker", "3001").await;
    let (_, outsider) = fixture.register("Outsider", "3002").await;

    let project = fixture
        .create_project(&token, json!({ "title": "P", "startDate": "2024-01-01" }))
        .await;
    let resp = fixture
        .post(&token, "/api/tasks")
        .json(&json!({
            "projectId": project["id"],
            "title": "Write docs",
            "assigneeIds": [worker_id],
            "deadline": "2030-01-01"
        }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let task_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "PENDING");

    let resp = fixture
        .post(&worker, &format!("/api/tasks/{}/progress", task_id))
        .json(&json!({ "progress": 40, "remark": "Half the outline" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "IN_PROGRESS");
    assert_eq!(body["data"]["remarks"][0]["content"], "Half the outline");

    let resp = fixture
        .post(&worker, &format!("/api/tasks/{}/progress", task_id))
        .json(&json!({ "progress": 100 }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "COMPLETED");

    let resp = fixture
        .post(&worker, &format!("/api/tasks/{}/progress", task_id))
        .json(&json!({ "progress": 140 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .post(&outsider, &format!("/api/tasks/{}/progress", task_id))
        .json(&json!({ "progress": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_reports_filter_group_and_export() {
    let fixture = TestFixture::new().await;
    let (alice_id, alice) = fixture.register("Alice", "1001").await;
    let (_, bob) = fixture.register("Bob", "1002").await;

    for (token, content) in [
        (&alice, "Finished the payment gateway"),
        (&bob, "Reviewed contracts"),
        (&alice, "Started load testing"),
    ] {
        let resp = fixture
            .post(token, "/api/reports")
            .json(&json!({ "weekStartDate": "2024-06-03", "content": content }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let admin = fixture.admin_token.clone();

    let resp = fixture.get(&admin, "/api/reports").send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    // Case-insensitive match on author display name
    let resp = fixture.get(&admin, "/api/reports?q=alice").send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    // Date range excluding everything
    let resp = fixture
        .get(&admin, "/api/reports?startDate=2000-01-01&endDate=2000-01-02")
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());

    let resp = fixture
        .get(&admin, "/api/reports?groupBy=author")
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let groups = body["data"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    let alice_group = groups.iter().find(|g| g["key"] == alice_id.as_str()).unwrap();
    assert_eq!(alice_group["title"], "Alice(1001)");
    assert_eq!(alice_group["reports"].as_array().unwrap().len(), 2);

    let resp = fixture
        .get(&admin, "/api/reports?groupBy=weekday")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .get(&admin, "/api/reports/export?q=contracts")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let text = resp.text().await.unwrap();
    assert!(text.contains("Employee: Bob(1002)"));
    assert!(text.contains("Reviewed contracts"));
    assert!(!text.contains("payment gateway"));
}

#[tokio::test]
async fn test_report_delete_permissions() {
    let fixture = TestFixture::new().await;
    let (_, alice) = fixture.register("Alice", "1001").await;
    let (_, bob) = fixture.register("Bob", "1002").await;

    let resp = fixture
        .post(&alice, "/api/reports")
        .json(&json!({ "weekStartDate": "2024-06-03", "content": "Mine" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .delete(&bob, &format!("/api/reports/{}", id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = fixture
        .delete(&alice, &format!("/api/reports/{}", id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Empty reports are rejected
    let resp = fixture
        .post(&alice, "/api/reports")
        .json(&json!({ "weekStartDate": "2024-06-03", "content": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_upload_and_serve_file() {
    let fixture = TestFixture::new().await;
    let token = fixture.admin_token.clone();

    let part = multipart::Part::bytes(vec![0x89, b'P', b'N', b'G', 1, 2, 3])
        .file_name("IMG_0001.png")
        .mime_str("image/png")
        .unwrap();
    let form = multipart::Form::new()
        .part("file", part)
        .text("projectName", "Q3 Launch")
        .text("caption", "Demo Screenshot!!");

    let resp = fixture
        .post(&token, "/api/files/upload")
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Q3_Launch_Demo_Screenshot.png");
    assert_eq!(body["data"]["folder"], "Images");
    assert_eq!(body["data"]["originalName"], "IMG_0001.png");
    assert!(body["data"]["path"]
        .as_str()
        .unwrap()
        .starts_with("projects/Q3_Launch/Images/"));

    // Served without a token
    let url = body["data"]["url"].as_str().unwrap();
    let resp = fixture.client.get(fixture.url(url)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("content-type").unwrap(), "image/png");
    assert_eq!(resp.bytes().await.unwrap().len(), 7);

    let resp = fixture
        .client
        .get(fixture.url("/api/files/content/missing/file.txt"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_upload_document_keeps_name() {
    let fixture = TestFixture::new().await;

    let part = multipart::Part::bytes(b"hello".to_vec())
        .file_name("minutes.txt")
        .mime_str("text/plain")
        .unwrap();
    let form = multipart::Form::new().part("file", part);

    let resp = fixture
        .post(&fixture.admin_token, "/api/files/upload")
        .multipart(form)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "minutes.txt");
    assert_eq!(body["data"]["folder"], "Documents");
    assert!(body["data"]["path"]
        .as_str()
        .unwrap()
        .starts_with("uploads/Documents/"));
}

#[tokio::test]
async fn test_report_upload_is_filed_under_owner_name() {
    let fixture = TestFixture::new().await;
    let (_, alice) = fixture.register("Alice", "1001").await;

    let part = multipart::Part::bytes(b"notes".to_vec())
        .file_name("week23.txt")
        .mime_str("text/plain")
        .unwrap();
    let form = multipart::Form::new()
        .part("file", part)
        .text("folder", "reports/weekly");

    let resp = fixture
        .post(&alice, "/api/files/upload")
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["folder"], "Documents");
    assert!(body["data"]["path"]
        .as_str()
        .unwrap()
        .starts_with("reports/Alice/Documents/"));
}

#[tokio::test]
async fn test_upload_too_large() {
    let fixture = TestFixture::with_upload_limit(16 * 1024).await;

    let part = multipart::Part::bytes(vec![0u8; 32 * 1024])
        .file_name("big.bin")
        .mime_str("application/octet-stream")
        .unwrap();
    let form = multipart::Form::new().part("file", part);

    let resp = fixture
        .post(&fixture.admin_token, "/api/files/upload")
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_attachment_folders() {
    let fixture = TestFixture::new().await;
    let token = fixture.admin_token.clone();

    let project = fixture
        .create_project(&token, json!({ "title": "Docs", "startDate": "2024-01-01" }))
        .await;
    let project_id = project["id"].as_str().unwrap().to_string();

    let resp = fixture
        .post(&token, "/api/events")
        .json(&json!({
            "projectId": project_id,
            "content": "Contract signed",
            "attachments": [
                { "name": "contract.pdf", "url": "/api/files/content/x/contract.pdf", "folder": "Documents" }
            ]
        }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let event_id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .put(&token, &format!("/api/events/{}/attachments/0/folder", event_id))
        .json(&json!({ "folder": "Contracts" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["attachments"][0]["folder"], "Contracts");
    assert_eq!(body["data"]["attachments"][0]["name"], "contract.pdf");

    let resp = fixture
        .put(&token, &format!("/api/events/{}/attachments/5/folder", event_id))
        .json(&json!({ "folder": "Contracts" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .get(&token, &format!("/api/projects/{}/folders", project_id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"], json!(["Contracts", "Documents", "Images"]));
}

#[tokio::test]
async fn test_events_date_range() {
    let fixture = TestFixture::new().await;
    let token = fixture.admin_token.clone();

    let project = fixture
        .create_project(&token, json!({ "title": "Timeline", "startDate": "2024-01-01" }))
        .await;

    for (date, content) in [
        ("2024-03-01T23:59:59", "late"),
        ("2024-03-02T00:00:01", "early"),
    ] {
        let resp = fixture
            .post(&token, "/api/events")
            .json(&json!({ "projectId": project["id"], "content": content, "date": date }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = fixture
        .get(&token, "/api/events?startDate=2024-03-01&endDate=2024-03-01")
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let events = body["data"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["content"], "late");

    let resp = fixture
        .get(&token, "/api/events?startDate=not-a-date")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_llm_fallbacks_without_key() {
    let fixture = TestFixture::new().await;
    let token = fixture.admin_token.clone();

    let project = fixture
        .create_project(&token, json!({ "title": "Apollo", "startDate": "2024-01-01" }))
        .await;

    let resp = fixture
        .post(&token, "/api/llm/project-report")
        .json(&json!({ "projectId": project["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["content"]
        .as_str()
        .unwrap()
        .starts_with("AI service unavailable"));

    // No team reports: answered without the model
    let resp = fixture
        .post(&token, "/api/llm/project-weekly-report")
        .json(&json!({ "projectId": project["id"] }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["content"], crate::ai::NO_TEAM_UPDATES);

    let resp = fixture
        .post(&token, "/api/llm/personal-report")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["data"]["generalSummary"]
        .as_str()
        .unwrap()
        .starts_with("AI service unavailable"));

    let resp = fixture
        .post(&token, "/api/llm/generate-report")
        .json(&json!({ "reportType": "dept_monthly" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["type"], "dept_monthly");
    assert!(body["data"]["content"].is_string());

    let resp = fixture
        .post(&token, "/api/llm/generate-report")
        .json(&json!({ "reportType": "quarterly" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .post(&token, "/api/llm/project-report")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_dashboard_admin_only() {
    let fixture = TestFixture::new().await;
    let (_, employee) = fixture.register("Eve", "2001").await;

    fixture
        .create_project(
            &fixture.admin_token,
            json!({ "title": "Live", "status": "EXECUTION", "startDate": "2024-01-01" }),
        )
        .await;
    fixture
        .create_project(
            &fixture.admin_token,
            json!({ "title": "Done", "status": "CLOSED", "startDate": "2024-01-01" }),
        )
        .await;

    let resp = fixture.get(&employee, "/api/dashboard").send().await.unwrap();
    assert_eq!(resp.status(), 403);

    let resp = fixture
        .get(&fixture.admin_token, "/api/dashboard")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["totalProjects"], 2);
    assert_eq!(body["data"]["activeProjects"], 1);
    assert_eq!(body["data"]["closedProjects"], 1);
}

#[tokio::test]
async fn test_search_endpoint() {
    let fixture = TestFixture::new().await;
    let (_, alice) = fixture.register("Alice", "1001").await;

    let resp = fixture
        .post(&alice, "/api/reports")
        .json(&json!({ "weekStartDate": "2024-06-03", "content": "Migrated the billing database" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let report_id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = fixture.get(&alice, "/api/search?q=billing").send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["results"][0]["kind"], "report");
    assert_eq!(body["data"]["results"][0]["item"]["id"], report_id.as_str());

    fixture
        .delete(&alice, &format!("/api/reports/{}", report_id))
        .send()
        .await
        .unwrap();
    let resp = fixture.get(&alice, "/api/search?q=billing").send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_inspirations_crud() {
    let fixture = TestFixture::new().await;
    let (_, alice) = fixture.register("Alice", "1001").await;
    let (_, bob) = fixture.register("Bob", "1002").await;

    let resp = fixture
        .post(&alice, "/api/inspirations")
        .json(&json!({ "content": "Automate the weekly digest", "tags": ["idea"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["authorName"], "Alice(1001)");

    let resp = fixture
        .put(&bob, &format!("/api/inspirations/{}", id))
        .json(&json!({ "content": "Mine now" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = fixture
        .put(&alice, &format!("/api/inspirations/{}", id))
        .json(&json!({ "content": "Automate the monthly digest", "expectedVersion": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture.get(&bob, "/api/inspirations").send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(data_ids(&body), vec![id.clone()]);
    assert_eq!(body["data"][0]["content"], "Automate the monthly digest");

    let resp = fixture
        .delete(&alice, &format!("/api/inspirations/{}", id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_datastore_snapshot() {
    let fixture = TestFixture::new().await;
    let token = fixture.admin_token.clone();

    fixture
        .create_project(&token, json!({ "title": "Snap", "startDate": "2024-01-01" }))
        .await;

    let resp = fixture.get(&token, "/api/datastore").send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["schemaVersion"], 1);
    assert_eq!(body["data"]["projects"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["users"].as_array().unwrap().len(), 1);
    assert!(body["data"]["users"][0].get("passwordHash").is_none());
    assert_eq!(body["data"]["revisionId"], body["revisionId"]);
}

#[tokio::test]
async fn test_revision_increments_on_writes() {
    let fixture = TestFixture::new().await;
    let token = fixture.admin_token.clone();

    // Get initial revision
    let resp = fixture
        .get(&token, "/api/datastore/revision")
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let initial_revision = body["data"]["revisionId"].as_i64().unwrap();

    let resp = fixture
        .post(&token, "/api/projects")
        .json(&json!({ "title": "Revision Test", "startDate": "2024-01-01" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["revisionId"].as_i64().unwrap(), initial_revision + 1);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .put(&token, &format!("/api/projects/{}", id))
        .json(&json!({ "title": "Updated" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["revisionId"].as_i64().unwrap(), initial_revision + 2);

    let resp = fixture
        .delete(&token, &format!("/api/projects/{}", id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["revisionId"].as_i64().unwrap(), initial_revision + 3);
}

#[tokio::test]
async fn test_not_found_errors() {
    let fixture = TestFixture::new().await;
    let token = fixture.admin_token.clone();

    for path in ["/api/projects/missing", "/api/tasks/missing", "/api/users/missing"] {
        let resp = fixture.get(&token, path).send().await.unwrap();
        assert_eq!(resp.status(), 404, "{}", path);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    let resp = fixture
        .post(&token, "/api/events")
        .json(&json!({ "projectId": "missing", "content": "Orphan" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_project_list_filters() {
    let fixture = TestFixture::new().await;
    let token = fixture.admin_token.clone();

    let draft = fixture
        .create_project(
            &token,
            json!({ "title": "Gate Upgrade", "status": "INITIATION", "startDate": "2024-01-01",
                    "businessScenario": "Logistics" }),
        )
        .await;
    let running = fixture
        .create_project(
            &token,
            json!({ "title": "Store Rollout", "status": "ACCEPTANCE", "startDate": "2024-01-01",
                    "customerName": "Contoso", "businessScenario": "Retail" }),
        )
        .await;
    let closed = fixture
        .create_project(
            &token,
            json!({ "title": "Old Portal", "status": "CLOSED", "startDate": "2023-01-01",
                    "projectNumber": "PRJ-0042", "businessScenario": "Retail" }),
        )
        .await;

    let list = |query: &'static str| {
        let request = fixture.get(&token, &format!("/api/projects{}", query));
        async move {
            let resp = request.send().await.unwrap();
            assert_eq!(resp.status(), 200);
            data_ids(&resp.json::<Value>().await.unwrap())
        }
    };

    assert_eq!(list("?tab=pre").await, vec![draft["id"].as_str().unwrap()]);
    assert_eq!(list("?tab=formal").await, vec![running["id"].as_str().unwrap()]);
    assert_eq!(list("?tab=archived").await, vec![closed["id"].as_str().unwrap()]);
    assert_eq!(list("?q=contoso").await, vec![running["id"].as_str().unwrap()]);
    assert_eq!(list("?q=prj-0042").await, vec![closed["id"].as_str().unwrap()]);
    assert_eq!(list("?businessScenario=Retail").await.len(), 2);
    assert_eq!(list("").await.len(), 3);

    let resp = fixture
        .get(&token, "/api/projects?tab=someday")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_inspiration_filters_and_tags() {
    let fixture = TestFixture::new().await;
    let (_, alice) = fixture.register("Alice", "1001").await;
    let (_, bob) = fixture.register("Bob", "1002").await;

    for (token, content, tags) in [
        (&alice, "QR codes at the gate", json!(["ops", "idea"])),
        (&bob, "Shorter standups", json!(["process"])),
        (&bob, "Badge printer", json!(["ops"])),
    ] {
        let resp = fixture
            .post(token, "/api/inspirations")
            .json(&json!({ "content": content, "tags": tags }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = fixture.get(&alice, "/api/inspirations?tag=ops").send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let resp = fixture
        .get(&alice, "/api/inspirations?q=BOB&tag=ops")
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["content"], "Badge printer");

    let resp = fixture.get(&alice, "/api/inspirations/tags").send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"], json!(["idea", "ops", "process"]));
}
