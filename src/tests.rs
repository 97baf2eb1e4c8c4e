//! Integration tests for the journal query API.

use std::sync::Arc;

use reqwest::Client;
use serde_json::Value;
use tempfile::TempDir;

use crate::collab::locale::StaticLocaleService;
use crate::config::Config;
use crate::db::{init_database, SqliteRepository};
use crate::models::WorkflowStatus::*;
use crate::observe::RecordingObserver;
use crate::query::test_support::article;
use crate::query::QueryService;
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    observer: Arc<RecordingObserver>,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize and seed database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(SqliteRepository::new(pool));
        seed(&repo).await;

        // Create config
        let mut config = Config::from_lookup(|name| match name {
            "JQ_AVAILABLE_LOCALES" => Some("en_US,ru_RU".to_string()),
            "JQ_LOG_LEVEL" => Some("warn".to_string()),
            _ => None,
        })
        .expect("Failed to build config");
        config.db_path = db_path;
        config.bind_addr = "127.0.0.1:0".parse().unwrap();

        let observer = Arc::new(RecordingObserver::new());
        let service = QueryService::new(
            repo.clone(),
            repo,
            Arc::new(StaticLocaleService::new(config.available_locales.clone())),
            observer.clone(),
            config.query_settings(),
        );

        let state = AppState {
            service: Arc::new(service),
            config: Arc::new(config),
        };

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

        TestFixture {
            client: Client::new(),
            base_url,
            observer,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }
}

async fn seed(repo: &SqliteRepository) {
    let versions = vec![
        article("A", 10, 1.0, Approved)
            .title("en_US", "City budget 2024")
            .body("en_US", "<root><p>Council approves budget</p></root>")
            .title("ru_RU", "Городской бюджет")
            .body("ru_RU", "<root><p>Совет одобрил бюджет</p></root>")
            .tag("finance")
            .category("Economy")
            .modified(1)
            .build(),
        article("A", 10, 1.1, Pending)
            .title("en_US", "City budget 2024 (draft)")
            .body("en_US", "<root><p>Council debates budget</p></root>")
            .modified(3)
            .build(),
        article("B", 11, 1.0, Approved)
            .title("en_US", "Derby day")
            .body("en_US", "Local club wins")
            .tag("sports")
            .category("Sport")
            .modified(5)
            .build(),
        article("C", 12, 1.0, Expired)
            .title("en_US", "Old budget")
            .body("en_US", "archived")
            .build(),
        article("D", 13, 1.0, Trashed)
            .title("en_US", "Removed budget")
            .body("en_US", "gone")
            .trashed()
            .build(),
    ];
    for version in &versions {
        repo.insert_version(version).await.expect("Failed to seed");
    }
}

fn article_ids(data: &Value) -> Vec<&str> {
    data.as_array()
        .unwrap()
        .iter()
        .map(|item| item["articleId"].as_str().unwrap())
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
async fn test_listing_newest_first_with_default_languages() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/articles").await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(article_ids(&body["data"]), vec!["B", "A"]);
    let a = &body["data"][1];
    assert_eq!(a["version"], 1.0);
    assert_eq!(a["title"], "City budget 2024");
    assert_eq!(a["content"], "Council approves budget");
    assert_eq!(a["resourceKey"], 10);
}

#[tokio::test]
async fn test_listing_in_requested_locale() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/articles?locale=ru-RU").await;

    assert_eq!(status, 200);
    let a = &body["data"][1];
    assert_eq!(a["title"], "Городской бюджет");
    assert_eq!(a["content"], "Совет одобрил бюджет");
    assert_eq!(a["locale"], "ru_RU");
    // No Russian body: falls back to the default language.
    assert_eq!(body["data"][0]["title"], "Derby day");
    assert_eq!(body["data"][0]["locale"], "en_US");
}

#[tokio::test]
async fn test_keyword_search_returns_current_version() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/search?keywords=budget").await;

    assert_eq!(status, 200);
    let data = &body["data"];
    assert_eq!(data["total"], 1);
    assert_eq!(article_ids(&data["results"]), vec!["A"]);
    assert_eq!(data["results"][0]["version"], 1.1);
    assert_eq!(data["results"][0]["title"], "City budget 2024 (draft)");
}

#[tokio::test]
async fn test_archived_search_with_pagination() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .get("/api/search?keywords=budget&archived=true&start=1&end=5")
        .await;

    assert_eq!(status, 200);
    let data = &body["data"];
    assert_eq!(data["total"], 2);
    assert_eq!(data["start"], 1);
    assert_eq!(data["end"], 5);
    assert_eq!(article_ids(&data["results"]), vec!["C"]);
}

#[tokio::test]
async fn test_advanced_search_by_tag_and_title() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .get("/api/search?advanced=true&and=true&title=budget&tag=FINANCE")
        .await;
    assert_eq!(status, 200);
    assert_eq!(article_ids(&body["data"]["results"]), vec!["A"]);

    let (_, body) = fixture
        .get("/api/search?advanced=true&and=true&title=budget&tag=sports")
        .await;
    assert_eq!(body["data"]["total"], 0);

    let (_, body) = fixture.get("/api/search?advanced=true&category=sport").await;
    assert_eq!(article_ids(&body["data"]["results"]), vec!["B"]);

    assert!(fixture.observer.events().is_empty());
}

#[tokio::test]
async fn test_articles_by_tag_and_category() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/tags/fin/articles").await;
    assert_eq!(status, 200);
    assert_eq!(article_ids(&body["data"]), vec!["A"]);

    let (_, body) = fixture.get("/api/tags/Fin/articles").await;
    assert!(article_ids(&body["data"]).is_empty());

    let (status, body) = fixture.get("/api/categories/Econ/articles").await;
    assert_eq!(status, 200);
    assert_eq!(article_ids(&body["data"]), vec!["A"]);
}

#[tokio::test]
async fn test_get_article() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/articles/20/A").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["articleId"], "A");
    assert_eq!(body["data"]["version"], 1.1);

    let (status, body) = fixture.get("/api/articles/20/ZZ").await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_arguments_are_bad_requests() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/articles/0/A").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");

    let (status, body) = fixture.get("/api/search?start=5&end=2").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");

    let (status, _) = fixture.get("/api/search?locale=e!").await;
    assert_eq!(status, 400);

    let (status, _) = fixture.get("/api/tags/%20/articles").await;
    assert_eq!(status, 400);
}
