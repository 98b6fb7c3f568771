use glean::server::router;
use glean_core::{NewSummary, SummaryMode, SummaryStore};
use glean_local::library::{FsLibrary, HttpLibrary};
use std::net::SocketAddr;
use std::sync::Arc;

async fn serve_library(dir: &std::path::Path) -> SocketAddr {
    let store = Arc::new(FsLibrary::new(dir.to_path_buf()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(store)).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn post_then_list_newest_first() {
    let tmp = tempfile::tempdir().unwrap();
    let addr = serve_library(tmp.path()).await;
    let http = reqwest::Client::new();
    let url = format!("http://{addr}/api/summaries");

    let r = http
        .post(&url)
        .json(&serde_json::json!({
            "url": "https://a.example/1",
            "title": "First",
            "summary": "One."
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(r.status().as_u16(), 201);
    let v: serde_json::Value = r.json().await.unwrap();
    assert_eq!(v["success"], true);
    assert_eq!(v["data"]["type"], "brief");
    assert_eq!(v["data"]["tags"], serde_json::json!([]));

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let r = http
        .post(&url)
        .json(&serde_json::json!({
            "url": "https://a.example/2",
            "title": "Second",
            "summary": "Two.",
            "type": "bullets",
            "tags": ["News"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(r.status().as_u16(), 201);

    let v: serde_json::Value = http.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(v["success"], true);
    let titles: Vec<&str> = v["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Second", "First"]);
}

#[tokio::test]
async fn post_missing_fields_is_400() {
    let tmp = tempfile::tempdir().unwrap();
    let addr = serve_library(tmp.path()).await;
    let r = reqwest::Client::new()
        .post(format!("http://{addr}/api/summaries"))
        .json(&serde_json::json!({"url": "https://a.example", "summary": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(r.status().as_u16(), 400);
    let v: serde_json::Value = r.json().await.unwrap();
    assert_eq!(
        v,
        serde_json::json!({"success": false, "error": "Missing required fields"})
    );
}

#[tokio::test]
async fn post_with_null_or_empty_type_and_tags_uses_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let addr = serve_library(tmp.path()).await;
    let http = reqwest::Client::new();
    for body in [
        serde_json::json!({"url": "u", "title": "t", "summary": "s", "type": ""}),
        serde_json::json!({"url": "u", "title": "t", "summary": "s", "type": null}),
        serde_json::json!({"url": "u", "title": "t", "summary": "s", "tags": null}),
    ] {
        let r = http
            .post(format!("http://{addr}/api/summaries"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(r.status().as_u16(), 201, "{body}");
        let v: serde_json::Value = r.json().await.unwrap();
        assert_eq!(v["data"]["type"], "brief");
        assert_eq!(v["data"]["tags"], serde_json::json!([]));
    }

    let r = http
        .post(format!("http://{addr}/api/summaries"))
        .json(&serde_json::json!({"url": "u", "title": null, "summary": "s"}))
        .send()
        .await
        .unwrap();
    assert_eq!(r.status().as_u16(), 400);
    let v: serde_json::Value = r.json().await.unwrap();
    assert_eq!(v["error"], "Missing required fields");
}

#[tokio::test]
async fn post_malformed_json_is_400() {
    let tmp = tempfile::tempdir().unwrap();
    let addr = serve_library(tmp.path()).await;
    let r = reqwest::Client::new()
        .post(format!("http://{addr}/api/summaries"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(r.status().as_u16(), 400);
}

#[tokio::test]
async fn unknown_id_is_404() {
    let tmp = tempfile::tempdir().unwrap();
    let addr = serve_library(tmp.path()).await;
    let r = reqwest::get(format!("http://{addr}/api/summaries/nope"))
        .await
        .unwrap();
    assert_eq!(r.status().as_u16(), 404);
}

#[tokio::test]
async fn http_library_client_round_trips_through_the_service() {
    let tmp = tempfile::tempdir().unwrap();
    let addr = serve_library(tmp.path()).await;
    let lib = HttpLibrary::new(reqwest::Client::new(), &format!("http://{addr}")).unwrap();

    let rec = lib
        .save(NewSummary {
            url: "https://a.example/post".to_string(),
            title: "Post".to_string(),
            summary: "Summary.".to_string(),
            mode: SummaryMode::Detailed,
            tags: vec!["Tech".to_string()],
        })
        .await
        .unwrap();
    assert_eq!(rec.mode, SummaryMode::Detailed);

    assert_eq!(lib.list().await.unwrap(), vec![rec.clone()]);
    assert_eq!(lib.get(&rec.id).await.unwrap(), Some(rec));
    assert_eq!(lib.get(&"f".repeat(32)).await.unwrap(), None);

    let err = lib.save(NewSummary::default()).await.unwrap_err();
    assert!(matches!(err, glean_core::Error::InvalidInput(ref m) if m == "Missing required fields"));
}

#[tokio::test]
async fn index_lists_saved_summaries_and_filters() {
    let tmp = tempfile::tempdir().unwrap();
    let lib = FsLibrary::new(tmp.path().to_path_buf());
    lib.save_sync(NewSummary {
        url: "https://a.example/rust".to_string(),
        title: "Rust release".to_string(),
        summary: "New compiler.".to_string(),
        mode: SummaryMode::Brief,
        tags: vec!["Programming".to_string()],
    })
    .unwrap();
    lib.save_sync(NewSummary {
        url: "https://a.example/bread".to_string(),
        title: "Sourdough".to_string(),
        summary: "Flour and water.".to_string(),
        mode: SummaryMode::Eli5,
        tags: vec![],
    })
    .unwrap();
    let addr = serve_library(tmp.path()).await;

    let html = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("2 saved articles"));
    assert!(html.contains("Rust release") && html.contains("Sourdough"));

    let html = reqwest::get(format!("http://{addr}/?q=programming"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("1 saved article<"));
    assert!(!html.contains("Sourdough"));
}
