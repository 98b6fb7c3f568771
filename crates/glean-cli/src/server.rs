//! Library HTTP service: JSON API plus a read-only HTML listing.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Json, Router,
};
use glean_core::{Error, NewSummary, SummaryRecord, SummaryStore};
use glean_local::library::ApiEnvelope;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

pub type SharedStore = Arc<dyn SummaryStore>;

type ApiReply<T> = (StatusCode, Json<ApiEnvelope<T>>);

pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/summaries", get(list_summaries).post(create_summary))
        .route("/api/summaries/:id", get(get_summary))
        .with_state(store)
}

pub async fn serve(bind: SocketAddr, store: SharedStore) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "library listening");
    axum::serve(listener, router(store)).await?;
    Ok(())
}

async fn list_summaries(State(store): State<SharedStore>) -> ApiReply<Vec<SummaryRecord>> {
    match store.list().await {
        Ok(records) => (StatusCode::OK, Json(ApiEnvelope::ok(records))),
        Err(e) => {
            tracing::error!(error = %e, "fetching summaries failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiEnvelope::err("Failed to fetch summaries")),
            )
        }
    }
}

async fn create_summary(
    State(store): State<SharedStore>,
    body: Result<Json<NewSummary>, JsonRejection>,
) -> ApiReply<SummaryRecord> {
    let Ok(Json(new)) = body else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiEnvelope::err("Invalid request body")),
        );
    };
    match store.save(new).await {
        Ok(record) => (StatusCode::CREATED, Json(ApiEnvelope::ok(record))),
        Err(Error::InvalidInput(msg)) => (StatusCode::BAD_REQUEST, Json(ApiEnvelope::err(msg))),
        Err(e) => {
            tracing::error!(error = %e, "creating summary failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiEnvelope::err("Failed to create summary")),
            )
        }
    }
}

async fn get_summary(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> ApiReply<SummaryRecord> {
    match store.get(&id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(ApiEnvelope::ok(record))),
        Ok(None) => (StatusCode::NOT_FOUND, Json(ApiEnvelope::err("Summary not found"))),
        Err(e) => {
            tracing::error!(error = %e, %id, "fetching summary failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiEnvelope::err("Failed to fetch summary")),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct IndexQuery {
    q: Option<String>,
}

async fn index(
    State(store): State<SharedStore>,
    Query(query): Query<IndexQuery>,
) -> (StatusCode, Html<String>) {
    match store.list().await {
        Ok(records) => {
            let q = query.q.as_deref().map(str::trim).unwrap_or("");
            let shown: Vec<&SummaryRecord> =
                records.iter().filter(|r| matches_query(r, q)).collect();
            (StatusCode::OK, Html(render_index(&shown, q)))
        }
        Err(e) => {
            tracing::error!(error = %e, "rendering library failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html("<h1>Failed to fetch summaries</h1>".to_string()),
            )
        }
    }
}

/// Case-insensitive substring match on title, summary and tags.
fn matches_query(r: &SummaryRecord, q: &str) -> bool {
    if q.is_empty() {
        return true;
    }
    let q = q.to_lowercase();
    r.title.to_lowercase().contains(&q)
        || r.summary.to_lowercase().contains(&q)
        || r.tags.iter().any(|t| t.to_lowercase().contains(&q))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_card(r: &SummaryRecord) -> String {
    let tags: String = r
        .tags
        .iter()
        .map(|t| format!(r#"<span class="tag">#{}</span>"#, escape_html(t)))
        .collect();
    format!(
        r#"<article class="card" id="{id}">
<header><h3 title="{title}">{title}</h3><span class="badge badge-{mode}">{mode}</span></header>
<p class="summary">{summary}</p>
<div class="tags">{tags}</div>
<footer>{link}</footer>
</article>
"#,
        id = escape_html(&r.id),
        title = escape_html(&r.title),
        mode = r.mode,
        summary = escape_html(&r.summary),
        link = source_link(&r.url),
    )
}

/// Only web URLs become links; anything else (`javascript:`, `data:`) is shown as text.
fn source_link(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => format!(
            r#"<a href="{}" target="_blank" rel="noopener noreferrer">Read Article</a>"#,
            escape_html(raw)
        ),
        _ => format!(r#"<span class="source">{}</span>"#, escape_html(raw)),
    }
}

fn render_index(records: &[&SummaryRecord], q: &str) -> String {
    let n = records.len();
    let plural = if n == 1 { "" } else { "s" };
    let body = if records.is_empty() {
        r#"<p class="empty">Use the glean CLI to summarize articles and save them to your library.</p>"#
            .to_string()
    } else {
        records.iter().map(|r| render_card(r)).collect()
    };
    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Library</title>
<style>
body {{ font-family: sans-serif; max-width: 60rem; margin: 2rem auto; }}
.card {{ border: 1px solid #e2e8f0; border-radius: .75rem; padding: 1.5rem; margin-bottom: 1rem; }}
.summary {{ white-space: pre-wrap; }}
.tag {{ background: #f1f5f9; padding: .1rem .4rem; margin-right: .4rem; border-radius: .25rem; }}
</style></head>
<body>
<header><h1>Library</h1><p class="count">{n} saved article{plural}</p>
<form method="get"><input type="text" name="q" placeholder="Search summaries..." value="{q}"></form></header>
<main>
{body}</main>
</body>
</html>
"#,
        q = escape_html(q),
    )
}
