//! HTTP server for post pages and comment submission

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

use crate::generator::{GenerateError, Generator, PageResponse};
use crate::submission::{CommentForm, SubmissionHandler, SubmitError, ValidationError};
use crate::templates::FormView;
use crate::Blog;

/// Server state
#[derive(Clone)]
struct AppState {
    generator: Generator,
    submissions: SubmissionHandler,
}

/// Body of every `/api/createComment` response
#[derive(Debug, Serialize)]
struct SubmitResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<ValidationError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

impl SubmitResponse {
    fn success() -> Self {
        Self {
            message: "submit success",
            errors: None,
            error: None,
        }
    }

    fn failed(error: &'static str) -> Self {
        Self {
            message: "submit failed",
            errors: None,
            error: Some(error),
        }
    }

    fn invalid(errors: Vec<ValidationError>) -> Self {
        Self {
            message: "submit failed",
            errors: Some(errors),
            error: None,
        }
    }
}

/// Build the application router
pub fn router(generator: Generator, submissions: SubmissionHandler) -> Router {
    let state = AppState {
        generator,
        submissions,
    };

    Router::new()
        .route("/post/:slug", get(post_page))
        .route("/post/:slug/comment", post(post_comment_form))
        .route("/api/createComment", post(create_comment))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Prerender every post, then serve until Ctrl+C
pub async fn start(blog: &Blog, ip: &str, port: u16) -> Result<()> {
    let generator = blog.generator()?;

    match generator.prerender_all().await {
        Ok(report) if !report.failed.is_empty() => {
            tracing::warn!("Some pages failed to prerender ({})", report.summary());
        }
        Ok(_) => {}
        // Pages still render on first request.
        Err(e) => tracing::warn!("Could not list posts for prerendering: {}", e),
    }

    let app = router(generator, blog.submissions());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn post_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    uri: Uri,
) -> Response {
    match state.generator.page(&slug).await {
        Ok(PageResponse::Page { page, served }) => {
            tracing::debug!(slug = %slug, ?served, "Serving page");
            Html(page.html.to_string()).into_response()
        }
        Ok(PageResponse::NotFound) => not_found(&state.generator, uri.path()),
        Err(e) => generate_failed(&state.generator, &slug, e),
    }
}

/// HTML form submission. Re-renders the post with the outcome.
async fn post_comment_form(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Form(mut form): Form<CommentForm>,
) -> Response {
    let generator = &state.generator;
    let post = match generator.page(&slug).await {
        Ok(PageResponse::Page { page, .. }) => page.post,
        Ok(PageResponse::NotFound) => return not_found(generator, &format!("/post/{}", slug)),
        Err(e) => return generate_failed(generator, &slug, e),
    };

    // The page being commented on decides the target, not the hidden field.
    form.post_id = post.id.clone();

    let (status, view) = match state.submissions.submit(&form).await {
        Ok(_) => (StatusCode::OK, FormView::succeeded()),
        Err(SubmitError::Validation(errors)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, FormView::invalid(form, errors))
        }
        Err(e) => {
            tracing::warn!(slug = %slug, "Comment form submission failed: {}", e);
            (StatusCode::BAD_GATEWAY, FormView::failed(form))
        }
    };

    match generator.render_with_form(&post, &view) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => generate_failed(generator, &slug, e),
    }
}

/// JSON submission endpoint
async fn create_comment(State(state): State<AppState>, body: Bytes) -> Response {
    let result = match CommentForm::from_json(&body) {
        Ok(form) => state.submissions.submit(&form).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => (StatusCode::OK, Json(SubmitResponse::success())).into_response(),
        Err(SubmitError::Validation(errors)) => {
            (StatusCode::BAD_REQUEST, Json(SubmitResponse::invalid(errors))).into_response()
        }
        Err(e @ SubmitError::Payload(_)) => {
            tracing::debug!("Rejected comment payload: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(SubmitResponse::failed(e.public_message())),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SubmitResponse::failed(e.public_message())),
        )
            .into_response(),
    }
}

async fn fallback_handler(State(state): State<AppState>, uri: Uri) -> Response {
    not_found(&state.generator, uri.path())
}

fn not_found(generator: &Generator, path: &str) -> Response {
    match generator.renderer().render_not_found(path) {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render not-found page: {}", e);
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
    }
}

fn generate_failed(generator: &Generator, slug: &str, error: GenerateError) -> Response {
    if !error.is_retryable() {
        tracing::error!(slug, "Failed to generate page: {}", error);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response();
    }

    tracing::warn!(slug, "Content store unavailable: {}", error);
    match generator.renderer().render_unavailable() {
        Ok(html) => (StatusCode::SERVICE_UNAVAILABLE, Html(html)).into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable").into_response(),
    }
}
