use crate::analyze_payload::AnalyzePayload;
use crate::page::INDEX_HTML;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use record_advisor::{ErrorResponse, ReportOutline};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

pub const INCOMPLETE_NOTE: &str = "(이 결과는 중간에 중단되어 완전하지 않습니다.)";

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        // document size is left to the backend to judge
        .layer(DefaultBodyLimit::disable())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "mode": state.mode }))
}

fn error_response(status: StatusCode, error: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            status: "error".to_string(),
            error,
        }),
    )
        .into_response()
}

/// POST /analyze – multipart `goal` + `file`; streams the report as plain text.
async fn analyze(State(state): State<AppState>, multipart: Multipart) -> Response {
    let payload = match AnalyzePayload::from_multipart(multipart).await {
        Ok(payload) => payload,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    // claimed before spawning so a second request can never slip in
    let permit = match state.service.try_begin() {
        Ok(permit) => permit,
        Err(e) => return error_response(StatusCode::CONFLICT, e.to_string()),
    };

    let analysis_id = Uuid::new_v4();
    log::info!(
        "[{}] Analysis requested: goal '{}', {} bytes",
        analysis_id,
        payload.goal,
        payload.bytes.len()
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let service = state.service.clone();

    tokio::spawn(async move {
        let chunk_tx = tx.clone();
        let result = service
            .analyze_upload_with_permit(
                permit,
                &payload.bytes,
                payload.filename,
                &payload.goal,
                move |chunk| {
                    let _ = chunk_tx.send(chunk.to_string());
                },
            )
            .await;

        match result {
            Ok(text) => {
                let outline = ReportOutline::parse(&text);
                if outline.is_complete() {
                    log::info!("[{}] Report complete (grade {:?})", analysis_id, outline.grade);
                } else {
                    log::warn!("[{}] Report does not follow the requested layout: {:?}", analysis_id, outline);
                }
            }
            Err(e) => {
                log::error!("[{}] Analysis failed: {}", analysis_id, e);
                let _ = tx.send(format!("\n\n[분석 오류: {}]\n{}\n", e, INCOMPLETE_NOTE));
            }
        }
    });

    let stream = async_stream::stream! {
        while let Some(chunk) = rx.recv().await {
            yield chunk;
        }
    };
    let body = Body::from_stream(stream.map(Ok::<_, Infallible>));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use record_advisor::report::SAMPLE_REPORT;
    use record_advisor::{AnalysisError, ScriptStep, ScriptedBackend};
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "advisor-test-boundary";

    fn multipart_body(goal: Option<&str>, file: Option<&[u8]>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(goal) = goal {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"goal\"\r\n\r\n{goal}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(file) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"record.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(file);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn analyze_request(goal: Option<&str>, file: Option<&[u8]>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(goal, file)))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_mode() {
        let app = create_router(AppState::with_backend(ScriptedBackend::default(), "mock"));
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(res).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["mode"], "mock");
    }

    #[tokio::test]
    async fn index_serves_upload_form() {
        let app = create_router(AppState::with_backend(ScriptedBackend::default(), "mock"));
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();

        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let html = body_text(res).await;
        assert!(html.contains("name=\"goal\""));
        assert!(html.contains("type=\"file\""));
    }

    #[tokio::test]
    async fn analyze_streams_the_report() {
        let backend = ScriptedBackend::streaming_text(SAMPLE_REPORT);
        let app = create_router(AppState::with_backend(backend.clone(), "mock"));

        let res = app
            .oneshot(analyze_request(Some("컴퓨터공학과"), Some(b"%PDF-1.4\n%%EOF\n")))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_text(res).await, SAMPLE_REPORT);
        assert_eq!(backend.calls(), 1);
        assert!(backend.prompts()[0].contains("컴퓨터공학과"));
    }

    #[tokio::test]
    async fn missing_goal_is_rejected_without_calling_the_backend() {
        let backend = ScriptedBackend::streaming_text(SAMPLE_REPORT);
        let app = create_router(AppState::with_backend(backend.clone(), "mock"));

        let res = app
            .oneshot(analyze_request(Some("   "), Some(b"%PDF-1.4\n")))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body_text(res).await).unwrap();
        assert_eq!(json["error"], "goal is required");
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn missing_file_is_rejected() {
        let app = create_router(AppState::with_backend(ScriptedBackend::default(), "mock"));

        let res = app
            .oneshot(analyze_request(Some("의예과"), None))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn failure_leaves_partial_output_marked_incomplete() {
        let backend = ScriptedBackend::new(vec![
            ScriptStep::Fragment("## 1. ".to_string()),
            ScriptStep::Fragment("학년별".to_string()),
            ScriptStep::Fail(AnalysisError::Backend("quota exceeded".to_string())),
        ]);
        let app = create_router(AppState::with_backend(backend, "mock"));

        let res = app
            .oneshot(analyze_request(Some("컴퓨터공학과"), Some(b"%PDF-1.4\n")))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let text = body_text(res).await;
        assert!(text.starts_with("## 1. 학년별"));
        assert!(text.contains("[분석 오류: generation backend error: quota exceeded]"));
        assert!(text.contains(INCOMPLETE_NOTE));
    }

    #[tokio::test]
    async fn simultaneous_requests_admit_exactly_one() {
        let backend = ScriptedBackend::from_fragments(["## 1. ", "학년별"])
            .with_delay(Duration::from_millis(50));
        let app = create_router(AppState::with_backend(backend.clone(), "mock"));

        let (first, second) = tokio::join!(
            app.clone()
                .oneshot(analyze_request(Some("컴퓨터공학과"), Some(b"%PDF-1.4\n"))),
            app.clone()
                .oneshot(analyze_request(Some("컴퓨터공학과"), Some(b"%PDF-1.4\n"))),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        let mut statuses = vec![first.status(), second.status()];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);

        let (accepted, rejected) = if first.status() == StatusCode::OK {
            (first, second)
        } else {
            (second, first)
        };
        let json: serde_json::Value = serde_json::from_str(&body_text(rejected).await).unwrap();
        assert_eq!(json["error"], "invalid request: an analysis is already in progress");
        assert_eq!(body_text(accepted).await, "## 1. 학년별");
        assert_eq!(backend.calls(), 1);
    }
}
