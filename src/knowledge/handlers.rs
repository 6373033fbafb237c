use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;

use super::{
    dto::{
        CompleteAnswerRequest, ListObjectsQuery, ListObjectsResponse, ReconcileResponse,
        UploadUrlRequest,
    },
    files::{FileWithUrl, UploadTicket},
    repo_types::IngestionJob,
    services::CompletedAnswer,
};
use crate::{
    auth::extractors::{AdminUser, AuthUser},
    error::{AppError, AppResult},
    pagination::{PageQuery, Paginated},
    state::AppState,
};

pub fn knowledge_routes() -> Router<AppState> {
    Router::new()
        .route("/chat/complete-answer", post(complete_answer))
        .route("/generate-presigned-url", post(generate_presigned_url))
        .route("/list-objects", get(list_objects))
        .route("/objects", get(list_files))
        .route("/objects/reconcile", post(reconcile_objects))
        .route("/objects/:id", delete(delete_object))
        .route("/sync-knowledge-base", post(sync_knowledge_base))
        .route("/ingestion-jobs/:id", get(ingestion_job_status))
}

#[instrument(skip(state, body))]
pub async fn complete_answer(
    State(state): State<AppState>,
    Json(body): Json<CompleteAnswerRequest>,
) -> AppResult<Json<CompletedAnswer>> {
    let answer = state
        .knowledge
        .complete_answer(&body.user_message, body.session_id, body.user_chat_id)
        .await?;
    Ok(Json(answer))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn generate_presigned_url(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<UploadUrlRequest>,
) -> AppResult<Json<UploadTicket>> {
    Ok(Json(state.files.issue_upload_url(&user, &body.filename).await?))
}

#[instrument(skip(state, _user))]
pub async fn list_objects(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(q): Query<ListObjectsQuery>,
) -> AppResult<Json<ListObjectsResponse>> {
    let page = state.files.list_objects(q.page_size, q.continuation_token).await?;
    Ok(Json(ListObjectsResponse {
        files: page.keys,
        continuation_token: page.next_token,
    }))
}

#[instrument(skip(state, _user))]
pub async fn list_files(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Paginated<FileWithUrl>>> {
    let page = q.validate()?;
    Ok(Json(state.files.list_files(page).await?))
}

#[instrument(skip(state, _user))]
pub async fn delete_object(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id: i64 = id
        .parse()
        .map_err(|_| AppError::bad_request("File id must be a number"))?;
    state.files.delete_file(id).await?;
    Ok(Json(json!({ "message": "Object deleted successfully" })))
}

#[instrument(skip(state, admin), fields(user_id = %admin.0.id))]
pub async fn reconcile_objects(
    State(state): State<AppState>,
    admin: AdminUser,
) -> AppResult<Json<ReconcileResponse>> {
    let removed = state.files.reconcile_orphans().await?;
    Ok(Json(ReconcileResponse { removed }))
}

#[instrument(skip(state, _user))]
pub async fn sync_knowledge_base(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<IngestionJob>> {
    Ok(Json(state.knowledge.sync().await?))
}

#[instrument(skip(state, _user))]
pub async fn ingestion_job_status(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<IngestionJob>> {
    Ok(Json(state.knowledge.ingestion_status(&id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_state, login};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn complete_answer_returns_citations_and_ids() {
        let (state, fakes) = fake_state();
        fakes.knowledge.answer_with(&["s3://kb/data/faq.md"]);
        let app = knowledge_routes().with_state(state);

        let response = app
            .oneshot(post_json("/chat/complete-answer", json!({ "userMessage": "hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["citations"][0]["sources"][0], "s3://kb/data/faq.md");
        assert!(value["userChatID"].as_str().is_some());
        assert_eq!(fakes.interactions.len(), 1);
    }

    #[tokio::test]
    async fn complete_answer_upstream_failure_is_503() {
        let (state, fakes) = fake_state();
        fakes.knowledge.fail();
        let app = knowledge_routes().with_state(state);

        let response = app
            .oneshot(post_json("/chat/complete-answer", json!({ "userMessage": "hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(fakes.interactions.len(), 0);
    }

    #[tokio::test]
    async fn file_routes_require_a_session() {
        let (state, _) = fake_state();
        let app = knowledge_routes().with_state(state);

        let response = app
            .oneshot(Request::builder().uri("/objects").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn upload_then_delete_round() {
        let (state, fakes) = fake_state();
        let cookie = login(&state, &fakes, "ops@corp.io", false).await;
        let app = knowledge_routes().with_state(state);

        let mut req = post_json("/generate-presigned-url", json!({ "filename": "plan.pdf" }));
        req.headers_mut()
            .insert(header::COOKIE, cookie.parse().unwrap());
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        let id = value["file"]["id"].as_i64().unwrap();
        assert_eq!(value["file"]["userEmail"], "ops@corp.io");

        let delete = |id: String| {
            Request::builder()
                .method("DELETE")
                .uri(format!("/objects/{id}"))
                .header(header::COOKIE, cookie.clone())
                .body(Body::empty())
                .unwrap()
        };
        let response = app.clone().oneshot(delete(id.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(fakes.files.len(), 0);

        let response = app.clone().oneshot(delete(id.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(delete("abc".into())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reconcile_is_admin_only() {
        let (state, fakes) = fake_state();
        let cookie = login(&state, &fakes, "plain@corp.io", false).await;
        let app = knowledge_routes().with_state(state);

        let mut req = post_json("/objects/reconcile", json!({}));
        req.headers_mut()
            .insert(header::COOKIE, cookie.parse().unwrap());
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
