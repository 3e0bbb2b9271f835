use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        CredentialDto, CredentialInput, DeleteResponse, ListAllQuery, NameQuery, Page, Pagination,
    },
    services::{CredentialService, EmptyPolicy},
};
use crate::{auth::AuthUser, error::AppError, reports::Report, state::AppState};

pub fn platform_routes() -> Router<AppState> {
    Router::new()
        .route("/platform", get(list_page).post(create))
        .route("/platform/", get(list_page).post(create))
        .route("/platform/all", get(list_all))
        .route("/platform/name", get(get_by_name))
        .route("/platform/:id", put(update).delete(delete))
        .route("/platform/export/excel", get(export_excel))
        .route("/platform/export/pdf", get(export_pdf))
}

#[instrument(skip(svc, auth), fields(owner_id = %auth.id))]
pub async fn list_page(
    State(svc): State<CredentialService>,
    auth: AuthUser,
    query: Result<Query<Pagination>, QueryRejection>,
) -> Result<Json<Page<CredentialDto>>, AppError> {
    let Query(p) = query?;
    Ok(Json(svc.list_page(auth.id, p.page, p.size).await?))
}

#[instrument(skip(svc, auth), fields(owner_id = %auth.id))]
pub async fn list_all(
    State(svc): State<CredentialService>,
    auth: AuthUser,
    query: Result<Query<ListAllQuery>, QueryRejection>,
) -> Result<Json<Vec<CredentialDto>>, AppError> {
    let Query(q) = query?;
    let policy = if q.allow_empty {
        EmptyPolicy::Allow
    } else {
        EmptyPolicy::Fail
    };
    Ok(Json(svc.list_all(auth.id, policy).await?))
}

#[instrument(skip(svc, auth), fields(owner_id = %auth.id))]
pub async fn get_by_name(
    State(svc): State<CredentialService>,
    auth: AuthUser,
    query: Result<Query<NameQuery>, QueryRejection>,
) -> Result<Json<CredentialDto>, AppError> {
    let Query(q) = query?;
    Ok(Json(svc.get_by_name(auth.id, &q.name).await?))
}

/// A missing or unparsable body arrives as `None` and is rejected by the service.
#[instrument(skip(svc, auth, body), fields(owner_id = %auth.id))]
pub async fn create(
    State(svc): State<CredentialService>,
    auth: AuthUser,
    body: Option<Json<CredentialInput>>,
) -> Result<(StatusCode, Json<CredentialDto>), AppError> {
    let saved = svc.create(auth.id, body.map(|Json(b)| b)).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

#[instrument(skip(svc, auth, body), fields(owner_id = %auth.id))]
pub async fn update(
    State(svc): State<CredentialService>,
    auth: AuthUser,
    Path(id): Path<String>,
    body: Option<Json<CredentialInput>>,
) -> Result<Json<CredentialDto>, AppError> {
    Ok(Json(svc.update(auth.id, &id, body.map(|Json(b)| b)).await?))
}

#[instrument(skip(svc, auth), fields(owner_id = %auth.id))]
pub async fn delete(
    State(svc): State<CredentialService>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    svc.delete(auth.id, &id).await?;
    Ok(Json(DeleteResponse {
        message: "Credential deleted".into(),
    }))
}

#[instrument(skip(svc, auth), fields(owner_id = %auth.id))]
pub async fn export_excel(
    State(svc): State<CredentialService>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    download(svc.export_excel(auth.id).await?)
}

#[instrument(skip(svc, auth), fields(owner_id = %auth.id))]
pub async fn export_pdf(
    State(svc): State<CredentialService>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    download(svc.export_pdf(auth.id).await?)
}

fn download(report: Report) -> Result<Response, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(report.content_type),
    );
    let disposition = format!("attachment; filename=\"{}\"", report.file_name);
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .map_err(|e| AppError::ExportFailure(format!("Bad download header: {e}")))?,
    );
    Ok((StatusCode::OK, headers, report.bytes).into_response())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{app::build_app, auth::jwt::JwtKeys, state::AppState};

    struct Client {
        app: Router,
        token: String,
    }

    impl Client {
        fn new(state: &AppState) -> Self {
            let keys = JwtKeys::from_ref(state);
            let token = keys.sign_access(Uuid::new_v4(), "tester").unwrap();
            Self {
                app: build_app(state.clone()),
                token,
            }
        }

        async fn send(
            &self,
            method: &str,
            uri: &str,
            body: Option<Value>,
        ) -> (StatusCode, Vec<u8>, header::HeaderMap) {
            let mut req = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.token));
            let body = match body {
                Some(v) => {
                    req = req.header(header::CONTENT_TYPE, "application/json");
                    Body::from(v.to_string())
                }
                None => Body::empty(),
            };
            let res = self.app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
            let status = res.status();
            let headers = res.headers().clone();
            let bytes = axum::body::to_bytes(res.into_body(), 10 * 1024 * 1024)
                .await
                .unwrap();
            (status, bytes.to_vec(), headers)
        }

        async fn json(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let (status, bytes, _) = self.send(method, uri, body).await;
            (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
        }
    }

    fn github() -> Value {
        json!({
            "name": "GitHub",
            "url": "https://github.com",
            "username": "u",
            "password": "p",
            "created_date": "2024-12-10"
        })
    }

    #[tokio::test]
    async fn crud_round_trip_over_http() {
        let state = AppState::fake();
        let client = Client::new(&state);

        let (status, created) = client.json("POST", "/api/v1/platform/", Some(github())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, found) = client.json("GET", "/api/v1/platform/name?name=GitHub", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["id"], created["id"]);
        assert_eq!(found["password"], "p");

        let mut changed = github();
        changed["password"] = json!("rotated");
        let (status, updated) = client
            .json("PUT", &format!("/api/v1/platform/{id}"), Some(changed))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["password"], "rotated");

        let (status, page) = client.json("GET", "/api/v1/platform/?page=0&size=10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total_elements"], 1);
        assert_eq!(page["content"][0]["name"], "GitHub");

        let (status, deleted) = client
            .json("DELETE", &format!("/api/v1/platform/{id}"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["message"], "Credential deleted");

        let (status, _) = client.json("GET", "/api/v1/platform/name?name=GitHub", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_codes_follow_error_taxonomy() {
        let state = AppState::fake();
        let client = Client::new(&state);

        let (status, _) = client.json("GET", "/api/v1/platform?page=0&size=10", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = client.json("GET", "/api/v1/platform?page=-1&size=10", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = client.json("POST", "/api/v1/platform", Some(github())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = client.json("POST", "/api/v1/platform", Some(github())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Conflict");

        let (status, _) = client.json("POST", "/api/v1/platform", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = client
            .json("PUT", &format!("/api/v1/platform/{}", Uuid::new_v4()), Some(github()))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = client.json("GET", "/api/v1/platform/name?name=", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_query_strings_are_invalid_arguments() {
        let state = AppState::fake();
        let client = Client::new(&state);

        for uri in [
            "/api/v1/platform?page=abc&size=1",
            "/api/v1/platform?page=0&size=99999999999999999999",
            "/api/v1/platform/all?allow_empty=maybe",
        ] {
            let (status, body) = client.json("GET", uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["status"], 400);
            assert_eq!(body["error"], "Bad Request");
            assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
        }
    }

    #[tokio::test]
    async fn maximal_page_size_lists_everything() {
        let state = AppState::fake();
        let client = Client::new(&state);
        client.json("POST", "/api/v1/platform", Some(github())).await;
        let mut other = github();
        other["name"] = json!("GitLab");
        client.json("POST", "/api/v1/platform", Some(other)).await;

        let uri = format!("/api/v1/platform?page=0&size={}", i64::MAX);
        let (status, page) = client.json("GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total_elements"], 2);
        assert_eq!(page["total_pages"], 1);
    }

    #[tokio::test]
    async fn owners_do_not_see_each_other() {
        let state = AppState::fake();
        let alice = Client::new(&state);
        let bob = Client::new(&state);

        let (_, created) = alice.json("POST", "/api/v1/platform", Some(github())).await;
        let id = created["id"].as_str().unwrap();

        let (status, _) = bob.json("GET", "/api/v1/platform/name?name=GitHub", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = bob.json("DELETE", &format!("/api/v1/platform/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = bob.json("POST", "/api/v1/platform", Some(github())).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn list_all_honours_allow_empty() {
        let state = AppState::fake();
        let client = Client::new(&state);

        let (status, _) = client.json("GET", "/api/v1/platform/all", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = client
            .json("GET", "/api/v1/platform/all?allow_empty=true", None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn exports_are_downloads() {
        let state = AppState::fake();
        let client = Client::new(&state);

        let (status, _, _) = client.send("GET", "/api/v1/platform/export/pdf", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        client.json("POST", "/api/v1/platform", Some(github())).await;

        let (status, bytes, headers) = client
            .send("GET", "/api/v1/platform/export/excel", None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(bytes.starts_with(b"PK"));
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"credentials.xlsx\""
        );

        let (status, bytes, headers) = client
            .send("GET", "/api/v1/platform/export/pdf", None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    }

    #[tokio::test]
    async fn unauthenticated_requests_fail_before_validation() {
        let app = build_app(AppState::fake());
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/platform")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .uri("/api/v1/platform?page=-1&size=0")
            .header(header::AUTHORIZATION, "Bearer garbage")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
