use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use routes::{
    blobs::serve_blob,
    collections::{create_collection, get_collection},
    documents::{list_documents, upload_document},
    liveness::live,
    readiness::ready,
};

pub mod api_state;
pub mod error;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Probes for k8s/systemd
    let public = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let catalog = Router::new()
        .route("/collections", post(create_collection))
        .route("/collections/{collection_id}", get(get_collection))
        .route(
            "/collections/{collection_id}/documents",
            post(upload_document)
                .layer(DefaultBodyLimit::max(app_state.config.upload_max_bytes))
                .get(list_documents),
        )
        .route("/blobs/{key}", get(serve_blob));

    public.merge(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use common::{
        storage::{db::SurrealDbClient, store::StorageManager},
        utils::config::AppConfig,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    const BOUNDARY: &str = "bookshelf-test-boundary";

    async fn test_app() -> Router {
        test_app_with(AppConfig::default()).await
    }

    async fn test_app_with(config: AppConfig) -> Router {
        let db = SurrealDbClient::memory("api_test", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");
        db.ensure_initialized().await.expect("schema");

        let state = ApiState::with_resources(Arc::new(db), &config, StorageManager::memory());

        Router::new()
            .nest("/api/v1", api_routes_v1(&state))
            .with_state(state)
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.expect("router response")
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    fn json_request(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn upload_request(uri: &str, file_name: Option<&str>, contents: &[u8]) -> Request<Body> {
        let disposition = match file_name {
            Some(name) => format!("form-data; name=\"file\"; filename=\"{name}\""),
            None => "form-data; name=\"file\"".to_string(),
        };
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: {disposition}\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn create_collection_id(app: &Router, name: &str) -> String {
        let response = send(
            app,
            json_request("/api/v1/collections", &json!({ "name": name })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["id"]
            .as_str()
            .expect("id")
            .to_string()
    }

    #[tokio::test]
    async fn create_and_fetch_collection() {
        let app = test_app().await;
        let id = create_collection_id(&app, "  Poetry ").await;
        assert!(Uuid::parse_str(&id).is_ok());

        let response = send(&app, get_request(&format!("/api/v1/collections/{id}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["name"], "Poetry");
        assert_eq!(body["data"]["id"], id.as_str());
    }

    #[tokio::test]
    async fn malformed_collection_requests_are_rejected() {
        let app = test_app().await;

        let unknown_field = send(
            &app,
            json_request(
                "/api/v1/collections",
                &json!({ "name": "Poetry", "owner": "someone" }),
            ),
        )
        .await;
        assert_eq!(unknown_field.status(), StatusCode::BAD_REQUEST);

        let blank = send(
            &app,
            json_request("/api/v1/collections", &json!({ "name": "   " })),
        )
        .await;
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

        let not_a_uuid = send(&app, get_request("/api/v1/collections/not-a-uuid")).await;
        assert_eq!(not_a_uuid.status(), StatusCode::NOT_FOUND);

        let unknown = send(
            &app,
            get_request(&format!("/api/v1/collections/{}", Uuid::new_v4())),
        )
        .await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_list_and_download_document() {
        let app = test_app().await;
        let id = create_collection_id(&app, "C1").await;
        let contents = vec![42_u8; 1024];

        let response = send(
            &app,
            upload_request(
                &format!("/api/v1/collections/{id}/documents"),
                Some("report.pdf"),
                &contents,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        assert_eq!(created["filename"], "report.pdf");
        let document_id = created["document_id"]
            .as_str()
            .expect("document id")
            .to_string();

        let response = send(
            &app,
            get_request(&format!("/api/v1/collections/{id}/documents")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let listing = json_body(response).await;
        let documents = listing["documents"].as_array().expect("documents");
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["filename"], "report.pdf");
        assert_eq!(documents[0]["document_id"], document_id.as_str());
        let link = documents[0]["link"].as_str().expect("link");
        assert!(!link.is_empty());

        let link = url::Url::parse(link).expect("absolute link");
        let local_uri = format!("{}?{}", link.path(), link.query().unwrap_or_default());
        let response = send(&app, get_request(&local_uri)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"report.pdf\""
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let downloaded = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(downloaded.as_ref(), contents.as_slice());

        // Altering the advertised file name invalidates the signature.
        let mut tampered = link.clone();
        let pairs: Vec<(String, String)> = link
            .query_pairs()
            .map(|(k, v)| {
                let v = if k == "filename" { "other.pdf".into() } else { v };
                (k.into_owned(), v.into_owned())
            })
            .collect();
        tampered.query_pairs_mut().clear().extend_pairs(pairs);
        let tampered_uri = format!(
            "{}?{}",
            tampered.path(),
            tampered.query().unwrap_or_default()
        );
        let response = send(&app, get_request(&tampered_uri)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn upload_into_unknown_collection_is_not_found() {
        let app = test_app().await;
        let response = send(
            &app,
            upload_request(
                &format!("/api/v1/collections/{}/documents", Uuid::new_v4()),
                Some("report.pdf"),
                b"content",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_without_file_name_is_rejected() {
        let app = test_app().await;
        let id = create_collection_id(&app, "C1").await;
        let response = send(
            &app,
            upload_request(
                &format!("/api/v1/collections/{id}/documents"),
                None,
                b"content",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_over_the_body_limit_is_payload_too_large() {
        let app = test_app_with(AppConfig {
            upload_max_bytes: 1024,
            ..AppConfig::default()
        })
        .await;
        let id = create_collection_id(&app, "C1").await;

        let response = send(
            &app,
            upload_request(
                &format!("/api/v1/collections/{id}/documents"),
                Some("big.pdf"),
                &[7_u8; 4096],
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            json_body(response).await["status"],
            json!("error")
        );

        let listing = send(
            &app,
            get_request(&format!("/api/v1/collections/{id}/documents")),
        )
        .await;
        assert_eq!(json_body(listing).await, json!({ "documents": [] }));
    }

    #[tokio::test]
    async fn listing_an_unknown_collection_is_empty() {
        let app = test_app().await;
        let response = send(
            &app,
            get_request(&format!("/api/v1/collections/{}/documents", Uuid::new_v4())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "documents": [] }));
    }

    #[tokio::test]
    async fn probes_report_ok() {
        let app = test_app().await;
        assert_eq!(
            send(&app, get_request("/api/v1/live")).await.status(),
            StatusCode::OK
        );
        let ready = send(&app, get_request("/api/v1/ready")).await;
        assert_eq!(ready.status(), StatusCode::OK);
        assert_eq!(
            json_body(ready).await["checks"],
            json!({ "db": "ok", "storage": "ok" })
        );
    }
}
