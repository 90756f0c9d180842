use std::net::SocketAddr;

use axum::extract::{ConnectInfo, DefaultBodyLimit, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::controllers::paste;
use crate::sweeper::Sweeper;
use crate::types::api::{
    CreatePasteForm, DecryptForm, DecryptedPaste, PasteSummary, PasteView, UploadPaste,
};
use crate::App;

/// The manual for the program in man page form.
const MAN_PAGE: &str = include_str!("../../assets/man.txt");

const NOT_FOUND_PAGE: &str = "We can't seem to find the page you're looking for: 404";

pub async fn run(app: App) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], app.config.port));

    let sweeper = Sweeper::new(
        app.database.clone(),
        app.config.sweeper.interval(),
        app.config.sweeper.grace(),
    )
    .start();

    info!("listening on {addr}");

    let result = axum::Server::bind(&addr)
        .serve(router(app).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.stop().await;
    result?;

    Ok(())
}

pub fn router(app: App) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/pastes", get(list_pastes).post(create_paste))
        .route("/p/:identifier", get(get_paste))
        .route("/p/:identifier/decrypt", post(decrypt_paste))
        .fallback(not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            app.config.limits.max_upload_size,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

async fn index() -> &'static str {
    MAN_PAGE
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NOT_FOUND_PAGE)
}

async fn list_pastes(State(mut app): State<App>) -> crate::AppResult<Json<Vec<PasteSummary>>> {
    let pastes = paste::list(&mut app).await?;
    Ok(Json(pastes.into_iter().map(PasteSummary::from).collect()))
}

async fn get_paste(
    State(mut app): State<App>,
    Path(identifier): Path<String>,
) -> crate::AppResult<Json<PasteView>> {
    let paste = paste::fetch(&mut app, &identifier).await?;
    Ok(Json(paste.into()))
}

async fn create_paste(
    State(mut app): State<App>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Form(form): Form<CreatePasteForm>,
) -> crate::AppResult<impl IntoResponse> {
    let origin_ip = connect_info.map(|ConnectInfo(addr)| addr.ip().to_string());
    let paste = paste::create(&mut app, form, origin_ip).await?;

    let path = format!("/p/{}", paste.identifier);
    let url = format!("{base_url}{path}", base_url = app.config.base_url);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, path)],
        Json(UploadPaste {
            identifier: paste.identifier,
            url,
            is_encrypted: paste.is_encrypted,
            expires_at: paste.expires_at,
        }),
    ))
}

async fn decrypt_paste(
    State(mut app): State<App>,
    Path(identifier): Path<String>,
    Form(form): Form<DecryptForm>,
) -> crate::AppResult<Json<DecryptedPaste>> {
    let decrypted = paste::decrypt(&mut app, &identifier, &form.password).await?;
    Ok(Json(decrypted))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::test_app;

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>, Option<String>) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|value| value.to_str().unwrap().to_owned());
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, body.to_vec(), location)
    }

    fn form_post(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn index_serves_manual() {
        let router = router(test_app().await);
        let (status, body, _) = send(&router, get_request("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, MAN_PAGE.as_bytes());
    }

    #[tokio::test]
    async fn create_then_view_plain_paste() {
        let router = router(test_app().await);

        let (status, body, location) = send(
            &router,
            form_post("/pastes", "title=title_content&content=content_content"),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let created = json(&body);
        let identifier = created["identifier"].as_str().unwrap();
        assert_eq!(location.as_deref(), Some(format!("/p/{identifier}").as_str()));
        assert_eq!(
            created["url"],
            format!("http://localhost:8080/p/{identifier}")
        );

        let (status, body, _) = send(&router, get_request(&format!("/p/{identifier}"))).await;
        assert_eq!(status, StatusCode::OK);
        let view = json(&body);
        assert_eq!(view["title"], "title_content");
        assert_eq!(view["content"], "content_content");
        assert_eq!(view["is_encrypted"], false);

        let (status, body, _) = send(&router, get_request("/pastes")).await;
        assert_eq!(status, StatusCode::OK);
        let listed = json(&body);
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["identifier"], identifier);
        assert!(listed[0].get("content").is_none());
    }

    #[tokio::test]
    async fn encrypted_paste_requires_password() {
        let router = router(test_app().await);

        let (status, body, _) = send(
            &router,
            form_post(
                "/pastes",
                "title=secret&content=Secret+content&encrypt=on&password=encryption_test_password",
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let created = json(&body);
        assert_eq!(created["is_encrypted"], true);
        let identifier = created["identifier"].as_str().unwrap().to_owned();

        let (status, body, _) = send(&router, get_request(&format!("/p/{identifier}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["content"], Value::Null);

        let (status, body, _) = send(
            &router,
            form_post(
                &format!("/p/{identifier}/decrypt"),
                "password=not_the_password",
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(String::from_utf8(body).unwrap().contains("please try again"));

        let (status, body, _) = send(
            &router,
            form_post(
                &format!("/p/{identifier}/decrypt"),
                "password=encryption_test_password",
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["content"], "Secret content");
    }

    #[tokio::test]
    async fn invalid_form_is_bad_request() {
        let router = router(test_app().await);
        let (status, body, _) = send(&router, form_post("/pastes", "title=&content=abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"missing title");

        let (status, _, _) = send(
            &router,
            form_post("/pastes", "title=t&content=c&encrypt=on"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_paste_is_not_found() {
        let router = router(test_app().await);
        let (status, _, _) = send(&router, get_request("/p/00000000-0000-0000-0000-000000000000")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let router = router(test_app().await);
        let (status, body, _) = send(&router, get_request("/nothinghere")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, NOT_FOUND_PAGE.as_bytes());
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut app = test_app().await;
        app.config.limits.max_upload_size = 16;
        let router = router(app);
        let (status, _, _) = send(
            &router,
            form_post("/pastes", "title=t&content=this+body+is+far+too+long"),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
