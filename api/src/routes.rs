use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::session_middleware;
use crate::state::AppState;

/// Create the main application router with all routes and middleware
#[tracing::instrument(skip(state))]
pub fn create_router(state: AppState) -> Router {
    // Public routes (no session required)
    let public_routes = Router::new()
        .route(
            "/login",
            get(handlers::login::login_page).post(handlers::login::login_submit),
        )
        .route("/logout", post(handlers::login::logout))
        .route("/health", get(handlers::health::health_check))
        .route("/health/scheduler", get(handlers::health::scheduler_health));

    // Protected routes (signed-in users only)
    let protected_routes = Router::new()
        .route("/", get(handlers::portal::portal_page))
        .route("/jobs", post(handlers::jobs::create_job))
        .route("/jobs/run-now", post(handlers::jobs::run_now))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    // Metrics endpoint (no session for Prometheus scraping)
    let metrics_routes = Router::new().route("/metrics", get(handlers::metrics::metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(metrics_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use common::actions::JobService;
    use common::auth::StaticCredentialVerifier;
    use common::command::CommandBuilder;
    use common::config::{AllowedUser, Settings};
    use common::scheduler::{CronicleClient, CREATE_EVENT_PATH, HEALTH_PATH, RUN_EVENT_PATH};
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        app: Router,
        _scripts: tempfile::TempDir,
    }

    fn harness(scheduler_url: &str) -> Harness {
        let scripts = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(scripts.path().join("Abdullah/reports")).unwrap();
        std::fs::write(scripts.path().join("Abdullah/hello.py"), "print('hi')").unwrap();
        std::fs::write(scripts.path().join("Abdullah/reports/daily.py"), "").unwrap();

        let mut config = Settings::default();
        config.scheduler.url = scheduler_url.to_string();
        config.scheduler.api_key = "test-key".to_string();
        config.scripts.scripts_dir = scripts.path().to_path_buf();
        config.scripts.outputs_dir = scripts.path().join("outputs");
        config.auth.users = vec![AllowedUser {
            first: "Abdullah".to_string(),
            last: "Memon".to_string(),
            password: Some("secret123".to_string()),
            password_hash: None,
        }];

        let client = CronicleClient::new(&config.scheduler).unwrap();
        let jobs = JobService::new(Arc::new(client), CommandBuilder::new(&config.runtime));
        let verifier = Arc::new(StaticCredentialVerifier::from_config(&config.auth));
        let state = AppState::new(config, jobs, verifier, None);

        Harness {
            app: create_router(state),
            _scripts: scripts,
        }
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn sign_in(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(form(
                "/login",
                "first=Abdullah&last=Memon&password=secret123",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Max-Age=43200"));
        set_cookie.split(';').next().unwrap().to_string()
    }

    const JOB_FORM: &str = "user=Abdullah&script=hello.py&arguments=--days+7&hour=9&minute=0&title=&run_title=";

    #[tokio::test]
    async fn test_health_is_public() {
        let h = harness("http://127.0.0.1:9");
        let response = h
            .app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn test_portal_requires_session() {
        let h = harness("http://127.0.0.1:9");
        let response = h
            .app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get(header::LOCATION)
                .unwrap()
                .to_str()
                .unwrap(),
            "/login"
        );
    }

    #[tokio::test]
    async fn test_forged_session_is_rejected() {
        let h = harness("http://127.0.0.1:9");
        let response = h
            .app
            .oneshot(
                Request::get("/")
                    .header(header::COOKIE, "pythonhub_session=forged")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_login_failure_message() {
        let h = harness("http://127.0.0.1:9");
        let response = h
            .app
            .oneshot(form("/login", "first=Abdullah&last=Memon&password=nope", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response)
            .await
            .contains("Invalid details. Please check your first name, last name, and password."));
    }

    #[tokio::test]
    async fn test_portal_lists_scripts_after_login() {
        let h = harness("http://127.0.0.1:9");
        let cookie = sign_in(&h.app).await;
        let response = h
            .app
            .oneshot(
                Request::get("/?user=Abdullah")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("Signed in as <strong>Abdullah Memon</strong>"));
        assert!(page.contains("hello.py"));
        assert!(page.contains("reports"));
        assert!(page.contains("Abdullah: hello.py"));
    }

    #[tokio::test]
    async fn test_create_job_reports_event_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(HEALTH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(CREATE_EVENT_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"code": 0, "id": "ev123"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        let cookie = sign_in(&h.app).await;
        let response = h
            .app
            .oneshot(form("/jobs", JOB_FORM, Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response)
            .await
            .contains("Created ✔ (id: ev123) – 09:00 daily"));
    }

    #[tokio::test]
    async fn test_run_now_reports_trigger() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(HEALTH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(CREATE_EVENT_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"code": 0, "id": "ev9"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(RUN_EVENT_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"code": 0, "ids": ["job1"]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        let cookie = sign_in(&h.app).await;
        let response = h
            .app
            .oneshot(form("/jobs/run-now", JOB_FORM, Some(&cookie)))
            .await
            .unwrap();
        let page = body_text(response).await;
        assert!(page.contains("Triggered ✔ (event id: ev9)"));
        assert!(page.contains("job1"));
    }

    #[tokio::test]
    async fn test_unreachable_scheduler_skips_create() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(CREATE_EVENT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
            .expect(0)
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        let cookie = sign_in(&h.app).await;
        let response = h
            .app
            .oneshot(form("/jobs", JOB_FORM, Some(&cookie)))
            .await
            .unwrap();
        assert!(body_text(response).await.contains("HTTP 503"));
    }

    #[tokio::test]
    async fn test_unknown_script_is_reported() {
        let h = harness("http://127.0.0.1:9");
        let cookie = sign_in(&h.app).await;
        let response = h
            .app
            .oneshot(form(
                "/jobs",
                "user=Abdullah&script=..%2Fsecret.py&hour=9&minute=0",
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert!(body_text(response)
            .await
            .contains("Error: Invalid script selection"));
    }

    #[tokio::test]
    async fn test_scheduler_health_endpoint() {
        let h = harness("http://127.0.0.1:9");
        let response = h
            .app
            .oneshot(
                Request::get("/health/scheduler")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["reachable"], false);
    }
}
