// End-to-end flows: script catalog, command builder, job service and the
// HTTP scheduler client against a mock scheduler.

use common::{
    actions::{JobRequest, JobService, RunOutcome},
    command::CommandBuilder,
    config::Settings,
    errors::{ActionError, SchedulerError},
    scheduler::{CronicleClient, API_KEY_HEADER, CREATE_EVENT_PATH, HEALTH_PATH, RUN_EVENT_PATH},
    scripts::ScriptCatalog,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to lay out `<base>/Abdullah/hello.py`
fn scripts_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("Abdullah")).unwrap();
    std::fs::write(dir.path().join("Abdullah/hello.py"), "print('hi')").unwrap();
    dir
}

fn settings(server: &MockServer, scripts: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.scheduler.url = server.uri();
    settings.scheduler.api_key = "integration-key".to_string();
    settings.scripts.scripts_dir = scripts.to_path_buf();
    settings
}

fn service(settings: &Settings) -> JobService {
    let client = CronicleClient::new(&settings.scheduler).unwrap();
    JobService::new(Arc::new(client), CommandBuilder::new(&settings.runtime))
}

fn request(settings: &Settings, arguments: &[&str], title: &str) -> JobRequest {
    let catalog = ScriptCatalog::from_config(&settings.scripts);
    JobRequest {
        user: "Abdullah".to_string(),
        script_path: catalog.resolve("Abdullah", "hello.py").unwrap(),
        arguments: arguments.iter().map(|a| a.to_string()).collect(),
        title: title.to_string(),
        hour: 9,
        minute: 0,
    }
}

async fn mount_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(HEALTH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .mount(server)
        .await;
}

/// Bodies of every create-event request the mock received
async fn created_events(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == CREATE_EVENT_PATH)
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_create_job_end_to_end() {
    let server = MockServer::start().await;
    let scripts = scripts_dir();
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path(CREATE_EVENT_PATH))
        .and(header(API_KEY_HEADER, "integration-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "id": "ev123"})))
        .expect(1)
        .mount(&server)
        .await;

    let settings = settings(&server, scripts.path());
    let outcome = service(&settings)
        .create_job(&request(&settings, &["--days", "7"], ""))
        .await
        .unwrap();

    assert_eq!(outcome.event_id.as_deref(), Some("ev123"));
    assert_eq!(outcome.title, "Abdullah: hello.py");
    assert_eq!(outcome.schedule, "09:00 daily");

    let events = created_events(&server).await;
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event["title"], "Abdullah: hello.py");
    assert_eq!(event["enabled"], 1);
    assert_eq!(event["category"], "general");
    assert_eq!(event["plugin"], "shellplug");
    assert_eq!(event["target"], "main");
    assert_eq!(event["timezone"], "Australia/Perth");
    assert_eq!(event["timing"], json!({"hours": [9], "minutes": [0]}));

    let script = event["params"]["script"].as_str().unwrap();
    assert!(script.starts_with("#!/bin/sh\nset -e\n"));
    let inner = format!(
        "python '{}' '--days' '7'",
        scripts.path().join("Abdullah/hello.py").display()
    );
    assert!(script.contains(&format!(
        "docker exec -i 'pythonhub_portal' bash -lc {}",
        common::shell::quote(inner)
    )));
}

#[tokio::test]
async fn test_run_now_creates_daily_event_then_runs_it() {
    let server = MockServer::start().await;
    let scripts = scripts_dir();
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path(CREATE_EVENT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 0, "event": {"id": "nested-7"}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RUN_EVENT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "ids": ["j1"]})))
        .expect(1)
        .mount(&server)
        .await;

    let settings = settings(&server, scripts.path());
    let outcome = service(&settings)
        .run_now(&request(&settings, &[], ""))
        .await
        .unwrap();

    match outcome {
        RunOutcome::Triggered { event_id, .. } => assert_eq!(event_id, "nested-7"),
        other => panic!("unexpected outcome: {:?}", other),
    }

    let events = created_events(&server).await;
    assert_eq!(events[0]["title"], "Run now: Abdullah/hello.py");
    assert_eq!(events[0]["timing"], json!({"hours": [9], "minutes": [0]}));

    let runs: Vec<Value> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == RUN_EVENT_PATH)
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(runs, vec![json!({"id": "nested-7"})]);
}

#[tokio::test]
async fn test_run_now_failed_nudge_is_still_success() {
    let server = MockServer::start().await;
    let scripts = scripts_dir();
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path(CREATE_EVENT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "id": "ev5"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RUN_EVENT_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let settings = settings(&server, scripts.path());
    let outcome = service(&settings)
        .run_now(&request(&settings, &[], "custom"))
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::TriggeredUnconfirmed { ref event_id, .. } if event_id == "ev5"));
    assert_eq!(created_events(&server).await[0]["title"], "custom");
}

#[tokio::test]
async fn test_run_now_without_identifier_skips_run() {
    let server = MockServer::start().await;
    let scripts = scripts_dir();
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path(CREATE_EVENT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RUN_EVENT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .expect(0)
        .mount(&server)
        .await;

    let settings = settings(&server, scripts.path());
    let outcome = service(&settings)
        .run_now(&request(&settings, &[], ""))
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::AcceptedWithoutId);
}

#[tokio::test]
async fn test_rejected_create_surfaces_payload() {
    let server = MockServer::start().await;
    let scripts = scripts_dir();
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path(CREATE_EVENT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": "api", "description": "Unknown target"})),
        )
        .mount(&server)
        .await;

    let settings = settings(&server, scripts.path());
    let err = service(&settings)
        .create_job(&request(&settings, &[], ""))
        .await
        .unwrap_err();

    match err {
        ActionError::Scheduler(SchedulerError::Rejection { payload }) => {
            assert_eq!(payload["description"], "Unknown target");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_scheduler_never_creates() {
    let server = MockServer::start().await;
    let scripts = scripts_dir();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .expect(0)
        .mount(&server)
        .await;

    let settings = settings(&server, scripts.path());
    let err = service(&settings)
        .run_now(&request(&settings, &[], ""))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ActionError::Scheduler(SchedulerError::Unreachable(ref message)) if message == "HTTP 502"
    ));
}

/// Run the script body the scheduler would receive, with a stand-in client
#[cfg(unix)]
#[tokio::test]
async fn test_submitted_script_executes_under_sh() {
    use std::os::unix::fs::PermissionsExt;
    use std::process::Command;

    let server = MockServer::start().await;
    let scripts = scripts_dir();
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path(CREATE_EVENT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "id": "x"})))
        .mount(&server)
        .await;

    let tools = tempfile::tempdir().unwrap();
    let client = tools.path().join("docker");
    std::fs::write(
        &client,
        "#!/bin/sh\nprintf 'container=%s\\n' \"$3\"\nshift 5\nexec sh -c \"$1\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&client, std::fs::Permissions::from_mode(0o644)).unwrap();

    let mut settings = settings(&server, scripts.path());
    settings.runtime.binary_path = client.to_string_lossy().to_string();
    settings.runtime.fallback_paths = vec![];
    settings.runtime.scratch_path = tools.path().join("staged").to_string_lossy().to_string();
    settings.runtime.interpreter = "printf '<%s>'".to_string();

    service(&settings)
        .create_job(&request(&settings, &["it's", "$(id)"], ""))
        .await
        .unwrap();

    let script = created_events(&server).await[0]["params"]["script"]
        .as_str()
        .unwrap()
        .to_string();
    let output = Command::new("/bin/sh").arg("-c").arg(&script).output().unwrap();

    assert!(output.status.success(), "{:?}", output);
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        format!(
            "container=pythonhub_portal\n<{}><it's><$(id)>",
            scripts.path().join("Abdullah/hello.py").display()
        )
    );
}
