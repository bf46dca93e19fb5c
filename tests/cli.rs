use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn publish_in(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("publish").expect("Binary exists");
    cmd.current_dir(dir)
        .env_remove("PUBLISH_STORE_URL")
        .env_remove("PUBLISH_STORE_KEY");
    cmd
}

#[test]
fn empty_name_prints_usage_and_exits_with_status_2() {
    let dir = tempdir().unwrap();
    publish_in(dir.path())
        .arg("")
        .assert()
        .code(2)
        .stderr(
            predicate::str::contains("[ERROR]")
                .and(predicate::str::contains("Usage"))
                .and(predicate::str::contains("Publish aborted")),
        );
}

#[test]
fn missing_name_is_a_usage_error() {
    let dir = tempdir().unwrap();
    publish_in(dir.path()).assert().code(2);
}

#[test]
fn missing_store_credentials_exit_with_status_1() {
    let dir = tempdir().unwrap();
    publish_in(dir.path())
        .arg("2024-03-15-rain")
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("PUBLISH_STORE_URL")
                .and(predicate::str::contains("==== Publish aborted ====")),
        );
}

#[test]
fn unparseable_config_exits_with_status_1() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("publish.yaml"), "paths: [:::").unwrap();
    publish_in(dir.path())
        .args(["day", "--config", "publish.yaml"])
        .env("PUBLISH_STORE_URL", "http://127.0.0.1:9")
        .env("PUBLISH_STORE_KEY", "k")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("parse"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use daily_publish::cli::{run, Cli};

    // An empty name fails validation right after the first event, before any side effect.
    let cli = Cli {
        name: String::new(),
        description: None,
        config: None,
        repo: std::path::PathBuf::from("."),
    };

    let err = run(cli).await.unwrap_err();
    assert_eq!(daily_publish::cli::exit_code(&err), 2);

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
