use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;
use tempfile::tempdir;

fn seed_user(root: &Path, name: &str) {
    let dir = root.join(name);
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("thesis.txt"), b"final draft, really").unwrap();
    fs::create_dir(dir.join("notebooks")).unwrap();
    fs::write(dir.join("notebooks").join("week1.ipynb"), b"{}").unwrap();
}

fn archiver() -> Command {
    Command::cargo_bin("homedir-archiver").expect("Binary exists")
}

#[test]
fn archives_stale_directory_end_to_end() {
    let root = tempdir().unwrap();
    let dest = tempdir().unwrap();
    seed_user(root.path(), "alice");

    // With days_ago=0 the cutoff is "now" at process start; give the files a
    // moment to age past it.
    sleep(Duration::from_millis(1200));

    archiver()
        .arg(root.path())
        .arg("0")
        .arg(format!("file://{}", dest.path().display()))
        .assert()
        .success();

    assert!(dest.path().join("alice.tar.gz").exists());
    assert!(dest.path().join("alice.tar.gz.md5").exists());
    // upload pass leaves the home directory alone
    assert!(root.path().join("alice").join("thesis.txt").exists());
}

#[test]
fn delete_flag_replaces_contents_with_notice() {
    let root = tempdir().unwrap();
    let dest = tempdir().unwrap();
    seed_user(root.path(), "alice");
    sleep(Duration::from_millis(1200));

    archiver()
        .arg(root.path())
        .arg("0")
        .arg(format!("file://{}", dest.path().display()))
        .arg("--delete")
        .assert()
        .success();

    assert!(dest.path().join("alice.tar.gz").exists());

    let alice = root.path().join("alice");
    let remaining: Vec<String> = fs::read_dir(&alice)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(remaining, vec!["WHERE-ARE-MY-FILES.txt".to_string()]);

    let notice = fs::read_to_string(alice.join("WHERE-ARE-MY-FILES.txt")).unwrap();
    assert!(notice.contains("alice.tar.gz"));
}

#[test]
fn active_directory_is_left_alone() {
    let root = tempdir().unwrap();
    let dest = tempdir().unwrap();
    seed_user(root.path(), "alice");

    // Freshly written files are well inside a 30-day threshold.
    archiver()
        .arg(root.path())
        .arg("30")
        .arg(format!("file://{}", dest.path().display()))
        .assert()
        .success();

    assert!(!dest.path().join("alice.tar.gz").exists());
    assert!(root.path().join("alice").join("thesis.txt").exists());
}

#[test]
fn user_flag_restricts_the_run() {
    let root = tempdir().unwrap();
    let dest = tempdir().unwrap();
    seed_user(root.path(), "alice");
    seed_user(root.path(), "bob");
    sleep(Duration::from_millis(1200));

    archiver()
        .arg(root.path())
        .arg("0")
        .arg(format!("file://{}", dest.path().display()))
        .arg("--user")
        .arg("alice")
        .assert()
        .success();

    assert!(dest.path().join("alice.tar.gz").exists());
    assert!(!dest.path().join("bob.tar.gz").exists());
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
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

    use homedir_archiver::cli::{run, Cli};

    // A root that does not exist: run() fails, but only after tracing is up.
    let cli = Cli {
        root_dir: std::path::PathBuf::from("/nonexistent/user/homes"),
        days_ago: 30,
        destination: "memory://".to_string(),
        delete: false,
        user: None,
        notice_file_name: "WHERE-ARE-MY-FILES.txt".to_string(),
        config: None,
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}

#[test]
fn unsupported_destination_scheme_fails() {
    let root = tempdir().unwrap();
    seed_user(root.path(), "alice");

    archiver()
        .arg(root.path())
        .arg("0")
        .arg("ftp://somewhere/archives")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported destination scheme"));
}
