//! Integration tests for the command flow: register, add, move, view.
//!
//! Runs the same entry point as the binary against an in-process server,
//! with the session file in a per-test temp directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use taskboard::api::ClientError;
use taskboard::cli::{self, Command};
use taskboard::config::ClientConfig;
use taskboard::notify::{Notifier, ToastKind};
use taskboard::session::SessionStore;
use taskboard_proto::task::TaskStatus;
use taskboard_server::api::{self, AppState};
use taskboard_server::config::ServerConfig;
use taskboard_server::store::Store;
use url::Url;

async fn start_server() -> (Url, tokio::task::JoinHandle<()>) {
    let config = ServerConfig {
        jwt_secret: "flow-secret".to_string(),
        bcrypt_cost: 4,
        ..ServerConfig::default()
    };
    let state = Arc::new(AppState::new(Store::open_in_memory().unwrap(), &config));
    let (addr, handle) = api::start_server_with_state("127.0.0.1:0", state)
        .await
        .unwrap();
    (Url::parse(&format!("http://{addr}")).unwrap(), handle)
}

fn session_path(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("taskboard-flow-{test}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir.join("session.toml")
}

fn client_config(api_url: Url, test: &str) -> ClientConfig {
    ClientConfig {
        session_path: session_path(test),
        toast_ttl: Duration::from_secs(60),
        ..ClientConfig::new(api_url)
    }
}

/// Runs one command and returns its result, stdout and toast.
fn exec(config: &ClientConfig, command: Command) -> (Result<(), ClientError>, String, Option<(ToastKind, String)>) {
    let mut notifier = Notifier::new(config.toast_ttl);
    let mut out = Vec::new();
    let result = cli::run(command, config, &mut notifier, &mut out);
    let toast = notifier
        .current(Instant::now())
        .map(|t| (t.kind, t.message.clone()));
    (result, String::from_utf8(out).unwrap(), toast)
}

// =============================================================================
// Session gating
// =============================================================================

#[test]
fn task_commands_need_a_session() {
    // Nothing listens here; the command must fail before any request.
    let config = client_config(Url::parse("http://127.0.0.1:9").unwrap(), "no-session");
    let (result, out, toast) = exec(
        &config,
        Command::Board {
            search: None,
            date: None,
            list: None,
        },
    );
    assert!(matches!(result, Err(ClientError::NotAuthenticated)));
    assert!(out.is_empty());
    let (kind, message) = toast.unwrap();
    assert_eq!(kind, ToastKind::Error);
    assert!(message.contains("log in"));
}

// =============================================================================
// Full flow
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn register_add_move_and_view() {
    let (base, _handle) = start_server().await;
    tokio::task::spawn_blocking(move || {
        let config = client_config(base, "full");

        let (result, _, toast) = exec(
            &config,
            Command::Register {
                username: "alice".into(),
                password: "pw".into(),
            },
        );
        result.unwrap();
        assert_eq!(toast.unwrap().0, ToastKind::Success);
        let session = SessionStore::new(config.session_path.clone())
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(session.username, "alice");

        for title in ["Buy milk", "Write report"] {
            let (result, _, _) = exec(
                &config,
                Command::Add {
                    title: title.into(),
                    status: TaskStatus::Todo,
                    description: None,
                    deadline: None,
                    list: None,
                },
            );
            result.unwrap();
        }

        let (result, _, toast) = exec(
            &config,
            Command::Move {
                id: 1,
                status: TaskStatus::Done,
            },
        );
        result.unwrap();
        assert_eq!(toast.unwrap().1, "Task #1 moved to Done");

        let (result, out, _) = exec(
            &config,
            Command::Board {
                search: None,
                date: None,
                list: None,
            },
        );
        result.unwrap();
        assert!(out.contains("To do (1)"));
        assert!(out.contains("Done (1)"));
        let done_section = out.split("Done (1)").nth(1).unwrap();
        assert!(done_section.contains("Buy milk"));

        let (result, out, _) = exec(
            &config,
            Command::Board {
                search: Some("REPORT".into()),
                date: None,
                list: None,
            },
        );
        result.unwrap();
        assert!(out.contains("Write report"));
        assert!(!out.contains("Buy milk"));

        let (result, _, toast) = exec(&config, Command::Logout);
        result.unwrap();
        assert_eq!(toast.unwrap().1, "Signed out");

        let (result, _, _) = exec(&config, Command::Chart);
        assert!(matches!(result, Err(ClientError::NotAuthenticated)));
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_password_shows_server_message() {
    let (base, _handle) = start_server().await;
    tokio::task::spawn_blocking(move || {
        let config = client_config(base, "bad-login");
        let (result, _, _) = exec(
            &config,
            Command::Register {
                username: "bob".into(),
                password: "right".into(),
            },
        );
        result.unwrap();

        let (result, _, toast) = exec(
            &config,
            Command::Login {
                username: "bob".into(),
                password: "wrong".into(),
            },
        );
        assert!(matches!(result, Err(ClientError::Api { status: 400, .. })));
        let (kind, message) = toast.unwrap();
        assert_eq!(kind, ToastKind::Error);
        assert_eq!(message, "invalid username or password");
    })
    .await
    .unwrap();
}
