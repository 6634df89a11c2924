//! Integration tests for the task API over real HTTP.
//!
//! Starts the server in-process on an ephemeral port with an in-memory
//! store, then drives it with the blocking HTTP client from the blocking
//! thread pool.

use std::sync::Arc;

use chrono::NaiveDate;
use taskboard::api::{AuthApi, ClientError, HttpTaskApi, TaskApi};
use taskboard::repo::{MoveOutcome, TaskRepository};
use taskboard_proto::auth::Credentials;
use taskboard_proto::task::{NewTask, StatusChange, TaskId, TaskPatch, TaskStatus};
use taskboard_server::api::{self, AppState};
use taskboard_server::config::ServerConfig;
use taskboard_server::store::Store;
use url::Url;

/// Start the server in-process and return its base URL.
async fn start_server() -> (Url, tokio::task::JoinHandle<()>) {
    let config = ServerConfig {
        jwt_secret: "integration-secret".to_string(),
        bcrypt_cost: 4,
        ..ServerConfig::default()
    };
    let store = Store::open_in_memory().expect("in-memory store");
    let state = Arc::new(AppState::new(store, &config));
    let (addr, handle) = api::start_server_with_state("127.0.0.1:0", state)
        .await
        .expect("failed to start server");
    let url = Url::parse(&format!("http://{addr}")).expect("server url");
    (url, handle)
}

/// Run blocking client code without stalling the server.
async fn blocking<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    tokio::task::spawn_blocking(f).await.expect("client thread panicked")
}

fn sign_up(base: &Url, username: &str) -> HttpTaskApi {
    let auth = AuthApi::new(base.clone());
    let response = auth
        .register(&Credentials::new(username, "password"))
        .expect("register");
    assert_eq!(response.user.username, username);
    HttpTaskApi::new(base.clone(), response.token)
}

// =============================================================================
// Accounts
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn register_then_login_returns_same_user() {
    let (base, _handle) = start_server().await;
    blocking(move || {
        let auth = AuthApi::new(base);
        let registered = auth.register(&Credentials::new("alice", "pw")).unwrap();
        let logged_in = auth.login(&Credentials::new("alice", "pw")).unwrap();
        assert_eq!(registered.user, logged_in.user);
        assert!(!logged_in.token.is_empty());
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_username_is_rejected() {
    let (base, _handle) = start_server().await;
    blocking(move || {
        let auth = AuthApi::new(base);
        auth.register(&Credentials::new("alice", "pw")).unwrap();
        let err = auth.register(&Credentials::new("alice", "other")).unwrap_err();
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "username already exists");
            }
            other => panic!("unexpected error: {other}"),
        }
        // The original password still works.
        assert!(auth.login(&Credentials::new("alice", "pw")).is_ok());
        assert!(auth.login(&Credentials::new("alice", "other")).is_err());
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn garbage_token_is_unauthorized() {
    let (base, _handle) = start_server().await;
    blocking(move || {
        let api = HttpTaskApi::new(base, "not.a.token");
        let err = api.list().unwrap_err();
        assert!(err.is_unauthorized(), "{err}");
    })
    .await;
}

// =============================================================================
// Tasks
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn move_into_empty_column_leaves_other_task_alone() {
    let (base, _handle) = start_server().await;
    blocking(move || {
        let mut repo = TaskRepository::new(sign_up(&base, "alice"));
        let a = repo.create(NewTask::new("A", TaskStatus::Todo)).unwrap();
        let b = repo.create(NewTask::new("B", TaskStatus::Todo)).unwrap();
        assert_eq!((a.order, b.order), (0, 1));

        let MoveOutcome::Moved(moved) = repo.move_task(a.id, TaskStatus::Done).unwrap() else {
            panic!("expected a move");
        };
        assert_eq!((moved.status, moved.order), (TaskStatus::Done, 0));

        let board = repo.board().unwrap();
        let a = board.find(a.id).unwrap();
        let b = board.find(b.id).unwrap();
        assert_eq!((a.status, a.order), (TaskStatus::Done, 0));
        assert_eq!((b.status, b.order), (TaskStatus::Todo, 1));
        assert_eq!(b.title, "B");
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn server_ordering_appends_after_tail() {
    let (base, _handle) = start_server().await;
    blocking(move || {
        let mut repo = TaskRepository::new(sign_up(&base, "alice")).with_server_ordering(true);
        repo.create(NewTask::new("done 1", TaskStatus::Done).with_order(4))
            .unwrap();
        let todo = repo.create(NewTask::new("todo", TaskStatus::Todo)).unwrap();

        let MoveOutcome::Moved(moved) = repo.move_task(todo.id, TaskStatus::Done).unwrap() else {
            panic!("expected a move");
        };
        assert_eq!(moved.order, 5);
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_update_keeps_unsupplied_fields() {
    let (base, _handle) = start_server().await;
    blocking(move || {
        let api = sign_up(&base, "alice");
        let deadline = NaiveDate::from_ymd_opt(2030, 1, 15).unwrap();
        let created = api
            .create(
                &NewTask::new("Quarterly report", TaskStatus::InProgress)
                    .with_description("numbers for Q1")
                    .with_deadline(deadline)
                    .with_list("work"),
            )
            .unwrap();

        let updated = api
            .update(
                created.id,
                &TaskPatch {
                    title: Some("Quarterly report v2".into()),
                    ..TaskPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Quarterly report v2");
        assert_eq!(updated.description, "numbers for Q1");
        assert_eq!(updated.deadline, Some(deadline));
        assert_eq!(updated.list, "work");
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert_eq!(updated.created_at, created.created_at);
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn status_change_can_set_deadline() {
    let (base, _handle) = start_server().await;
    blocking(move || {
        let api = sign_up(&base, "alice");
        let task = api.create(&NewTask::new("x", TaskStatus::Todo)).unwrap();
        let deadline = NaiveDate::from_ymd_opt(2031, 6, 1).unwrap();
        let change = StatusChange {
            deadline: Some(deadline),
            ..StatusChange::to_position(TaskStatus::InProgress, 0)
        };
        let moved = api.update_status(task.id, &change).unwrap();
        assert_eq!(moved.status, TaskStatus::InProgress);
        assert_eq!(moved.deadline, Some(deadline));
        assert_eq!(moved.title, "x");
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn users_only_see_and_touch_their_own_tasks() {
    let (base, _handle) = start_server().await;
    blocking(move || {
        let alice = sign_up(&base, "alice");
        let bob = sign_up(&base, "bob");
        let task = alice.create(&NewTask::new("private", TaskStatus::Todo)).unwrap();

        assert!(bob.list().unwrap().is_empty());

        let err = bob.delete(task.id).unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 404, .. }));
        let err = bob
            .update_status(task.id, &StatusChange::append(TaskStatus::Done))
            .unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 404, .. }));

        let mine = alice.list().unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].status, TaskStatus::Todo);
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_removes_task() {
    let (base, _handle) = start_server().await;
    blocking(move || {
        let api = sign_up(&base, "alice");
        let task = api.create(&NewTask::new("temp", TaskStatus::Todo)).unwrap();
        api.delete(task.id).unwrap();
        assert!(api.list().unwrap().is_empty());

        let err = api.delete(task.id).unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 404, .. }));
        let err = api.delete(TaskId::new(999)).unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 404, .. }));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_create_is_rejected_by_server() {
    let (base, _handle) = start_server().await;
    blocking(move || {
        let api = sign_up(&base, "alice");
        let err = api
            .create(&NewTask {
                title: Some("no status".into()),
                ..NewTask::default()
            })
            .unwrap_err();
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "title and status are required");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(api.list().unwrap().is_empty());
    })
    .await;
}
