use std::sync::Arc;

use todo_sync::api::router;
use todo_sync::models::{Priority, StatusFilter, TaskDraft, TaskPatch};
use todo_sync::notify::LogNotifier;
use todo_sync::remote::HttpTaskApi;
use todo_sync::state::AppState;
use todo_sync::storage::FileStorage;
use todo_sync::{Outcome, TaskStore, db};

async fn spawn_server() -> String {
    let pool = db::connect("sqlite::memory:")
        .await
        .expect("Failed to create database");
    let app = router(AppState { db: pool });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn store_for(base_url: &str, dir: &std::path::Path) -> TaskStore {
    TaskStore::new(
        Arc::new(HttpTaskApi::new(base_url).unwrap()),
        Arc::new(FileStorage::new(dir)),
        Arc::new(LogNotifier),
    )
}

#[tokio::test]
async fn full_lifecycle_against_live_server() {
    let base_url = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let store = store_for(&base_url, dir.path());
    store.hydrate().await;
    assert_eq!(store.fetch_all(false).await, Outcome::Applied);
    assert!(store.snapshot().tasks.is_empty());

    assert_eq!(
        store
            .add_task(TaskDraft::new("Buy milk", Priority::Medium, "ios"))
            .await,
        Outcome::Applied
    );
    assert_eq!(
        store
            .add_task(TaskDraft::new("Walk dog", Priority::High, "ios"))
            .await,
        Outcome::Applied
    );
    let tasks = store.snapshot().tasks;
    assert_eq!(tasks[0].text, "Walk dog");
    assert_eq!(tasks[1].text, "Buy milk");
    let milk = tasks[1].id.clone();
    let dog = tasks[0].id.clone();

    assert_eq!(store.toggle_task(&milk).await, Outcome::Applied);
    let patch = TaskPatch {
        text: Some("Walk the dog".to_string()),
        priority: Some(Priority::Low),
        ..TaskPatch::default()
    };
    assert_eq!(store.edit_task(&dog, patch).await, Outcome::Applied);

    // the server agrees with local state
    let local = store.snapshot().tasks;
    assert_eq!(store.fetch_all(true).await, Outcome::Applied);
    assert_eq!(store.snapshot().tasks, local);
    assert!(local.iter().any(|t| t.id == milk && t.is_completed));
    assert!(local.iter().any(|t| t.id == dog && t.text == "Walk the dog"));

    assert_eq!(store.delete_task(&milk).await, Outcome::Applied);
    assert_eq!(store.snapshot().tasks.len(), 1);

    // deleting again hits a 404 and leaves state alone
    assert_eq!(store.delete_task(&milk).await, Outcome::Failed);
    assert_eq!(store.snapshot().tasks.len(), 1);
}

#[tokio::test]
async fn restart_restores_from_disk_before_fetching() {
    let base_url = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();

    {
        let store = store_for(&base_url, dir.path());
        store.hydrate().await;
        store
            .add_task(TaskDraft::new("Persist me", Priority::Low, "android"))
            .await;
        store.set_status_filter(StatusFilter::Pending).await;
    }

    let store = store_for(&base_url, dir.path());
    store.hydrate().await;
    let state = store.snapshot();
    assert!(state.is_hydrated);
    assert_eq!(state.status_filter, StatusFilter::Pending);
    assert_eq!(state.tasks.len(), 1);
    assert_eq!(state.tasks[0].text, "Persist me");
    assert_eq!(state.tasks[0].platform, "android");
}
