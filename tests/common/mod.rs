#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use todo_sync::AppError;
use todo_sync::models::{Priority, Task, TaskDraft};
use todo_sync::notify::Notifier;
use todo_sync::remote::{TaskApi, TaskUpdate};
use todo_sync::storage::KeyValueStorage;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    Create(TaskDraft),
    Delete(String),
    Update(String, TaskUpdate),
}

/// In-process stand-in for the task service.
#[derive(Default)]
pub struct FakeTaskApi {
    tasks: Mutex<Vec<Task>>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicUsize,
    failing: AtomicBool,
    gate: Mutex<Option<Arc<Semaphore>>>,
    update_gate: Mutex<Option<Arc<Semaphore>>>,
    hidden: Mutex<HashSet<String>>,
}

impl FakeTaskApi {
    pub fn new() -> Self {
        Self {
            next_id: AtomicUsize::new(1),
            ..Self::default()
        }
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let api = Self::new();
        *api.tasks.lock().unwrap() = tasks;
        api
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every call waits for a permit from `gate` before answering.
    pub fn hold_with(&self, gate: Arc<Semaphore>) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    /// Only update calls wait on `gate`.
    pub fn hold_updates_with(&self, gate: Arc<Semaphore>) {
        *self.update_gate.lock().unwrap() = Some(gate);
    }

    /// Leaves `id` out of list responses, as if another client deleted it.
    pub fn hide_from_list(&self, id: &str) {
        self.hidden.lock().unwrap().insert(id.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn server_tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    async fn enter(&self, call: Call) -> Result<(), AppError> {
        let is_update = matches!(call, Call::Update(..));
        self.calls.lock().unwrap().push(call);
        let mut gate = self.gate.lock().unwrap().clone();
        if gate.is_none() && is_update {
            gate = self.update_gate.lock().unwrap().clone();
        }
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Api {
                method: "TEST".to_string(),
                url: "http://fake/tasks".to_string(),
                status: 500,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TaskApi for FakeTaskApi {
    async fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        self.enter(Call::List).await?;
        let hidden = self.hidden.lock().unwrap().clone();
        Ok(self
            .server_tasks()
            .into_iter()
            .filter(|t| !hidden.contains(&t.id))
            .collect())
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, AppError> {
        self.enter(Call::Create(draft.clone())).await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let task = Task {
            id,
            text: draft.text.clone(),
            is_completed: draft.is_completed,
            priority: draft.priority,
            platform: draft.platform.clone(),
        };
        self.tasks.lock().unwrap().insert(0, task.clone());
        Ok(task)
    }

    async fn delete_task(&self, id: &str) -> Result<(), AppError> {
        self.enter(Call::Delete(id.to_string())).await?;
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Task, AppError> {
        self.enter(Call::Update(id.to_string(), update.clone())).await?;
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(AppError::NotFound)?;
        match update {
            TaskUpdate::Completion { is_completed } => task.is_completed = *is_completed,
            TaskUpdate::Fields {
                text,
                is_completed,
                priority,
            } => {
                task.text = text.clone();
                task.is_completed = *is_completed;
                task.priority = *priority;
            }
        }
        Ok(task.clone())
    }
}

/// Storage whose every operation fails.
pub struct BrokenStorage;

#[async_trait]
impl KeyValueStorage for BrokenStorage {
    async fn get(&self, _key: &str) -> Result<Option<String>, AppError> {
        Err(AppError::Storage(std::io::Error::other("disk unavailable")))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), AppError> {
        Err(AppError::Storage(std::io::Error::other("disk unavailable")))
    }

    async fn remove(&self, _key: &str) -> Result<(), AppError> {
        Err(AppError::Storage(std::io::Error::other("disk unavailable")))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<(String, String)> {
        self.alerts.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, title: &str, message: &str) {
        self.alerts
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

pub fn task(id: &str, text: &str, priority: Priority, is_completed: bool) -> Task {
    Task {
        id: id.to_string(),
        text: text.to_string(),
        is_completed,
        priority,
        platform: "ios".to_string(),
    }
}
