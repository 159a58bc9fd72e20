use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use crate::models::{PriorityFilter, StatusFilter, Task, TaskDraft, TaskPatch};
use crate::notify::Notifier;
use crate::remote::{TaskApi, TaskUpdate};
use crate::storage::KeyValueStorage;
use crate::view;

pub const STORE_KEY: &str = "todo-storage";

const ERROR_TITLE: &str = "Error";
const EMPTY_TEXT_MESSAGE: &str = "Task cannot be empty!";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub tasks: Vec<Task>,
    pub status_filter: StatusFilter,
    pub priority_filter: PriorityFilter,
    pub is_hydrated: bool,
    pub loading_task_ids: BTreeSet<String>,
    pub pending_adds: usize,
    pub is_refreshing: bool,
}

impl StoreState {
    pub fn is_adding_task(&self) -> bool {
        self.pending_adds > 0
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.loading_task_ids.contains(id)
    }

    pub fn visible_tasks(&self) -> Vec<Task> {
        view::visible_tasks(&self.tasks, self.status_filter, self.priority_filter)
    }

    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            tasks: self.tasks.clone(),
            status_filter: self.status_filter,
            priority_filter: self.priority_filter,
        }
    }
}

/// The slice of [`StoreState`] that survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub status_filter: StatusFilter,
    #[serde(default)]
    pub priority_filter: PriorityFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Confirmed and applied to local state.
    Applied,
    /// Nothing to do (unknown id, not hydrated yet).
    Unchanged,
    /// Input failed validation; no request was sent.
    Rejected,
    /// Another request for the same task is still in flight.
    Busy,
    /// The remote call failed; local tasks are untouched.
    Failed,
}

enum Busy {
    Task(String),
    Adding,
    Refreshing,
}

/// Clears a busy marker when dropped, including when the action future is cancelled.
struct BusyGuard<'a> {
    state: &'a watch::Sender<StoreState>,
    busy: Busy,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let busy = &self.busy;
        self.state.send_modify(|s| match busy {
            Busy::Task(id) => {
                s.loading_task_ids.remove(id);
            }
            Busy::Adding => s.pending_adds = s.pending_adds.saturating_sub(1),
            Busy::Refreshing => s.is_refreshing = false,
        });
    }
}

pub struct TaskStore {
    api: Arc<dyn TaskApi>,
    storage: Arc<dyn KeyValueStorage>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<StoreState>,
    write_lock: Mutex<()>,
}

impl TaskStore {
    pub fn new(
        api: Arc<dyn TaskApi>,
        storage: Arc<dyn KeyValueStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            api,
            storage,
            notifier,
            state,
            write_lock: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    pub fn visible_tasks(&self) -> Vec<Task> {
        self.state.borrow().visible_tasks()
    }

    /// Restores the persisted slice. Runs once; any load failure leaves defaults.
    pub async fn hydrate(&self) {
        if self.state.borrow().is_hydrated {
            debug!("store already hydrated");
            return;
        }

        let restored = match self.storage.get(STORE_KEY).await {
            Ok(Some(blob)) => match serde_json::from_str::<PersistedState>(&blob) {
                Ok(persisted) => Some(persisted),
                Err(e) => {
                    warn!("ignoring unreadable persisted tasks: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                error!("failed to load persisted tasks: {}", e);
                None
            }
        };

        self.state.send_modify(|s| {
            if let Some(persisted) = restored {
                info!("restored {} tasks from storage", persisted.tasks.len());
                s.tasks = persisted.tasks;
                s.status_filter = persisted.status_filter;
                s.priority_filter = persisted.priority_filter;
            }
            s.is_hydrated = true;
        });
    }

    /// Replaces local tasks with the server's list. Failures are logged only.
    pub async fn fetch_all(&self, is_refreshing: bool) -> Outcome {
        if !self.state.borrow().is_hydrated {
            warn!("fetch requested before hydration, skipping");
            return Outcome::Unchanged;
        }

        let _refreshing = if is_refreshing {
            self.track(Busy::Refreshing)
        } else {
            None
        };

        match self.api.list_tasks().await {
            Ok(tasks) => {
                info!("fetched {} tasks", tasks.len());
                self.state.send_modify(|s| s.tasks = tasks);
                self.persist().await;
                Outcome::Applied
            }
            Err(e) => {
                error!("failed to fetch tasks: {}", e);
                Outcome::Failed
            }
        }
    }

    pub async fn add_task(&self, draft: TaskDraft) -> Outcome {
        let text = draft.text.trim();
        if text.is_empty() {
            self.notifier.alert(ERROR_TITLE, EMPTY_TEXT_MESSAGE);
            return Outcome::Rejected;
        }
        let draft = TaskDraft {
            text: text.to_string(),
            ..draft
        };

        let _adding = self.track(Busy::Adding);

        match self.api.create_task(&draft).await {
            Ok(task) => {
                info!(id = %task.id, "task created");
                self.state.send_modify(|s| {
                    s.tasks.retain(|t| t.id != task.id);
                    s.tasks.insert(0, task);
                });
                self.persist().await;
                Outcome::Applied
            }
            Err(e) => {
                error!("failed to add task: {}", e);
                self.notifier
                    .alert(ERROR_TITLE, "Failed to add task. Please try again.");
                Outcome::Failed
            }
        }
    }

    pub async fn toggle_task(&self, id: &str) -> Outcome {
        let Some(current) = self.find(id) else {
            debug!(id, "toggle on unknown task ignored");
            return Outcome::Unchanged;
        };
        let Some(_loading) = self.track(Busy::Task(id.to_string())) else {
            return Outcome::Busy;
        };

        let update = TaskUpdate::Completion {
            is_completed: !current.is_completed,
        };
        self.apply_update(id, &update, "update").await
    }

    pub async fn edit_task(&self, id: &str, patch: TaskPatch) -> Outcome {
        let Some(current) = self.find(id) else {
            debug!(id, "edit on unknown task ignored");
            return Outcome::Unchanged;
        };

        let text = match patch.text {
            Some(text) => text.trim().to_string(),
            None => current.text,
        };
        if text.is_empty() {
            self.notifier.alert(ERROR_TITLE, EMPTY_TEXT_MESSAGE);
            return Outcome::Rejected;
        }

        let Some(_loading) = self.track(Busy::Task(id.to_string())) else {
            return Outcome::Busy;
        };

        let update = TaskUpdate::Fields {
            text,
            is_completed: patch.is_completed.unwrap_or(current.is_completed),
            priority: patch.priority.unwrap_or(current.priority),
        };
        self.apply_update(id, &update, "edit").await
    }

    pub async fn delete_task(&self, id: &str) -> Outcome {
        let Some(_loading) = self.track(Busy::Task(id.to_string())) else {
            return Outcome::Busy;
        };

        match self.api.delete_task(id).await {
            Ok(()) => {
                info!(id, "task deleted");
                self.state.send_modify(|s| s.tasks.retain(|t| t.id != id));
                self.persist().await;
                Outcome::Applied
            }
            Err(e) => {
                error!(id, "failed to delete task: {}", e);
                self.notifier
                    .alert(ERROR_TITLE, &format!("Failed to delete task {}.", id));
                Outcome::Failed
            }
        }
    }

    pub async fn set_status_filter(&self, filter: StatusFilter) {
        let changed = self.state.send_if_modified(|s| {
            let changed = s.status_filter != filter;
            s.status_filter = filter;
            changed
        });
        if changed {
            self.persist().await;
        }
    }

    pub async fn set_priority_filter(&self, filter: PriorityFilter) {
        let changed = self.state.send_if_modified(|s| {
            let changed = s.priority_filter != filter;
            s.priority_filter = filter;
            changed
        });
        if changed {
            self.persist().await;
        }
    }

    async fn apply_update(&self, id: &str, update: &TaskUpdate, action: &str) -> Outcome {
        match self.api.update_task(id, update).await {
            Ok(task) => {
                debug!(id, "task {} confirmed", action);
                self.state.send_modify(|s| {
                    if let Some(slot) = s.tasks.iter_mut().find(|t| t.id == id) {
                        *slot = task;
                    }
                });
                self.persist().await;
                Outcome::Applied
            }
            Err(e) => {
                error!(id, "failed to {} task: {}", action, e);
                self.notifier
                    .alert(ERROR_TITLE, &format!("Failed to {} task {}.", action, id));
                Outcome::Failed
            }
        }
    }

    fn find(&self, id: &str) -> Option<Task> {
        self.state.borrow().tasks.iter().find(|t| t.id == id).cloned()
    }

    /// Sets the busy marker. `None` when the task already has a request in flight.
    fn track(&self, busy: Busy) -> Option<BusyGuard<'_>> {
        let marked = self.state.send_if_modified(|s| match &busy {
            Busy::Task(id) => s.loading_task_ids.insert(id.clone()),
            Busy::Adding => {
                s.pending_adds += 1;
                true
            }
            Busy::Refreshing => {
                s.is_refreshing = true;
                true
            }
        });
        if !marked {
            if let Busy::Task(id) = &busy {
                warn!(id = %id, "request already in flight for task");
            }
            return None;
        }
        Some(BusyGuard {
            state: &self.state,
            busy,
        })
    }

    async fn persist(&self) {
        let _write = self.write_lock.lock().await;
        if !self.state.borrow().is_hydrated {
            // an unhydrated store would clobber the saved slice with defaults
            debug!("store not hydrated yet, skipping save");
            return;
        }
        // snapshot under the write lock so the last write holds the newest state
        let persisted = self.state.borrow().persisted();
        let result = match serde_json::to_string(&persisted) {
            Ok(blob) => self.storage.set(STORE_KEY, &blob).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            error!("failed to save tasks: {}", e);
        }
    }
}
