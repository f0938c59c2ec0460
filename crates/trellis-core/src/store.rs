use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::task::{Task, clamp_progress};

/// Transient drag gesture state. `dragged` is a denormalized copy of the
/// active task for overlay rendering, never a live reference into `tasks`.
#[derive(Debug, Clone, Default)]
pub struct DragState {
    pub active_id: Option<String>,
    pub dragged: Option<Task>,
}

/// Authoritative task collection plus coarse async status. `revision` counts
/// observable changes to `tasks` and is the identity key the selector caches
/// compare against.
#[derive(Debug, Clone, Default)]
pub struct TaskState {
    pub tasks: Vec<Task>,
    pub loading: bool,
    pub error: Option<String>,
    pub drag: DragState,
    /// Ids with an optimistic local write awaiting remote confirmation.
    /// A sync keeps the local record for these ids.
    pub pending: HashSet<String>,
    pub last_sync: Option<DateTime<Utc>>,
    pub syncing: bool,
    pub revision: u64,
}

impl TaskState {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }
}

/// Outcome of a confirmed remote write, folded back into local state.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    Created(Task),
    Updated(Task),
    Deleted(String),
}

#[derive(Debug, Clone)]
pub enum TaskAction {
    Add(Task),
    Remove(String),
    Edit(Task),
    SetAll(Vec<Task>),

    FetchStarted,
    FetchCompleted(Vec<Task>),
    FetchFailed(String),

    WriteStarted,
    WriteCompleted(WriteOutcome),
    WriteFailed(String),

    DragStart {
        id: String,
    },
    DragEnd,
    UpdateStatus {
        id: String,
        status: String,
        sub_status: String,
        optimistic: bool,
    },
    Move {
        id: String,
        to_index: usize,
    },
    ClearPending(String),

    SyncStarted,
    Sync {
        tasks: Vec<Task>,
        at: DateTime<Utc>,
    },
    SyncFailed(String),
}

/// Applies one action to the store. Reducers never fail: a mutation that
/// targets a missing or duplicate id is a warn-logged no-op, and remote
/// failures arrive here already flattened to a message string.
#[tracing::instrument(skip(state, action), fields(revision = state.revision))]
pub fn reduce(state: &mut TaskState, action: TaskAction) {
    match action {
        TaskAction::Add(task) => add_task(state, task),
        TaskAction::Remove(id) => remove_task(state, &id),
        TaskAction::Edit(task) => edit_task(state, task),
        TaskAction::SetAll(tasks) => {
            state.tasks = tasks;
            touch(state);
        }

        TaskAction::FetchStarted => {
            state.loading = true;
            state.error = None;
        }
        TaskAction::FetchCompleted(tasks) => {
            state.tasks = tasks;
            state.loading = false;
            touch(state);
        }
        TaskAction::FetchFailed(message) => {
            warn!(%message, "task fetch failed");
            state.loading = false;
            state.error = Some(message);
        }

        TaskAction::WriteStarted => {
            state.loading = true;
            state.error = None;
        }
        TaskAction::WriteCompleted(outcome) => {
            state.loading = false;
            match outcome {
                WriteOutcome::Created(task) => add_task(state, task),
                WriteOutcome::Updated(task) => {
                    state.pending.remove(&task.id);
                    edit_task(state, task);
                }
                WriteOutcome::Deleted(id) => {
                    state.pending.remove(&id);
                    remove_task(state, &id);
                }
            }
        }
        TaskAction::WriteFailed(message) => {
            warn!(%message, "task write failed");
            state.loading = false;
            state.error = Some(message);
        }

        TaskAction::DragStart { id } => {
            let Some(task) = state.task(&id).cloned() else {
                warn!(%id, "drag start for unknown task");
                return;
            };
            state.drag.active_id = Some(id);
            state.drag.dragged = Some(task);
        }
        TaskAction::DragEnd => {
            if let Some(id) = state.drag.active_id.take() {
                state.pending.remove(&id);
            }
            state.drag.dragged = None;
        }
        TaskAction::UpdateStatus {
            id,
            status,
            sub_status,
            optimistic,
        } => update_status(state, &id, status, sub_status, optimistic),
        TaskAction::Move { id, to_index } => move_task(state, &id, to_index),
        TaskAction::ClearPending(id) => {
            state.pending.remove(&id);
        }

        TaskAction::SyncStarted => {
            state.syncing = true;
        }
        TaskAction::Sync { tasks, at } => apply_sync(state, tasks, at),
        TaskAction::SyncFailed(message) => {
            warn!(%message, "sync failed");
            state.syncing = false;
            state.error = Some(message);
        }
    }
}

fn touch(state: &mut TaskState) {
    state.revision += 1;
}

fn add_task(state: &mut TaskState, mut task: Task) {
    if state.tasks.iter().any(|existing| existing.id == task.id) {
        warn!(id = %task.id, "duplicate task id rejected");
        return;
    }
    task.progress = clamp_progress(task.progress);
    debug!(id = %task.id, title = %task.title, "task added");
    state.tasks.push(task);
    touch(state);
}

fn remove_task(state: &mut TaskState, id: &str) {
    let before = state.tasks.len();
    state.tasks.retain(|task| task.id != id);
    if state.tasks.len() == before {
        debug!(%id, "remove on absent task ignored");
        return;
    }
    touch(state);
}

fn edit_task(state: &mut TaskState, mut task: Task) {
    let Some(slot) = state.tasks.iter_mut().find(|t| t.id == task.id) else {
        warn!(id = %task.id, "edit dropped: task not found");
        return;
    };
    task.progress = clamp_progress(task.progress);
    *slot = task;
    touch(state);
}

fn update_status(state: &mut TaskState, id: &str, status: String, sub_status: String, optimistic: bool) {
    let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) else {
        warn!(%id, "status update dropped: task not found");
        return;
    };
    task.status = status;
    task.sub_status = sub_status;

    if state.drag.active_id.as_deref() == Some(id) {
        state.drag.dragged = Some(task.clone());
    }
    if optimistic {
        state.pending.insert(id.to_string());
    }
    touch(state);
}

fn move_task(state: &mut TaskState, id: &str, to_index: usize) {
    let Some(from) = state.tasks.iter().position(|t| t.id == id) else {
        warn!(%id, "move dropped: task not found");
        return;
    };
    let task = state.tasks.remove(from);
    let to_index = to_index.min(state.tasks.len());
    state.tasks.insert(to_index, task);
    touch(state);
}

/// Applies a remote snapshot. Tasks with an outstanding optimistic write keep
/// their local record, so a stale snapshot can never revert an in-flight
/// edit; everything else is replaced wholesale.
fn apply_sync(state: &mut TaskState, incoming: Vec<Task>, at: DateTime<Utc>) {
    state.syncing = false;

    if state.pending.is_empty() {
        state.tasks = incoming;
        state.last_sync = Some(at);
        touch(state);
        return;
    }

    let mut merged: Vec<Task> = incoming
        .into_iter()
        .map(|task| {
            if state.pending.contains(&task.id) {
                state.task(&task.id).cloned().unwrap_or(task)
            } else {
                task
            }
        })
        .collect();

    // A pending task the snapshot has never seen (local create) survives too.
    for id in &state.pending {
        if !merged.iter().any(|task| &task.id == id)
            && let Some(local) = state.tasks.iter().find(|task| &task.id == id)
        {
            merged.push(local.clone());
        }
    }

    debug!(
        kept_pending = state.pending.len(),
        total = merged.len(),
        "sync merged around pending writes"
    );
    state.tasks = merged;
    state.last_sync = Some(at);
    touch(state);
}
