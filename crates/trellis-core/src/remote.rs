use std::path::Path;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::snapshot::SnapshotStore;
use crate::store::{TaskAction, TaskState, WriteOutcome, reduce};
use crate::task::{Priority, Task, clamp_progress};

/// Wire envelope shared by every remote operation. `success: false` is the
/// sole error signal; transport-level status never reaches the state layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }

    pub fn into_result(self) -> anyhow::Result<T> {
        if self.success {
            return self
                .data
                .ok_or_else(|| anyhow!("remote reported success without a payload"));
        }
        let detail = self
            .error
            .or(self.message)
            .unwrap_or_else(|| "remote request failed".to_string());
        Err(anyhow!(detail))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCreate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub client: String,
    pub priority: Priority,
    pub due: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub sub_status: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TaskCreate {
    pub fn into_task(self, now: DateTime<Utc>) -> Task {
        let mut task = Task::new(self.title, now);
        task.description = self.description;
        task.assignee = self.assignee;
        task.client = self.client;
        task.priority = self.priority;
        task.due = self.due.unwrap_or(now);
        task.status = self.status;
        task.sub_status = self.sub_status;
        task.tags = self.tags;
        task
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub client: Option<String>,
    pub priority: Option<Priority>,
    pub due: Option<DateTime<Utc>>,
    pub progress: Option<u8>,
    pub status: Option<String>,
    pub sub_status: Option<String>,
    pub tags: Option<Vec<String>>,
    pub counter: Option<Option<u32>>,
}

pub fn apply_patch(task: &mut Task, patch: TaskPatch) {
    if let Some(title) = patch.title {
        task.title = title;
    }
    if let Some(description) = patch.description {
        task.description = description;
    }
    if let Some(assignee) = patch.assignee {
        task.assignee = assignee;
    }
    if let Some(client) = patch.client {
        task.client = client;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(due) = patch.due {
        task.due = due;
    }
    if let Some(progress) = patch.progress {
        task.progress = clamp_progress(progress);
    }
    if let Some(status) = patch.status {
        task.status = status;
    }
    if let Some(sub_status) = patch.sub_status {
        task.sub_status = sub_status;
    }
    if let Some(tags) = patch.tags {
        task.tags = tags;
    }
    if let Some(counter) = patch.counter {
        task.counter = counter;
    }
    debug!(id = %task.id, "task patch applied");
}

/// Remote backend surface. Tenancy is the implementation's concern: an HTTP
/// implementation attaches its tenant id as a header, the state layer never
/// filters by tenant itself.
pub trait RemoteApi {
    fn list(&mut self) -> ApiEnvelope<Vec<Task>>;
    fn create(&mut self, create: TaskCreate) -> ApiEnvelope<Task>;
    fn update(&mut self, id: &str, patch: TaskPatch) -> ApiEnvelope<Task>;
    fn delete(&mut self, id: &str) -> ApiEnvelope<String>;
}

/// JSONL-backed backend used by the CLI and tests in place of the real
/// HTTP transport.
#[derive(Debug)]
pub struct FileRemote {
    store: SnapshotStore,
    tenant: String,
}

impl FileRemote {
    pub fn open(data_dir: &Path, tenant: impl Into<String>) -> anyhow::Result<Self> {
        let store = SnapshotStore::open(data_dir)?;
        let tenant = tenant.into();
        info!(%tenant, "file remote ready");
        Ok(Self { store, tenant })
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    fn mutate<T>(
        &mut self,
        op: impl FnOnce(&mut Vec<Task>) -> anyhow::Result<T>,
    ) -> ApiEnvelope<T> {
        let mut tasks = match self.store.load() {
            Ok(tasks) => tasks,
            Err(err) => return ApiEnvelope::err(format!("{err:#}")),
        };
        let out = match op(&mut tasks) {
            Ok(out) => out,
            Err(err) => return ApiEnvelope::err(format!("{err:#}")),
        };
        match self.store.save(&tasks) {
            Ok(()) => ApiEnvelope::ok(out),
            Err(err) => ApiEnvelope::err(format!("{err:#}")),
        }
    }
}

impl RemoteApi for FileRemote {
    fn list(&mut self) -> ApiEnvelope<Vec<Task>> {
        match self.store.load() {
            Ok(tasks) => ApiEnvelope::ok(tasks),
            Err(err) => ApiEnvelope::err(format!("{err:#}")),
        }
    }

    fn create(&mut self, create: TaskCreate) -> ApiEnvelope<Task> {
        let task = create.into_task(Utc::now());
        self.mutate(move |tasks| {
            tasks.push(task.clone());
            Ok(task)
        })
    }

    fn update(&mut self, id: &str, patch: TaskPatch) -> ApiEnvelope<Task> {
        self.mutate(move |tasks| {
            let task = tasks
                .iter_mut()
                .find(|task| task.id == id)
                .ok_or_else(|| anyhow!("task not found: {id}"))?;
            apply_patch(task, patch);
            Ok(task.clone())
        })
    }

    fn delete(&mut self, id: &str) -> ApiEnvelope<String> {
        self.mutate(move |tasks| {
            let before = tasks.len();
            tasks.retain(|task| task.id != id);
            if tasks.len() == before {
                return Err(anyhow!("task not found: {id}"));
            }
            Ok(id.to_string())
        })
    }
}

/// Tri-state thunks: started, then fulfilled or rejected, folded into the
/// store as actions. Rejections become error strings, never panics, and no
/// retry happens at this layer.
#[tracing::instrument(skip(state, api))]
pub fn fetch_tasks(state: &mut TaskState, api: &mut dyn RemoteApi) {
    reduce(state, TaskAction::FetchStarted);
    match api.list().into_result() {
        Ok(tasks) => reduce(state, TaskAction::FetchCompleted(tasks)),
        Err(err) => reduce(state, TaskAction::FetchFailed(format!("{err:#}"))),
    }
}

#[tracing::instrument(skip(state, api, create))]
pub fn create_task(state: &mut TaskState, api: &mut dyn RemoteApi, create: TaskCreate) {
    reduce(state, TaskAction::WriteStarted);
    match api.create(create).into_result() {
        Ok(task) => reduce(state, TaskAction::WriteCompleted(WriteOutcome::Created(task))),
        Err(err) => reduce(state, TaskAction::WriteFailed(format!("{err:#}"))),
    }
}

#[tracing::instrument(skip(state, api, patch))]
pub fn update_task(state: &mut TaskState, api: &mut dyn RemoteApi, id: &str, patch: TaskPatch) {
    reduce(state, TaskAction::WriteStarted);
    match api.update(id, patch).into_result() {
        Ok(task) => reduce(state, TaskAction::WriteCompleted(WriteOutcome::Updated(task))),
        Err(err) => reduce(state, TaskAction::WriteFailed(format!("{err:#}"))),
    }
}

#[tracing::instrument(skip(state, api))]
pub fn delete_task(state: &mut TaskState, api: &mut dyn RemoteApi, id: &str) {
    reduce(state, TaskAction::WriteStarted);
    match api.delete(id).into_result() {
        Ok(id) => reduce(state, TaskAction::WriteCompleted(WriteOutcome::Deleted(id))),
        Err(err) => reduce(state, TaskAction::WriteFailed(format!("{err:#}"))),
    }
}
