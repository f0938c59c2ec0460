use chrono::{Duration, Utc};
use tempfile::tempdir;
use trellis_core::remote::{self, FileRemote, TaskCreate, TaskPatch};
use trellis_core::select::Selectors;
use trellis_core::store::{TaskAction, TaskState, reduce};
use trellis_core::sync::{FileSyncSource, SyncLoop, SyncStatus, sync_status};
use trellis_core::task::Priority;
use trellis_core::ui_state::{UiAction, UiState, reduce_ui};

fn create(title: &str, client: &str, sub_status: &str) -> TaskCreate {
    TaskCreate {
        title: title.to_string(),
        description: String::new(),
        assignee: "Dana".to_string(),
        client: client.to_string(),
        priority: Priority::Medium,
        due: None,
        status: "Production".to_string(),
        sub_status: sub_status.to_string(),
        tags: vec![],
    }
}

#[test]
fn board_flow_from_create_to_synced_columns() {
    let temp = tempdir().expect("tempdir");
    let mut remote = FileRemote::open(temp.path(), "studio-a").expect("open remote");

    let mut state = TaskState::default();
    remote::create_task(&mut state, &mut remote, create("script teaser", "Acme Media", "Scripting"));
    remote::create_task(&mut state, &mut remote, create("grade footage", "Borealis", "Editing"));
    assert!(state.error.is_none());
    assert_eq!(state.tasks.len(), 2);

    // A fresh session fetches the same board back from the backend.
    let mut session = TaskState::default();
    remote::fetch_tasks(&mut session, &mut remote);
    assert_eq!(session.tasks.len(), 2);

    let mut selectors = Selectors::default();
    let groups = selectors.grouped_by_sub_status(&session);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups.get("Scripting").map(Vec::len), Some(1));

    // Filter pipeline through the UI state store.
    let mut ui = UiState::default();
    reduce_ui(&mut ui, UiAction::SetClientFilter("Acme Media".to_string()));
    let now = Utc::now();
    let filtered = selectors.filtered(&session, &ui.filters, now);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].title, "script teaser");
}

#[test]
fn optimistic_drag_survives_a_stale_sync_tick() {
    let temp = tempdir().expect("tempdir");
    let mut remote = FileRemote::open(temp.path(), "studio-a").expect("open remote");

    let mut state = TaskState::default();
    remote::create_task(&mut state, &mut remote, create("publish cut", "Borealis", "Editing"));
    let id = state.tasks[0].id.clone();

    // The user drags the card to a new column; the backend still has the
    // old sub-status.
    reduce(&mut state, TaskAction::DragStart { id: id.clone() });
    reduce(
        &mut state,
        TaskAction::UpdateStatus {
            id: id.clone(),
            status: "Post-Production".to_string(),
            sub_status: "Review".to_string(),
            optimistic: true,
        },
    );

    let mut source = FileSyncSource::open(temp.path()).expect("open source");
    let mut listener = SyncLoop::new(30);
    let now = Utc::now();
    assert!(listener.tick(&mut state, &mut source, now));

    let task = state.task(&id).expect("task present");
    assert_eq!(task.sub_status, "Review", "stale snapshot must not revert the drag");
    assert!(state.last_sync.is_some());
    assert_eq!(sync_status(&state, true, now), SyncStatus::JustNow);

    // Backend catches up, the gesture ends, and the next tick reconciles.
    remote::update_task(
        &mut state,
        &mut remote,
        &id,
        TaskPatch {
            status: Some("Post-Production".to_string()),
            sub_status: Some("Review".to_string()),
            ..TaskPatch::default()
        },
    );
    reduce(&mut state, TaskAction::DragEnd);
    assert!(state.pending.is_empty());
    assert!(state.drag.active_id.is_none());

    assert!(listener.tick(&mut state, &mut source, now + Duration::seconds(30)));
    let task = state.task(&id).expect("task present");
    assert_eq!(task.sub_status, "Review");
}

#[test]
fn disabled_realtime_reports_offline_regardless_of_freshness() {
    let state = TaskState {
        last_sync: Some(Utc::now()),
        ..TaskState::default()
    };
    assert_eq!(sync_status(&state, false, Utc::now()), SyncStatus::Offline);
}
