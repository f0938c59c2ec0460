use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::datetime::DateRangePreset;
use crate::task::Task;

pub const ALL_TEAMS: &str = "All Teams";
pub const ALL_CLIENTS: &str = "All Clients";
pub const ALL_STATUSES: &str = "All Statuses";
pub const ALL_ASSIGNEES: &str = "All Assignees";
pub const ALL_PRIORITIES: &str = "All Priorities";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProgressBucket {
    #[default]
    All,
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressBucket {
    pub fn matches(self, progress: u8) -> bool {
        match self {
            ProgressBucket::All => true,
            ProgressBucket::NotStarted => progress == 0,
            ProgressBucket::InProgress => progress > 0 && progress < 100,
            ProgressBucket::Completed => progress == 100,
        }
    }
}

/// Active filter values. Each string field treats its `ALL_*` sentinel as
/// "no filter"; everything else is exact-match against the task field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filters {
    pub team: String,
    pub client: String,
    pub status: String,
    pub sub_status: Option<String>,
    pub assignee: String,
    pub priority: String,
    pub progress: ProgressBucket,
    pub search: String,
    pub range: DateRangePreset,
    pub custom_range: (Option<DateTime<Utc>>, Option<DateTime<Utc>>),
    pub overdue_only: bool,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            team: ALL_TEAMS.to_string(),
            client: ALL_CLIENTS.to_string(),
            status: ALL_STATUSES.to_string(),
            sub_status: None,
            assignee: ALL_ASSIGNEES.to_string(),
            priority: ALL_PRIORITIES.to_string(),
            progress: ProgressBucket::All,
            search: String::new(),
            range: DateRangePreset::All,
            custom_range: (None, None),
            overdue_only: false,
        }
    }
}

/// Everything that affects presentation but not business data. Holds at most
/// a copy of a task for editing, never a live link into the entity store,
/// and none of it survives a reload.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub filters: Filters,
    pub selected: Option<Task>,
    pub edit_modal_open: bool,
    /// Status pair pre-filled into the edit form when the modal opens.
    pub edit_status: (String, String),
    pub open_dropdown: Option<String>,
}

#[derive(Debug, Clone)]
pub enum UiAction {
    SetTeamFilter(String),
    SetClientFilter(String),
    SetStatusFilter {
        status: String,
        sub_status: Option<String>,
    },
    SetAssigneeFilter(String),
    SetPriorityFilter(String),
    SetProgressFilter(ProgressBucket),
    SetSearch(String),
    SetDateRange(DateRangePreset),
    SetCustomRange(Option<DateTime<Utc>>, Option<DateTime<Utc>>),
    SetOverdueOnly(bool),
    ClearFilters,

    ToggleDropdown(String),
    CloseDropdowns,

    /// Compound: selects the task (by copy), pre-fills the status pair, and
    /// opens the modal in one step so "modal open without selection" is
    /// unreachable.
    OpenEditModal(Task),
    CloseEditModal,
}

#[tracing::instrument(skip(state, action))]
pub fn reduce_ui(state: &mut UiState, action: UiAction) {
    match action {
        UiAction::SetTeamFilter(team) => state.filters.team = team,
        UiAction::SetClientFilter(client) => state.filters.client = client,
        UiAction::SetStatusFilter { status, sub_status } => {
            state.filters.status = status;
            state.filters.sub_status = sub_status;
        }
        UiAction::SetAssigneeFilter(assignee) => state.filters.assignee = assignee,
        UiAction::SetPriorityFilter(priority) => state.filters.priority = priority,
        UiAction::SetProgressFilter(bucket) => state.filters.progress = bucket,
        UiAction::SetSearch(text) => state.filters.search = text,
        UiAction::SetDateRange(preset) => {
            state.filters.range = preset;
            if preset != DateRangePreset::Custom {
                state.filters.custom_range = (None, None);
            }
        }
        UiAction::SetCustomRange(start, end) => {
            state.filters.range = DateRangePreset::Custom;
            state.filters.custom_range = (start, end);
        }
        UiAction::SetOverdueOnly(flag) => state.filters.overdue_only = flag,
        UiAction::ClearFilters => state.filters = Filters::default(),

        UiAction::ToggleDropdown(name) => {
            if state.open_dropdown.as_deref() == Some(name.as_str()) {
                state.open_dropdown = None;
            } else {
                state.open_dropdown = Some(name);
            }
        }
        UiAction::CloseDropdowns => state.open_dropdown = None,

        UiAction::OpenEditModal(task) => {
            debug!(id = %task.id, "edit modal opened");
            state.edit_status = (task.status.clone(), task.sub_status.clone());
            state.selected = Some(task);
            state.edit_modal_open = true;
        }
        UiAction::CloseEditModal => {
            state.selected = None;
            state.edit_status = (String::new(), String::new());
            state.edit_modal_open = false;
        }
    }
}
