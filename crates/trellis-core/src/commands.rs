use std::path::Path;

use anyhow::{anyhow, bail};
use chrono::Utc;

use crate::cli::Command;
use crate::config::Config;
use crate::datetime::{DateRangePreset, parse_date};
use crate::invoice::{Discount, LineItem, compute_totals};
use crate::remote::{self, FileRemote, TaskCreate, TaskPatch};
use crate::render::Renderer;
use crate::select::Selectors;
use crate::snapshot::SnapshotStore;
use crate::store::{TaskAction, TaskState, reduce};
use crate::sync::{FileSyncSource, SyncLoop, sync_status};
use crate::task::{Priority, Task};
use crate::ui_state::{ProgressBucket, UiAction, UiState, reduce_ui};

#[tracing::instrument(skip(cfg, renderer, data_dir, command))]
pub fn dispatch(
    cfg: &Config,
    renderer: &mut Renderer,
    data_dir: &Path,
    command: Command,
) -> anyhow::Result<()> {
    let tenant = cfg.get("tenant").unwrap_or_else(|| "default".to_string());
    let mut remote = FileRemote::open(data_dir, tenant)?;
    let now = Utc::now();

    match command {
        Command::Add {
            title,
            description,
            assignee,
            client,
            priority,
            due,
            status,
            sub_status,
            tags,
        } => {
            let priority =
                Priority::parse(&priority).ok_or_else(|| anyhow!("invalid priority: {priority}"))?;
            let due = due.as_deref().map(parse_date).transpose()?;

            let mut state = TaskState::default();
            remote::create_task(
                &mut state,
                &mut remote,
                TaskCreate {
                    title,
                    description,
                    assignee,
                    client,
                    priority,
                    due,
                    status,
                    sub_status,
                    tags,
                },
            );
            fail_on_error(&state)?;
            renderer.print_task_table(&state.tasks, now)?;
        }

        Command::List {
            client,
            status,
            sub_status,
            assignee,
            priority,
            search,
            overdue,
            progress,
            range,
        } => {
            let state = load_state(&mut remote)?;

            let mut ui = UiState::default();
            if let Some(client) = client {
                reduce_ui(&mut ui, UiAction::SetClientFilter(client));
            }
            if let Some(status) = status {
                reduce_ui(&mut ui, UiAction::SetStatusFilter { status, sub_status });
            }
            if let Some(assignee) = assignee {
                reduce_ui(&mut ui, UiAction::SetAssigneeFilter(assignee));
            }
            if let Some(priority) = priority {
                reduce_ui(&mut ui, UiAction::SetPriorityFilter(priority));
            }
            if let Some(search) = search {
                reduce_ui(&mut ui, UiAction::SetSearch(search));
            }
            if overdue {
                reduce_ui(&mut ui, UiAction::SetOverdueOnly(true));
            }
            if let Some(bucket) = progress {
                reduce_ui(&mut ui, UiAction::SetProgressFilter(parse_bucket(&bucket)?));
            }
            if let Some(preset) = range {
                reduce_ui(
                    &mut ui,
                    UiAction::SetDateRange(DateRangePreset::parse(&preset)?),
                );
            }

            let mut selectors = Selectors::default();
            let tasks = selectors.filtered(&state, &ui.filters, now);
            renderer.print_task_table(&tasks, now)?;
        }

        Command::Edit {
            id,
            title,
            description,
            assignee,
            client,
            priority,
            due,
            progress,
            status,
            sub_status,
        } => {
            let mut state = load_state(&mut remote)?;
            let id = resolve_id(&state.tasks, &id)?;

            let priority = priority
                .map(|p| Priority::parse(&p).ok_or_else(|| anyhow!("invalid priority: {p}")))
                .transpose()?;
            let due = due.as_deref().map(parse_date).transpose()?;

            remote::update_task(
                &mut state,
                &mut remote,
                &id,
                TaskPatch {
                    title,
                    description,
                    assignee,
                    client,
                    priority,
                    due,
                    progress,
                    status,
                    sub_status,
                    tags: None,
                    counter: None,
                },
            );
            fail_on_error(&state)?;
            let edited: Vec<Task> = state.task(&id).cloned().into_iter().collect();
            renderer.print_task_table(&edited, now)?;
        }

        Command::Remove { id } => {
            let mut state = load_state(&mut remote)?;
            let id = resolve_id(&state.tasks, &id)?;
            remote::delete_task(&mut state, &mut remote, &id);
            fail_on_error(&state)?;
        }

        Command::Move { id, to_index } => {
            // Reordering is board-local: mutate through the reducer and
            // persist the new order directly.
            let store = SnapshotStore::open(data_dir)?;
            let mut state = TaskState::with_tasks(store.load()?);
            let id = resolve_id(&state.tasks, &id)?;
            reduce(&mut state, TaskAction::Move { id, to_index });
            store.save(&state.tasks)?;
            renderer.print_task_table(&state.tasks, now)?;
        }

        Command::Board => {
            let state = load_state(&mut remote)?;
            let mut selectors = Selectors::default();
            let groups = selectors.grouped_by_sub_status(&state);
            renderer.print_board(groups.iter())?;
        }

        Command::Stats => {
            let state = load_state(&mut remote)?;
            let realtime = cfg.get_bool("sync.realtime").unwrap_or(true);
            let mut selectors = Selectors::default();
            let stats = selectors.stats(&state, now);
            renderer.print_stats(stats, sync_status(&state, realtime, now))?;
        }

        Command::Sync => {
            let realtime = cfg.get_bool("sync.realtime").unwrap_or(true);
            let mut state = TaskState::default();
            let mut listener = SyncLoop::new(
                cfg.get_i64("sync.interval_secs")
                    .unwrap_or(crate::sync::DEFAULT_SYNC_INTERVAL_SECS),
            );
            if !realtime {
                listener.disable();
            }

            let mut source = FileSyncSource::open(data_dir)?;
            listener.tick(&mut state, &mut source, now);
            fail_on_error(&state)?;

            let mut selectors = Selectors::default();
            let stats = selectors.stats(&state, now);
            renderer.print_stats(stats, sync_status(&state, realtime, now))?;
        }

        Command::Invoice {
            discount_percent,
            discount_fixed,
            tax,
        } => {
            let discount = match (discount_percent, discount_fixed) {
                (Some(_), Some(_)) => {
                    bail!("choose either --discount-percent or --discount-fixed, not both")
                }
                (Some(pct), None) => Some(Discount::Percent(pct)),
                (None, Some(amount)) => Some(Discount::Fixed(amount)),
                (None, None) => Some(Discount::Percent(10.0)),
            };

            let items = sample_line_items();
            let totals = compute_totals(&items, discount, tax);
            renderer.print_invoice(&items, totals)?;
        }
    }

    Ok(())
}

fn load_state(remote: &mut FileRemote) -> anyhow::Result<TaskState> {
    let mut state = TaskState::default();
    remote::fetch_tasks(&mut state, remote);
    fail_on_error(&state)?;
    Ok(state)
}

/// Reducer failures are data, not exceptions; the CLI boundary is where they
/// become a non-zero exit.
fn fail_on_error(state: &TaskState) -> anyhow::Result<()> {
    if let Some(error) = &state.error {
        bail!("{error}");
    }
    Ok(())
}

/// Accepts a full id or an unambiguous prefix (the table prints the first
/// eight characters).
fn resolve_id(tasks: &[Task], input: &str) -> anyhow::Result<String> {
    let matches: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.id.starts_with(input))
        .collect();
    match matches.as_slice() {
        [] => Err(anyhow!("no task matches id {input}")),
        [task] => Ok(task.id.clone()),
        _ => Err(anyhow!("id prefix {input} is ambiguous")),
    }
}

fn parse_bucket(value: &str) -> anyhow::Result<ProgressBucket> {
    match value.to_ascii_lowercase().as_str() {
        "all" => Ok(ProgressBucket::All),
        "not-started" => Ok(ProgressBucket::NotStarted),
        "in-progress" => Ok(ProgressBucket::InProgress),
        "completed" => Ok(ProgressBucket::Completed),
        other => Err(anyhow!("unknown progress bucket: {other}")),
    }
}

fn sample_line_items() -> Vec<LineItem> {
    vec![
        LineItem {
            description: "Brand film production".to_string(),
            quantity: 1.0,
            unit_price: 5000.0,
        },
        LineItem {
            description: "Motion graphics package".to_string(),
            quantity: 1.0,
            unit_price: 8000.0,
        },
        LineItem {
            description: "Licensed stock clips".to_string(),
            quantity: 20.0,
            unit_price: 150.0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{parse_bucket, resolve_id};
    use crate::task::Task;
    use crate::ui_state::ProgressBucket;

    #[test]
    fn id_prefix_resolution() {
        let now = Utc.with_ymd_and_hms(2026, 2, 16, 5, 0, 0).unwrap();
        let mut a = Task::new("a".to_string(), now);
        a.id = "abc123".to_string();
        let mut b = Task::new("b".to_string(), now);
        b.id = "abd456".to_string();
        let tasks = vec![a, b];

        assert_eq!(resolve_id(&tasks, "abc").expect("unique prefix"), "abc123");
        assert!(resolve_id(&tasks, "ab").is_err());
        assert!(resolve_id(&tasks, "zzz").is_err());
    }

    #[test]
    fn bucket_names_parse() {
        assert_eq!(
            parse_bucket("in-progress").expect("bucket"),
            ProgressBucket::InProgress
        );
        assert!(parse_bucket("half-done").is_err());
    }
}
