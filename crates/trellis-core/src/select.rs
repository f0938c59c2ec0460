use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::datetime::{in_range, resolve_range};
use crate::store::TaskState;
use crate::task::{Priority, Task};
use crate::ui_state::{ALL_ASSIGNEES, ALL_CLIENTS, ALL_PRIORITIES, ALL_STATUSES, Filters};

/// Single-slot cache keyed by input identity. Unchanged inputs return a
/// clone of the cached value; callers hand in `Rc`-wrapped values when they
/// want the stable-reference contract.
#[derive(Debug)]
pub struct Memo<K, V> {
    slot: Option<(K, V)>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<K: PartialEq, V: Clone> Memo<K, V> {
    pub fn get_or_compute(&mut self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some((cached_key, value)) = &self.slot
            && *cached_key == key
        {
            trace!("memo hit");
            return value.clone();
        }
        let value = compute();
        self.slot = Some((key, value.clone()));
        value
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub not_started: usize,
    pub overdue: usize,
}

#[derive(Debug, PartialEq)]
struct FilteredKey {
    revision: u64,
    filters: Filters,
    now: DateTime<Utc>,
}

/// Memoized query surface over the entity store. Each selector recomputes
/// only when the store revision or its parameters change; otherwise the
/// previously returned allocation comes back, so the rendering side can
/// short-circuit on pointer equality.
#[derive(Debug, Default)]
pub struct Selectors {
    filtered: Memo<FilteredKey, Rc<Vec<Task>>>,
    stats: Memo<(u64, DateTime<Utc>), TaskStats>,
    grouped: Memo<u64, Rc<BTreeMap<String, Vec<Task>>>>,
}

impl Selectors {
    /// Fixed narrowing pipeline: client, status(+sub), assignee, priority,
    /// search, overdue, then the progress/date-range view filters. The steps
    /// are pure intersections, so the order is a clarity choice, not a
    /// semantic one.
    pub fn filtered(
        &mut self,
        state: &TaskState,
        filters: &Filters,
        now: DateTime<Utc>,
    ) -> Rc<Vec<Task>> {
        let key = FilteredKey {
            revision: state.revision,
            filters: filters.clone(),
            now,
        };
        self.filtered.get_or_compute(key, || {
            let mut tasks = by_client(state.tasks.clone(), &filters.client);
            tasks = by_status(tasks, &filters.status, filters.sub_status.as_deref());
            tasks = by_assignee(tasks, &filters.assignee);
            tasks = by_priority(tasks, &filters.priority);
            tasks = search(tasks, &filters.search);
            if filters.overdue_only {
                tasks = overdue(tasks, now);
            }
            tasks.retain(|task| filters.progress.matches(task.progress));
            if let Some(range) = resolve_range(filters.range, now, filters.custom_range) {
                tasks.retain(|task| in_range(task.due, range));
            }
            Rc::new(tasks)
        })
    }

    pub fn stats(&mut self, state: &TaskState, now: DateTime<Utc>) -> TaskStats {
        self.stats
            .get_or_compute((state.revision, now), || compute_stats(&state.tasks, now))
    }

    /// Partitions every task into exactly one bucket keyed by sub-status;
    /// the board materializes its columns from this.
    pub fn grouped_by_sub_status(&mut self, state: &TaskState) -> Rc<BTreeMap<String, Vec<Task>>> {
        self.grouped.get_or_compute(state.revision, || {
            let mut groups: BTreeMap<String, Vec<Task>> = BTreeMap::new();
            for task in &state.tasks {
                groups
                    .entry(task.sub_status.clone())
                    .or_default()
                    .push(task.clone());
            }
            Rc::new(groups)
        })
    }
}

pub fn by_client(tasks: Vec<Task>, client: &str) -> Vec<Task> {
    if client == ALL_CLIENTS {
        return tasks;
    }
    tasks.into_iter().filter(|t| t.client == client).collect()
}

/// Main-status match, narrowed further by sub-status when one is supplied.
pub fn by_status(tasks: Vec<Task>, status: &str, sub_status: Option<&str>) -> Vec<Task> {
    if status == ALL_STATUSES {
        return tasks;
    }
    tasks
        .into_iter()
        .filter(|t| t.status == status && sub_status.is_none_or(|sub| t.sub_status == sub))
        .collect()
}

pub fn by_assignee(tasks: Vec<Task>, assignee: &str) -> Vec<Task> {
    if assignee == ALL_ASSIGNEES {
        return tasks;
    }
    tasks.into_iter().filter(|t| t.assignee == assignee).collect()
}

pub fn by_priority(tasks: Vec<Task>, priority: &str) -> Vec<Task> {
    if priority == ALL_PRIORITIES {
        return tasks;
    }
    let Some(wanted) = Priority::parse(priority) else {
        // An unparseable priority matches nothing rather than everything.
        return vec![];
    };
    tasks.into_iter().filter(|t| t.priority == wanted).collect()
}

/// Case-insensitive substring match across title, description, client and
/// assignee; an empty term keeps everything.
pub fn search(tasks: Vec<Task>, term: &str) -> Vec<Task> {
    if term.is_empty() {
        return tasks;
    }
    let needle = term.to_lowercase();
    tasks
        .into_iter()
        .filter(|t| {
            t.title.to_lowercase().contains(&needle)
                || t.description.to_lowercase().contains(&needle)
                || t.client.to_lowercase().contains(&needle)
                || t.assignee.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn overdue(tasks: Vec<Task>, now: DateTime<Utc>) -> Vec<Task> {
    tasks.into_iter().filter(|t| t.is_overdue(now)).collect()
}

fn compute_stats(tasks: &[Task], now: DateTime<Utc>) -> TaskStats {
    let mut stats = TaskStats::default();
    for task in tasks {
        stats.total += 1;
        match task.progress {
            0 => stats.not_started += 1,
            100 => stats.completed += 1,
            _ => stats.in_progress += 1,
        }
        if task.is_overdue(now) {
            stats.overdue += 1;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use chrono::{Duration, TimeZone, Utc};

    use super::{Selectors, by_assignee, by_client, by_priority, by_status, overdue, search};
    use crate::store::{TaskAction, TaskState, reduce};
    use crate::task::{Priority, Task};
    use crate::ui_state::Filters;

    fn fixed_now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 16, 5, 0, 0).unwrap()
    }

    fn board() -> Vec<Task> {
        let now = fixed_now();
        let mut tasks = vec![];
        for (title, client, assignee, priority, sub, progress) in [
            ("script teaser", "Acme Media", "Dana", Priority::High, "Scripting", 20),
            ("shoot interview", "Acme Media", "Lee", Priority::Medium, "Filming", 0),
            ("grade footage", "Borealis", "Dana", Priority::Low, "Editing", 100),
            ("publish cut", "Borealis", "Sam", Priority::High, "Editing", 60),
        ] {
            let mut task = Task::new(title.to_string(), now);
            task.client = client.to_string();
            task.assignee = assignee.to_string();
            task.priority = priority;
            task.status = if sub == "Scripting" {
                "Pre-Production".to_string()
            } else {
                "Production".to_string()
            };
            task.sub_status = sub.to_string();
            task.progress = progress;
            task.due = now + Duration::days(1);
            tasks.push(task);
        }
        tasks
    }

    #[test]
    fn sentinel_values_disable_each_filter() {
        let tasks = board();
        assert_eq!(by_client(tasks.clone(), "All Clients").len(), 4);
        assert_eq!(by_status(tasks.clone(), "All Statuses", None).len(), 4);
        assert_eq!(by_assignee(tasks.clone(), "All Assignees").len(), 4);
        assert_eq!(by_priority(tasks, "All Priorities").len(), 4);
    }

    #[test]
    fn status_filter_supports_two_level_matching() {
        let tasks = board();
        let main_only = by_status(tasks.clone(), "Production", None);
        assert_eq!(main_only.len(), 3);

        let with_sub = by_status(tasks, "Production", Some("Editing"));
        assert_eq!(with_sub.len(), 2);
        assert!(with_sub.iter().all(|t| t.sub_status == "Editing"));
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let tasks = board();
        assert_eq!(search(tasks.clone(), "ACME").len(), 2); // client
        assert_eq!(search(tasks.clone(), "dana").len(), 2); // assignee
        assert_eq!(search(tasks.clone(), "teaser").len(), 1); // title
        assert_eq!(search(tasks, "no such thing").len(), 0);
    }

    #[test]
    fn completed_tasks_are_never_overdue() {
        let now = fixed_now();
        let mut tasks = board();
        for task in &mut tasks {
            task.due = now - Duration::hours(1);
        }
        let late = overdue(tasks, now);
        assert_eq!(late.len(), 3);
        assert!(late.iter().all(|t| t.progress < 100));
    }

    #[test]
    fn filter_pipeline_is_order_independent() {
        let tasks = board();
        let fixed = by_priority(
            by_assignee(
                by_status(by_client(tasks.clone(), "Acme Media"), "Production", None),
                "Lee",
            ),
            "Medium",
        );
        let shuffled = by_client(
            by_status(
                by_priority(by_assignee(tasks, "Lee"), "Medium"),
                "Production",
                None,
            ),
            "Acme Media",
        );
        assert_eq!(fixed, shuffled);
        assert_eq!(fixed.len(), 1);
        assert_eq!(fixed[0].title, "shoot interview");
    }

    #[test]
    fn stats_bucket_every_task_once() {
        let state = TaskState::with_tasks(board());
        let mut selectors = Selectors::default();
        let stats = selectors.stats(&state, fixed_now());

        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.in_progress, 2);
        assert_eq!(stats.not_started, 1);
        assert_eq!(
            stats.completed + stats.in_progress + stats.not_started,
            stats.total
        );
        assert_eq!(stats.overdue, 0);
    }

    #[test]
    fn grouping_partitions_the_whole_collection() {
        let state = TaskState::with_tasks(board());
        let mut selectors = Selectors::default();
        let groups = selectors.grouped_by_sub_status(&state);

        let grouped_total: usize = groups.values().map(Vec::len).sum();
        assert_eq!(grouped_total, state.tasks.len());
        for task in &state.tasks {
            let bucket = groups.get(&task.sub_status).expect("bucket exists");
            assert_eq!(bucket.iter().filter(|t| t.id == task.id).count(), 1);
        }
    }

    #[test]
    fn unchanged_inputs_return_the_same_allocation() {
        let mut state = TaskState::with_tasks(board());
        let filters = Filters::default();
        let now = fixed_now();
        let mut selectors = Selectors::default();

        let first = selectors.filtered(&state, &filters, now);
        let second = selectors.filtered(&state, &filters, now);
        assert!(Rc::ptr_eq(&first, &second));

        let task = Task::new("new work".to_string(), now);
        reduce(&mut state, TaskAction::Add(task));
        let third = selectors.filtered(&state, &filters, now);
        assert!(!Rc::ptr_eq(&second, &third));
        assert_eq!(third.len(), 5);
    }
}
