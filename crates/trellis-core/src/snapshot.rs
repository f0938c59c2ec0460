use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::task::Task;

const BOARD_FILE: &str = "board.data";

/// JSONL snapshot of the task collection on disk. This is the local
/// stand-in for the remote backend: the CLI writes through it and the sync
/// loop reads from it.
#[derive(Debug)]
pub struct SnapshotStore {
    pub data_dir: PathBuf,
    pub board_path: PathBuf,
}

impl SnapshotStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let board_path = data_dir.join(BOARD_FILE);
        if !board_path.exists() {
            fs::write(&board_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            board = %board_path.display(),
            "opened snapshot store"
        );

        Ok(Self {
            data_dir,
            board_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> anyhow::Result<Vec<Task>> {
        load_jsonl(&self.board_path).context("failed to load board.data")
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.board_path, tasks).context("failed to save board.data")
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<Task>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let task: Task = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(task);
    }

    debug!(count = out.len(), "loaded tasks from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, tasks))]
fn save_jsonl_atomic(path: &Path, tasks: &[Task]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = tasks.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for task in tasks {
        let serialized = serde_json::to_string(task)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use super::SnapshotStore;
    use crate::task::Task;

    #[test]
    fn roundtrips_tasks_and_tolerates_blank_lines() {
        let temp = tempdir().expect("tempdir");
        let store = SnapshotStore::open(temp.path()).expect("open store");

        let now = Utc.with_ymd_and_hms(2026, 2, 16, 5, 0, 0).unwrap();
        let mut task = Task::new("storyboard".to_string(), now);
        task.tags = vec!["video".to_string()];
        store.save(&[task.clone()]).expect("save");

        std::fs::write(
            &store.board_path,
            format!("{}\n\n", serde_json::to_string(&task).expect("serialize")),
        )
        .expect("rewrite with blank line");

        let loaded = store.load().expect("load");
        assert_eq!(loaded, vec![task]);
    }
}
