use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Local, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::invoice::{InvoiceTotals, LineItem};
use crate::select::TaskStats;
use crate::sync::SyncStatus;
use crate::task::Task;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, tasks, now))]
    pub fn print_task_table(&mut self, tasks: &[Task], now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Due".to_string(),
            "Client".to_string(),
            "Assignee".to_string(),
            "Pri".to_string(),
            "Status".to_string(),
            "%".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());

        for task in tasks {
            let id = self.paint(&short_id(&task.id), "33");

            let due = task
                .due
                .with_timezone(&Local)
                .format("%Y-%m-%d")
                .to_string();
            let due = if task.is_overdue(now) {
                self.paint(&due, "31")
            } else {
                due
            };

            let status = if task.sub_status.is_empty() {
                task.status.clone()
            } else {
                format!("{}/{}", task.status, task.sub_status)
            };

            rows.push(vec![
                id,
                due,
                task.client.clone(),
                task.assignee.clone(),
                task.priority.label().to_string(),
                status,
                task.progress.to_string(),
                task.title.clone(),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    /// Board view: one column block per sub-status group.
    #[tracing::instrument(skip(self, groups))]
    pub fn print_board<'a, I>(&mut self, groups: I) -> anyhow::Result<()>
    where
        I: Iterator<Item = (&'a String, &'a Vec<Task>)>,
    {
        let mut out = io::stdout().lock();

        for (sub_status, tasks) in groups {
            let header = if sub_status.is_empty() {
                "(no sub-status)"
            } else {
                sub_status.as_str()
            };
            writeln!(out, "{} ({})", self.paint(header, "1;36"), tasks.len())?;
            for task in tasks {
                writeln!(
                    out,
                    "  {} {:>3}% {}",
                    self.paint(&short_id(&task.id), "33"),
                    task.progress,
                    task.title
                )?;
            }
            writeln!(out)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, stats, status))]
    pub fn print_stats(&mut self, stats: TaskStats, status: SyncStatus) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "total        {}", stats.total)?;
        writeln!(out, "completed    {}", stats.completed)?;
        writeln!(out, "in progress  {}", stats.in_progress)?;
        writeln!(out, "not started  {}", stats.not_started)?;
        let overdue = stats.overdue.to_string();
        let overdue = if stats.overdue > 0 {
            self.paint(&overdue, "31")
        } else {
            overdue
        };
        writeln!(out, "overdue      {overdue}")?;
        writeln!(out, "sync         {}", status.label())?;

        Ok(())
    }

    #[tracing::instrument(skip(self, items, totals))]
    pub fn print_invoice(
        &mut self,
        items: &[LineItem],
        totals: InvoiceTotals,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "Item".to_string(),
            "Qty".to_string(),
            "Unit".to_string(),
            "Amount".to_string(),
        ];
        let rows = items
            .iter()
            .map(|item| {
                vec![
                    item.description.clone(),
                    format!("{}", item.quantity),
                    format!("{:.2}", item.unit_price),
                    format!("{:.2}", item.amount()),
                ]
            })
            .collect();
        write_table(&mut out, headers, rows)?;

        writeln!(out)?;
        writeln!(out, "subtotal  {:>10.2}", totals.subtotal)?;
        writeln!(out, "discount  {:>10.2}", totals.discount_amount)?;
        writeln!(out, "taxable   {:>10.2}", totals.taxable)?;
        writeln!(out, "tax       {:>10.2}", totals.tax)?;
        writeln!(
            out,
            "total     {}",
            self.paint(&format!("{:>10.2}", totals.total), "1")
        )?;

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
