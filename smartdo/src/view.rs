//! Plain-text rendering of the board for the terminal.

use std::fmt::Display;

use chrono::{DateTime, TimeZone};
use smartdo_proto::task::{Priority, Subtask, Task};

use crate::tasks::{BoardStats, Bucket, DayBounds, classify};

/// Renders the bucketed board, most urgent first.
///
/// Empty active buckets are omitted. At most `completed_cap` completed
/// tasks are listed; the rest are summarized in one line.
#[must_use]
pub fn render_board<Tz>(tasks: &[Task], now: &DateTime<Tz>, completed_cap: usize) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let buckets = classify(tasks, now);
    let bounds = DayBounds::containing(now);
    let stats = BoardStats::of(tasks);
    let mut lines = vec![stats_line(&stats, buckets.focus_count())];

    for bucket in [Bucket::Overdue, Bucket::DueToday, Bucket::Upcoming] {
        let section = buckets.bucket(bucket);
        if section.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(format!("{} ({})", bucket.heading(), section.len()));
        for task in section {
            push_task(&mut lines, task, now, &bounds);
        }
    }

    let recent = buckets.recent_completed(completed_cap);
    if !recent.is_empty() {
        lines.push(String::new());
        lines.push(format!("{} ({})", Bucket::Completed.heading(), buckets.completed.len()));
        for task in recent {
            push_task(&mut lines, task, now, &bounds);
        }
        let hidden = buckets.hidden_completed(completed_cap);
        if hidden > 0 {
            lines.push(format!("  + {hidden} more completed tasks hidden"));
        }
    }

    if tasks.is_empty() {
        lines.push(String::new());
        lines.push("No tasks yet. Try: smartdo add \"dentist tomorrow at 3pm\"".to_string());
    }
    lines.join("\n")
}

fn stats_line(stats: &BoardStats, focus: usize) -> String {
    format!(
        "{}/{} done ({}%), {} to focus on today",
        stats.done, stats.total, stats.percent, focus
    )
}

fn push_task<Tz>(lines: &mut Vec<String>, task: &Task, now: &DateTime<Tz>, bounds: &DayBounds)
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let check = if task.is_completed { "[x]" } else { "[ ]" };
    let flag = if task.priority == Priority::High && !task.is_completed {
        "! "
    } else {
        ""
    };
    let mut meta = vec![task.priority.as_label().to_string()];
    if !task.category.is_empty() {
        meta.push(task.category.clone());
    }
    if let Some(due) = task.due_date {
        let local = due.with_timezone(&now.timezone());
        let when = if due >= bounds.start && due < bounds.next_start {
            format!("today {}", local.format("%H:%M"))
        } else {
            local.format("%a %b %-d %H:%M").to_string()
        };
        meta.push(when);
    }
    let progress = task.subtask_progress();
    if progress.total > 0 {
        meta.push(format!("{}/{} subtasks", progress.completed, progress.total));
    }
    lines.push(format!(
        "  {check} {flag}{}  ({})  #{}",
        task.title,
        meta.join(", "),
        task.id
    ));
    if let Some(description) = task.description.as_deref().filter(|d| !d.trim().is_empty()) {
        lines.push(format!("      {description}"));
    }
    push_subtasks(lines, &task.subtasks, 3);
}

fn push_subtasks(lines: &mut Vec<String>, subtasks: &[Subtask], depth: usize) {
    for subtask in subtasks {
        let check = if subtask.is_completed { "[x]" } else { "[ ]" };
        let indent = "  ".repeat(depth);
        let progress = subtask.progress();
        let counts = if progress.total > 0 {
            format!(" ({}/{})", progress.completed, progress.total)
        } else {
            String::new()
        };
        lines.push(format!("{indent}{check} {}{counts}  #{}", subtask.title, subtask.id));
        push_subtasks(lines, &subtask.subtasks, depth + 1);
    }
}
