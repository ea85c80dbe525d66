//! Partitioning of the task list into display buckets.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use smartdo_proto::task::{Priority, Task};

/// One of the mutually exclusive display partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Due before today.
    Overdue,
    /// Due today, or undated and high priority.
    DueToday,
    /// Due after today, or undated and not high priority.
    Upcoming,
    /// Completed, regardless of due date.
    Completed,
}

impl Bucket {
    /// All buckets in display order.
    pub const ALL: [Self; 4] = [Self::Overdue, Self::DueToday, Self::Upcoming, Self::Completed];

    /// Section heading used by the CLI.
    #[must_use]
    pub const fn heading(&self) -> &'static str {
        match self {
            Self::Overdue => "Critical Attention",
            Self::DueToday => "Action Plan (Today)",
            Self::Upcoming => "On The Horizon",
            Self::Completed => "Recently Completed",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overdue => write!(f, "overdue"),
            Self::DueToday => write!(f, "today"),
            Self::Upcoming => write!(f, "upcoming"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overdue" => Ok(Self::Overdue),
            "today" | "due-today" => Ok(Self::DueToday),
            "upcoming" => Ok(Self::Upcoming),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(format!("unknown bucket: {other}")),
        }
    }
}

/// Start of today and start of tomorrow in the caller's time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBounds {
    /// Local midnight today.
    pub start: DateTime<Utc>,
    /// Local midnight tomorrow; the end of today is exclusive of this.
    pub next_start: DateTime<Utc>,
}

impl DayBounds {
    /// Computes the bounds of the local day containing `now`.
    #[must_use]
    pub fn containing<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let tomorrow = today.succ_opt().unwrap_or(today);
        Self {
            start: local_midnight(&tz, today),
            next_start: local_midnight(&tz, tomorrow),
        }
    }

    /// Which bucket an unfinished task belongs to.
    #[must_use]
    pub fn bucket_of(&self, task: &Task) -> Bucket {
        if task.is_completed {
            return Bucket::Completed;
        }
        match task.due_date {
            None if task.priority == Priority::High => Bucket::DueToday,
            None => Bucket::Upcoming,
            Some(due) if due < self.start => Bucket::Overdue,
            Some(due) if due < self.next_start => Bucket::DueToday,
            Some(_) => Bucket::Upcoming,
        }
    }
}

/// First valid local instant of `date`.
///
/// When a DST jump skips midnight the day starts at the end of the gap
/// (e.g. 01:00 local).
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    (0..MINUTES_PER_DAY)
        .map(|m| naive + Duration::minutes(m))
        .find_map(|candidate| tz.from_local_datetime(&candidate).earliest())
        .map_or_else(|| naive.and_utc(), |dt| dt.with_timezone(&Utc))
}

const MINUTES_PER_DAY: i64 = 24 * 60;

/// The classified task list, borrowing from the source list.
#[derive(Debug, Default, Clone)]
pub struct Buckets<'a> {
    /// Overdue tasks, by `order`.
    pub overdue: Vec<&'a Task>,
    /// Tasks for today, by `order`.
    pub due_today: Vec<&'a Task>,
    /// Later tasks, by `order`.
    pub upcoming: Vec<&'a Task>,
    /// Completed tasks, newest `created_at` first.
    pub completed: Vec<&'a Task>,
}

impl<'a> Buckets<'a> {
    /// Contents of one bucket.
    #[must_use]
    pub fn bucket(&self, bucket: Bucket) -> &[&'a Task] {
        match bucket {
            Bucket::Overdue => &self.overdue,
            Bucket::DueToday => &self.due_today,
            Bucket::Upcoming => &self.upcoming,
            Bucket::Completed => &self.completed,
        }
    }

    /// Completed tasks shown in the "recently completed" section.
    ///
    /// Sorted by creation time since completion time is not tracked.
    #[must_use]
    pub fn recent_completed(&self, cap: usize) -> &[&'a Task] {
        &self.completed[..self.completed.len().min(cap)]
    }

    /// How many completed tasks are hidden by `cap`.
    #[must_use]
    pub const fn hidden_completed(&self, cap: usize) -> usize {
        self.completed.len().saturating_sub(cap)
    }

    /// Number of tasks to focus on today (overdue + today).
    #[must_use]
    pub const fn focus_count(&self) -> usize {
        self.overdue.len() + self.due_today.len()
    }
}

/// Partitions `tasks` into buckets relative to `now`'s local day.
///
/// Completed tasks go to `completed`. Otherwise: undated high-priority tasks
/// are due today, other undated tasks are upcoming, and dated tasks are
/// overdue / today / upcoming by comparison with today's bounds (both ends
/// inclusive at millisecond precision). Active buckets sort by `order`.
#[must_use]
pub fn classify<'a, Tz: TimeZone>(tasks: &'a [Task], now: &DateTime<Tz>) -> Buckets<'a> {
    let bounds = DayBounds::containing(now);
    let mut buckets = Buckets::default();
    for task in tasks {
        match bounds.bucket_of(task) {
            Bucket::Overdue => buckets.overdue.push(task),
            Bucket::DueToday => buckets.due_today.push(task),
            Bucket::Upcoming => buckets.upcoming.push(task),
            Bucket::Completed => buckets.completed.push(task),
        }
    }
    for active in [&mut buckets.overdue, &mut buckets.due_today, &mut buckets.upcoming] {
        active.sort_by(|a, b| a.order.total_cmp(&b.order));
    }
    buckets
        .completed
        .sort_by(|a, b| b.created_at.cmp(&a.created_at));
    buckets
}

/// Overall completion figures for the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardStats {
    /// Number of tasks.
    pub total: usize,
    /// Number of completed tasks.
    pub done: usize,
    /// Rounded completion percentage, 0 for an empty list.
    pub percent: usize,
}

impl BoardStats {
    /// Computes the figures for `tasks`.
    #[must_use]
    pub fn of(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let done = tasks.iter().filter(|t| t.is_completed).count();
        let percent = if total == 0 {
            0
        } else {
            (done * 100 + total / 2) / total
        };
        Self {
            total,
            done,
            percent,
        }
    }
}
