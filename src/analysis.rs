//! Log analysis: turns the append-only session log back into records and
//! aggregates them into a [`Report`].

use std::{collections::HashMap, fmt, fs, path::Path};

use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};

use crate::{
    error::{PomoError, Result},
    record::{COMMENT_MARKER, SESSION_MINUTES, SessionRecord, parse_timestamp},
};

/// How many days before today the activity histogram reaches back.
pub const HISTORY_DAYS: u32 = 5;
pub const NO_LONGEST_TASK: &str = "No task longer than 0 minutes";

// ============================================================================
// Parsing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogWarning {
    /// Non-blank line count was not a multiple of three; `discarded` trailing
    /// lines were dropped.
    InvalidLineCount { lines: usize, discarded: usize },
}

impl fmt::Display for LogWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLineCount { .. } => write!(
                f,
                "Log file contains invalid number of lines. Trying to proceed anyway."
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLog {
    pub records: Vec<SessionRecord>,
    pub warnings: Vec<LogWarning>,
}

pub fn parse_log<I, S>(lines: I) -> Result<ParsedLog>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let data: Vec<(usize, String)> = lines
        .into_iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with(COMMENT_MARKER) {
                None
            } else {
                Some((idx + 1, line.to_string()))
            }
        })
        .collect();

    let mut warnings = Vec::new();
    let discarded = data.len() % 3;
    if discarded != 0 {
        warn!(lines = data.len(), discarded, "log has an incomplete trailing entry");
        warnings.push(LogWarning::InvalidLineCount {
            lines: data.len(),
            discarded,
        });
    }

    let records = data
        .chunks_exact(3)
        .map(|group| {
            let (_, task) = &group[0];
            let start = timestamp_at(&group[1])?;
            let end = timestamp_at(&group[2])?;
            Ok(SessionRecord::from_log(task, start, end))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(records = records.len(), "parsed session log");
    Ok(ParsedLog { records, warnings })
}

fn timestamp_at((line, value): &(usize, String)) -> Result<chrono::NaiveDateTime> {
    parse_timestamp(value).ok_or_else(|| PomoError::MalformedTimestamp {
        line: *line,
        value: value.clone(),
    })
}

pub fn read_log(path: &Path) -> Result<ParsedLog> {
    let content = fs::read_to_string(path).map_err(|source| PomoError::LogUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_log(content.lines())
}

// ============================================================================
// Aggregation
// ============================================================================

/// How much time a single pomodoro contributes to the totals.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DurationPolicy {
    /// The measured `end - start` of each record.
    #[default]
    Measured,
    /// A fixed 25 minutes per record, whatever was measured.
    Nominal,
}

impl DurationPolicy {
    fn duration_of(self, record: &SessionRecord) -> TimeDelta {
        match self {
            Self::Measured => record.duration(),
            Self::Nominal => TimeDelta::minutes(SESSION_MINUTES as i64),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TaskSummary {
    pub task: String,
    pub count: u32,
    #[serde(rename = "total_secs", serialize_with = "as_seconds")]
    pub total: TimeDelta,
    pub last_date: NaiveDate,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DailyTaskSummary {
    pub task: String,
    pub date: NaiveDate,
    pub count: u32,
    #[serde(rename = "total_secs", serialize_with = "as_seconds")]
    pub total: TimeDelta,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LongestTask {
    pub task: String,
    #[serde(rename = "total_secs", serialize_with = "as_seconds")]
    pub total: TimeDelta,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DayActivity {
    pub days_ago: u32,
    pub date: NaiveDate,
    pub pomodoros: u32,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub today: NaiveDate,
    pub policy: DurationPolicy,
    pub tasks: Vec<TaskSummary>,
    pub daily: Vec<DailyTaskSummary>,
    #[serde(rename = "total_today_secs", serialize_with = "as_seconds")]
    pub total_today: TimeDelta,
    #[serde(rename = "total_secs", serialize_with = "as_seconds")]
    pub total: TimeDelta,
    pub longest: LongestTask,
    /// Index `n` holds the day `n` days before `today`, for `0..=HISTORY_DAYS`.
    pub last_days: Vec<DayActivity>,
}

impl Report {
    pub fn task(&self, name: &str) -> Option<&TaskSummary> {
        self.tasks.iter().find(|t| t.task == name)
    }
}

fn as_seconds<S: Serializer>(delta: &TimeDelta, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_i64(delta.num_seconds())
}

pub fn summarize(records: &[SessionRecord], today: NaiveDate, policy: DurationPolicy) -> Report {
    // Vecs keep first-seen order; the maps point into them.
    let mut tasks: Vec<TaskSummary> = Vec::new();
    let mut task_index: HashMap<&str, usize> = HashMap::new();
    let mut daily: Vec<DailyTaskSummary> = Vec::new();
    let mut daily_index: HashMap<(&str, NaiveDate), usize> = HashMap::new();
    let mut total_today = TimeDelta::zero();

    let mut last_days: Vec<DayActivity> = (0..=HISTORY_DAYS)
        .map(|days_ago| DayActivity {
            days_ago,
            date: today - TimeDelta::days(days_ago as i64),
            pomodoros: 0,
        })
        .collect();

    for record in records {
        let delta = policy.duration_of(record);
        let date = record.end_date();

        match task_index.get(record.task.as_str()) {
            Some(&idx) => {
                let summary = &mut tasks[idx];
                summary.count += 1;
                summary.total = summary.total + delta;
                summary.last_date = summary.last_date.max(date);
            }
            None => {
                task_index.insert(record.task.as_str(), tasks.len());
                tasks.push(TaskSummary {
                    task: record.task.clone(),
                    count: 1,
                    total: delta,
                    last_date: date,
                });
            }
        }

        match daily_index.get(&(record.task.as_str(), date)) {
            Some(&idx) => {
                let day = &mut daily[idx];
                day.count += 1;
                day.total = day.total + delta;
            }
            None => {
                daily_index.insert((record.task.as_str(), date), daily.len());
                daily.push(DailyTaskSummary {
                    task: record.task.clone(),
                    date,
                    count: 1,
                    total: delta,
                });
            }
        }

        if date == today {
            total_today = total_today + delta;
        }

        let days_ago = (today - date).num_days();
        if (0..=HISTORY_DAYS as i64).contains(&days_ago) {
            last_days[days_ago as usize].pomodoros += 1;
        }
    }

    let total = tasks.iter().fold(TimeDelta::zero(), |acc, t| acc + t.total);

    let mut longest = LongestTask {
        task: NO_LONGEST_TASK.into(),
        total: TimeDelta::zero(),
    };
    for summary in &tasks {
        // Strict comparison keeps the earliest task on ties.
        if summary.total > longest.total {
            longest = LongestTask {
                task: summary.task.clone(),
                total: summary.total,
            };
        }
    }

    Report {
        today,
        policy,
        tasks,
        daily,
        total_today,
        total,
        longest,
        last_days,
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Formats like `H:MM:SS`, hours unbounded.
pub fn format_delta(delta: TimeDelta) -> String {
    let secs = delta.num_seconds().max(0);
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub fn render_report(report: &Report) -> String {
    let mut out = String::new();

    out.push_str("Task summary [pomos]\n");
    out.push_str("--------------------\n");
    for task in &report.tasks {
        out.push_str(&format!("{} [{}]\n", task.task, task.count));
    }
    out.push('\n');

    out.push_str("Last 5 days\n");
    out.push_str("-----------\n");
    for day in report.last_days.iter().rev().filter(|d| d.pomodoros > 0) {
        out.push_str(&format!("{} [{}]\n", day.date.format("%Y-%m-%d"), day.pomodoros));
    }

    out.push_str("\nTime summary\n");
    out.push_str("------------\n");
    out.push_str(&format!("Total time for today: {}\n", format_delta(report.total_today)));
    out.push_str(&format!("Total time: {}\n", format_delta(report.total)));
    out.push_str(&format!(
        "Longest task: {} at {}\n",
        report.longest.task,
        format_delta(report.longest.total)
    ));

    out
}
