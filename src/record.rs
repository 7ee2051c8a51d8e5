//! Session records and the four-line log format they are stored in.

use std::{
    fs::OpenOptions,
    io::Write,
    path::Path,
};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::error::{PomoError, Result};

/// Length of one pomodoro. Not configurable.
pub const SESSION_MINUTES: u64 = 25;
pub const BREAK_MINUTES: u64 = 5;
/// Lines starting with this are skipped when the log is read back.
pub const COMMENT_MARKER: char = '#';
/// Label used when a session is started without a task name.
pub const DEFAULT_TASK: &str = "Pomodoro";
pub const TIMESTAMP_FMT: &str = "%Y/%m/%d %H:%M:%S";
const TIMESTAMP_FMT_MINUTES: &str = "%Y/%m/%d %H:%M";

/// One completed work interval, as written to and read back from the log.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub task: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl SessionRecord {
    /// Builds a record, normalising the task label. `end` is clamped so it
    /// never precedes `start`.
    pub fn new(task: Option<&str>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            task: task_label(task),
            start,
            end: end.max(start),
        }
    }

    /// Builds a record from a task line read back from the log. The label is
    /// kept verbatim so distinct historical labels stay distinct.
    pub fn from_log(task: &str, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            task: task.into(),
            start,
            end: end.max(start),
        }
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date()
    }

    /// The on-disk group: task, start, end and a blank separator line.
    pub fn to_log_entry(&self) -> String {
        format!(
            "{}\n{}\n{}\n\n",
            self.task,
            format_timestamp(&self.start),
            format_timestamp(&self.end)
        )
    }
}

/// Maps an absent or blank task to [`DEFAULT_TASK`] and folds the label onto
/// a single line without a leading [`COMMENT_MARKER`], so it cannot break the
/// log's line grouping.
pub fn task_label(task: Option<&str>) -> String {
    let label = task
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let label = label.trim_start_matches(|c: char| c == COMMENT_MARKER || c.is_whitespace());

    if label.is_empty() { DEFAULT_TASK.into() } else { label.into() }
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FMT).to_string()
}

/// Accepts both the seconds and the minutes variants of the log format.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FMT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, TIMESTAMP_FMT_MINUTES))
        .ok()
}

/// Appends one record to the log, creating the file if needed.
pub fn append_record(path: &Path, record: &SessionRecord) -> Result<()> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(record.to_log_entry().as_bytes())?;
        file.flush()
    };

    write().map_err(|source| PomoError::LogWrite {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn blank_task_falls_back_to_default_label() {
        assert_eq!(task_label(None), "Pomodoro");
        assert_eq!(task_label(Some("   ")), "Pomodoro");
        assert_eq!(task_label(Some("Writing")), "Writing");
    }

    #[test]
    fn multiline_task_is_folded_onto_one_line() {
        assert_eq!(task_label(Some("Fix\nbug  #12\r\n")), "Fix bug #12");
    }

    #[test]
    fn leading_comment_marker_is_dropped_from_label() {
        assert_eq!(task_label(Some("#42 fix login")), "42 fix login");
        assert_eq!(task_label(Some("## # triage")), "triage");
        assert_eq!(task_label(Some("#")), "Pomodoro");
        assert_eq!(task_label(Some("fix #42")), "fix #42");
    }

    #[test]
    fn labels_from_the_log_are_kept_verbatim() {
        let record = SessionRecord::from_log("Fix  bug", at(9, 0, 0), at(9, 25, 0));
        assert_eq!(record.task, "Fix  bug");
    }

    #[test]
    fn log_entry_is_a_four_line_group() {
        let record = SessionRecord::new(Some("Writing"), at(9, 0, 0), at(9, 25, 0));
        assert_eq!(
            record.to_log_entry(),
            "Writing\n2024/01/01 09:00:00\n2024/01/01 09:25:00\n\n"
        );
        assert_eq!(record.duration(), TimeDelta::minutes(25));
    }

    #[test]
    fn end_never_precedes_start() {
        let record = SessionRecord::new(None, at(10, 0, 0), at(9, 0, 0));
        assert_eq!(record.end, record.start);
    }

    #[test]
    fn parses_both_timestamp_precisions() {
        assert_eq!(parse_timestamp("2024/01/01 09:25:10"), Some(at(9, 25, 10)));
        assert_eq!(parse_timestamp("2024/01/01 09:25"), Some(at(9, 25, 0)));
        assert_eq!(parse_timestamp("2024-01-01 09:25"), None);
        assert_eq!(parse_timestamp("Writing"), None);
    }

    #[test]
    fn append_creates_file_and_keeps_existing_groups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("pomo.log");

        let first = SessionRecord::new(Some("A"), at(9, 0, 0), at(9, 25, 0));
        let second = SessionRecord::new(Some("B"), at(10, 0, 0), at(10, 25, 0));
        append_record(&path, &first).unwrap();
        append_record(&path, &second).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("{}{}", first.to_log_entry(), second.to_log_entry()));
    }

    #[test]
    fn append_failure_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let record = SessionRecord::new(None, at(9, 0, 0), at(9, 25, 0));

        let err = append_record(dir.path(), &record).unwrap_err();
        assert!(matches!(err, PomoError::LogWrite { .. }));
        assert!(err.to_string().contains("Could not write to log file"));
    }
}
