use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::session::PausePolicy;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pomo",
    version,
    about = "🍅 pomo - a Pomodoro timer with a plain-text session log"
)]
pub struct Args {
    /// Description of the task to work on
    #[arg(short, long)]
    pub task: Option<String>,

    /// Analyse the given pomo log instead of starting a session
    #[arg(short, long, value_name = "LOG", visible_alias = "analyze")]
    pub analyse: Option<PathBuf>,

    /// Log file to append finished sessions to
    #[arg(long, value_name = "PATH")]
    pub log: Option<PathBuf>,

    #[arg(long)]
    pub no_sound: bool,

    /// Never take over the terminal or show desktop notifications
    #[arg(long)]
    pub headless: bool,

    #[arg(long, value_enum)]
    pub pause_policy: Option<PausePolicy>,

    /// Count every pomodoro as 25 minutes instead of its measured length
    #[arg(long, requires = "analyse")]
    pub nominal: bool,

    /// Print the analysis as JSON
    #[arg(long, requires = "analyse")]
    pub json: bool,

    /// Date the analysis treats as today (YYYY/MM/DD or YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, requires = "analyse")]
    pub today: Option<NaiveDate>,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y/%m/%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map_err(|_| format!("invalid date {s:?}, expected YYYY/MM/DD"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_both_date_separators() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert_eq!(parse_date("2024/01/01").ok(), expected);
        assert_eq!(parse_date("2024-01-01").ok(), expected);
        assert!(parse_date("01/01/2024").is_err());
    }

    #[test]
    fn analysis_flags_need_a_log() {
        assert!(Args::try_parse_from(["pomo", "--json"]).is_err());
        assert!(Args::try_parse_from(["pomo", "--analyse"]).is_err());

        let args = Args::try_parse_from(["pomo", "--analyze", "pomo.log", "--today", "2024/01/01"]).unwrap();
        assert_eq!(args.analyse, Some(PathBuf::from("pomo.log")));
        assert!(args.today.is_some());
    }

    #[test]
    fn pause_policy_uses_kebab_case_names() {
        let args = Args::try_parse_from(["pomo", "-t", "Writing", "--pause-policy", "freeze-elapsed"]).unwrap();
        assert_eq!(args.task.as_deref(), Some("Writing"));
        assert_eq!(args.pause_policy, Some(PausePolicy::FreezeElapsed));
    }
}
