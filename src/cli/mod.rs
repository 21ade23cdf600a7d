//! Command-line client for a lifelog server.
//!
//! Argument definitions live here; [`commands`] turns them into API calls.

mod commands;
pub mod config;
pub mod output;

pub use commands::run;

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "lifelog",
    version = env!("CARGO_PKG_VERSION"),
    about = "Track activities and expenses on a lifelog server",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Config file (defaults to <config dir>/lifelog/config.toml)
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Server base URL, overriding the saved one
    #[arg(long, global = true, env = "LIFELOG_URL", value_name = "URL")]
    pub url: Option<String>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and save the token pair
    Login {
        /// Read from stdin when omitted
        password: Option<String>,
    },
    /// Forget the saved tokens
    Logout,
    /// Manage tags
    #[command(subcommand)]
    Tags(TagCommand),
    /// Manage expenses
    #[command(subcommand)]
    Expenses(ExpenseCommand),
    /// Manage activities
    #[command(subcommand)]
    Activities(ActivityCommand),
}

#[derive(Debug, Subcommand)]
pub enum TagCommand {
    /// List all tags
    #[command(visible_alias = "ls")]
    List,
    /// Create a tag
    Add { name: String },
    /// Rename a tag
    Edit { id: i64, name: String },
    /// Delete an unused tag
    #[command(visible_alias = "rm")]
    Delete { id: i64 },
    /// Expenses carrying the tag
    Expenses { id: i64 },
    /// Activities carrying the tag
    Activities { id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum ExpenseCommand {
    /// List recent expenses
    #[command(visible_alias = "ls")]
    List {
        /// Only entries at or after this RFC 3339 time
        #[arg(long)]
        from: Option<DateTime<Utc>>,
    },
    /// Show one expense
    Show { id: i64 },
    /// Record an expense
    Add(ExpenseArgs),
    /// Replace an expense
    Edit {
        id: i64,
        #[command(flatten)]
        fields: ExpenseArgs,
    },
    /// Delete an expense
    #[command(visible_alias = "rm")]
    Delete { id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum ActivityCommand {
    /// List recent activities
    #[command(visible_alias = "ls")]
    List {
        /// Only entries at or after this RFC 3339 time
        #[arg(long)]
        from: Option<DateTime<Utc>>,
    },
    /// Show one activity with its expenses
    Show { id: i64 },
    /// Record an activity
    Add(ActivityArgs),
    /// Replace an activity
    Edit {
        id: i64,
        #[command(flatten)]
        fields: ActivityArgs,
    },
    /// Delete an activity that owns no expenses
    #[command(visible_alias = "rm")]
    Delete { id: i64 },
    /// Expenses owned by the activity
    Expenses { id: i64 },
}

#[derive(Debug, Clone, Args)]
pub struct ExpenseArgs {
    #[arg(short, long)]
    pub label: String,
    #[arg(long)]
    pub value: f64,
    #[arg(short, long)]
    pub unit: String,
    /// RFC 3339 timestamp; now when omitted
    #[arg(short, long)]
    pub time: Option<DateTime<Utc>>,
    /// Owning activity
    #[arg(short, long)]
    pub activity: Option<i64>,
    /// Tag ID, repeatable
    #[arg(long = "tag")]
    pub tags: Vec<i64>,
}

#[derive(Debug, Clone, Args)]
pub struct ActivityArgs {
    #[arg(short, long)]
    pub label: String,
    #[arg(short, long, default_value = "")]
    pub place: String,
    #[arg(short, long, default_value = "")]
    pub description: String,
    /// RFC 3339 timestamp; now when omitted
    #[arg(short, long)]
    pub time: Option<DateTime<Utc>>,
    /// Seconds, or a compact form such as 1h30m
    #[arg(long, value_parser = parse_duration)]
    pub duration: Duration,
    /// Tag ID, repeatable
    #[arg(long = "tag")]
    pub tags: Vec<i64>,
}

/// Parse `90`, `45s`, `30m`, `2h` or combinations like `1h30m`.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in raw.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let scale = match c {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return Err(format!("unexpected {c:?} in duration {raw:?}")),
        };
        let n: u64 = digits
            .parse()
            .map_err(|_| format!("missing number before {c:?} in {raw:?}"))?;
        total = n
            .checked_mul(scale)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| format!("duration {raw:?} is too large"))?;
        digits.clear();
    }
    if !digits.is_empty() || raw.is_empty() {
        return Err(format!("invalid duration {raw:?}"));
    }
    Ok(Duration::from_secs(total))
}

/// Log to stderr so stdout stays clean for `--json`.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("45s"), Ok(Duration::from_secs(45)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("2h5s"), Ok(Duration::from_secs(7205)));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("1d").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("1h30").is_err());
    }

    #[test]
    fn test_parse_expense_add() {
        let cli = Cli::try_parse_from([
            "lifelog", "--json", "expenses", "add", "-l", "Lunch", "--value", "12.5", "-u",
            "EUR", "--tag", "1", "--tag", "3",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Expenses(ExpenseCommand::Add(args)) => {
                assert_eq!(args.label, "Lunch");
                assert_eq!(args.value, 12.5);
                assert_eq!(args.tags, vec![1, 3]);
                assert!(args.time.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_activity_edit_and_list() {
        let cli = Cli::try_parse_from([
            "lifelog",
            "activities",
            "edit",
            "4",
            "--label",
            "Run",
            "--duration",
            "45m",
            "--time",
            "2024-01-02T07:00:00Z",
        ])
        .unwrap();
        match cli.command {
            Command::Activities(ActivityCommand::Edit { id, fields }) => {
                assert_eq!(id, 4);
                assert_eq!(fields.duration, Duration::from_secs(2700));
                assert_eq!(fields.place, "");
                assert!(fields.time.is_some());
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "lifelog",
            "activities",
            "ls",
            "--from",
            "2024-01-01T00:00:00Z",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Activities(ActivityCommand::List { from: Some(_) })
        ));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Cli::try_parse_from(["lifelog", "tags", "delete", "abc"]).is_err());
        assert!(Cli::try_parse_from([
            "lifelog", "activities", "add", "-l", "x", "--duration", "soon"
        ])
        .is_err());
    }
}
