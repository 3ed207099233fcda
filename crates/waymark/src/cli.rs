use crate::logging::{LogFormat, LogLevel};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(name = "waymark")]
#[command(about = "Dependency-driven schedule reflow over JSON snapshots")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        global = true,
        env = "WAYMARK_LOG",
        help = "Log level used when RUST_LOG is unset",
        default_value = "warn",
        value_enum
    )]
    pub log_level: LogLevel,

    #[arg(
        long,
        global = true,
        env = "WAYMARK_LOG_FORMAT",
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: LogFormat,

    #[arg(
        long,
        global = true,
        value_name = "DIRECTIVES",
        help = "Tracing filter directives, overriding RUST_LOG and --log-level"
    )]
    pub log_filter: Option<String>,
}

/// Snapshot file plus whether to write results back into it.
#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    #[arg(help = "Path to a JSON snapshot { items, edges, overlays }")]
    pub snapshot: PathBuf,

    #[arg(long, help = "Persist the result back into the snapshot file")]
    pub write: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Recompute dates, optionally after start or duration edits")]
    Reflow {
        #[command(flatten)]
        target: SnapshotArgs,
        #[arg(
            long = "set-start",
            value_name = "ID=DATE",
            value_parser = parse_assignment::<NaiveDate>,
            help = "Move an item to a new start date (YYYY-MM-DD)"
        )]
        set_start: Vec<(u64, NaiveDate)>,
        #[arg(
            long = "set-duration",
            value_name = "ID=DAYS",
            value_parser = parse_assignment::<u32>,
            help = "Give an item a new duration in days"
        )]
        set_duration: Vec<(u64, u32)>,
    },
    #[command(about = "Check whether a dependency could be added")]
    CheckEdge {
        #[arg(help = "Path to a JSON snapshot")]
        snapshot: PathBuf,
        #[arg(help = "Item that must finish first")]
        predecessor: u64,
        #[arg(help = "Item that waits")]
        successor: u64,
    },
    #[command(about = "Expand items to fit team overlays, or show one team's schedule")]
    Overlays {
        #[command(flatten)]
        target: SnapshotArgs,
        #[arg(
            long,
            conflicts_with = "write",
            help = "Show this team's independent schedule instead (read-only)"
        )]
        team: Option<u64>,
    },
    #[command(about = "Move an item into another group")]
    Move {
        #[command(flatten)]
        target: SnapshotArgs,
        #[arg(help = "Item to move")]
        item: u64,
        #[arg(long, help = "Destination group")]
        to: u64,
    },
    #[command(about = "Re-chain a group in an explicit order")]
    Reorder {
        #[command(flatten)]
        target: SnapshotArgs,
        #[arg(help = "Group to reorder")]
        group: u64,
        #[arg(required = true, help = "Every item of the group, in the new order")]
        order: Vec<u64>,
    },
    #[command(about = "Print items in dependency order")]
    Order {
        #[arg(help = "Path to a JSON snapshot")]
        snapshot: PathBuf,
        #[arg(long, help = "Only this group")]
        group: Option<u64>,
    },
}

/// Parse `ID=VALUE`.
fn parse_assignment<T>(raw: &str) -> Result<(u64, T), String>
where
    T: FromStr,
    T::Err: Display,
{
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got `{raw}`"))?;
    let id = id
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid item id `{id}`: {e}"))?;
    let value = value
        .trim()
        .parse::<T>()
        .map_err(|e| format!("invalid value `{value}`: {e}"))?;
    Ok((id, value))
}
