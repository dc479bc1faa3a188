use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "courseboard", version, about = "Terminal course scheduling board")]
pub struct Cli {
    #[command(flatten)]
    pub globals: Globals,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct Globals {
    /// Use this store file instead of the project/global one
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only courses with this name ("All" for every course)
    #[arg(long)]
    pub course: Option<String>,
    /// Only courses at this campus ("All" for every campus)
    #[arg(long)]
    pub campus: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a project store in the current directory
    Init,
    /// List courses in chronological order
    List {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Add a new course
    Add {
        /// Course name, e.g. Jr-2 or Adults
        name: String,
        /// Date in YYYY-MM-DD format
        date: String,
        /// Start time in HH:MM (24-hour) format
        start: String,
        /// Campus name
        campus: String,
    },
    /// Remove a course
    Remove {
        /// Course id
        id: i64,
        /// Confirm the removal
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Increment or decrement a course's counter
    Count {
        /// Course id
        id: i64,
        #[arg(value_enum)]
        direction: Direction,
    },
    /// Mark a course as full (or open again with --off)
    Full {
        /// Course id
        id: i64,
        /// Clear the full flag
        #[arg(long)]
        off: bool,
    },
    /// Change a course's date and/or start time
    Edit {
        /// Course id
        id: i64,
        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// New start time (HH:MM)
        #[arg(long)]
        start: Option<String>,
    },
    /// Show a course with its nearest same-campus courses
    Show {
        /// Course id
        id: i64,
    },
    /// Print a shareable summary of a course
    Share {
        /// Course id
        id: i64,
    },
    /// Print a month calendar
    Calendar {
        /// Month in YYYY-MM format (defaults to the earliest visible course)
        #[arg(long)]
        month: Option<String>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Print the schedule for one day
    Day {
        /// Date in YYYY-MM-DD format
        date: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Launch the interactive TUI
    Tui,
}
