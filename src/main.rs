mod calendar;
mod cli;
mod commands;
mod config;
mod logging;
mod model;
mod planner;
mod repository;
mod siblings;
mod storage;
mod timeutil;
mod ui;
mod view;

use anyhow::Result;
use clap::Parser;
use logging::LogTarget;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let globals = args.globals;
    let command = args.command.unwrap_or(cli::Command::Tui);
    let target = match command {
        cli::Command::Tui => LogTarget::File(commands::tui_log_path(&globals)?),
        _ => LogTarget::Stderr,
    };
    logging::init(target)?;

    match command {
        cli::Command::Init => commands::init(),
        cli::Command::List { filters } => commands::list(&globals, filters),
        cli::Command::Add {
            name,
            date,
            start,
            campus,
        } => commands::add(&globals, name, date, start, campus),
        cli::Command::Remove { id, yes } => commands::remove(&globals, id, yes),
        cli::Command::Count { id, direction } => commands::count(&globals, id, direction),
        cli::Command::Full { id, off } => commands::full(&globals, id, off),
        cli::Command::Edit { id, date, start } => commands::edit(&globals, id, date, start),
        cli::Command::Show { id } => commands::show(&globals, id),
        cli::Command::Share { id } => commands::share(&globals, id),
        cli::Command::Calendar { month, filters } => commands::calendar(&globals, month, filters),
        cli::Command::Day { date, filters } => commands::day(&globals, date, filters),
        cli::Command::Tui => commands::tui(&globals),
    }
}
