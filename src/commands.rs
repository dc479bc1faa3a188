use crate::calendar::{GridCell, WEEKDAY_HEADINGS};
use crate::cli::{Direction, FilterArgs, Globals};
use crate::config::Settings;
use crate::model::{CourseRecord, NewCourse};
use crate::planner::{Intent, Outcome, Planner, ViewModel};
use crate::repository::{CountStep, CourseRepository};
use crate::storage::{init_project_store, locate_store, log_path, FileStore, StoreLocation};
use crate::timeutil::{date_info, minute_difference_phrase, parse_date, to_12_hour};
use crate::ui;
use crate::view::{Filter, MonthCursor, ViewMode};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{Datelike, Local};
use std::env;

pub fn init() -> Result<()> {
    let location = init_project_store()?;
    println!("Initialized course store at {}", location.path.display());
    Ok(())
}

pub fn list(globals: &Globals, filters: FilterArgs) -> Result<()> {
    let (mut planner, location) = open_planner(globals)?;
    apply_filters(&mut planner, filters)?;
    println!(
        "Courses ({}) [course: {}, campus: {}]",
        location.scope.label(),
        planner.view().active_filter,
        planner.view().campus_filter
    );
    let visible = planner.visible_courses();
    if visible.is_empty() {
        println!("  (none)");
    }
    for course in visible {
        print_course(course);
    }
    Ok(())
}

pub fn add(globals: &Globals, name: String, date: String, start: String, campus: String) -> Result<()> {
    let (mut planner, _) = open_planner(globals)?;
    let outcome = planner
        .dispatch(Intent::AddCourse(NewCourse::new(name, date, start, campus)))
        .context("adding course")?;
    report(outcome)
}

pub fn remove(globals: &Globals, id: i64, yes: bool) -> Result<()> {
    if !yes {
        bail!("refusing to remove course {} without --yes", id);
    }
    let (mut planner, _) = open_planner(globals)?;
    let outcome = planner
        .dispatch(Intent::RemoveCourse(id))
        .with_context(|| format!("removing course {}", id))?;
    report(outcome)
}

pub fn count(globals: &Globals, id: i64, direction: Direction) -> Result<()> {
    let step = match direction {
        Direction::Up => CountStep::Increment,
        Direction::Down => CountStep::Decrement,
    };
    let (mut planner, _) = open_planner(globals)?;
    let outcome = planner
        .dispatch(Intent::AdjustCount(id, step))
        .with_context(|| format!("updating count of {}", id))?;
    report(outcome)
}

pub fn full(globals: &Globals, id: i64, off: bool) -> Result<()> {
    let (mut planner, _) = open_planner(globals)?;
    let outcome = planner
        .dispatch(Intent::SetFull(id, !off))
        .with_context(|| format!("updating course {}", id))?;
    report(outcome)
}

pub fn edit(globals: &Globals, id: i64, date: Option<String>, start: Option<String>) -> Result<()> {
    if date.is_none() && start.is_none() {
        bail!("nothing to change (use --date and/or --start)");
    }
    let (mut planner, _) = open_planner(globals)?;
    let current = planner
        .repository()
        .find_by_id(id)
        .cloned()
        .ok_or_else(|| anyhow!("course {} not found", id))?;
    let outcome = planner
        .dispatch(Intent::EditSchedule {
            id,
            date: date.unwrap_or(current.date),
            start_time: start.unwrap_or(current.start_time),
        })
        .with_context(|| format!("editing course {}", id))?;
    report(outcome)
}

pub fn show(globals: &Globals, id: i64) -> Result<()> {
    let (planner, _) = open_planner(globals)?;
    let detail = planner
        .course_detail(id)
        .ok_or_else(|| anyhow!("course {} not found", id))?;
    print_course(detail.course);
    if let Some(arabic) = detail.arabic_weekday() {
        println!("    weekday (ar): {}", arabic);
    }
    if detail.siblings.is_empty() {
        println!("  no other courses at {} that day", detail.course.campus);
        return Ok(());
    }
    println!("  nearby at {}:", detail.course.campus);
    for sibling in &detail.siblings {
        println!(
            "    - {} {} ({}) {}",
            sibling.course.id,
            sibling.course.name,
            to_12_hour(&sibling.course.start_time),
            minute_difference_phrase(sibling.diff_minutes)
        );
    }
    Ok(())
}

pub fn share(globals: &Globals, id: i64) -> Result<()> {
    let (planner, _) = open_planner(globals)?;
    let text = planner
        .share_text(id)
        .ok_or_else(|| anyhow!("course {} not found", id))?;
    println!("{}", text);
    Ok(())
}

pub fn calendar(globals: &Globals, month: Option<String>, filters: FilterArgs) -> Result<()> {
    let (mut planner, _) = open_planner(globals)?;
    apply_filters(&mut planner, filters)?;
    planner.dispatch(Intent::SetViewMode(ViewMode::Calendar))?;
    if let Some(raw) = month {
        let target = MonthCursor::parse(&raw)
            .ok_or_else(|| anyhow!("invalid month (use YYYY-MM): {}", raw))?;
        let current = planner.view().calendar_cursor;
        let delta = (target.year - current.year) * 12 + target.month as i32 - current.month as i32;
        planner.dispatch(Intent::NavigateMonth(delta))?;
    }
    let grid = match planner.view_model() {
        ViewModel::Calendar { grid, .. } => grid,
        ViewModel::List(_) => bail!("calendar view unavailable"),
    };
    let title = grid
        .cursor
        .first_day()
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|| grid.cursor.to_string());
    println!("{:^35}", title);
    println!(
        "{}",
        WEEKDAY_HEADINGS
            .iter()
            .map(|h| format!("{:^5}", h))
            .collect::<String>()
    );
    for week in grid.weeks() {
        let row: String = week
            .iter()
            .map(|cell| match cell {
                GridCell::Padding => "     ".to_string(),
                GridCell::Day(day) => {
                    let number = day.date.day();
                    let marker = if day.has_courses() {
                        format!("{}", day.course_ids.len())
                    } else {
                        String::new()
                    };
                    if day.is_today {
                        format!("[{:>2}]{:<1}", number, marker)
                    } else {
                        format!(" {:>2}{:<2}", number, marker)
                    }
                }
            })
            .collect();
        println!("{}", row.trim_end());
    }
    Ok(())
}

pub fn day(globals: &Globals, date: String, filters: FilterArgs) -> Result<()> {
    let parsed = parse_date(&date).ok_or_else(|| anyhow!("invalid date (use YYYY-MM-DD): {}", date))?;
    let (mut planner, _) = open_planner(globals)?;
    apply_filters(&mut planner, filters)?;
    let schedule = planner.day_schedule(parsed);
    let heading = date_info(&date)
        .map(|info| format!("{} {}", info.weekday_name, info.formatted_date))
        .unwrap_or_else(|| "Invalid Date".to_string());
    println!(
        "{}: {} course(s), {} shown",
        heading,
        schedule.course_count(),
        schedule.events.len()
    );
    for hour in &schedule.hours {
        println!("  {:>5}  {:>6.0}px", hour.label, hour.top_px);
    }
    for event in &schedule.events {
        println!(
            "  {} {} {}-{} top {:.0}px height {:.0}px",
            event.course.id,
            event.course.name,
            event.course.start_time,
            event.course.end_time,
            event.top_px,
            event.height_px
        );
    }
    Ok(())
}

pub fn tui(globals: &Globals) -> Result<()> {
    let settings = Settings::load(globals.config.as_deref())?;
    let (planner, location) = open_planner_with(globals, &settings)?;
    ui::run(planner, location, settings)
}

pub fn tui_log_path(globals: &Globals) -> Result<std::path::PathBuf> {
    let cwd = env::current_dir()?;
    let location = locate_store(&cwd, globals.store.clone())?;
    Ok(log_path(&location))
}

fn open_planner(globals: &Globals) -> Result<(Planner<FileStore>, StoreLocation)> {
    let settings = Settings::load(globals.config.as_deref())?;
    open_planner_with(globals, &settings)
}

fn open_planner_with(
    globals: &Globals,
    settings: &Settings,
) -> Result<(Planner<FileStore>, StoreLocation)> {
    let cwd = env::current_dir()?;
    let location = locate_store(&cwd, globals.store.clone())?;
    let store = FileStore::new(location.clone(), settings.store_key.clone());
    let repo = CourseRepository::open(store).context("opening course store")?;
    let planner = Planner::new(repo, Local::now().date_naive(), settings.layout);
    Ok((planner, location))
}

fn apply_filters(planner: &mut Planner<FileStore>, filters: FilterArgs) -> Result<()> {
    if let Some(course) = filters.course {
        planner.dispatch(Intent::SetFilter(Filter::parse(&course)))?;
    }
    if let Some(campus) = filters.campus {
        planner.dispatch(Intent::SetCampusFilter(Filter::parse(&campus)))?;
    }
    Ok(())
}

fn report(outcome: Outcome) -> Result<()> {
    match outcome {
        Outcome::Applied(message) => {
            println!("{}", message);
            Ok(())
        }
        Outcome::Ignored(message) => bail!("{}", message),
    }
}

fn print_course(course: &CourseRecord) {
    let when = match date_info(&course.date) {
        Some(info) => format!("{} ({})", info.formatted_date, info.weekday_name),
        None => "Invalid Date".to_string(),
    };
    println!("  - {}: {}", course.id, course.name);
    println!(
        "    {}  {} - {}",
        when,
        to_12_hour(&course.start_time),
        if course.end_time.is_empty() {
            "?".to_string()
        } else {
            to_12_hour(&course.end_time)
        }
    );
    let full = if course.is_full { " (full)" } else { "" };
    println!("    campus: {}  count: {}{}", course.campus, course.count, full);
}
