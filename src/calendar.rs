use crate::model::{CourseId, CourseRecord};
use crate::timeutil::{course_duration_minutes, hour_label};
use crate::view::MonthCursor;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub const WEEKDAY_HEADINGS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];
const DEFAULT_WINDOW_START_HOUR: u32 = 8;

/// Pixel metrics for the day schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutMetrics {
    pub row_height_px: f32,
    pub min_event_height_px: f32,
    pub window_hours: u32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        LayoutMetrics {
            row_height_px: 60.0,
            min_event_height_px: 20.0,
            window_hours: 12,
        }
    }
}

impl LayoutMetrics {
    /// The first field that cannot produce a usable schedule, if any.
    pub fn invalid_field(&self) -> Option<&'static str> {
        if !(self.row_height_px.is_finite() && self.row_height_px > 0.0) {
            return Some("row_height_px");
        }
        if !(self.min_event_height_px.is_finite() && self.min_event_height_px > 0.0) {
            return Some("min_event_height_px");
        }
        if self.window_hours == 0 {
            return Some("window_hours");
        }
        None
    }

    pub fn pixels_per_minute(&self) -> f32 {
        self.row_height_px / 60.0
    }

    fn clamped_window_hours(&self) -> u32 {
        self.window_hours.clamp(1, 24)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridCell {
    Padding,
    Day(DayCell),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub course_ids: Vec<CourseId>,
    pub is_today: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthGrid {
    pub cursor: MonthCursor,
    /// Blank cells before the 1st, weeks starting on Sunday.
    pub offset: usize,
    pub days_in_month: u32,
    pub cells: Vec<GridCell>,
}

impl DayCell {
    pub fn has_courses(&self) -> bool {
        !self.course_ids.is_empty()
    }
}

impl MonthGrid {
    pub fn weeks(&self) -> impl Iterator<Item = &[GridCell]> {
        self.cells.chunks(7)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayCell> {
        self.cells.iter().find_map(|cell| match cell {
            GridCell::Day(day) if day.date == date => Some(day),
            _ => None,
        })
    }
}

pub fn month_grid(cursor: MonthCursor, visible: &[&CourseRecord], today: NaiveDate) -> MonthGrid {
    let first = match cursor.first_day() {
        Some(first) => first,
        None => {
            return MonthGrid {
                cursor,
                offset: 0,
                days_in_month: 0,
                cells: Vec::new(),
            }
        }
    };
    let offset = first.weekday().num_days_from_sunday() as usize;
    let days = days_in_month(cursor.year, cursor.month);
    let total = (offset + days as usize).div_ceil(7) * 7;

    let mut cells = Vec::with_capacity(total);
    cells.extend((0..offset).map(|_| GridCell::Padding));
    for day in 1..=days {
        let Some(date) = NaiveDate::from_ymd_opt(cursor.year, cursor.month, day) else {
            cells.push(GridCell::Padding);
            continue;
        };
        let course_ids = visible
            .iter()
            .filter(|c| c.parsed_date() == Some(date))
            .map(|c| c.id)
            .collect();
        cells.push(GridCell::Day(DayCell {
            date,
            course_ids,
            is_today: date == today,
        }));
    }
    cells.resize(total, GridCell::Padding);

    MonthGrid {
        cursor,
        offset,
        days_in_month: days,
        cells,
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.and_then(|d| d.pred_opt()).map(|d| d.day()).unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourRow {
    pub hour: u32,
    pub label: String,
    pub top_px: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventBlock<'a> {
    pub course: &'a CourseRecord,
    pub start_minutes: u32,
    pub top_px: f32,
    pub height_px: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DaySchedule<'a> {
    pub date: NaiveDate,
    /// Every visible course on the date, by start time.
    pub courses: Vec<&'a CourseRecord>,
    pub window_start_hour: u32,
    pub window_hours: u32,
    pub hours: Vec<HourRow>,
    /// Courses placed inside the window; the rest are not drawn.
    pub events: Vec<EventBlock<'a>>,
    pub height_px: f32,
}

impl DaySchedule<'_> {
    pub fn course_count(&self) -> usize {
        self.courses.len()
    }
}

pub fn day_schedule<'a>(
    date: NaiveDate,
    visible: &[&'a CourseRecord],
    metrics: &LayoutMetrics,
) -> DaySchedule<'a> {
    let mut courses: Vec<&'a CourseRecord> = visible
        .iter()
        .copied()
        .filter(|c| c.parsed_date() == Some(date))
        .collect();
    courses.sort_by_key(|c| c.start_minutes().unwrap_or(u32::MAX));

    let window_hours = metrics.clamped_window_hours();
    let latest_start_hour = 24 - window_hours;
    let window_start_hour = match courses.iter().filter_map(|c| c.start_minutes()).min() {
        Some(earliest) => (earliest / 60).saturating_sub(1).min(latest_start_hour),
        None => DEFAULT_WINDOW_START_HOUR.min(latest_start_hour),
    };
    let window_start = window_start_hour * 60;
    let window_end = window_start + window_hours * 60;
    let ppm = metrics.pixels_per_minute();

    let hours = (window_start_hour..window_start_hour + window_hours)
        .enumerate()
        .map(|(row, hour)| HourRow {
            hour,
            label: hour_label(hour as i32),
            top_px: row as f32 * metrics.row_height_px,
        })
        .collect();

    let events = courses
        .iter()
        .copied()
        .filter_map(|course| {
            let start = course.start_minutes()?;
            if start < window_start || start >= window_end {
                return None;
            }
            let duration = course_duration_minutes(&course.name) as f32;
            Some(EventBlock {
                course,
                start_minutes: start,
                top_px: (start - window_start) as f32 * ppm,
                height_px: (duration * ppm).max(metrics.min_event_height_px),
            })
        })
        .collect();

    DaySchedule {
        date,
        courses,
        window_start_hour,
        window_hours,
        hours,
        events,
        height_px: window_hours as f32 * metrics.row_height_px,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::course;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn grid_is_whole_weeks() {
        let today = date(2024, 6, 15);
        for month in 1..=12 {
            let cursor = MonthCursor::new(2024, month).unwrap();
            let grid = month_grid(cursor, &[], today);
            assert_eq!(grid.cells.len() % 7, 0);
            assert!(grid.cells.len() >= grid.offset + grid.days_in_month as usize);
            assert!(grid.cells.len() < grid.offset + grid.days_in_month as usize + 7);
        }
    }

    #[test]
    fn grid_offsets_and_tags_days() {
        // June 2024 starts on a Saturday.
        let all = vec![
            course(1, "Adults", "2024-06-03", "09:00", "North"),
            course(2, "Jr-1", "2024-06-03", "10:00", "North"),
            course(3, "Adults", "2024-07-03", "09:00", "North"),
        ];
        let visible: Vec<_> = all.iter().collect();
        let grid = month_grid(MonthCursor::new(2024, 6).unwrap(), &visible, date(2024, 6, 15));
        assert_eq!(grid.offset, 6);
        assert_eq!(grid.days_in_month, 30);
        assert_eq!(grid.cells.len(), 42);
        assert!(matches!(grid.cells[5], GridCell::Padding));
        assert!(matches!(grid.cells[41], GridCell::Padding));

        let third = grid.day(date(2024, 6, 3)).unwrap();
        assert!(third.has_courses());
        assert_eq!(third.course_ids, vec![1, 2]);
        assert!(!grid.day(date(2024, 6, 4)).unwrap().has_courses());
        assert!(grid.day(date(2024, 6, 15)).unwrap().is_today);
        assert_eq!(grid.weeks().count(), 6);
    }

    #[test]
    fn february_leap_year() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2023, 12), 31);
    }

    #[test]
    fn window_starts_an_hour_before_earliest() {
        let all = vec![
            course(1, "Adults", "2024-06-03", "10:30", "North"),
            course(2, "Jr-2", "2024-06-03", "09:15", "North"),
        ];
        let visible: Vec<_> = all.iter().collect();
        let metrics = LayoutMetrics::default();
        let schedule = day_schedule(date(2024, 6, 3), &visible, &metrics);
        assert_eq!(schedule.window_start_hour, 8);
        assert_eq!(schedule.hours.len(), 12);
        assert_eq!(schedule.hours[0].label, "8 AM");
        assert_eq!(schedule.events[0].course.id, 2);
        assert_eq!(schedule.events[0].top_px, 75.0);
        assert_eq!(schedule.events[0].height_px, 90.0);
        assert_eq!(schedule.events[1].top_px, 150.0);
        assert_eq!(schedule.events[1].height_px, 120.0);
    }

    #[test]
    fn window_defaults_and_clamps() {
        let metrics = LayoutMetrics::default();
        let empty = day_schedule(date(2024, 6, 3), &[], &metrics);
        assert_eq!(empty.window_start_hour, 8);
        assert!(empty.events.is_empty());

        let late = vec![course(1, "Adults", "2024-06-03", "23:00", "North")];
        let visible: Vec<_> = late.iter().collect();
        let schedule = day_schedule(date(2024, 6, 3), &visible, &metrics);
        assert_eq!(schedule.window_start_hour, 12);
        assert_eq!(schedule.events.len(), 1);

        let early = vec![course(1, "Adults", "2024-06-03", "00:20", "North")];
        let visible: Vec<_> = early.iter().collect();
        assert_eq!(day_schedule(date(2024, 6, 3), &visible, &metrics).window_start_hour, 0);
    }

    #[test]
    fn out_of_window_courses_are_dropped_but_counted() {
        let mut all = vec![
            course(1, "Adults", "2024-06-03", "07:00", "North"),
            course(2, "Adults", "2024-06-03", "20:00", "North"),
            course(3, "Adults", "2024-06-03", "12:00", "North"),
        ];
        all.push(course(4, "Adults", "2024-06-03", "08:00", "North"));
        all[3].start_time = "tbd".into();
        let visible: Vec<_> = all.iter().collect();
        let schedule = day_schedule(date(2024, 6, 3), &visible, &LayoutMetrics::default());
        assert_eq!(schedule.window_start_hour, 6);
        assert_eq!(schedule.course_count(), 4);
        let placed: Vec<_> = schedule.events.iter().map(|e| e.course.id).collect();
        assert_eq!(placed, vec![1, 3]);
        assert_eq!(schedule.courses.last().unwrap().id, 4);
    }

    #[test]
    fn short_rows_respect_minimum_height() {
        let metrics = LayoutMetrics {
            row_height_px: 6.0,
            min_event_height_px: 20.0,
            window_hours: 12,
        };
        let all = vec![course(1, "Jr-1", "2024-06-03", "10:00", "North")];
        let visible: Vec<_> = all.iter().collect();
        let schedule = day_schedule(date(2024, 6, 3), &visible, &metrics);
        assert_eq!(schedule.events[0].height_px, 20.0);
        assert_eq!(schedule.height_px, 72.0);
    }
}
