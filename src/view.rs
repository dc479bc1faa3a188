use crate::model::CourseRecord;
use chrono::{Datelike, NaiveDate};
use std::fmt;

pub const ALL: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Only(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    List,
    Calendar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonthCursor {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub active_filter: Filter,
    pub campus_filter: Filter,
    pub view_mode: ViewMode,
    pub calendar_cursor: MonthCursor,
}

impl Filter {
    /// `"All"` (any case) or blank input means no restriction.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL) {
            Filter::All
        } else {
            Filter::Only(trimmed.to_string())
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Filter::All => true,
            Filter::Only(expected) => expected == value,
        }
    }

    /// Steps through `All` followed by `options`, wrapping around.
    pub fn cycle(&self, options: &[String]) -> Filter {
        let position = match self {
            Filter::All => None,
            Filter::Only(current) => options.iter().position(|o| o == current),
        };
        let next = match position {
            None => 0,
            Some(idx) => idx + 1,
        };
        match options.get(next) {
            Some(option) => Filter::Only(option.clone()),
            None => Filter::All,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => f.write_str(ALL),
            Filter::Only(value) => f.write_str(value),
        }
    }
}

impl ViewMode {
    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::List => "List",
            ViewMode::Calendar => "Calendar",
        }
    }
}

impl MonthCursor {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(MonthCursor { year, month })
        } else {
            None
        }
    }

    pub fn containing(date: NaiveDate) -> Self {
        MonthCursor {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parses `YYYY-MM`.
    pub fn parse(value: &str) -> Option<Self> {
        let (year, month) = value.trim().split_once('-')?;
        MonthCursor::new(year.parse().ok()?, month.parse().ok()?)
    }

    pub fn shift(self, months: i32) -> Self {
        let index = self.year * 12 + (self.month as i32 - 1) + months;
        MonthCursor {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for MonthCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl ViewState {
    pub fn new(today: NaiveDate) -> Self {
        ViewState {
            active_filter: Filter::All,
            campus_filter: Filter::All,
            view_mode: ViewMode::List,
            calendar_cursor: MonthCursor::containing(today),
        }
    }

    /// Courses passing both filters, in the order given (callers pass the
    /// chronologically sorted collection).
    pub fn visible_courses<'a>(&self, all: &'a [CourseRecord]) -> Vec<&'a CourseRecord> {
        all.iter()
            .filter(|c| self.active_filter.matches(&c.name) && self.campus_filter.matches(&c.campus))
            .collect()
    }

    pub fn set_filter(&mut self, filter: Filter, all: &[CourseRecord], today: NaiveDate) {
        self.active_filter = filter;
        self.reanchor(all, today);
    }

    pub fn set_campus_filter(&mut self, filter: Filter, all: &[CourseRecord], today: NaiveDate) {
        self.campus_filter = filter;
        self.reanchor(all, today);
    }

    pub fn set_view_mode(&mut self, mode: ViewMode, all: &[CourseRecord], today: NaiveDate) {
        self.view_mode = mode;
        if mode == ViewMode::Calendar {
            self.reanchor(all, today);
        }
    }

    /// Only moves the cursor while the calendar is shown.
    pub fn navigate_month(&mut self, delta: i32) -> bool {
        if self.view_mode != ViewMode::Calendar {
            return false;
        }
        self.calendar_cursor = self.calendar_cursor.shift(delta);
        true
    }

    fn reanchor(&mut self, all: &[CourseRecord], today: NaiveDate) {
        let earliest = self
            .visible_courses(all)
            .into_iter()
            .filter_map(|c| c.parsed_date())
            .min();
        self.calendar_cursor = MonthCursor::containing(earliest.unwrap_or(today));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::course;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn sample() -> Vec<CourseRecord> {
        vec![
            course(1, "Adults", "2024-03-01", "09:00", "North"),
            course(2, "Jr-1", "2024-04-10", "10:00", "North"),
            course(3, "Adults", "2024-05-02", "09:00", "South"),
            course(4, "Jr-1", "2024-05-03", "11:00", "South"),
        ]
    }

    fn ids(courses: &[&CourseRecord]) -> Vec<i64> {
        courses.iter().map(|c| c.id).collect()
    }

    #[test]
    fn filters_combine_with_and() {
        let all = sample();
        let mut state = ViewState::new(today());
        state.set_filter(Filter::parse("Adults"), &all, today());
        assert_eq!(ids(&state.visible_courses(&all)), vec![1, 3]);
        state.set_campus_filter(Filter::parse("South"), &all, today());
        assert_eq!(ids(&state.visible_courses(&all)), vec![3]);
        state.set_filter(Filter::parse("all"), &all, today());
        assert_eq!(ids(&state.visible_courses(&all)), vec![3, 4]);
    }

    #[test]
    fn filter_order_does_not_matter() {
        let all = sample();
        let mut name_first = ViewState::new(today());
        name_first.set_filter(Filter::parse("Jr-1"), &all, today());
        name_first.set_campus_filter(Filter::parse("North"), &all, today());

        let mut campus_first = ViewState::new(today());
        campus_first.set_campus_filter(Filter::parse("North"), &all, today());
        campus_first.set_filter(Filter::parse("Jr-1"), &all, today());

        assert_eq!(
            ids(&name_first.visible_courses(&all)),
            ids(&campus_first.visible_courses(&all))
        );
        assert_eq!(name_first.calendar_cursor, campus_first.calendar_cursor);
    }

    #[test]
    fn filter_change_reanchors_to_earliest_visible_month() {
        let all = sample();
        let mut state = ViewState::new(today());
        state.set_campus_filter(Filter::parse("South"), &all, today());
        assert_eq!(state.calendar_cursor, MonthCursor::new(2024, 5).unwrap());
        state.set_filter(Filter::parse("Nobody"), &all, today());
        assert_eq!(state.calendar_cursor, MonthCursor::containing(today()));
    }

    #[test]
    fn entering_calendar_reanchors() {
        let all = sample();
        let mut state = ViewState::new(today());
        state.set_view_mode(ViewMode::Calendar, &all, today());
        assert_eq!(state.calendar_cursor, MonthCursor::new(2024, 3).unwrap());
    }

    #[test]
    fn month_navigation_requires_calendar_mode() {
        let all = sample();
        let mut state = ViewState::new(today());
        assert!(!state.navigate_month(1));
        assert_eq!(state.calendar_cursor, MonthCursor::containing(today()));

        state.set_view_mode(ViewMode::Calendar, &all, today());
        assert!(state.navigate_month(-3));
        assert_eq!(state.calendar_cursor, MonthCursor::new(2023, 12).unwrap());
        assert!(state.navigate_month(1));
        assert_eq!(state.calendar_cursor, MonthCursor::new(2024, 1).unwrap());
    }

    #[test]
    fn cursor_shift_rolls_years() {
        let dec = MonthCursor::new(2024, 12).unwrap();
        assert_eq!(dec.shift(1), MonthCursor::new(2025, 1).unwrap());
        assert_eq!(dec.shift(-12), MonthCursor::new(2023, 12).unwrap());
        assert_eq!(MonthCursor::parse("2024-02"), MonthCursor::new(2024, 2));
        assert_eq!(MonthCursor::parse("2024-13"), None);
    }

    #[test]
    fn filter_cycles_through_options() {
        let options = vec!["Adults".to_string(), "Jr-1".to_string()];
        let first = Filter::All.cycle(&options);
        assert_eq!(first, Filter::Only("Adults".into()));
        let second = first.cycle(&options);
        assert_eq!(second, Filter::Only("Jr-1".into()));
        assert_eq!(second.cycle(&options), Filter::All);
        assert_eq!(Filter::Only("Gone".into()).cycle(&options), Filter::Only("Adults".into()));
    }
}
