use crate::calendar::{day_schedule, month_grid, DaySchedule, LayoutMetrics, MonthGrid};
use crate::model::{CourseError, CourseId, CourseRecord, NewCourse};
use crate::repository::{CountChange, CountStep, CourseRepository, CourseStore};
use crate::siblings::{siblings_of, Sibling};
use crate::timeutil::{arabic_weekday, date_info, to_12_hour, DateInfo};
use crate::view::{Filter, ViewMode, ViewState};
use chrono::NaiveDate;
use tracing::debug;

/// A discrete user command coming from the presentation layer.
#[derive(Debug, Clone)]
pub enum Intent {
    AddCourse(NewCourse),
    RemoveCourse(CourseId),
    AdjustCount(CourseId, CountStep),
    SetFull(CourseId, bool),
    EditSchedule {
        id: CourseId,
        date: String,
        start_time: String,
    },
    SetFilter(Filter),
    SetCampusFilter(Filter),
    SetViewMode(ViewMode),
    NavigateMonth(i32),
    SelectDay(Option<NaiveDate>),
    SelectCourse(Option<CourseId>),
}

/// What happened to an intent that did not fail; both carry a status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied(String),
    Ignored(String),
}

pub enum ViewModel<'a> {
    List(Vec<&'a CourseRecord>),
    Calendar {
        grid: MonthGrid,
        day: Option<DaySchedule<'a>>,
    },
}

pub struct CourseDetail<'a> {
    pub course: &'a CourseRecord,
    pub info: Option<DateInfo>,
    pub siblings: Vec<Sibling<'a>>,
}

pub struct Planner<S: CourseStore> {
    repo: CourseRepository<S>,
    view: ViewState,
    today: NaiveDate,
    metrics: LayoutMetrics,
    selected_day: Option<NaiveDate>,
    selected_course: Option<CourseId>,
}

impl Intent {
    /// Intents that write to the store when they apply.
    pub fn mutates_store(&self) -> bool {
        matches!(
            self,
            Intent::AddCourse(_)
                | Intent::RemoveCourse(_)
                | Intent::AdjustCount(..)
                | Intent::SetFull(..)
                | Intent::EditSchedule { .. }
        )
    }
}

impl CourseDetail<'_> {
    pub fn arabic_weekday(&self) -> Option<&str> {
        self.info.as_ref().map(|info| arabic_weekday(&info.weekday_name))
    }
}

impl Outcome {
    pub fn message(&self) -> &str {
        match self {
            Outcome::Applied(msg) | Outcome::Ignored(msg) => msg,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }
}

impl<S: CourseStore> Planner<S> {
    pub fn new(repo: CourseRepository<S>, today: NaiveDate, metrics: LayoutMetrics) -> Self {
        Planner {
            repo,
            view: ViewState::new(today),
            today,
            metrics,
            selected_day: None,
            selected_course: None,
        }
    }

    pub fn repository(&self) -> &CourseRepository<S> {
        &self.repo
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    pub fn selected_day(&self) -> Option<NaiveDate> {
        self.selected_day
    }

    pub fn selected_course(&self) -> Option<CourseId> {
        self.selected_course
    }

    /// Writes the collection back, retrying any save that failed earlier.
    pub fn flush(&mut self) -> Result<(), CourseError> {
        self.repo.flush()
    }

    pub fn dispatch(&mut self, intent: Intent) -> Result<Outcome, CourseError> {
        debug!(?intent, "dispatch");
        let outcome = match intent {
            Intent::AddCourse(draft) => {
                let name = draft.name.trim().to_string();
                let id = self.repo.add(draft)?;
                Outcome::Applied(format!("Added {} ({})", name, id))
            }
            Intent::RemoveCourse(id) => {
                if self.repo.remove(id)? {
                    if self.selected_course == Some(id) {
                        self.selected_course = None;
                    }
                    Outcome::Applied(format!("Removed {}", id))
                } else {
                    not_found(id)
                }
            }
            Intent::AdjustCount(id, step) => match self.repo.adjust_count(id, step)? {
                CountChange::Changed(count) => Outcome::Applied(format!("Count for {} is {}", id, count)),
                CountChange::Floor => Outcome::Ignored("Count is already 0".into()),
                CountChange::Locked => {
                    Outcome::Ignored("Course is full; unmark it to change the count".into())
                }
                CountChange::Missing => not_found(id),
            },
            Intent::SetFull(id, full) => {
                if self.repo.set_full(id, full)? {
                    let state = if full { "full" } else { "open" };
                    Outcome::Applied(format!("Marked {} {}", id, state))
                } else {
                    not_found(id)
                }
            }
            Intent::EditSchedule {
                id,
                date,
                start_time,
            } => {
                if self.repo.edit_schedule(id, &date, &start_time)? {
                    Outcome::Applied(format!("Rescheduled {}", id))
                } else {
                    not_found(id)
                }
            }
            Intent::SetFilter(filter) => {
                let message = format!("Course filter: {}", filter);
                self.view.set_filter(filter, self.repo.all(), self.today);
                Outcome::Applied(message)
            }
            Intent::SetCampusFilter(filter) => {
                let message = format!("Campus filter: {}", filter);
                self.view.set_campus_filter(filter, self.repo.all(), self.today);
                Outcome::Applied(message)
            }
            Intent::SetViewMode(mode) => {
                self.view.set_view_mode(mode, self.repo.all(), self.today);
                Outcome::Applied(format!("Switched to {} view", mode.label()))
            }
            Intent::NavigateMonth(delta) => {
                if self.view.navigate_month(delta) {
                    Outcome::Applied(format!("Showing {}", self.view.calendar_cursor))
                } else {
                    Outcome::Ignored("Month navigation needs the calendar view".into())
                }
            }
            Intent::SelectDay(day) => {
                self.selected_day = day;
                match day {
                    Some(date) => Outcome::Applied(format!("Schedule for {}", date.format("%Y-%m-%d"))),
                    None => Outcome::Applied("Closed day schedule".into()),
                }
            }
            Intent::SelectCourse(id) => match id {
                Some(id) if self.repo.find_by_id(id).is_none() => not_found(id),
                _ => {
                    self.selected_course = id;
                    Outcome::Applied(String::new())
                }
            },
        };
        Ok(outcome)
    }

    pub fn visible_courses(&self) -> Vec<&CourseRecord> {
        self.view.visible_courses(self.repo.all())
    }

    pub fn view_model(&self) -> ViewModel<'_> {
        let visible = self.visible_courses();
        match self.view.view_mode {
            ViewMode::List => ViewModel::List(visible),
            ViewMode::Calendar => {
                let grid = month_grid(self.view.calendar_cursor, &visible, self.today);
                let day = self
                    .selected_day
                    .map(|date| day_schedule(date, &visible, &self.metrics));
                ViewModel::Calendar { grid, day }
            }
        }
    }

    pub fn day_schedule(&self, date: NaiveDate) -> DaySchedule<'_> {
        day_schedule(date, &self.visible_courses(), &self.metrics)
    }

    pub fn course_detail(&self, id: CourseId) -> Option<CourseDetail<'_>> {
        let course = self.repo.find_by_id(id)?;
        Some(CourseDetail {
            course,
            info: date_info(&course.date),
            siblings: siblings_of(course, self.repo.all()),
        })
    }

    pub fn selected_detail(&self) -> Option<CourseDetail<'_>> {
        self.selected_course.and_then(|id| self.course_detail(id))
    }

    /// Plain-text summary suitable for pasting elsewhere.
    pub fn share_text(&self, id: CourseId) -> Option<String> {
        let detail = self.course_detail(id)?;
        let course = detail.course;
        let date_line = match (&detail.info, detail.arabic_weekday()) {
            (Some(info), Some(arabic)) => format!(
                "{} ({} / {})",
                info.formatted_date, info.weekday_name, arabic
            ),
            _ => "Invalid Date".to_string(),
        };
        let end = if course.end_time.is_empty() {
            "?".to_string()
        } else {
            to_12_hour(&course.end_time)
        };
        let mut text = format!(
            "{}\nDate: {}\nTime: {} - {}\nCampus: {}\nCount: {}",
            course.name,
            date_line,
            to_12_hour(&course.start_time),
            end,
            course.campus,
            course.count
        );
        if course.is_full {
            text.push_str(" (full)");
        }
        Some(text)
    }
}

fn not_found(id: CourseId) -> Outcome {
    Outcome::Ignored(format!("No course with id {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{course, MemoryStore};
    use crate::view::MonthCursor;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn planner() -> Planner<MemoryStore> {
        let store = MemoryStore::with(&[
            course(1, "Adults", "2024-05-01", "09:00", "North"),
            course(2, "Jr-1", "2024-05-01", "09:30", "North"),
            course(3, "Adults", "2024-07-04", "18:00", "South"),
        ]);
        let repo = CourseRepository::open(store).unwrap();
        Planner::new(repo, today(), LayoutMetrics::default())
    }

    #[test]
    fn add_and_remove_round_trip() {
        let mut planner = planner();
        let outcome = planner
            .dispatch(Intent::AddCourse(NewCourse::new("Jr-4", "2024-06-20", "16:00", "South")))
            .unwrap();
        assert!(outcome.is_applied());
        assert_eq!(planner.repository().all().len(), 4);

        let id = planner.repository().all()[2].id;
        assert!(planner.dispatch(Intent::RemoveCourse(id)).unwrap().is_applied());
        let again = planner.dispatch(Intent::RemoveCourse(id)).unwrap();
        assert_eq!(again, Outcome::Ignored(format!("No course with id {}", id)));
    }

    #[test]
    fn invalid_add_is_rejected() {
        let mut planner = planner();
        let err = planner
            .dispatch(Intent::AddCourse(NewCourse::new("", "2024-06-20", "16:00", "South")))
            .unwrap_err();
        assert!(matches!(err, CourseError::MissingField("name")));
        assert_eq!(planner.repository().all().len(), 3);
    }

    #[test]
    fn full_course_ignores_count_changes() {
        let mut planner = planner();
        planner.dispatch(Intent::SetFull(1, true)).unwrap();
        let outcome = planner
            .dispatch(Intent::AdjustCount(1, CountStep::Increment))
            .unwrap();
        assert!(!outcome.is_applied());
        assert_eq!(planner.repository().find_by_id(1).unwrap().count, 0);
    }

    #[test]
    fn list_view_model_follows_filters() {
        let mut planner = planner();
        planner
            .dispatch(Intent::SetCampusFilter(Filter::parse("North")))
            .unwrap();
        match planner.view_model() {
            ViewModel::List(courses) => {
                let ids: Vec<_> = courses.iter().map(|c| c.id).collect();
                assert_eq!(ids, vec![1, 2]);
            }
            ViewModel::Calendar { .. } => panic!("expected list view"),
        }
    }

    #[test]
    fn calendar_view_model_with_selected_day() {
        let mut planner = planner();
        assert!(!planner.dispatch(Intent::NavigateMonth(1)).unwrap().is_applied());
        planner
            .dispatch(Intent::SetViewMode(ViewMode::Calendar))
            .unwrap();
        assert_eq!(planner.view().calendar_cursor, MonthCursor::new(2024, 5).unwrap());
        planner
            .dispatch(Intent::SelectDay(NaiveDate::from_ymd_opt(2024, 5, 1)))
            .unwrap();
        match planner.view_model() {
            ViewModel::Calendar { grid, day } => {
                let first = grid.day(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()).unwrap();
                assert_eq!(first.course_ids, vec![1, 2]);
                let day = day.expect("day schedule");
                assert_eq!(day.events.len(), 2);
                assert_eq!(day.window_start_hour, 8);
            }
            ViewModel::List(_) => panic!("expected calendar view"),
        }
        assert!(planner.dispatch(Intent::NavigateMonth(2)).unwrap().is_applied());
        assert_eq!(planner.view().calendar_cursor, MonthCursor::new(2024, 7).unwrap());
    }

    #[test]
    fn selecting_course_exposes_siblings() {
        let mut planner = planner();
        planner.dispatch(Intent::SelectCourse(Some(1))).unwrap();
        let detail = planner.selected_detail().unwrap();
        assert_eq!(detail.info.as_ref().unwrap().weekday_name, "Wednesday");
        assert_eq!(detail.arabic_weekday(), Some("الأربعاء"));
        assert_eq!(detail.siblings.len(), 1);
        assert_eq!(detail.siblings[0].course.id, 2);

        planner.dispatch(Intent::RemoveCourse(1)).unwrap();
        assert_eq!(planner.selected_course(), None);
        let missing = planner.dispatch(Intent::SelectCourse(Some(1))).unwrap();
        assert!(!missing.is_applied());
    }

    #[test]
    fn flush_writes_current_collection() {
        let mut planner = planner();
        assert_eq!(planner.repository().store().saves, 0);
        planner.flush().unwrap();
        assert_eq!(planner.repository().store().saves, 1);
    }

    #[test]
    fn share_text_summarises_course() {
        let mut planner = planner();
        planner.dispatch(Intent::SetFull(2, true)).unwrap();
        let text = planner.share_text(2).unwrap();
        assert!(text.starts_with("Jr-1\n"));
        assert!(text.contains("Date: 01/05/2024 (Wednesday / الأربعاء)"));
        assert!(text.contains("Time: 9:30 AM - 11:00 AM"));
        assert!(text.ends_with("Count: 0 (full)"));
        assert!(planner.share_text(99).is_none());
    }

    #[test]
    fn edit_schedule_moves_course() {
        let mut planner = planner();
        planner
            .dispatch(Intent::EditSchedule {
                id: 3,
                date: "2024-04-01".into(),
                start_time: "22:45".into(),
            })
            .unwrap();
        let moved = planner.repository().all().first().unwrap();
        assert_eq!(moved.id, 3);
        assert_eq!(moved.end_time, "00:45");
    }
}
