use crate::calendar::{DaySchedule, GridCell, MonthGrid, WEEKDAY_HEADINGS};
use crate::config::Settings;
use crate::model::{CourseId, CourseRecord, NewCourse};
use crate::planner::{Intent, Planner, ViewModel};
use crate::repository::CountStep;
use crate::storage::{FileStore, StoreLocation};
use crate::timeutil::{
    course_duration_minutes, date_info, derive_end_time, is_junior, minute_difference_phrase,
    to_12_hour,
};
use crate::view::{MonthCursor, ViewMode};
use anyhow::Result;
use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const LINES_PER_HOUR: usize = 2;

pub fn run(planner: Planner<FileStore>, location: StoreLocation, settings: Settings) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(planner, location, settings);
    info!(path = ?app.location.path, "tui started");
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    planner: Planner<FileStore>,
    location: StoreLocation,
    settings: Settings,
    selected: usize,
    list_offset: usize,
    calendar: CalendarState,
    last_save: Instant,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    Creating(CourseForm),
    Editing { course_id: CourseId, form: CourseForm },
    ConfirmDelete { course_id: CourseId },
    Details,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum CalendarFocus {
    Grid,
    Day,
}

struct CalendarState {
    focus: CalendarFocus,
    cursor_day: NaiveDate,
    day_idx: usize,
}

struct CourseForm {
    name: FieldValue,
    date: FieldValue,
    start: FieldValue,
    campus: FieldValue,
    field: FormField,
    schedule_only: bool,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Name,
    Date,
    Start,
    Campus,
}

#[derive(Copy, Clone)]
enum FormAction {
    Create,
    Edit(CourseId),
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn set(&mut self, value: &str) {
        self.value = value.to_string();
        self.cursor = self.value.len();
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char_boundary(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl CalendarState {
    fn new(today: NaiveDate) -> Self {
        CalendarState {
            focus: CalendarFocus::Grid,
            cursor_day: today,
            day_idx: 0,
        }
    }
}

impl App {
    fn new(planner: Planner<FileStore>, location: StoreLocation, settings: Settings) -> Self {
        let status = format!("Loaded courses from {}", location.path.display());
        let calendar = CalendarState::new(planner.today());
        App {
            planner,
            location,
            settings,
            selected: 0,
            list_offset: 0,
            calendar,
            last_save: Instant::now(),
            status,
            mode: Mode::Normal,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            self.planner.set_today(Local::now().date_naive());
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        if let Err(err) = self.planner.flush() {
            warn!(error = %err, "final save failed");
        }
        Ok(())
    }

    /// Sends an intent to the planner and reports the result in the status line.
    fn apply(&mut self, intent: Intent) -> bool {
        let mutates = intent.mutates_store();
        match self.planner.dispatch(intent) {
            Ok(outcome) => {
                if !outcome.message().is_empty() {
                    self.status = outcome.message().to_string();
                }
                let applied = outcome.is_applied();
                if applied && mutates {
                    self.last_save = Instant::now();
                }
                self.ensure_bounds();
                applied
            }
            Err(err) => {
                warn!(error = %err, "command rejected");
                self.status = format!("Error: {}", err);
                false
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Creating(_) | Mode::Editing { .. } => {
                self.handle_form_key(key);
                false
            }
            Mode::ConfirmDelete { .. } => {
                self.handle_confirm_key(key);
                false
            }
            Mode::Details => {
                self.handle_details_key(key);
                false
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('1') => {
                self.set_view(ViewMode::List);
                return false;
            }
            KeyCode::Char('2') => {
                self.set_view(ViewMode::Calendar);
                return false;
            }
            KeyCode::Char('n') => {
                let date = match self.planner.view().view_mode {
                    ViewMode::Calendar => self.calendar.cursor_day.format("%Y-%m-%d").to_string(),
                    ViewMode::List => String::new(),
                };
                self.mode = Mode::Creating(CourseForm::new(&date));
                self.status = "New course (Tab/Shift-Tab move, ↑↓ suggestions, Enter save, Esc cancel)".into();
                return false;
            }
            KeyCode::Char('f') => {
                let options = self
                    .settings
                    .merged_names(self.planner.repository().course_names());
                let next = self.planner.view().active_filter.cycle(&options);
                self.apply(Intent::SetFilter(next));
                self.after_filter_change();
                return false;
            }
            KeyCode::Char('c') => {
                let options = self
                    .settings
                    .merged_campuses(self.planner.repository().campuses());
                let next = self.planner.view().campus_filter.cycle(&options);
                self.apply(Intent::SetCampusFilter(next));
                self.after_filter_change();
                return false;
            }
            _ => {}
        }

        if let Some(id) = self.current_course().map(|c| c.id) {
            match key.code {
                KeyCode::Char('+') | KeyCode::Char('=') => {
                    self.apply(Intent::AdjustCount(id, CountStep::Increment));
                    return false;
                }
                KeyCode::Char('-') => {
                    self.apply(Intent::AdjustCount(id, CountStep::Decrement));
                    return false;
                }
                KeyCode::Char('x') => {
                    let full = self.current_course().map(|c| c.is_full).unwrap_or(false);
                    self.apply(Intent::SetFull(id, !full));
                    return false;
                }
                KeyCode::Char('e') => {
                    if let Some(course) = self.current_course() {
                        let form = CourseForm::from_course(course);
                        self.mode = Mode::Editing {
                            course_id: id,
                            form,
                        };
                        self.status = format!("Rescheduling {}", id);
                    }
                    return false;
                }
                KeyCode::Char('d') => {
                    self.mode = Mode::ConfirmDelete { course_id: id };
                    self.status = format!("Remove {}? (y to confirm, n/Esc to cancel)", id);
                    return false;
                }
                KeyCode::Char('s') => {
                    self.open_details(id);
                    return false;
                }
                _ => {}
            }
        }

        match self.planner.view().view_mode {
            ViewMode::List => self.handle_list_key(key),
            ViewMode::Calendar => self.handle_calendar_key(key),
        }
        false
    }

    fn handle_list_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected += 1;
                self.ensure_bounds();
            }
            KeyCode::Enter => {
                if let Some(id) = self.current_course().map(|c| c.id) {
                    self.open_details(id);
                }
            }
            _ => {}
        }
    }

    fn handle_calendar_key(&mut self, key: KeyEvent) {
        match self.calendar.focus {
            CalendarFocus::Grid => match key.code {
                KeyCode::Left | KeyCode::Char('h') => self.shift_day(-1),
                KeyCode::Right | KeyCode::Char('l') => self.shift_day(1),
                KeyCode::Up | KeyCode::Char('k') => self.shift_day(-7),
                KeyCode::Down | KeyCode::Char('j') => self.shift_day(7),
                KeyCode::Char('[') | KeyCode::PageUp => self.shift_month(-1),
                KeyCode::Char(']') | KeyCode::PageDown => self.shift_month(1),
                KeyCode::Enter => {
                    if self.apply(Intent::SelectDay(Some(self.calendar.cursor_day))) {
                        self.calendar.focus = CalendarFocus::Day;
                        self.calendar.day_idx = 0;
                    }
                }
                KeyCode::Esc => {
                    self.apply(Intent::SelectDay(None));
                }
                KeyCode::Tab => {
                    if self.planner.selected_day().is_some() {
                        self.calendar.focus = CalendarFocus::Day;
                    }
                }
                _ => {}
            },
            CalendarFocus::Day => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.calendar.day_idx = self.calendar.day_idx.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.calendar.day_idx += 1;
                    self.ensure_bounds();
                }
                KeyCode::Enter => {
                    if let Some(id) = self.current_course().map(|c| c.id) {
                        self.open_details(id);
                    }
                }
                KeyCode::Tab => self.calendar.focus = CalendarFocus::Grid,
                KeyCode::Esc => {
                    self.apply(Intent::SelectDay(None));
                    self.calendar.focus = CalendarFocus::Grid;
                }
                KeyCode::Char('[') | KeyCode::PageUp => self.shift_month(-1),
                KeyCode::Char(']') | KeyCode::PageDown => self.shift_month(1),
                _ => {}
            },
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let mut close_form = false;
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        match &mut mode {
            Mode::Creating(form) => {
                close_form = self.process_form_key(FormAction::Create, form, key);
            }
            Mode::Editing { course_id, form } => {
                let id = *course_id;
                close_form = self.process_form_key(FormAction::Edit(id), form, key);
            }
            Mode::ConfirmDelete { .. } | Mode::Details | Mode::Normal => {}
        }
        self.mode = if close_form { Mode::Normal } else { mode };
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let course_id = match &self.mode {
            Mode::ConfirmDelete { course_id } => *course_id,
            _ => return,
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.apply(Intent::RemoveCourse(course_id));
                self.mode = Mode::Normal;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Remove canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
    }

    fn handle_details_key(&mut self, key: KeyEvent) {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('s')
        ) {
            self.apply(Intent::SelectCourse(None));
            self.mode = Mode::Normal;
        }
    }

    fn open_details(&mut self, id: CourseId) {
        if self.apply(Intent::SelectCourse(Some(id))) {
            self.mode = Mode::Details;
        }
    }

    fn set_view(&mut self, view: ViewMode) {
        if self.planner.view().view_mode == view {
            return;
        }
        self.apply(Intent::SetViewMode(view));
        if view == ViewMode::Calendar {
            self.calendar.focus = CalendarFocus::Grid;
            self.sync_cursor_day();
        }
    }

    fn after_filter_change(&mut self) {
        self.selected = 0;
        self.list_offset = 0;
        self.calendar.day_idx = 0;
        self.sync_cursor_day();
    }

    /// Keeps the highlighted day inside the month the planner is showing.
    fn sync_cursor_day(&mut self) {
        let month = self.planner.view().calendar_cursor;
        if MonthCursor::containing(self.calendar.cursor_day) == month {
            return;
        }
        let today = self.planner.today();
        self.calendar.cursor_day = if MonthCursor::containing(today) == month {
            today
        } else {
            month.first_day().unwrap_or(today)
        };
    }

    fn shift_day(&mut self, days: i64) {
        let Some(new_date) = self
            .calendar
            .cursor_day
            .checked_add_signed(ChronoDuration::days(days))
        else {
            return;
        };
        let old = MonthCursor::containing(self.calendar.cursor_day);
        let new = MonthCursor::containing(new_date);
        if old != new {
            let delta = (new.year - old.year) * 12 + new.month as i32 - old.month as i32;
            if !self.apply(Intent::NavigateMonth(delta)) {
                return;
            }
        }
        self.calendar.cursor_day = new_date;
    }

    fn shift_month(&mut self, delta: i32) {
        if self.apply(Intent::NavigateMonth(delta)) {
            self.sync_cursor_day();
        }
    }

    fn process_form_key(&mut self, action: FormAction, form: &mut CourseForm, key: KeyEvent) -> bool {
        let mut close_form = false;
        match key.code {
            KeyCode::Esc => {
                close_form = true;
                self.status = "Canceled".into();
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Left => form.active_field_mut().move_left(),
            KeyCode::Right => form.active_field_mut().move_right(),
            KeyCode::Up => self.suggest(form, -1),
            KeyCode::Down => self.suggest(form, 1),
            KeyCode::Enter => close_form = self.try_submit(action, form),
            KeyCode::Backspace => form.active_field_mut().backspace(),
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    form.active_field_mut().insert_char(c);
                }
            }
            _ => {}
        }
        close_form
    }

    /// Cycles the name/campus field through known values.
    fn suggest(&self, form: &mut CourseForm, step: isize) {
        let options = match form.field {
            FormField::Name => self
                .settings
                .merged_names(self.planner.repository().course_names()),
            FormField::Campus => self
                .settings
                .merged_campuses(self.planner.repository().campuses()),
            FormField::Date | FormField::Start => return,
        };
        if options.is_empty() {
            return;
        }
        let field = form.active_field_mut();
        let len = options.len() as isize;
        let next = match options.iter().position(|o| *o == field.value) {
            Some(idx) => (idx as isize + step).rem_euclid(len),
            None if step < 0 => len - 1,
            None => 0,
        };
        field.set(&options[next as usize]);
    }

    fn try_submit(&mut self, action: FormAction, form: &CourseForm) -> bool {
        let intent = match action {
            FormAction::Create => Intent::AddCourse(NewCourse::new(
                form.name.value.clone(),
                form.date.value.clone(),
                form.start.value.clone(),
                form.campus.value.clone(),
            )),
            FormAction::Edit(id) => Intent::EditSchedule {
                id,
                date: form.date.value.clone(),
                start_time: form.start.value.clone(),
            },
        };
        match self.planner.dispatch(intent) {
            Ok(outcome) => {
                if outcome.is_applied() {
                    self.last_save = Instant::now();
                }
                self.status = outcome.message().to_string();
                self.ensure_bounds();
                true
            }
            Err(err) => {
                self.status = match action {
                    FormAction::Create => format!("Could not create: {}", err),
                    FormAction::Edit(_) => format!("Could not edit: {}", err),
                };
                false
            }
        }
    }

    fn current_course(&self) -> Option<&CourseRecord> {
        match self.planner.view().view_mode {
            ViewMode::List => self.planner.visible_courses().get(self.selected).copied(),
            ViewMode::Calendar => {
                if self.calendar.focus != CalendarFocus::Day {
                    return None;
                }
                let day = self.planner.selected_day()?;
                self.planner
                    .day_schedule(day)
                    .courses
                    .get(self.calendar.day_idx)
                    .copied()
            }
        }
    }

    fn ensure_bounds(&mut self) {
        let visible = self.planner.visible_courses().len();
        if self.selected >= visible {
            self.selected = visible.saturating_sub(1);
        }
        let day_len = self
            .planner
            .selected_day()
            .map(|day| self.planner.day_schedule(day).course_count())
            .unwrap_or(0);
        if self.calendar.day_idx >= day_len {
            self.calendar.day_idx = day_len.saturating_sub(1);
        }
        if self.planner.selected_day().is_none() {
            self.calendar.focus = CalendarFocus::Grid;
        }
        if matches!(self.mode, Mode::Details) && self.planner.selected_course().is_none() {
            self.mode = Mode::Normal;
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        let list_offset = match self.planner.view_model() {
            ViewModel::List(courses) => Some(self.draw_list(f, layout[1], &courses)),
            ViewModel::Calendar { grid, day } => {
                self.draw_calendar(f, layout[1], &grid, day.as_ref());
                None
            }
        };
        if let Some(offset) = list_offset {
            self.list_offset = offset;
        }
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::Creating(form) => self.draw_form(f, "New Course", form),
            Mode::Editing { form, .. } => self.draw_form(f, "Reschedule Course", form),
            Mode::ConfirmDelete { course_id } => self.draw_confirm(f, *course_id),
            Mode::Details => self.draw_details(f),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let view = self.planner.view();
        let title = Line::from(vec![
            Span::styled(
                "courseboard ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(self.location.scope.label(), Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.location.path.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(Color::Gray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("view {}", view.view_mode.label().to_lowercase()),
                Style::default().fg(Color::Magenta),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("course {}  campus {}", view.active_filter, view.campus_filter),
                Style::default().fg(Color::LightYellow),
            ),
        ]);

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_list(&self, f: &mut ratatui::Frame<'_>, area: Rect, courses: &[&CourseRecord]) -> usize {
        let mut state = ListState::default();
        // Each course renders as two lines.
        let viewport = (area.height.saturating_sub(2) / 2) as usize;
        let selected = self.selected.min(courses.len().saturating_sub(1));
        let offset = adjust_offset(selected, self.list_offset, viewport, 1, courses.len());
        *state.offset_mut() = offset;
        if !courses.is_empty() {
            state.select(Some(selected));
        }

        let items = if courses.is_empty() {
            vec![ListItem::new("No courses match the current filters")]
        } else {
            courses.iter().map(|c| course_item(c)).collect()
        };
        let block = Block::default()
            .title(Span::styled(
                format!("Courses ({})", courses.len()),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(Color::LightCyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, area, &mut state);
        offset
    }

    fn draw_calendar(
        &self,
        f: &mut ratatui::Frame<'_>,
        area: Rect,
        grid: &MonthGrid,
        day: Option<&DaySchedule<'_>>,
    ) {
        let sections = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        self.draw_month(f, sections[0], grid);
        match day {
            Some(schedule) => self.draw_day_schedule(f, sections[1], schedule),
            None => {
                let hint = Paragraph::new("Press Enter on a day to open its schedule")
                    .alignment(Alignment::Center)
                    .block(
                        Block::default()
                            .title("Day")
                            .borders(Borders::ALL)
                            .border_style(Style::default().fg(Color::DarkGray)),
                    );
                f.render_widget(hint, sections[1]);
            }
        }
    }

    fn draw_month(&self, f: &mut ratatui::Frame<'_>, area: Rect, grid: &MonthGrid) {
        let focused = self.calendar.focus == CalendarFocus::Grid;
        let title = grid
            .cursor
            .first_day()
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| grid.cursor.to_string());
        let mut lines = vec![Line::from(Span::styled(
            title,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))];
        let header_spans: Vec<Span<'static>> = WEEKDAY_HEADINGS
            .iter()
            .map(|h| Span::styled(format!("{:^7}", h), Style::default().fg(Color::Gray)))
            .collect();
        lines.push(Line::from(header_spans));

        for week in grid.weeks() {
            let mut spans = Vec::new();
            for cell in week {
                match cell {
                    GridCell::Padding => spans.push(Span::raw("       ")),
                    GridCell::Day(day) => {
                        let count = day.course_ids.len();
                        let text = if count > 0 {
                            format!("{:>2}({:>2})", day.date.day(), count)
                        } else {
                            format!("{:>2}    ", day.date.day())
                        };
                        let mut style = Style::default().fg(if day.has_courses() {
                            Color::LightYellow
                        } else {
                            Color::Gray
                        });
                        if day.is_today {
                            style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
                        }
                        if day.date == self.calendar.cursor_day {
                            style = style
                                .bg(if focused { Color::Cyan } else { Color::Blue })
                                .fg(Color::Black)
                                .add_modifier(Modifier::BOLD);
                        }
                        spans.push(Span::styled(format!("{:>6}", text), style));
                        spans.push(Span::raw(" "));
                    }
                }
            }
            lines.push(Line::from(spans));
        }

        let cursor_count = grid
            .day(self.calendar.cursor_day)
            .map(|day| day.course_ids.len())
            .unwrap_or(0);
        let block = Block::default()
            .title(Span::styled(
                format!("Calendar ({} on {})", cursor_count, self.calendar.cursor_day.format("%d/%m")),
                Style::default()
                    .fg(if focused { Color::Cyan } else { Color::Gray })
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused {
                Color::Cyan
            } else {
                Color::DarkGray
            }));
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_day_schedule(&self, f: &mut ratatui::Frame<'_>, area: Rect, schedule: &DaySchedule<'_>) {
        let focused = self.calendar.focus == CalendarFocus::Day;
        let selected_id = if focused {
            schedule.courses.get(self.calendar.day_idx).map(|c| c.id)
        } else {
            None
        };
        let px_per_line = self.settings.layout.row_height_px / LINES_PER_HOUR as f32;
        let total_lines = schedule.hours.len() * LINES_PER_HOUR;

        let mut rows: Vec<Vec<Span<'static>>> = (0..total_lines)
            .map(|idx| {
                let label = if idx % LINES_PER_HOUR == 0 {
                    schedule.hours[idx / LINES_PER_HOUR].label.clone()
                } else {
                    String::new()
                };
                vec![Span::styled(
                    format!("{:>5} │ ", label),
                    Style::default().fg(Color::DarkGray),
                )]
            })
            .collect();

        for event in &schedule.events {
            let first = (event.top_px / px_per_line).floor() as usize;
            let span = ((event.height_px / px_per_line).ceil() as usize).max(1);
            let mut style = Style::default().fg(if is_junior(&event.course.name) {
                Color::LightGreen
            } else {
                Color::LightBlue
            });
            if Some(event.course.id) == selected_id {
                style = style.bg(Color::LightCyan).fg(Color::Black).add_modifier(Modifier::BOLD);
            }
            for line in first..(first + span).min(total_lines) {
                let text = if line == first {
                    format!(
                        "█ {} {}-{} ",
                        event.course.name,
                        event.course.start_time,
                        event.course.end_time
                    )
                } else {
                    "┆ ".to_string()
                };
                rows[line].push(Span::styled(text, style));
            }
        }

        let mut lines: Vec<Line<'static>> = rows.into_iter().map(Line::from).collect();
        let hidden = schedule.course_count() - schedule.events.len();
        let mut summary = format!("{} course(s)", schedule.course_count());
        if hidden > 0 {
            summary.push_str(&format!(", {} outside the window", hidden));
        }
        lines.push(Line::from(Span::styled(summary, Style::default().fg(Color::Gray))));

        let title = match date_info(&schedule.date.format("%Y-%m-%d").to_string()) {
            Some(info) => format!("{} {}", info.weekday_name, info.formatted_date),
            None => "Invalid Date".to_string(),
        };
        let block = Block::default()
            .title(Span::styled(
                title,
                Style::default()
                    .fg(if focused { Color::Cyan } else { Color::Gray })
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused {
                Color::Cyan
            } else {
                Color::DarkGray
            }));
        f.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let detail = match self.current_course() {
            Some(course) => selected_course_detail(course),
            None => Line::from("No course selected"),
        };
        let detail = Paragraph::new(detail).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray))
                .title("Selected"),
        );
        f.render_widget(detail, bottom[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let mut spans = vec![
            Span::styled("1", Style::default().fg(Color::LightCyan)),
            Span::raw(" list  "),
            Span::styled("2", Style::default().fg(Color::LightCyan)),
            Span::raw(" calendar  "),
            Span::styled("f/c", Style::default().fg(Color::LightYellow)),
            Span::raw(" course/campus filter  "),
        ];
        match self.planner.view().view_mode {
            ViewMode::List => spans.extend([
                Span::styled("↑↓ / j k", Style::default().fg(Color::LightCyan)),
                Span::raw(" move  "),
            ]),
            ViewMode::Calendar => spans.extend([
                Span::styled("←↑↓→", Style::default().fg(Color::LightCyan)),
                Span::raw(" day  "),
                Span::styled("[ ]", Style::default().fg(Color::LightCyan)),
                Span::raw(" month  "),
                Span::styled("Enter", Style::default().fg(Color::LightYellow)),
                Span::raw(" open day  "),
                Span::styled("Tab", Style::default().fg(Color::LightCyan)),
                Span::raw(" focus  "),
            ]),
        }
        spans.extend([
            Span::styled("+/-", Style::default().fg(Color::LightGreen)),
            Span::raw(" count  "),
            Span::styled("x", Style::default().fg(Color::LightGreen)),
            Span::raw(" full  "),
            Span::styled("s", Style::default().fg(Color::LightYellow)),
            Span::raw(" siblings  "),
            Span::styled("n", Style::default().fg(Color::LightMagenta)),
            Span::raw(" new  "),
            Span::styled("e", Style::default().fg(Color::LightYellow)),
            Span::raw(" edit  "),
            Span::styled("d", Style::default().fg(Color::LightRed)),
            Span::raw(" delete  "),
            Span::styled("q", Style::default().fg(Color::LightRed)),
            Span::raw(" quit"),
        ]);
        Line::from(spans)
    }

    fn draw_form(&self, f: &mut ratatui::Frame<'_>, title: &str, form: &CourseForm) {
        let area = centered_rect(60, 50, f.size());
        let mut fields = Vec::new();
        if form.schedule_only {
            fields.push(field_line("Name", &form.name, false));
        } else {
            fields.push(field_line("Name", &form.name, form.field == FormField::Name));
        }
        fields.push(field_line(
            "Date (YYYY-MM-DD)",
            &form.date,
            form.field == FormField::Date,
        ));
        fields.push(field_line(
            "Start (HH:MM)",
            &form.start,
            form.field == FormField::Start,
        ));
        if form.schedule_only {
            fields.push(field_line("Campus", &form.campus, false));
        } else {
            fields.push(field_line("Campus", &form.campus, form.field == FormField::Campus));
        }
        let preview = match derive_end_time(&form.name.value, &form.start.value) {
            Some(end) => format!(
                "Ends at {} ({} min)",
                to_12_hour(&end),
                course_duration_minutes(&form.name.value)
            ),
            None => "End time appears once the start time is valid".to_string(),
        };
        fields.push(Line::from(""));
        fields.push(Line::from(Span::styled(
            preview,
            Style::default().fg(Color::LightGreen),
        )));
        fields.push(Line::from(Span::styled(
            "Enter to save • Esc to cancel • Tab/Shift-Tab to move • ↑↓ known names/campuses",
            Style::default().fg(Color::Gray),
        )));
        let dialog = Paragraph::new(fields)
            .block(
                Block::default()
                    .title(Span::styled(
                        title.to_string(),
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, course_id: CourseId) {
        let area = centered_rect(50, 30, f.size());
        let label = self
            .planner
            .repository()
            .find_by_id(course_id)
            .map(|c| format!("{} on {} at {}", c.name, c.date, c.start_time))
            .unwrap_or_else(|| course_id.to_string());
        let body = vec![
            Line::from(Span::styled(
                format!("Remove \"{}\"?", label),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    "Confirm Remove",
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_details(&self, f: &mut ratatui::Frame<'_>) {
        let area = centered_rect(70, 60, f.size());
        let Some(detail) = self.planner.selected_detail() else {
            return;
        };
        let course = detail.course;
        let when = match (&detail.info, detail.arabic_weekday()) {
            (Some(info), Some(arabic)) => {
                format!("{} ({} / {})", info.formatted_date, info.weekday_name, arabic)
            }
            _ => "Invalid Date".to_string(),
        };
        let mut lines = vec![
            Line::from(Span::styled(
                course.name.clone(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("Date: {}", when)),
            Line::from(format!(
                "Time: {} - {}",
                to_12_hour(&course.start_time),
                display_end(course)
            )),
            Line::from(format!("Campus: {}", course.campus)),
            Line::from(format!(
                "Count: {}{}",
                course.count,
                if course.is_full { " (full)" } else { "" }
            )),
            Line::from(""),
            Line::from(Span::styled(
                format!("Nearest at {} that day", course.campus),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
        ];
        if detail.siblings.is_empty() {
            lines.push(Line::from("No other courses"));
        }
        for sibling in &detail.siblings {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{} ", sibling.course.name),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    to_12_hour(&sibling.course.start_time),
                    Style::default().fg(Color::LightYellow),
                ),
                Span::raw("  "),
                Span::styled(
                    minute_difference_phrase(sibling.diff_minutes),
                    Style::default().fg(Color::Gray),
                ),
            ]));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Esc to close",
            Style::default().fg(Color::Gray),
        )));
        let dialog = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(Span::styled(
                        "Course",
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true });
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

impl CourseForm {
    fn new(date: &str) -> Self {
        CourseForm {
            name: FieldValue::new(""),
            date: FieldValue::new(date),
            start: FieldValue::new(""),
            campus: FieldValue::new(""),
            field: FormField::Name,
            schedule_only: false,
        }
    }

    fn from_course(course: &CourseRecord) -> Self {
        CourseForm {
            name: FieldValue::new(&course.name),
            date: FieldValue::new(&course.date),
            start: FieldValue::new(&course.start_time),
            campus: FieldValue::new(&course.campus),
            field: FormField::Date,
            schedule_only: true,
        }
    }

    fn next_field(&mut self) {
        self.field = match (self.field, self.schedule_only) {
            (FormField::Date, true) => FormField::Start,
            (_, true) => FormField::Date,
            (FormField::Name, false) => FormField::Date,
            (FormField::Date, false) => FormField::Start,
            (FormField::Start, false) => FormField::Campus,
            (FormField::Campus, false) => FormField::Name,
        };
    }

    fn prev_field(&mut self) {
        self.field = match (self.field, self.schedule_only) {
            (FormField::Start, true) => FormField::Date,
            (_, true) => FormField::Start,
            (FormField::Name, false) => FormField::Campus,
            (FormField::Date, false) => FormField::Name,
            (FormField::Start, false) => FormField::Date,
            (FormField::Campus, false) => FormField::Start,
        };
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            FormField::Name => &mut self.name,
            FormField::Date => &mut self.date,
            FormField::Start => &mut self.start,
            FormField::Campus => &mut self.campus,
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn prev_char_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn display_end(course: &CourseRecord) -> String {
    if course.end_time.is_empty() {
        "?".to_string()
    } else {
        to_12_hour(&course.end_time)
    }
}

fn course_item(course: &CourseRecord) -> ListItem<'static> {
    let when = match date_info(&course.date) {
        Some(info) => format!("{} ({})", info.formatted_date, info.weekday_name),
        None => "Invalid Date".to_string(),
    };
    let accent = if is_junior(&course.name) {
        Color::LightGreen
    } else {
        Color::LightBlue
    };
    let first = Line::from(vec![
        Span::styled(format!("[{}]", course.id), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            course.name.clone(),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(when, Style::default().fg(Color::LightYellow)),
    ]);
    let mut second = vec![
        Span::raw("    "),
        Span::styled(
            format!("{} - {}", to_12_hour(&course.start_time), display_end(course)),
            Style::default().fg(Color::White),
        ),
        Span::raw("  "),
        Span::styled(course.campus.clone(), Style::default().fg(Color::LightMagenta)),
        Span::raw("  "),
        Span::styled(format!("count {}", course.count), Style::default().fg(Color::Gray)),
    ];
    if course.is_full {
        second.push(Span::raw("  "));
        second.push(Span::styled(
            "FULL",
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        ));
    }
    ListItem::new(vec![first, Line::from(second)]).style(Style::default().fg(Color::Gray))
}

fn field_line(label: &str, field: &FieldValue, active: bool) -> Line<'static> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(text, value_style),
    ])
}

fn selected_course_detail(course: &CourseRecord) -> Line<'static> {
    let mut spans = vec![Span::styled(
        course.name.clone(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("{} {}", course.date, course.start_time),
        Style::default().fg(Color::LightRed),
    ));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        course.campus.clone(),
        Style::default().fg(Color::LightMagenta),
    ));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("count {}", course.count),
        Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
    ));
    Line::from(spans)
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}
