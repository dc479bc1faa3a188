use crate::timeutil::{derive_end_time, minutes_of_day, parse_date};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub type CourseId = i64;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
    pub id: CourseId,
    pub name: String,
    pub date: String,
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    pub campus: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub is_full: bool,
}

/// User-supplied fields for a course that does not exist yet.
#[derive(Debug, Clone, Default)]
pub struct NewCourse {
    pub name: String,
    pub date: String,
    pub start_time: String,
    pub campus: String,
}

#[derive(thiserror::Error, Debug)]
pub enum CourseError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid date (use YYYY-MM-DD): {0}")]
    InvalidDate(String),
    #[error("invalid time (use HH:MM): {0}")]
    InvalidTime(String),
    #[error("no course ids left above {0}")]
    IdsExhausted(CourseId),
    #[error(transparent)]
    Persist(#[from] anyhow::Error),
}

impl CourseRecord {
    pub fn new(id: CourseId, draft: NewCourse) -> Self {
        let mut course = CourseRecord {
            id,
            name: draft.name.trim().to_string(),
            date: draft.date.trim().to_string(),
            start_time: draft.start_time.trim().to_string(),
            end_time: String::new(),
            campus: draft.campus.trim().to_string(),
            count: 0,
            is_full: false,
        };
        course.refresh_end_time();
        course
    }

    pub fn expected_end_time(&self) -> String {
        derive_end_time(&self.name, &self.start_time).unwrap_or_default()
    }

    /// Overwrites a stale `end_time`; returns whether it changed.
    pub fn refresh_end_time(&mut self) -> bool {
        let expected = self.expected_end_time();
        if self.end_time == expected {
            return false;
        }
        self.end_time = expected;
        true
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    pub fn start_minutes(&self) -> Option<u32> {
        minutes_of_day(&self.start_time)
    }

    /// `(date, startTime)` ascending; unparsable values sort after parsable ones.
    pub fn chronological_cmp(&self, other: &CourseRecord) -> Ordering {
        let key = |c: &CourseRecord| {
            let date = c.parsed_date();
            let start = c.start_minutes();
            (date.is_none(), date, start.is_none(), start)
        };
        key(self).cmp(&key(other))
    }
}

impl NewCourse {
    pub fn new(
        name: impl Into<String>,
        date: impl Into<String>,
        start_time: impl Into<String>,
        campus: impl Into<String>,
    ) -> Self {
        NewCourse {
            name: name.into(),
            date: date.into(),
            start_time: start_time.into(),
            campus: campus.into(),
        }
    }

    pub fn validate(&self) -> Result<(), CourseError> {
        require("name", &self.name)?;
        require("date", &self.date)?;
        require("start time", &self.start_time)?;
        require("campus", &self.campus)?;
        validate_schedule(&self.date, &self.start_time)
    }
}

pub fn validate_schedule(date: &str, start_time: &str) -> Result<(), CourseError> {
    require("date", date)?;
    require("start time", start_time)?;
    if parse_date(date).is_none() {
        return Err(CourseError::InvalidDate(date.trim().to_string()));
    }
    if minutes_of_day(start_time).is_none() {
        return Err(CourseError::InvalidTime(start_time.trim().to_string()));
    }
    Ok(())
}

fn require(field: &'static str, value: &str) -> Result<(), CourseError> {
    if value.trim().is_empty() {
        return Err(CourseError::MissingField(field));
    }
    Ok(())
}
