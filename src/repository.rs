use crate::model::{validate_schedule, CourseError, CourseId, CourseRecord, NewCourse};
use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};

/// Key-value persistence for the course collection.
pub trait CourseStore {
    fn load(&self) -> Result<Vec<CourseRecord>>;
    fn save(&mut self, courses: &[CourseRecord]) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountStep {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountChange {
    Changed(u32),
    /// Decrement requested at zero.
    Floor,
    /// The course is marked full.
    Locked,
    Missing,
}

/// Owns the in-memory course list and writes it back after every mutation.
///
/// The list is kept chronologically sorted and every record's `end_time`
/// matches its `(name, start_time)`; both hold after `open` and after each
/// mutating call.
pub struct CourseRepository<S: CourseStore> {
    store: S,
    courses: Vec<CourseRecord>,
    last_issued: CourseId,
}

impl<S: CourseStore> CourseRepository<S> {
    pub fn open(store: S) -> Result<Self, CourseError> {
        let courses = match store.load() {
            Ok(courses) => courses,
            Err(err) => {
                warn!(error = %format!("{:#}", err), "stored courses unreadable, starting empty");
                Vec::new()
            }
        };
        let mut repo = CourseRepository {
            store,
            courses,
            last_issued: 0,
        };
        let reassigned = repo.reassign_duplicate_ids();
        let stale = repo
            .courses
            .iter_mut()
            .map(|c| c.refresh_end_time())
            .filter(|changed| *changed)
            .count();
        repo.sort();
        debug!(count = repo.courses.len(), "loaded courses");
        if stale > 0 {
            info!(stale, "re-derived stale end times");
        }
        if stale > 0 || reassigned > 0 {
            // The repaired list stays in memory; the next mutation retries the write.
            if let Err(err) = repo.persist() {
                warn!(error = %err, "could not write repaired courses");
            }
        }
        Ok(repo)
    }

    pub fn all(&self) -> &[CourseRecord] {
        &self.courses
    }

    pub fn find_by_id(&self, id: CourseId) -> Option<&CourseRecord> {
        self.courses.iter().find(|c| c.id == id)
    }

    pub fn add(&mut self, draft: NewCourse) -> Result<CourseId, CourseError> {
        draft.validate()?;
        let id = self.next_id()?;
        let course = CourseRecord::new(id, draft);
        info!(id, name = %course.name, date = %course.date, "adding course");
        self.courses.push(course);
        self.sort();
        self.persist()?;
        Ok(id)
    }

    /// Removing an unknown id is a no-op and does not touch the store.
    pub fn remove(&mut self, id: CourseId) -> Result<bool, CourseError> {
        let before = self.courses.len();
        self.courses.retain(|c| c.id != id);
        if self.courses.len() == before {
            debug!(id, "remove ignored, no such course");
            return Ok(false);
        }
        info!(id, "removed course");
        self.persist()?;
        Ok(true)
    }

    pub fn update<F>(&mut self, id: CourseId, f: F) -> Result<bool, CourseError>
    where
        F: FnOnce(&mut CourseRecord),
    {
        let course = match self.courses.iter_mut().find(|c| c.id == id) {
            Some(course) => course,
            None => return Ok(false),
        };
        f(course);
        course.id = id;
        course.refresh_end_time();
        self.sort();
        self.persist()?;
        Ok(true)
    }

    pub fn adjust_count(&mut self, id: CourseId, step: CountStep) -> Result<CountChange, CourseError> {
        let course = match self.find_by_id(id) {
            Some(course) => course,
            None => return Ok(CountChange::Missing),
        };
        if course.is_full {
            return Ok(CountChange::Locked);
        }
        let next = match step {
            CountStep::Increment => course.count.saturating_add(1),
            CountStep::Decrement if course.count == 0 => return Ok(CountChange::Floor),
            CountStep::Decrement => course.count - 1,
        };
        self.update(id, |c| c.count = next)?;
        Ok(CountChange::Changed(next))
    }

    pub fn set_full(&mut self, id: CourseId, full: bool) -> Result<bool, CourseError> {
        self.update(id, |c| c.is_full = full)
    }

    pub fn edit_schedule(
        &mut self,
        id: CourseId,
        date: &str,
        start_time: &str,
    ) -> Result<bool, CourseError> {
        validate_schedule(date, start_time)?;
        let date = date.trim().to_string();
        let start_time = start_time.trim().to_string();
        self.update(id, move |c| {
            c.date = date;
            c.start_time = start_time;
        })
    }

    pub fn course_names(&self) -> Vec<String> {
        distinct(self.courses.iter().map(|c| c.name.as_str()))
    }

    pub fn campuses(&self) -> Vec<String> {
        distinct(self.courses.iter().map(|c| c.campus.as_str()))
    }

    /// Writes the current collection even when nothing changed.
    pub fn flush(&mut self) -> Result<(), CourseError> {
        self.persist()
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    fn persist(&mut self) -> Result<(), CourseError> {
        self.store.save(&self.courses)?;
        Ok(())
    }

    fn sort(&mut self) {
        self.courses.sort_by(|a, b| a.chronological_cmp(b));
    }

    /// Later records sharing an id with an earlier one get a fresh id.
    fn reassign_duplicate_ids(&mut self) -> usize {
        let mut seen: Vec<CourseId> = Vec::with_capacity(self.courses.len());
        let mut duplicates = Vec::new();
        for (idx, course) in self.courses.iter().enumerate() {
            if seen.contains(&course.id) {
                duplicates.push(idx);
            } else {
                seen.push(course.id);
            }
        }
        let mut dropped = Vec::new();
        for &idx in &duplicates {
            match self.next_id() {
                Ok(id) => {
                    warn!(old = self.courses[idx].id, new = id, "reassigned duplicate course id");
                    self.courses[idx].id = id;
                }
                Err(err) => {
                    warn!(error = %err, "dropping course with duplicate id");
                    dropped.push(idx);
                }
            }
        }
        for &idx in dropped.iter().rev() {
            self.courses.remove(idx);
        }
        duplicates.len()
    }

    fn next_id(&mut self) -> Result<CourseId, CourseError> {
        let highest = self.courses.iter().map(|c| c.id).max().unwrap_or(0).max(self.last_issued);
        let floor = highest
            .checked_add(1)
            .ok_or(CourseError::IdsExhausted(highest))?;
        let id = Utc::now().timestamp_millis().max(floor);
        self.last_issued = id;
        Ok(id)
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for value in values {
        if !seen.iter().any(|s| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}


#[cfg(test)]
mod tests {
    use super::test_support::{course, MemoryStore};
    use super::*;

    fn repo_with(courses: &[CourseRecord]) -> CourseRepository<MemoryStore> {
        CourseRepository::open(MemoryStore::with(courses)).unwrap()
    }

    #[test]
    fn add_assigns_unique_ids_and_saves() {
        let mut repo = CourseRepository::open(MemoryStore::default()).unwrap();
        let a = repo
            .add(NewCourse::new("Adults", "2024-05-01", "09:00", "North"))
            .unwrap();
        let b = repo
            .add(NewCourse::new("Adults", "2024-05-01", "10:00", "North"))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(repo.all().len(), 2);
        assert_eq!(repo.store().saves, 2);
        assert_eq!(repo.find_by_id(a).unwrap().end_time, "11:00");
    }

    #[test]
    fn add_rejects_invalid_input_without_mutating() {
        let mut repo = CourseRepository::open(MemoryStore::default()).unwrap();
        let err = repo
            .add(NewCourse::new("Adults", "2024-05-01", "", "North"))
            .unwrap_err();
        assert!(matches!(err, CourseError::MissingField("start time")));
        assert!(repo.all().is_empty());
        assert_eq!(repo.store().saves, 0);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut repo = repo_with(&[course(1, "Adults", "2024-05-01", "09:00", "North")]);
        assert!(repo.remove(1).unwrap());
        assert!(!repo.remove(1).unwrap());
        assert!(repo.all().is_empty());
        assert_eq!(repo.store().saves, 1);
    }

    #[test]
    fn all_is_chronological() {
        let mut repo = repo_with(&[
            course(1, "A", "2024-05-02", "08:00", "North"),
            course(2, "B", "2024-05-01", "18:00", "North"),
            course(3, "C", "2024-05-01", "07:30", "North"),
        ]);
        let ids: Vec<_> = repo.all().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        repo.edit_schedule(1, "2024-04-30", "12:00").unwrap();
        let ids: Vec<_> = repo.all().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn edit_rederives_end_time() {
        let mut repo = repo_with(&[course(1, "Jr-2", "2024-05-01", "09:00", "North")]);
        assert!(repo.edit_schedule(1, "2024-05-03", "23:00").unwrap());
        let updated = repo.find_by_id(1).unwrap();
        assert_eq!(updated.date, "2024-05-03");
        assert_eq!(updated.end_time, "00:30");
    }

    #[test]
    fn edit_of_missing_course_is_silent() {
        let mut repo = repo_with(&[]);
        assert!(!repo.edit_schedule(42, "2024-05-03", "10:00").unwrap());
        assert_eq!(repo.store().saves, 0);
    }

    #[test]
    fn count_never_goes_negative() {
        let mut repo = repo_with(&[course(1, "Adults", "2024-05-01", "09:00", "North")]);
        assert_eq!(repo.adjust_count(1, CountStep::Decrement).unwrap(), CountChange::Floor);
        assert_eq!(repo.find_by_id(1).unwrap().count, 0);
        assert_eq!(
            repo.adjust_count(1, CountStep::Increment).unwrap(),
            CountChange::Changed(1)
        );
        assert_eq!(
            repo.adjust_count(1, CountStep::Decrement).unwrap(),
            CountChange::Changed(0)
        );
    }

    #[test]
    fn full_course_locks_count() {
        let mut repo = repo_with(&[course(1, "Adults", "2024-05-01", "09:00", "North")]);
        repo.adjust_count(1, CountStep::Increment).unwrap();
        repo.set_full(1, true).unwrap();
        assert_eq!(repo.adjust_count(1, CountStep::Increment).unwrap(), CountChange::Locked);
        assert_eq!(repo.adjust_count(1, CountStep::Decrement).unwrap(), CountChange::Locked);
        assert_eq!(repo.find_by_id(1).unwrap().count, 1);
        assert_eq!(repo.adjust_count(9, CountStep::Increment).unwrap(), CountChange::Missing);
    }

    #[test]
    fn stale_end_times_are_rewritten_on_open() {
        let mut stale = course(1, "Jr-1", "2024-05-01", "09:00", "North");
        stale.end_time = "11:00".into();
        let repo = repo_with(&[stale]);
        assert_eq!(repo.find_by_id(1).unwrap().end_time, "10:30");
        assert_eq!(repo.store().saves, 1);
        assert!(repo.store().serialized.as_deref().unwrap().contains("10:30"));
    }

    #[test]
    fn load_then_save_leaves_store_untouched() {
        let courses = [
            course(1, "Adults", "2024-05-01", "09:00", "North"),
            course(2, "Jr-4", "2024-05-02", "16:00", "South"),
        ];
        let original = serde_yaml::to_string(&courses).unwrap();
        let mut repo = repo_with(&courses);
        assert_eq!(repo.store().saves, 0);
        repo.flush().unwrap();
        assert_eq!(repo.store().serialized.as_deref(), Some(original.as_str()));
    }

    #[test]
    fn unreadable_store_degrades_to_empty() {
        let store = MemoryStore {
            fail_load: true,
            ..MemoryStore::default()
        };
        let repo = CourseRepository::open(store).unwrap();
        assert!(repo.all().is_empty());
    }

    #[test]
    fn distinct_names_and_campuses_keep_first_seen_order() {
        let repo = repo_with(&[
            course(1, "Adults", "2024-05-01", "09:00", "North"),
            course(2, "Jr-1", "2024-05-01", "10:00", "South"),
            course(3, "Adults", "2024-05-02", "09:00", "North"),
        ]);
        assert_eq!(repo.course_names(), vec!["Adults", "Jr-1"]);
        assert_eq!(repo.campuses(), vec!["North", "South"]);
    }

    #[test]
    fn ids_stay_unique_after_removal() {
        let mut repo = repo_with(&[]);
        let first = repo
            .add(NewCourse::new("Adults", "2024-05-01", "09:00", "North"))
            .unwrap();
        repo.remove(first).unwrap();
        let second = repo
            .add(NewCourse::new("Adults", "2024-05-01", "09:00", "North"))
            .unwrap();
        assert!(second > first);
    }

    #[test]
    fn failed_repair_write_still_opens() {
        let mut stale = course(1, "Jr-1", "2024-05-01", "09:00", "North");
        stale.end_time = "11:00".into();
        let store = MemoryStore {
            fail_save: true,
            ..MemoryStore::with(&[stale])
        };
        let mut repo = CourseRepository::open(store).unwrap();
        assert_eq!(repo.find_by_id(1).unwrap().end_time, "10:30");
        assert!(repo.store().serialized.as_deref().unwrap().contains("11:00"));
        assert!(repo.flush().is_err());
    }

    #[test]
    fn duplicate_ids_are_reassigned_on_open() {
        let repo = repo_with(&[
            course(7, "Adults", "2024-05-01", "09:00", "North"),
            course(7, "Jr-1", "2024-05-02", "10:00", "North"),
        ]);
        let ids: Vec<_> = repo.all().iter().map(|c| c.id).collect();
        assert_eq!(ids[0], 7);
        assert_ne!(ids[1], 7);
        assert_eq!(repo.find_by_id(ids[1]).unwrap().name, "Jr-1");
        assert_eq!(repo.store().saves, 1);
    }

    #[test]
    fn add_after_max_id_is_rejected() {
        let mut repo = repo_with(&[course(i64::MAX, "Adults", "2024-05-01", "09:00", "North")]);
        let err = repo
            .add(NewCourse::new("Jr-1", "2024-05-02", "10:00", "North"))
            .unwrap_err();
        assert!(matches!(err, CourseError::IdsExhausted(i64::MAX)));
        assert_eq!(repo.all().len(), 1);
        assert_eq!(repo.store().saves, 0);
    }
}
