use crate::model::CourseRecord;

pub const SIBLING_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Sibling<'a> {
    pub course: &'a CourseRecord,
    /// Candidate start minus target start, in minutes.
    pub diff_minutes: i64,
    pub abs_diff: i64,
}

/// Other courses at the same campus on the same date, closest start first.
///
/// Ties on distance go to the earlier start. Candidates without a parsable
/// start time are skipped, and a target without one has no siblings.
pub fn siblings_of<'a>(target: &CourseRecord, all: &'a [CourseRecord]) -> Vec<Sibling<'a>> {
    let target_start = match target.start_minutes() {
        Some(minutes) => minutes as i64,
        None => return Vec::new(),
    };
    let mut siblings: Vec<(i64, Sibling<'a>)> = all
        .iter()
        .filter(|c| c.id != target.id && c.campus == target.campus && c.date == target.date)
        .filter_map(|c| {
            let start = c.start_minutes()? as i64;
            let diff_minutes = start - target_start;
            Some((
                start,
                Sibling {
                    course: c,
                    diff_minutes,
                    abs_diff: diff_minutes.abs(),
                },
            ))
        })
        .collect();
    siblings.sort_by_key(|(start, s)| (s.abs_diff, *start));
    siblings
        .into_iter()
        .take(SIBLING_LIMIT)
        .map(|(_, s)| s)
        .collect()
}
