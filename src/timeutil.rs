use chrono::{Datelike, NaiveDate};

pub const MINUTES_PER_DAY: u32 = 24 * 60;
pub const JUNIOR_DURATION_MINUTES: u32 = 90;
pub const STANDARD_DURATION_MINUTES: u32 = 120;

const ARABIC_WEEKDAYS: [(&str, &str); 7] = [
    ("Sunday", "الأحد"),
    ("Monday", "الاثنين"),
    ("Tuesday", "الثلاثاء"),
    ("Wednesday", "الأربعاء"),
    ("Thursday", "الخميس"),
    ("Friday", "الجمعة"),
    ("Saturday", "السبت"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateInfo {
    pub formatted_date: String,
    pub weekday_name: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Junior courses are named `Jr-1` through `Jr-4`, case-insensitive.
pub fn is_junior(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    match lower.strip_prefix("jr-") {
        Some(level) => matches!(level, "1" | "2" | "3" | "4"),
        None => false,
    }
}

pub fn course_duration_minutes(name: &str) -> u32 {
    if is_junior(name) {
        JUNIOR_DURATION_MINUTES
    } else {
        STANDARD_DURATION_MINUTES
    }
}

/// End time for a course starting at `start_time`, wrapping past midnight.
///
/// Returns `None` when the start time is blank or unparsable; callers store
/// that as an empty end time.
pub fn derive_end_time(name: &str, start_time: &str) -> Option<String> {
    let start = minutes_of_day(start_time)?;
    Some(format_minutes(start + course_duration_minutes(name)))
}

pub fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()
}

pub fn date_info(date: &str) -> Option<DateInfo> {
    let parsed = parse_date(date)?;
    Some(DateInfo {
        formatted_date: parsed.format("%d/%m/%Y").to_string(),
        weekday_name: parsed.format("%A").to_string(),
        year: parsed.year(),
        month: parsed.month(),
        day: parsed.day(),
    })
}

pub fn arabic_weekday(weekday_name: &str) -> &str {
    for (english, arabic) in ARABIC_WEEKDAYS.iter() {
        if *english == weekday_name {
            return arabic;
        }
    }
    weekday_name
}

/// Parses `HH:MM` into minutes since midnight.
pub fn minutes_of_day(time: &str) -> Option<u32> {
    let (hours, minutes) = time.trim().split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    Some(hours * 60 + minutes)
}

pub fn format_minutes(minutes: u32) -> String {
    let wrapped = minutes % MINUTES_PER_DAY;
    format!("{:02}:{:02}", wrapped / 60, wrapped % 60)
}

pub fn to_12_hour(time: &str) -> String {
    match minutes_of_day(time) {
        Some(total) => {
            let (hour, suffix) = twelve_hour(total / 60);
            format!("{}:{:02} {}", hour, total % 60, suffix)
        }
        None => time.to_string(),
    }
}

pub fn hour_label(hour: i32) -> String {
    let (hour, suffix) = twelve_hour(hour.rem_euclid(24) as u32);
    format!("{} {}", hour, suffix)
}

fn twelve_hour(hour: u32) -> (u32, &'static str) {
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    (display, suffix)
}

/// Humanizes a signed start-time difference, e.g. `starts 1 hour 5 minutes after`.
pub fn minute_difference_phrase(diff_minutes: i64) -> String {
    if diff_minutes == 0 {
        return "starts at the same time".to_string();
    }
    let magnitude = diff_minutes.unsigned_abs();
    let days = magnitude / MINUTES_PER_DAY as u64;
    let hours = (magnitude % MINUTES_PER_DAY as u64) / 60;
    let minutes = magnitude % 60;

    let mut parts = Vec::new();
    for (value, unit) in [(days, "day"), (hours, "hour"), (minutes, "minute")] {
        if value > 0 {
            let plural = if value == 1 { "" } else { "s" };
            parts.push(format!("{} {}{}", value, unit, plural));
        }
    }
    let direction = if diff_minutes < 0 { "before" } else { "after" };
    format!("starts {} {}", parts.join(" "), direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_time_wraps_past_midnight() {
        assert_eq!(derive_end_time("Adults", "23:30").as_deref(), Some("01:30"));
        assert_eq!(derive_end_time("Jr-2", "23:00").as_deref(), Some("00:30"));
    }

    #[test]
    fn end_time_uses_duration_policy() {
        assert_eq!(derive_end_time("Jr-1", "10:00").as_deref(), Some("11:30"));
        assert_eq!(derive_end_time("Seniors", "10:00").as_deref(), Some("12:00"));
    }

    #[test]
    fn end_time_degrades_to_none() {
        assert_eq!(derive_end_time("Jr-1", ""), None);
        assert_eq!(derive_end_time("Jr-1", "ten:00"), None);
        assert_eq!(derive_end_time("Jr-1", "1000"), None);
    }

    #[test]
    fn junior_detection_is_exact_and_case_insensitive() {
        assert!(is_junior("jr-1"));
        assert!(is_junior("Jr-4"));
        assert!(is_junior("JR-3"));
        assert!(!is_junior("Jr-5"));
        assert!(!is_junior("Jr"));
        assert!(!is_junior("Jr-10"));
        assert!(!is_junior("Jr-1 "));
    }

    #[test]
    fn date_info_formats_and_names_weekday() {
        let info = date_info("2024-03-05").unwrap();
        assert_eq!(info.formatted_date, "05/03/2024");
        assert_eq!(info.weekday_name, "Tuesday");
        assert_eq!((info.year, info.month, info.day), (2024, 3, 5));
        assert!(date_info("2024-02-30").is_none());
    }

    #[test]
    fn arabic_weekday_falls_back_to_input() {
        assert_eq!(arabic_weekday("Friday"), "الجمعة");
        assert_eq!(arabic_weekday("Someday"), "Someday");
    }

    #[test]
    fn minutes_of_day_rejects_garbage() {
        assert_eq!(minutes_of_day("09:05"), Some(545));
        assert_eq!(minutes_of_day("00:00"), Some(0));
        assert_eq!(minutes_of_day("aa:10"), None);
        assert_eq!(minutes_of_day("24:00"), None);
        assert_eq!(minutes_of_day("9"), None);
    }

    #[test]
    fn twelve_hour_conversion() {
        assert_eq!(to_12_hour("00:15"), "12:15 AM");
        assert_eq!(to_12_hour("12:00"), "12:00 PM");
        assert_eq!(to_12_hour("18:45"), "6:45 PM");
        assert_eq!(to_12_hour("soon"), "soon");
    }

    #[test]
    fn hour_label_normalizes_range() {
        assert_eq!(hour_label(0), "12 AM");
        assert_eq!(hour_label(13), "1 PM");
        assert_eq!(hour_label(-1), "11 PM");
        assert_eq!(hour_label(25), "1 AM");
    }

    #[test]
    fn difference_phrase_covers_units() {
        assert_eq!(minute_difference_phrase(0), "starts at the same time");
        assert_eq!(minute_difference_phrase(5), "starts 5 minutes after");
        assert_eq!(minute_difference_phrase(-61), "starts 1 hour 1 minute before");
        assert_eq!(
            minute_difference_phrase(MINUTES_PER_DAY as i64 + 120),
            "starts 1 day 2 hours after"
        );
    }
}
