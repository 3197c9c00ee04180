//! Expands decoded weekly slots into concrete calendar occurrences for a
//! displayed date window. Pure date arithmetic, no I/O.

use chrono::{Datelike, Days, NaiveDate, NaiveTime};

use crate::schedule::slot::{Frequency, ScheduleSlot, SessionType};

/// One course's decoded schedule plus the context the projector needs.
/// `anchor` is the course's semester start date when one is set; it fixes
/// the parity epoch for biweekly slots.
#[derive(Debug, Clone)]
pub struct CourseSchedule {
    pub course_id: String,
    pub course_code: String,
    pub course_color: String,
    pub anchor: Option<NaiveDate>,
    pub slots: Vec<ScheduleSlot>,
}

/// One concrete placement of a slot on a specific date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub course_id: String,
    pub course_code: String,
    pub course_color: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub session: SessionType,
}

/// Projects every matching slot onto each day of the inclusive window.
/// Output is ordered by date, then start time, then course code.
pub fn project(
    window_start: NaiveDate,
    window_end: NaiveDate,
    courses: &[CourseSchedule],
) -> Vec<Occurrence> {
    let mut occurrences = Vec::new();
    if window_start > window_end {
        return occurrences;
    }
    for date in window_start.iter_days().take_while(|d| *d <= window_end) {
        for course in courses {
            for slot in &course.slots {
                if slot.day == date.weekday()
                    && frequency_matches(slot.frequency, date, course.anchor)
                {
                    occurrences.push(Occurrence {
                        date,
                        course_id: course.course_id.clone(),
                        course_code: course.course_code.clone(),
                        course_color: course.course_color.clone(),
                        start: slot.start,
                        end: slot.end,
                        session: slot.session,
                    });
                }
            }
        }
    }
    occurrences.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.start.cmp(&b.start))
            .then_with(|| a.course_code.cmp(&b.course_code))
    });
    occurrences
}

/// The month grid as displayed: padded to full weeks, Sunday..Saturday.
/// `None` for an impossible year/month pair.
pub fn month_window(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = next_first.pred_opt()?;
    let start = first - Days::new(u64::from(first.weekday().num_days_from_sunday()));
    let end = last + Days::new(u64::from(6 - last.weekday().num_days_from_sunday()));
    Some((start, end))
}

fn frequency_matches(freq: Frequency, date: NaiveDate, anchor: Option<NaiveDate>) -> bool {
    match freq {
        Frequency::Weekly => true,
        Frequency::BiweeklyEven => week_number(date, anchor).rem_euclid(2) == 0,
        Frequency::BiweeklyOdd => week_number(date, anchor).rem_euclid(2) == 1,
    }
}

/// Week parity epoch: with an anchor, the anchor's ISO week is week 1 and
/// the count runs from its Monday; otherwise the date's own ISO week
/// number is used.
fn week_number(date: NaiveDate, anchor: Option<NaiveDate>) -> i64 {
    match anchor {
        Some(anchor) => {
            let weeks = monday_of(date)
                .signed_duration_since(monday_of(anchor))
                .num_weeks();
            weeks + 1
        }
        None => i64::from(date.iso_week().week()),
    }
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}
