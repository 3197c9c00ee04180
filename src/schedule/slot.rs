use chrono::{NaiveTime, Weekday};
use thiserror::Error;

/// One recurring weekly class meeting embedded in a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSlot {
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub session: SessionType,
    pub frequency: Frequency,
}

impl ScheduleSlot {
    /// A slot is meaningless with an empty or inverted time range, so
    /// construction enforces `start < end`.
    pub fn new(
        day: Weekday,
        start: NaiveTime,
        end: NaiveTime,
        session: SessionType,
        frequency: Frequency,
    ) -> Result<Self, SlotError> {
        if start >= end {
            return Err(SlotError::EmptyTimeRange {
                start: format_time(start),
                end: format_time(end),
            });
        }
        Ok(Self { day, start, end, session, frequency })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    Lecture,
    Lab,
    Tutorial,
    Seminar,
    DiscussionGroup,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Lecture => "Lecture",
            SessionType::Lab => "Lab",
            SessionType::Tutorial => "Tutorial",
            SessionType::Seminar => "Seminar",
            SessionType::DiscussionGroup => "Discussion-Group",
        }
    }

    pub fn parse(s: &str) -> Result<Self, SlotError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lecture" => Ok(SessionType::Lecture),
            "lab" => Ok(SessionType::Lab),
            "tutorial" => Ok(SessionType::Tutorial),
            "seminar" => Ok(SessionType::Seminar),
            "discussion-group" | "discussion group" | "discussion" => {
                Ok(SessionType::DiscussionGroup)
            }
            _ => Err(SlotError::InvalidSessionType(s.to_string())),
        }
    }
}

impl Default for SessionType {
    fn default() -> Self {
        SessionType::Lecture
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Weekly,
    BiweeklyEven,
    BiweeklyOdd,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::BiweeklyEven => "biweekly-even",
            Frequency::BiweeklyOdd => "biweekly-odd",
        }
    }

    pub fn parse(s: &str) -> Result<Self, SlotError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Frequency::Weekly),
            "biweekly-even" | "bi-weekly-even" => Ok(Frequency::BiweeklyEven),
            "biweekly-odd" | "bi-weekly-odd" => Ok(Frequency::BiweeklyOdd),
            _ => Err(SlotError::InvalidFrequency(s.to_string())),
        }
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::Weekly
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("unrecognized day token '{0}'")]
    InvalidDay(String),

    #[error("time '{0}' is not in HH:MM form")]
    InvalidTime(String),

    #[error("time range {start}-{end} must start before it ends")]
    EmptyTimeRange { start: String, end: String },

    #[error("unrecognized session type '{0}'")]
    InvalidSessionType(String),

    #[error("unrecognized frequency '{0}'")]
    InvalidFrequency(String),

    #[error("slot is not an encoded object or 'DAY HH:MM-HH:MM' token")]
    Malformed,
}

/// Canonical three-letter day token, the form `encode` emits.
pub fn day_token(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// Accepts the canonical token, full names, and any casing ("Mon",
/// "monday", "MONDAY").
pub fn parse_day(s: &str) -> Result<Weekday, SlotError> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| SlotError::InvalidDay(s.to_string()))
}

pub fn format_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

pub fn parse_time(s: &str) -> Result<NaiveTime, SlotError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| SlotError::InvalidTime(s.to_string()))
}

/// Splits an `"HH:MM-HH:MM"` range into its two times.
pub fn parse_time_range(s: &str) -> Result<(NaiveTime, NaiveTime), SlotError> {
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| SlotError::InvalidTime(s.to_string()))?;
    Ok((parse_time(start)?, parse_time(end)?))
}
