//! Schedule recurrence rules in the `DTSTART;TZID=... RRULE:...` form the
//! schedules endpoint stores.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::{ConsoleError, FieldErrors, Result};

const STAMP: &str = "%Y%m%dT%H%M%S";
const UTC_STAMP: &str = "%Y%m%dT%H%M%SZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Frequency {
    /// Run once.
    #[default]
    None,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Frequency {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" | "" => Some(Frequency::None),
            "minute" => Some(Frequency::Minute),
            "hour" => Some(Frequency::Hour),
            "day" => Some(Frequency::Day),
            "week" => Some(Frequency::Week),
            "month" => Some(Frequency::Month),
            "year" => Some(Frequency::Year),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::None => "none",
            Frequency::Minute => "minute",
            Frequency::Hour => "hour",
            Frequency::Day => "day",
            Frequency::Week => "week",
            Frequency::Month => "month",
            Frequency::Year => "year",
        }
    }

    fn rrule_freq(&self) -> &'static str {
        match self {
            Frequency::None | Frequency::Minute => "MINUTELY",
            Frequency::Hour => "HOURLY",
            Frequency::Day => "DAILY",
            Frequency::Week => "WEEKLY",
            Frequency::Month => "MONTHLY",
            Frequency::Year => "YEARLY",
        }
    }

    fn from_rrule(s: &str) -> Option<Self> {
        match s {
            "MINUTELY" => Some(Frequency::Minute),
            "HOURLY" => Some(Frequency::Hour),
            "DAILY" => Some(Frequency::Day),
            "WEEKLY" => Some(Frequency::Week),
            "MONTHLY" => Some(Frequency::Month),
            "YEARLY" => Some(Frequency::Year),
            _ => None,
        }
    }
}

pub fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

pub fn parse_weekday(code: &str) -> Option<Weekday> {
    match code {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

const WEEKDAYS: [Weekday; 5] = [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri];
const WEEKEND: [Weekday; 2] = [Weekday::Sat, Weekday::Sun];
const ALL_DAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

fn by_day(days: &[Weekday]) -> String {
    days.iter().map(|d| weekday_code(*d)).collect::<Vec<_>>().join(",")
}

/// Day selector for "on the <occurrence> <day>" rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySpec {
    Day,
    Weekday,
    WeekendDay,
    Single(Weekday),
}

impl DaySpec {
    fn days(&self) -> Vec<Weekday> {
        match self {
            DaySpec::Day => ALL_DAYS.to_vec(),
            DaySpec::Weekday => WEEKDAYS.to_vec(),
            DaySpec::WeekendDay => WEEKEND.to_vec(),
            DaySpec::Single(d) => vec![*d],
        }
    }

    fn from_days(days: &[Weekday]) -> Option<Self> {
        let same = |set: &[Weekday]| set.len() == days.len() && set.iter().all(|d| days.contains(d));
        match days {
            [single] => Some(DaySpec::Single(*single)),
            _ if same(&ALL_DAYS[..]) => Some(DaySpec::Day),
            _ if same(&WEEKDAYS[..]) => Some(DaySpec::Weekday),
            _ if same(&WEEKEND[..]) => Some(DaySpec::WeekendDay),
            _ => None,
        }
    }
}

/// Monthly/yearly day selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOn {
    /// Day number of the month (`BYMONTHDAY`), with a month for yearly rules.
    Day { month: Option<u32>, day: u32 },
    /// `occurrence` is 1..=4 or -1 for "last".
    The {
        month: Option<u32>,
        occurrence: i32,
        day: DaySpec,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunEnd {
    #[default]
    Never,
    After(u32),
    OnDate(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recurrence {
    /// Wall-clock start in `timezone`.
    pub start: NaiveDateTime,
    pub timezone: String,
    pub frequency: Frequency,
    pub interval: u32,
    pub week_days: Vec<Weekday>,
    pub run_on: Option<RunOn>,
    pub end: RunEnd,
}

impl Recurrence {
    pub fn once(start: NaiveDateTime, timezone: &str) -> Self {
        Self {
            start,
            timezone: timezone.to_string(),
            frequency: Frequency::None,
            interval: 1,
            week_days: Vec::new(),
            run_on: None,
            end: RunEnd::Never,
        }
    }

    /// The first run as an instant. `None` when the zone is unknown or the
    /// wall-clock start is skipped by a DST change.
    pub fn start_utc(&self) -> Option<DateTime<Utc>> {
        let zone: Tz = self.timezone.trim().parse().ok()?;
        zone.from_local_datetime(&self.start)
            .earliest()
            .map(|start| start.with_timezone(&Utc))
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let start = self.start_utc();
        if self.timezone.trim().is_empty() {
            errors.insert("timezone".to_string(), "Select a time zone".to_string());
        } else if self.timezone.trim().parse::<Tz>().is_err() {
            errors.insert("timezone".to_string(), "Select a valid time zone".to_string());
        } else if start.is_none() {
            errors.insert(
                "start_datetime".to_string(),
                "Start time does not exist in the selected time zone".to_string(),
            );
        }
        if self.frequency == Frequency::None {
            return errors;
        }
        if self.interval == 0 {
            errors.insert("interval".to_string(), "Run every must be at least 1".to_string());
        }
        if self.frequency == Frequency::Week && self.week_days.is_empty() {
            errors.insert("days_of_week".to_string(), "Select a day of the week".to_string());
        }
        if matches!(self.frequency, Frequency::Month | Frequency::Year) {
            match self.run_on {
                None => {
                    errors.insert("run_on".to_string(), "Select when the schedule runs".to_string());
                }
                Some(RunOn::Day { day, month }) => {
                    if !(1..=31).contains(&day) {
                        errors.insert("run_on_day_number".to_string(), "Day must be between 1 and 31".to_string());
                    }
                    if month.is_some_and(|m| !(1..=12).contains(&m)) {
                        errors.insert("run_on_day_month".to_string(), "Select a valid month".to_string());
                    }
                }
                Some(RunOn::The { occurrence, month, .. }) => {
                    if !matches!(occurrence, 1..=4 | -1) {
                        errors.insert("run_on_the_occurrence".to_string(), "Select a valid occurrence".to_string());
                    }
                    if month.is_some_and(|m| !(1..=12).contains(&m)) {
                        errors.insert("run_on_the_month".to_string(), "Select a valid month".to_string());
                    }
                }
            }
        }
        match self.end {
            RunEnd::After(0) => {
                errors.insert("occurrences".to_string(), "Occurrences must be at least 1".to_string());
            }
            RunEnd::OnDate(until) if start.is_some_and(|start| until <= start) => {
                errors.insert("end_datetime".to_string(), "End date must be after the start date".to_string());
            }
            _ => {}
        }
        errors
    }

    pub fn build(&self) -> Result<String> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(ConsoleError::Validation(errors));
        }

        let dtstart = format!("DTSTART;TZID={}:{}", self.timezone, self.start.format(STAMP));
        if self.frequency == Frequency::None {
            return Ok(format!("{} RRULE:INTERVAL=1;COUNT=1;FREQ=MINUTELY", dtstart));
        }

        let mut parts = vec![
            format!("INTERVAL={}", self.interval),
            format!("FREQ={}", self.frequency.rrule_freq()),
        ];

        match self.frequency {
            Frequency::Week => parts.push(format!("BYDAY={}", by_day(&self.week_days))),
            Frequency::Month | Frequency::Year => match self.run_on {
                Some(RunOn::Day { month, day }) => {
                    if let (Frequency::Year, Some(m)) = (self.frequency, month) {
                        parts.push(format!("BYMONTH={}", m));
                    }
                    parts.push(format!("BYMONTHDAY={}", day));
                }
                Some(RunOn::The { month, occurrence, day }) => {
                    parts.push(format!("BYSETPOS={}", occurrence));
                    parts.push(format!("BYDAY={}", by_day(&day.days())));
                    if let (Frequency::Year, Some(m)) = (self.frequency, month) {
                        parts.push(format!("BYMONTH={}", m));
                    }
                }
                None => {}
            },
            _ => {}
        }

        match self.end {
            RunEnd::Never => {}
            RunEnd::After(n) => parts.push(format!("COUNT={}", n)),
            RunEnd::OnDate(until) => parts.push(format!("UNTIL={}", until.format(UTC_STAMP))),
        }
        Ok(format!("{} RRULE:{}", dtstart, parts.join(";")))
    }

    /// Reads back a rule produced by [`Recurrence::build`] (or the API).
    pub fn parse(rule: &str) -> Result<Self> {
        let bad = |msg: &str| ConsoleError::validation("rrule", format!("{}: {}", msg, rule));

        let (start_part, rule_part) = rule.trim().split_once(" RRULE:").ok_or_else(|| bad("missing RRULE"))?;
        let start_part = start_part.strip_prefix("DTSTART;TZID=").ok_or_else(|| bad("missing DTSTART"))?;
        let (timezone, stamp) = start_part.split_once(':').ok_or_else(|| bad("malformed DTSTART"))?;
        let start = NaiveDateTime::parse_from_str(stamp, STAMP).map_err(|_| bad("malformed DTSTART"))?;

        let mut recurrence = Recurrence::once(start, timezone);
        let mut count = None;
        let mut week_days: Vec<Weekday> = Vec::new();
        let mut by_month = None;
        let mut by_month_day = None;
        let mut by_set_pos = None;

        for pair in rule_part.split(';').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| bad("malformed RRULE"))?;
            match key {
                "INTERVAL" => recurrence.interval = value.parse().map_err(|_| bad("bad INTERVAL"))?,
                "FREQ" => recurrence.frequency = Frequency::from_rrule(value).ok_or_else(|| bad("bad FREQ"))?,
                "COUNT" => count = Some(value.parse::<u32>().map_err(|_| bad("bad COUNT"))?),
                "UNTIL" => {
                    let naive = NaiveDateTime::parse_from_str(value, UTC_STAMP).map_err(|_| bad("bad UNTIL"))?;
                    recurrence.end = RunEnd::OnDate(Utc.from_utc_datetime(&naive));
                }
                "BYDAY" => {
                    week_days = value
                        .split(',')
                        .map(|d| parse_weekday(d).ok_or_else(|| bad("bad BYDAY")))
                        .collect::<Result<_>>()?;
                }
                "BYMONTH" => by_month = Some(value.parse::<u32>().map_err(|_| bad("bad BYMONTH"))?),
                "BYMONTHDAY" => by_month_day = Some(value.parse::<u32>().map_err(|_| bad("bad BYMONTHDAY"))?),
                "BYSETPOS" => by_set_pos = Some(value.parse::<i32>().map_err(|_| bad("bad BYSETPOS"))?),
                _ => {}
            }
        }

        // The "run once" encoding.
        if recurrence.frequency == Frequency::Minute && recurrence.interval == 1 && count == Some(1) {
            recurrence.frequency = Frequency::None;
            return Ok(recurrence);
        }
        if let Some(n) = count {
            recurrence.end = RunEnd::After(n);
        }
        match recurrence.frequency {
            Frequency::Week => recurrence.week_days = week_days,
            Frequency::Month | Frequency::Year => {
                recurrence.run_on = match (by_month_day, by_set_pos) {
                    (Some(day), _) => Some(RunOn::Day { month: by_month, day }),
                    (None, Some(occurrence)) => Some(RunOn::The {
                        month: by_month,
                        occurrence,
                        day: DaySpec::from_days(&week_days).ok_or_else(|| bad("unsupported BYDAY set"))?,
                    }),
                    (None, None) => None,
                };
            }
            _ => {}
        }
        Ok(recurrence)
    }
}
