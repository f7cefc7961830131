//! Schedule form. The recurrence fields are folded into a single `rrule`
//! string on save and unfolded again when editing.

use chrono::{DateTime, NaiveDateTime, Utc, Weekday};
use serde_json::{Map, Value, json};

use crate::api::endpoints::ResourceKind;
use crate::api::models::Id;
use crate::error::{ConsoleError, Result};
use crate::forms::controller::ResourceSpec;
use crate::forms::rrule::{DaySpec, Frequency, Recurrence, RunEnd, RunOn, parse_weekday, weekday_code};
use crate::forms::schema::{FieldKind, FieldSchema, FormSchema, Values, one_of, str_of};

/// Wall-clock format of `start_datetime`.
pub const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub const FREQUENCIES: &[(&str, &str)] = &[
    ("none", "None (run once)"),
    ("minute", "Minute"),
    ("hour", "Hour"),
    ("day", "Day"),
    ("week", "Week"),
    ("month", "Month"),
    ("year", "Year"),
];

pub const RUN_ON: &[(&str, &str)] = &[("day", "Day"), ("the", "The")];

pub const OCCURRENCES: &[(&str, &str)] = &[
    ("1", "First"),
    ("2", "Second"),
    ("3", "Third"),
    ("4", "Fourth"),
    ("-1", "Last"),
];

pub const DAYS: &[(&str, &str)] = &[
    ("sunday", "Sunday"),
    ("monday", "Monday"),
    ("tuesday", "Tuesday"),
    ("wednesday", "Wednesday"),
    ("thursday", "Thursday"),
    ("friday", "Friday"),
    ("saturday", "Saturday"),
    ("day", "Day"),
    ("weekday", "Weekday"),
    ("weekendDay", "Weekend day"),
];

pub const ENDS: &[(&str, &str)] = &[("never", "Never"), ("after", "After number of occurrences"), ("onDate", "On date")];

fn repeats(v: &Values) -> bool {
    !one_of(v, "frequency", &["none", ""])
}

fn is_weekly(v: &Values) -> bool {
    one_of(v, "frequency", &["week"])
}

fn is_monthly_or_yearly(v: &Values) -> bool {
    one_of(v, "frequency", &["month", "year"])
}

fn on_day(v: &Values) -> bool {
    is_monthly_or_yearly(v) && one_of(v, "run_on", &["day"])
}

fn on_day_of_year(v: &Values) -> bool {
    on_day(v) && one_of(v, "frequency", &["year"])
}

fn on_the(v: &Values) -> bool {
    is_monthly_or_yearly(v) && one_of(v, "run_on", &["the"])
}

fn on_the_of_year(v: &Values) -> bool {
    on_the(v) && one_of(v, "frequency", &["year"])
}

fn ends_after(v: &Values) -> bool {
    repeats(v) && one_of(v, "end", &["after"])
}

fn ends_on_date(v: &Values) -> bool {
    repeats(v) && one_of(v, "end", &["onDate"])
}

pub fn schedule_form() -> FormSchema {
    FormSchema::new(
        "schedule",
        vec![
            FieldSchema::text("name", "Name").required().max_length(512),
            FieldSchema::text("description", "Description"),
            FieldSchema::new("enabled", "Enabled", FieldKind::Checkbox),
            FieldSchema::text("start_datetime", "Start date/time").required(),
            FieldSchema::text("timezone", "Local time zone").required(),
            FieldSchema::new("frequency", "Run frequency", FieldKind::Select(FREQUENCIES)).required(),
            FieldSchema::new("interval", "Run every", FieldKind::Number)
                .show_when(repeats)
                .required_when(repeats),
            FieldSchema::text("days_of_week", "On days")
                .show_when(is_weekly)
                .required_when(is_weekly),
            FieldSchema::new("run_on", "Run on", FieldKind::Select(RUN_ON))
                .show_when(is_monthly_or_yearly)
                .required_when(is_monthly_or_yearly),
            FieldSchema::new("run_on_day_month", "Month", FieldKind::Number)
                .show_when(on_day_of_year)
                .required_when(on_day_of_year),
            FieldSchema::new("run_on_day_number", "Day", FieldKind::Number)
                .show_when(on_day)
                .required_when(on_day),
            FieldSchema::new("run_on_the_occurrence", "Occurrence", FieldKind::Select(OCCURRENCES))
                .show_when(on_the)
                .required_when(on_the),
            FieldSchema::new("run_on_the_day", "Day", FieldKind::Select(DAYS))
                .show_when(on_the)
                .required_when(on_the),
            FieldSchema::new("run_on_the_month", "Month", FieldKind::Number)
                .show_when(on_the_of_year)
                .required_when(on_the_of_year),
            FieldSchema::new("end", "End", FieldKind::Select(ENDS))
                .show_when(repeats)
                .required_when(repeats),
            FieldSchema::new("occurrences", "Occurrences", FieldKind::Number)
                .show_when(ends_after)
                .required_when(ends_after),
            FieldSchema::text("end_datetime", "End date/time")
                .show_when(ends_on_date)
                .required_when(ends_on_date)
                .help("RFC 3339 timestamp with an offset, e.g. 2021-01-01T00:00:00-05:00."),
        ],
    )
}

fn number_of(values: &Values, field: &str) -> Option<i64> {
    match values.get(field)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn invalid(field: &str, message: &str) -> ConsoleError {
    ConsoleError::validation(field, message)
}

fn positive(values: &Values, field: &str) -> Result<u32> {
    number_of(values, field)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| invalid(field, "Please enter a number greater than 0."))
}

fn day_spec(name: &str) -> Option<DaySpec> {
    let single = match name {
        "day" => return Some(DaySpec::Day),
        "weekday" => return Some(DaySpec::Weekday),
        "weekendDay" => return Some(DaySpec::WeekendDay),
        "sunday" => Weekday::Sun,
        "monday" => Weekday::Mon,
        "tuesday" => Weekday::Tue,
        "wednesday" => Weekday::Wed,
        "thursday" => Weekday::Thu,
        "friday" => Weekday::Fri,
        "saturday" => Weekday::Sat,
        _ => return None,
    };
    Some(DaySpec::Single(single))
}

fn day_spec_name(spec: DaySpec) -> &'static str {
    match spec {
        DaySpec::Day => "day",
        DaySpec::Weekday => "weekday",
        DaySpec::WeekendDay => "weekendDay",
        DaySpec::Single(day) => match day {
            Weekday::Sun => "sunday",
            Weekday::Mon => "monday",
            Weekday::Tue => "tuesday",
            Weekday::Wed => "wednesday",
            Weekday::Thu => "thursday",
            Weekday::Fri => "friday",
            Weekday::Sat => "saturday",
        },
    }
}

/// Week days as `["MO", "WE"]` or `"MO,WE"`.
fn week_days(values: &Values) -> Result<Vec<Weekday>> {
    let codes: Vec<String> = match values.get("days_of_week") {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        Some(Value::String(s)) => s.split(',').map(|c| c.trim().to_string()).filter(|c| !c.is_empty()).collect(),
        _ => Vec::new(),
    };
    codes
        .iter()
        .map(|c| parse_weekday(&c.to_uppercase()).ok_or_else(|| invalid("days_of_week", "Select valid days of the week")))
        .collect()
}

/// Folds the form's recurrence fields into a [`Recurrence`].
pub fn recurrence_from_values(values: &Values) -> Result<Recurrence> {
    let start = NaiveDateTime::parse_from_str(str_of(values, "start_datetime"), LOCAL_FORMAT)
        .map_err(|_| invalid("start_datetime", "Please enter a valid date and time."))?;
    let frequency =
        Frequency::parse(str_of(values, "frequency")).ok_or_else(|| invalid("frequency", "Select a valid frequency"))?;

    let mut recurrence = Recurrence::once(start, str_of(values, "timezone"));
    recurrence.frequency = frequency;
    if frequency == Frequency::None {
        return Ok(recurrence);
    }

    recurrence.interval = positive(values, "interval")?;
    if frequency == Frequency::Week {
        recurrence.week_days = week_days(values)?;
    }
    if matches!(frequency, Frequency::Month | Frequency::Year) {
        let yearly = frequency == Frequency::Year;
        recurrence.run_on = match str_of(values, "run_on") {
            "day" => Some(RunOn::Day {
                month: if yearly { Some(positive(values, "run_on_day_month")?) } else { None },
                day: positive(values, "run_on_day_number")?,
            }),
            "the" => Some(RunOn::The {
                month: if yearly { Some(positive(values, "run_on_the_month")?) } else { None },
                occurrence: number_of(values, "run_on_the_occurrence")
                    .and_then(|n| i32::try_from(n).ok())
                    .ok_or_else(|| invalid("run_on_the_occurrence", "Select a valid occurrence"))?,
                day: day_spec(str_of(values, "run_on_the_day"))
                    .ok_or_else(|| invalid("run_on_the_day", "Select a valid day"))?,
            }),
            _ => None,
        };
    }

    recurrence.end = match str_of(values, "end") {
        "after" => RunEnd::After(positive(values, "occurrences")?),
        "onDate" => {
            let until = DateTime::parse_from_rfc3339(str_of(values, "end_datetime"))
                .map_err(|_| invalid("end_datetime", "Please enter a date and time with a UTC offset."))?;
            RunEnd::OnDate(until.with_timezone(&Utc))
        }
        _ => RunEnd::Never,
    };
    Ok(recurrence)
}

/// Unfolds a recurrence back into form values. `end_datetime` comes back in UTC.
pub fn values_from_recurrence(recurrence: &Recurrence) -> Values {
    let mut values = Values::new();
    values.insert("start_datetime".into(), json!(recurrence.start.format(LOCAL_FORMAT).to_string()));
    values.insert("timezone".into(), json!(recurrence.timezone));
    values.insert("frequency".into(), json!(recurrence.frequency.as_str()));
    if recurrence.frequency == Frequency::None {
        return values;
    }

    values.insert("interval".into(), json!(recurrence.interval));
    if recurrence.frequency == Frequency::Week {
        let days: Vec<&str> = recurrence.week_days.iter().map(|d| weekday_code(*d)).collect();
        values.insert("days_of_week".into(), json!(days));
    }
    match recurrence.run_on {
        Some(RunOn::Day { month, day }) => {
            values.insert("run_on".into(), json!("day"));
            values.insert("run_on_day_number".into(), json!(day));
            if let Some(m) = month {
                values.insert("run_on_day_month".into(), json!(m));
            }
        }
        Some(RunOn::The { month, occurrence, day }) => {
            values.insert("run_on".into(), json!("the"));
            values.insert("run_on_the_occurrence".into(), json!(occurrence.to_string()));
            values.insert("run_on_the_day".into(), json!(day_spec_name(day)));
            if let Some(m) = month {
                values.insert("run_on_the_month".into(), json!(m));
            }
        }
        None => {}
    }
    match recurrence.end {
        RunEnd::Never => {
            values.insert("end".into(), json!("never"));
        }
        RunEnd::After(n) => {
            values.insert("end".into(), json!("after"));
            values.insert("occurrences".into(), json!(n));
        }
        RunEnd::OnDate(until) => {
            values.insert("end".into(), json!("onDate"));
            values.insert("end_datetime".into(), json!(until.to_rfc3339()));
        }
    }
    values
}

/// Schedules are created under the template they run and updated in place.
pub struct ScheduleSpec {
    schema: FormSchema,
    template: Option<(ResourceKind, Id)>,
}

impl ScheduleSpec {
    /// For editing an existing schedule.
    pub fn new() -> Self {
        Self {
            schema: schedule_form(),
            template: None,
        }
    }

    /// For adding a schedule to `template`.
    pub fn for_template(kind: ResourceKind, id: Id) -> Self {
        Self {
            schema: schedule_form(),
            template: Some((kind, id)),
        }
    }
}

impl Default for ScheduleSpec {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSpec for ScheduleSpec {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Schedules
    }

    fn schema(&self) -> &FormSchema {
        &self.schema
    }

    fn create_path(&self) -> String {
        match self.template {
            Some((kind, id)) => kind.related_path(id, "schedules"),
            None => self.kind().list_path(),
        }
    }

    fn to_payload(&self, values: &Values) -> Result<Map<String, Value>> {
        let rrule = recurrence_from_values(values)?.build()?;
        let mut payload = Map::new();
        payload.insert("name".into(), json!(str_of(values, "name").trim()));
        payload.insert("description".into(), json!(str_of(values, "description")));
        payload.insert(
            "enabled".into(),
            json!(values.get("enabled").and_then(Value::as_bool).unwrap_or(true)),
        );
        payload.insert("rrule".into(), json!(rrule));
        Ok(payload)
    }

    fn from_resource(&self, resource: &Value) -> Result<Values> {
        let rule = resource.get("rrule").and_then(Value::as_str).unwrap_or_default();
        let mut values = values_from_recurrence(&Recurrence::parse(rule)?);
        for field in ["name", "description", "enabled"] {
            if let Some(v) = resource.get(field) {
                values.insert(field.to_string(), v.clone());
            }
        }
        Ok(values)
    }
}
