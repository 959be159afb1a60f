//! Date, time and timestamp converters.
//!
//! Domain values use the epoch-relative `Value` variants; wire values are
//! text in the formats most SQL engines accept for literals.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use super::{ParameterKind, TypeConverter, rejected};
use crate::error::{CastError, Error, Result};
use crate::value::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATETIME_FRACTIONAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const MICROS_PER_SECOND: i64 = 1_000_000;

fn days_to_date(days: i32) -> Option<NaiveDate> {
    let epoch = NaiveDate::default();
    if days >= 0 {
        epoch.checked_add_days(Days::new(u64::from(days.unsigned_abs())))
    } else {
        epoch.checked_sub_days(Days::new(u64::from(days.unsigned_abs())))
    }
}

fn date_to_days(date: NaiveDate) -> i32 {
    date.signed_duration_since(NaiveDate::default()).num_days() as i32
}

fn micros_to_time(micros: i64) -> Option<NaiveTime> {
    let secs = u32::try_from(micros.div_euclid(MICROS_PER_SECOND)).ok()?;
    let nanos = u32::try_from(micros.rem_euclid(MICROS_PER_SECOND) * 1_000).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
}

fn time_to_micros(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight()) * MICROS_PER_SECOND
        + i64::from(time.nanosecond() / 1_000)
}

fn micros_to_datetime(micros: i64) -> Option<NaiveDateTime> {
    let secs = micros.div_euclid(MICROS_PER_SECOND);
    let nanos = u32::try_from(micros.rem_euclid(MICROS_PER_SECOND) * 1_000).ok()?;
    DateTime::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
}

fn datetime_to_micros(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_micros()
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .or_else(|| parse_datetime(text).map(|dt| dt.date()))
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    ["%H:%M:%S%.f", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .map(|d| d.and_time(NaiveTime::default()))
        })
}

fn unix_seconds(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

fn out_of_range(value: &Value, target: &str) -> Error {
    CastError::new(value, target)
        .with_reason("out of range")
        .into()
}

/// Calendar dates. Registered as `date`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateType;

impl DateType {
    fn to_date(value: &Value) -> Result<NaiveDate> {
        match value {
            Value::Date(days) => days_to_date(*days).ok_or_else(|| out_of_range(value, "date")),
            Value::Timestamp(us) => micros_to_datetime(*us)
                .map(|dt| dt.date())
                .ok_or_else(|| out_of_range(value, "date")),
            Value::Text(s) => parse_date(s).ok_or_else(|| CastError::new(value, "date").into()),
            other => Err(CastError::new(other, "date").into()),
        }
    }
}

impl TypeConverter for DateType {
    fn name(&self) -> &str {
        "date"
    }

    fn parameter_kind(&self) -> ParameterKind {
        ParameterKind::Str
    }

    fn to_database(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Text(Self::to_date(value)?.format(DATE_FORMAT).to_string()))
    }

    fn to_domain(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Date(date_to_days(Self::to_date(value)?)))
    }

    fn marshal(&self, input: &serde_json::Value) -> Value {
        let date = match input {
            serde_json::Value::Null => return Value::Null,
            serde_json::Value::String(s) if s.is_empty() => return Value::Null,
            serde_json::Value::String(s) => parse_date(s),
            serde_json::Value::Number(n) => n.as_i64().and_then(unix_seconds).map(|dt| dt.date()),
            _ => None,
        };
        date.map_or_else(|| rejected("date", input), |d| Value::Date(date_to_days(d)))
    }
}

/// Time of day with whole-second precision on the wire. Registered as `time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeType;

impl TimeType {
    fn to_time(value: &Value) -> Result<NaiveTime> {
        match value {
            Value::Time(us) => micros_to_time(*us).ok_or_else(|| out_of_range(value, "time")),
            Value::Text(s) => parse_time(s).ok_or_else(|| CastError::new(value, "time").into()),
            other => Err(CastError::new(other, "time").into()),
        }
    }
}

impl TypeConverter for TimeType {
    fn name(&self) -> &str {
        "time"
    }

    fn parameter_kind(&self) -> ParameterKind {
        ParameterKind::Str
    }

    fn to_database(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Text(Self::to_time(value)?.format(TIME_FORMAT).to_string()))
    }

    fn to_domain(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Time(time_to_micros(Self::to_time(value)?)))
    }

    fn marshal(&self, input: &serde_json::Value) -> Value {
        match input {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::String(s) if s.is_empty() => Value::Null,
            serde_json::Value::String(s) => parse_time(s)
                .map_or_else(|| rejected("time", input), |t| Value::Time(time_to_micros(t))),
            _ => rejected("time", input),
        }
    }
}

/// Timestamps. Registered as `datetime` and `timestamp` (whole seconds on the
/// wire) and `datetimefractional` (microseconds on the wire).
#[derive(Debug, Clone)]
pub struct DateTimeType {
    name: String,
    format: &'static str,
}

impl DateTimeType {
    pub fn seconds(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: DATETIME_FORMAT,
        }
    }

    pub fn fractional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: DATETIME_FRACTIONAL_FORMAT,
        }
    }

    fn to_datetime(&self, value: &Value) -> Result<NaiveDateTime> {
        match value {
            Value::Timestamp(us) => {
                micros_to_datetime(*us).ok_or_else(|| out_of_range(value, &self.name))
            }
            Value::Date(days) => days_to_date(*days)
                .map(|d| d.and_time(NaiveTime::default()))
                .ok_or_else(|| out_of_range(value, &self.name)),
            Value::Int(secs) => unix_seconds(*secs).ok_or_else(|| out_of_range(value, &self.name)),
            Value::Text(s) => {
                parse_datetime(s).ok_or_else(|| CastError::new(value, &self.name).into())
            }
            other => Err(CastError::new(other, &self.name).into()),
        }
    }
}

impl TypeConverter for DateTimeType {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameter_kind(&self) -> ParameterKind {
        ParameterKind::Str
    }

    fn to_database(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let dt = self.to_datetime(value)?;
        Ok(Value::Text(dt.format(self.format).to_string()))
    }

    fn to_domain(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Timestamp(datetime_to_micros(self.to_datetime(value)?)))
    }

    fn marshal(&self, input: &serde_json::Value) -> Value {
        let dt = match input {
            serde_json::Value::Null => return Value::Null,
            serde_json::Value::String(s) if s.is_empty() => return Value::Null,
            serde_json::Value::String(s) => parse_datetime(s),
            serde_json::Value::Number(n) => n.as_i64().and_then(unix_seconds),
            _ => None,
        };
        dt.map_or_else(
            || rejected(&self.name, input),
            |dt| Value::Timestamp(datetime_to_micros(dt)),
        )
    }
}
