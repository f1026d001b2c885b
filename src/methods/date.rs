//! The `date` namespace.
//!
//! Patterns follow `chrono`'s strftime syntax, e.g. `date.format(d, '%Y-%m-%d')`.
//! Time zones are fixed offsets such as `+02:00`, or `UTC`; without one, dates
//! are read and written in UTC.

use chrono::{
    DateTime, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, TimeZone, Utc,
    format::{Parsed, StrftimeItems},
};

use super::{MethodDescriptor, MethodGroup, Parameter};
use crate::{
    convert::parse_date,
    evaluator::EvaluationError,
    value::{Value, ValueType},
};

pub const NAMESPACE: &str = "date";

pub fn group() -> MethodGroup {
    let string = || Parameter::of(ValueType::String);
    let date = || Parameter::of(ValueType::Date);

    MethodGroup::namespaced(NAMESPACE)
        .with(MethodDescriptor::new("now", vec![], |_| Ok(Value::Date(Utc::now()))))
        .with(MethodDescriptor::new("parse", vec![string(), string()], parse))
        .with(MethodDescriptor::new("parse", vec![string(), string(), string()], parse))
        .with(MethodDescriptor::new("format", vec![date(), string()], format))
        .with(MethodDescriptor::new("format", vec![date(), string(), string()], format))
        .with(MethodDescriptor::new("range", vec![date(), date(), string()], range))
        .with(MethodDescriptor::new("range", vec![date(), date(), string(), string()], range))
        .with(MethodDescriptor::new(
            "range",
            vec![date(), date(), string(), string(), string()],
            range,
        ))
        .with(MethodDescriptor::new(
            "millis",
            vec![date()],
            |args| Ok(as_date(&args[0]).map_or(Value::Null, |d| Value::Long(d.timestamp_millis()))),
        ))
}

fn invocation(name: &str, message: String) -> EvaluationError {
    EvaluationError::Invocation {
        name: format!("{}.{}", NAMESPACE, name),
        message,
    }
}

/// `+02:00`, `Z` or `UTC`; a missing zone is UTC.
fn timezone(name: &str, value: Option<&Value>) -> Result<FixedOffset, EvaluationError> {
    let utc = FixedOffset::east_opt(0).ok_or_else(|| invocation(name, "invalid UTC offset".to_string()))?;
    let Some(zone) = value.and_then(Value::as_str).map(str::trim) else {
        return Ok(utc);
    };
    if zone.eq_ignore_ascii_case("utc") || zone.eq_ignore_ascii_case("z") {
        return Ok(utc);
    }
    zone.parse::<FixedOffset>()
        .map_err(|_| invocation(name, format!("unknown time zone '{}'", zone)))
}

/// Parses with the given pattern, or detects RFC 3339 and `YYYY-MM-DD` without one.
fn parse(args: &[Value]) -> Result<Value, EvaluationError> {
    let Some(text) = args[0].as_str() else {
        return Ok(Value::Null);
    };
    let zone = timezone("parse", args.get(2))?;
    let parsed = match args[1].as_str() {
        None => parse_date(text),
        Some(pattern) => with_pattern(text, pattern, &zone),
    };
    parsed
        .map(Value::Date)
        .ok_or_else(|| invocation("parse", format!("'{}' is not a recognised date", text)))
}

/// Text without an offset of its own is read as local time in `zone`.
fn with_pattern(text: &str, pattern: &str, zone: &FixedOffset) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_str(text, pattern) {
        return Some(instant.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(text, pattern)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, pattern)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .or_else(|| with_defaults(text, pattern))?;
    zone.from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

/// Partial patterns such as `%Y-%m` or `%H:%M` start at the beginning of the
/// missing fields: the first of the month, midnight, 1970.
fn with_defaults(text: &str, pattern: &str) -> Option<NaiveDateTime> {
    let mut parsed = Parsed::new();
    chrono::format::parse(&mut parsed, text, StrftimeItems::new(pattern)).ok()?;
    // setters refuse to overwrite a parsed field, which is what we want
    let _ = parsed.set_year(1970);
    let _ = parsed.set_month(1);
    let _ = parsed.set_day(1);
    let _ = parsed.set_hour(0);
    let _ = parsed.set_minute(0);
    let _ = parsed.set_second(0);
    parsed.to_naive_datetime_with_offset(0).ok()
}

fn format(args: &[Value]) -> Result<Value, EvaluationError> {
    let (Some(date), Some(pattern)) = (as_date(&args[0]), args[1].as_str()) else {
        return Ok(Value::Null);
    };
    let zone = timezone("format", args.get(2))?;
    formatted(date, pattern, &zone).map(Value::String)
}

fn formatted(date: DateTime<Utc>, pattern: &str, zone: &FixedOffset) -> Result<String, EvaluationError> {
    let mut out = String::new();
    std::fmt::Write::write_fmt(&mut out, format_args!("{}", date.with_timezone(zone).format(pattern)))
        .map_err(|_| invocation("format", format!("invalid pattern '{}'", pattern)))?;
    Ok(out)
}

/// Dates from `from` up to and including `to`, stepping by `increment`.
///
/// With a pattern, both ends are first truncated to what the pattern shows
/// and the dates come back formatted.
fn range(args: &[Value]) -> Result<Value, EvaluationError> {
    let (Some(mut from), Some(mut to), Some(increment)) =
        (as_date(&args[0]), as_date(&args[1]), args[2].as_str())
    else {
        return Ok(Value::Null);
    };
    let step = Step::parse(increment)?;
    let pattern = args.get(3).and_then(Value::as_str);
    let zone = timezone("range", args.get(4))?;

    if let Some(pattern) = pattern {
        from = truncated(from, pattern, &zone)?;
        to = truncated(to, pattern, &zone)?;
    }

    let mut dates = Vec::new();
    let mut current = from;
    while current <= to {
        dates.push(match pattern {
            Some(pattern) => Value::String(formatted(current, pattern, &zone)?),
            None => Value::Date(current),
        });
        current = step
            .after(current)
            .ok_or_else(|| invocation("range", format!("'{}' steps out of range", increment)))?;
    }
    Ok(Value::Array(dates))
}

fn truncated(date: DateTime<Utc>, pattern: &str, zone: &FixedOffset) -> Result<DateTime<Utc>, EvaluationError> {
    let text = formatted(date, pattern, zone)?;
    Ok(with_pattern(&text, pattern, zone).unwrap_or(date))
}

/// A positive calendar or clock increment such as `1d`, `15m` or `3M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Clock(Duration),
    Months(u32),
}

impl Step {
    fn parse(text: &str) -> Result<Step, EvaluationError> {
        let invalid = || invocation("range", format!("invalid increment '{}'", text));
        let text = text.trim();
        let split = text
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (amount, unit) = text.split_at(split);
        let amount: u32 = amount.parse().map_err(|_| invalid())?;
        if amount == 0 {
            return Err(invalid());
        }
        let millis = |unit_millis: i64| Step::Clock(Duration::milliseconds(i64::from(amount) * unit_millis));
        Ok(match unit {
            "ms" => millis(1),
            "s" => millis(1_000),
            "m" => millis(60_000),
            "h" => millis(3_600_000),
            "d" | "D" => millis(86_400_000),
            "w" | "W" => millis(7 * 86_400_000),
            "M" => Step::Months(amount),
            "y" | "Y" => Step::Months(amount.checked_mul(12).ok_or_else(invalid)?),
            _ => return Err(invalid()),
        })
    }

    fn after(self, date: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Step::Clock(duration) => date.checked_add_signed(duration),
            Step::Months(months) => date.checked_add_months(Months::new(months)),
        }
    }
}

fn as_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Date(date) => Some(*date),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> Value {
        Value::Date(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_parse_and_format() {
        let parsed = parse(&[Value::from("03/02/2024"), Value::from("%d/%m/%Y")]).unwrap();
        let formatted = format(&[parsed, Value::from("%Y-%m-%d")]).unwrap();
        assert_eq!(formatted, Value::from("2024-02-03"));
    }

    #[test]
    fn test_parse_detects_format() {
        let parsed = parse(&[Value::from("2024-02-03T10:00:00Z"), Value::Null]).unwrap();
        assert!(matches!(parsed, Value::Date(_)));
        assert!(parse(&[Value::from("yesterday"), Value::Null]).is_err());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let now = Value::Date(Utc::now());
        assert!(format(&[now, Value::from("%Q")]).is_err());
    }

    #[test]
    fn test_time_zones() {
        let noon = Value::Date(Utc.with_ymd_and_hms(2024, 2, 3, 12, 0, 0).unwrap());
        assert_eq!(
            format(&[noon.clone(), Value::from("%H:%M"), Value::from("+02:00")]).unwrap(),
            Value::from("14:00")
        );
        assert_eq!(
            parse(&[Value::from("2024-02-03 14:00"), Value::from("%Y-%m-%d %H:%M"), Value::from("+02:00")]).unwrap(),
            noon
        );
        assert!(format(&[noon, Value::from("%H"), Value::from("Mars/Olympus")]).is_err());
    }

    #[test]
    fn test_partial_patterns() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(
            with_pattern("2024-02", "%Y-%m", &utc),
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_range() {
        assert_eq!(
            range(&[day(2024, 1, 30), day(2024, 2, 1), Value::from("1d")]).unwrap(),
            Value::Array(vec![day(2024, 1, 30), day(2024, 1, 31), day(2024, 2, 1)])
        );
        assert_eq!(
            range(&[day(2024, 1, 31), day(2024, 3, 15), Value::from("1M"), Value::from("%Y-%m")]).unwrap(),
            Value::Array(vec![Value::from("2024-01"), Value::from("2024-02"), Value::from("2024-03")])
        );
        assert_eq!(
            range(&[day(2024, 2, 1), day(2024, 1, 1), Value::from("1d")]).unwrap(),
            Value::Array(vec![])
        );
        assert!(range(&[day(2024, 1, 1), day(2024, 2, 1), Value::from("0d")]).is_err());
        assert!(range(&[day(2024, 1, 1), day(2024, 2, 1), Value::from("fortnight")]).is_err());
    }
}
