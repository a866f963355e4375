//! The `Time` and `Duration` object types.

use std::rc::Rc;

use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime, TimeZone};

use crate::{
    bindings::{VmType, new_callback},
    environment::Environment,
    error::{RunError, RunResult},
    gc::{Pool, Root},
    types::{Identifier, ObjectName, ObjectType, PurityType, Type},
    value::Value,
};

pub const TIME_TYPE_NAME: &str = "Time";
pub const DURATION_TYPE_NAME: &str = "Duration";

/// A point in time: seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: u32,
}

impl VmType for Timestamp {
    fn vm_type() -> Type {
        Type::Object(ObjectName::new(TIME_TYPE_NAME))
    }

    fn from_value(value: &Value) -> RunResult<Self> {
        Ok(*value.get_user_value::<Self>(&ObjectName::new(TIME_TYPE_NAME)))
    }

    fn into_value(self, pool: &Pool) -> Root<Value> {
        Value::new_object(pool, ObjectName::new(TIME_TYPE_NAME), Rc::new(self))
    }
}

/// A span between two timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    pub secs: i64,
    pub nanos: u32,
}

impl VmType for TimeSpan {
    fn vm_type() -> Type {
        Type::Object(ObjectName::new(DURATION_TYPE_NAME))
    }

    fn from_value(value: &Value) -> RunResult<Self> {
        Ok(*value.get_user_value::<Self>(&ObjectName::new(DURATION_TYPE_NAME)))
    }

    fn into_value(self, pool: &Pool) -> Root<Value> {
        Value::new_object(pool, ObjectName::new(DURATION_TYPE_NAME), Rc::new(self))
    }
}

fn local_datetime(time: Timestamp) -> RunResult<chrono::DateTime<Local>> {
    Local
        .timestamp_opt(time.secs, time.nanos)
        .single()
        .ok_or_else(|| RunError::Time(format!("localtime failure: {}", time.secs)))
}

pub fn register_time_type(pool: &Pool, environment: &Root<Environment>) {
    let time_type = ObjectType::new(pool, Timestamp::vm_type());
    time_type.value().add_field(
        Identifier::new("tostring"),
        new_callback(pool, PurityType::PURE, |time: Timestamp| {
            format!("{}.{:09}", time.secs, time.nanos)
        })
        .ptr(),
    );
    time_type.value().add_field(
        Identifier::new("AddDays"),
        new_callback(
            pool,
            PurityType::PURE,
            |time: Timestamp, days: i64| -> RunResult<Timestamp> {
                let datetime = local_datetime(time)?;
                let shifted = if days >= 0 {
                    datetime.checked_add_days(Days::new(days.unsigned_abs()))
                } else {
                    datetime.checked_sub_days(Days::new(days.unsigned_abs()))
                }
                .ok_or_else(|| RunError::Time(format!("AddDays overflow: {days}")))?;
                Ok(Timestamp {
                    secs: shifted.timestamp(),
                    nanos: time.nanos,
                })
            },
        )
        .ptr(),
    );
    time_type.value().add_field(
        Identifier::new("format"),
        new_callback(
            pool,
            PurityType::PURE,
            |time: Timestamp, format: String| -> RunResult<String> {
                use std::fmt::Write;
                let datetime = local_datetime(time)?;
                let mut output = String::new();
                write!(output, "{}", datetime.format(&format))
                    .map_err(|_| RunError::Time("strftime error".to_owned()))?;
                Ok(output)
            },
        )
        .ptr(),
    );
    time_type.value().add_field(
        Identifier::new("year"),
        new_callback(pool, PurityType::PURE, |time: Timestamp| -> RunResult<i64> {
            Ok(i64::from(local_datetime(time)?.year()))
        })
        .ptr(),
    );
    environment.value().define_type(time_type.ptr());

    let duration_type = ObjectType::new(pool, TimeSpan::vm_type());
    duration_type.value().add_field(
        Identifier::new("days"),
        new_callback(pool, PurityType::PURE, |span: TimeSpan| {
            span.secs / (24 * 60 * 60)
        })
        .ptr(),
    );
    environment.value().define_type(duration_type.ptr());

    environment.value().define(
        Identifier::new("Now"),
        &new_callback(pool, PurityType::READER, || {
            let now = Local::now();
            Timestamp {
                secs: now.timestamp(),
                nanos: now.timestamp_subsec_nanos(),
            }
        }),
    );
    environment.value().define(
        Identifier::new("ParseTime"),
        &new_callback(
            pool,
            PurityType::PURE,
            |value: String, format: String| -> RunResult<Timestamp> {
                let parsed = NaiveDateTime::parse_from_str(&value, &format).or_else(|_| {
                    NaiveDate::parse_from_str(&value, &format).map(|date| {
                        date.and_hms_opt(0, 0, 0).expect("midnight is valid")
                    })
                });
                let datetime = parsed.map_err(|_| {
                    RunError::Time(format!(
                        "strptime error: value: {value}, format: {format}"
                    ))
                })?;
                let local = datetime.and_local_timezone(Local).single().ok_or_else(|| {
                    RunError::Time(format!("mktime error: value: {value}, format: {format}"))
                })?;
                Ok(Timestamp {
                    secs: local.timestamp(),
                    nanos: 0,
                })
            },
        ),
    );
    environment.value().define(
        Identifier::new("Seconds"),
        &new_callback(pool, PurityType::PURE, |seconds: i64| TimeSpan {
            secs: seconds,
            nanos: 0,
        }),
    );
    environment.value().define(
        Identifier::new("DurationBetween"),
        &new_callback(pool, PurityType::PURE, |a: Timestamp, b: Timestamp| {
            let mut secs = b.secs - a.secs;
            let nanos = if b.nanos < a.nanos {
                secs -= 1;
                1_000_000_000 - a.nanos + b.nanos
            } else {
                b.nanos - a.nanos
            };
            TimeSpan { secs, nanos }
        }),
    );
}
