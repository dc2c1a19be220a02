use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use super::error::TimestampError;

const TIMESTAMP_FIELD: usize = 3;
const UNKNOWN_TIME: &str = "Unknown";

/// Extract the timestamp of a log line.
///
/// The fourth `|` separated field holds the UTC time as `YYYY-MM-DD HH:MM:SS.ffffff`. The
/// result is in seconds since the Unix epoch so that durations are simple subtractions.
pub fn log_timestamp(line: &str) -> Result<f64, TimestampError> {
    let field = line
        .split('|')
        .nth(TIMESTAMP_FIELD)
        .ok_or_else(|| TimestampError::MissingField(line.to_string()))?;

    let (seconds, microseconds) = match field.split('.').collect::<Vec<&str>>()[..] {
        [s, us] => (s, us),
        _ => return Err(TimestampError::BadFormat(field.to_string())),
    };

    let datetime = PrimitiveDateTime::parse(
        seconds,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )?
    .assume_utc();
    let microseconds: u64 = microseconds.trim().parse()?;

    Ok(datetime.unix_timestamp() as f64 + microseconds as f64 / 1e6)
}

/// Integer key of a timestamp (microseconds), usable for exact comparisons and map keys
pub fn timestamp_key(t: f64) -> i64 {
    (t * 1e6).round() as i64
}

fn utc(t: f64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(t.floor() as i64).ok()
}

/// Format as `YYYYMMDD HH:MM:SS`
pub fn time_str(t: f64) -> String {
    utc(t)
        .and_then(|dt| {
            dt.format(format_description!(
                "[year][month][day] [hour]:[minute]:[second]"
            ))
            .ok()
        })
        .unwrap_or_else(|| UNKNOWN_TIME.to_string())
}

/// Format as `YYYYMMDD`
pub fn day_str(t: f64) -> String {
    utc(t)
        .and_then(|dt| dt.format(format_description!("[year][month][day]")).ok())
        .unwrap_or_else(|| UNKNOWN_TIME.to_string())
}

/// Format as `HH:MM:SS`
pub fn hour_str(t: f64) -> String {
    utc(t)
        .and_then(|dt| {
            dt.format(format_description!("[hour]:[minute]:[second]"))
                .ok()
        })
        .unwrap_or_else(|| UNKNOWN_TIME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_timestamp() {
        let line = "AOARB|R|MAIN|2021-03-04 05:06:07.250000|Request: Pause()";
        let t = log_timestamp(line).unwrap();
        assert_eq!(t, 1614834367.25);
        assert_eq!(timestamp_key(t), 1614834367250000);
    }

    #[test]
    fn test_missing_field() {
        match log_timestamp("AOARB|R|MAIN") {
            Err(TimestampError::MissingField(_)) => (),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_malformed_field() {
        assert!(log_timestamp("a|b|c|2021-03-04 05:06:07|x").is_err());
        assert!(log_timestamp("a|b|c|2021-03-04 05:06:07.1.2|x").is_err());
        assert!(log_timestamp("a|b|c|yesterday.000001|x").is_err());
    }

    #[test]
    fn test_formatting() {
        let t = 1614834367.75;
        assert_eq!(time_str(t), "20210304 05:06:07");
        assert_eq!(day_str(t), "20210304");
        assert_eq!(hour_str(t), "05:06:07");
    }
}
