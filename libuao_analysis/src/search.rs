use regex::Regex;
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};
use std::sync::LazyLock;

use super::timestamp::{log_timestamp, timestamp_key};

const MESSAGE_FIELD: usize = 4;

static CONTINUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">  \. (.*)").expect("continuation pattern is valid"));

/// Search the lines, returning the accepted lines keyed by timestamp (in microseconds).
///
/// Log producers repeat the same line many times in a burst. A line is accepted only if at
/// least `mindiff` seconds have passed since the line before it, so a burst collapses onto
/// its first line, and only if no accepted line lies closer than `mindiff` to it. A line
/// landing exactly on an accepted timestamp appends its continuation payload (the text after
/// `>  . ` in the message field) to that entry instead.
pub fn search_map<I>(lines: I, mindiff: f64) -> BTreeMap<i64, String>
where
    I: IntoIterator<Item = String>,
{
    let mut found: BTreeMap<i64, String> = BTreeMap::new();
    let min_gap = timestamp_key(mindiff);
    let mut prev: f64 = 0.0;
    for line in lines {
        let now = match log_timestamp(&line) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Skipping line: {e}");
                continue;
            }
        };

        if now - prev >= mindiff {
            let key = timestamp_key(now);
            if let Some(entry) = found.get_mut(&key) {
                match line.split('|').nth(MESSAGE_FIELD) {
                    Some(message) => {
                        if let Some(cap) = CONTINUATION.captures(message) {
                            entry.push_str(&cap[1]);
                        }
                    }
                    None => log::warn!("Malformed line: {line}"),
                }
            } else if crowded(&found, key, min_gap) {
                log::debug!("Rejected {}", line.trim());
            } else {
                found.insert(key, line.trim().to_string());
            }
        } else {
            log::debug!("Rejected {}", line.trim());
        }
        prev = now;
    }
    found
}

/// Whether an accepted entry other than `key` itself lies within `min_gap` of it
fn crowded(found: &BTreeMap<i64, String>, key: i64, min_gap: i64) -> bool {
    let before = found.range(..key).next_back();
    let after = found.range((Excluded(key), Unbounded)).next();
    before.is_some_and(|(k, _)| key - k < min_gap)
        || after.is_some_and(|(k, _)| k - key < min_gap)
}

/// Search the lines, returning the accepted lines in chronological order
pub fn search<I>(lines: I, mindiff: f64) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    search_map(lines, mindiff).into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(t: &str, msg: &str) -> String {
        format!("AOARB|R|MAIN|2021-03-04 05:06:{t}|{msg}")
    }

    #[test]
    fn test_burst_collapses() {
        let lines: Vec<String> = (0..20)
            .map(|i| line(&format!("{:02}.{:06}", i / 2, (i % 2) * 500_000), "heartbeat"))
            .collect();
        let found = search(lines, 1.0);
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("05:06:00.000000"));
    }

    #[test]
    fn test_accepted_gap() {
        let lines = vec![
            line("00.000000", "a"),
            line("00.500000", "b"),
            line("02.000000", "c"),
            line("05.000000", "d"),
            line("05.900000", "e"),
        ];
        let found = search_map(lines, 1.0);
        let keys: Vec<i64> = found.keys().copied().collect();
        for pair in keys.windows(2) {
            assert!(pair[1] - pair[0] >= 1_000_000);
        }
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_zero_mindiff() {
        let lines = vec![
            line("00.000000", "Request: Pause()"),
            line("00.000000", "detail >  . continued text"),
            line("00.000000", "no continuation here"),
            line("00.000001", "Status after command: Pause"),
        ];
        let found = search(lines, 0.0);
        assert_eq!(found.len(), 2);
        assert!(found[0].ends_with("Request: Pause()continued text"));
        assert!(found[1].ends_with("Status after command: Pause"));
    }

    #[test]
    fn test_backwards_jump_rejected() {
        let lines = vec![
            line("01.000000", "early"),
            line("09.000000", "late"),
            line("05.000000", "out of order"),
            line("06.000000", "after"),
        ];
        let found = search(lines, 0.0);
        assert_eq!(found.len(), 3);
        assert!(found[0].ends_with("early"));
        assert!(found[1].ends_with("after"));
        assert!(found[2].ends_with("late"));
    }

    #[test]
    fn test_out_of_order_keeps_gap() {
        let lines = vec![
            line("10.000000", "first"),
            line("09.500000", "earlier"),
            line("10.600000", "too close to first"),
            line("11.700000", "far enough"),
        ];
        let found = search_map(lines, 1.0);
        let keys: Vec<i64> = found.keys().copied().collect();
        assert_eq!(keys, vec![1614834370000000, 1614834371700000]);
        assert!(found.values().next().unwrap().ends_with("first"));
    }

    #[test]
    fn test_bad_timestamp_skipped() {
        let lines = vec![String::from("garbage"), line("01.000000", "ok")];
        let found = search(lines, 0.0);
        assert_eq!(found.len(), 1);
    }
}
