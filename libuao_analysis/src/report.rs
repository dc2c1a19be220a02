use std::collections::BTreeMap;
use std::io::Write;

use super::command::CommandRef;
use super::event::PointEvent;
use super::timestamp::{time_str, timestamp_key};

const TABLE_OPEN: &str = r#"<table id="aotable">"#;
const EVENT_HEADER: &str = "<tr><th>Timestamp</th><th>Event</th><th>Details</th></tr>";
const COMMAND_HEADER: &str = r#"<tr><th>Time</th><th>Command</th><th>Ex. time (s)</th><th style="width: 300px">Result</th><th>Details</th><th>More details</th></tr>"#;

/// Escape text for inclusion in an HTML cell
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Writes the daily report, either as plain text or as a standalone HTML page.
///
/// In HTML mode every rendered row is also kept in a chronological list, keyed by its
/// formatted time, which is written as a last table by [`ReportWriter::finish`]. Rows which
/// fall on the same second overwrite each other in that list.
pub struct ReportWriter<W: Write> {
    out: W,
    html: bool,
    complete_list: BTreeMap<String, String>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W, html: bool) -> Self {
        Self {
            out,
            html,
            complete_list: BTreeMap::new(),
        }
    }

    /// Write the HTML prologue (nothing in text mode)
    pub fn begin(&mut self, day: &str) -> std::io::Result<()> {
        if self.html {
            let title = format!("AO commands statistics for {day}");
            writeln!(
                self.out,
                "\n<html>\n<head>\n  <title>{title}</title>\n  <link rel=\"stylesheet\" href=\"aotable.css\">\n</head>\n<body>\n<H1>{title}</H1>\n"
            )?;
        }
        Ok(())
    }

    /// Write a section listing the events in chronological order.
    /// Events sharing a timestamp are reported once.
    pub fn write_events(&mut self, title: &str, events: &[PointEvent]) -> std::io::Result<()> {
        let sorted: BTreeMap<i64, &PointEvent> = events
            .iter()
            .map(|e| (timestamp_key(e.timestamp), e))
            .collect();

        if !self.html {
            writeln!(self.out)?;
            writeln!(self.out, "{title}")?;
            writeln!(self.out, "Total: {}", sorted.len())?;
            for event in sorted.values() {
                writeln!(
                    self.out,
                    "{} {} {}",
                    time_str(event.timestamp),
                    event.kind,
                    event.details
                )?;
            }
            return Ok(());
        }

        writeln!(self.out, "<HR>")?;
        writeln!(self.out, "<H2>{}</H2>", escape_html(title))?;
        writeln!(self.out, "<p>Total: {}</p>", sorted.len())?;
        if sorted.is_empty() {
            writeln!(self.out, "<p>")?;
            return Ok(());
        }
        writeln!(self.out, "{TABLE_OPEN}")?;
        writeln!(self.out, "{EVENT_HEADER}")?;
        for event in sorted.values() {
            let time = time_str(event.timestamp);
            let row = format!(
                "<tr><td>{time}</td><td>{}</td><td>{}</td></tr>",
                event.kind,
                escape_html(&event.details)
            );
            writeln!(self.out, "{row}")?;
            self.complete_list.insert(time, row);
        }
        writeln!(self.out, "</table>")?;
        Ok(())
    }

    /// Write a section listing the commands, with their success rate.
    /// Returns the success rate (0 to 1).
    pub fn write_commands(
        &mut self,
        title: &str,
        commands: &[CommandRef],
    ) -> std::io::Result<f64> {
        let successes = commands
            .iter()
            .filter(|cmd| cmd.success == Some(true))
            .count();
        let success_rate = if commands.is_empty() {
            0.0
        } else {
            successes as f64 / commands.len() as f64
        };
        let percent = (success_rate * 100.0).trunc() as i64;

        if !self.html {
            writeln!(self.out)?;
            writeln!(self.out, "{title}")?;
            writeln!(
                self.out,
                "Total: {} - Success rate: {percent}%",
                commands.len()
            )?;
            for cmd in commands {
                writeln!(self.out, "{}", cmd.report())?;
            }
            return Ok(success_rate);
        }

        writeln!(self.out, "<HR>")?;
        writeln!(self.out, "<H2>{}</H2>", escape_html(title))?;
        writeln!(
            self.out,
            "<p>Total: {} - Success rate: {percent}%</p>",
            commands.len()
        )?;
        if !commands.is_empty() {
            writeln!(self.out, "<p>")?;
            writeln!(self.out, "{TABLE_OPEN}")?;
            writeln!(self.out, "{COMMAND_HEADER}")?;
        }
        for cmd in commands {
            let time = cmd
                .start_time
                .map(time_str)
                .unwrap_or_else(|| String::from("Unknown"));
            let elapsed = match cmd.elapsed() {
                Some(elapsed) => format!("{elapsed:5.1} s"),
                None => String::from("Unknown"),
            };
            let result = if cmd.success == Some(true) {
                String::from("Success")
            } else {
                cmd.error_string()
            };
            let details: Vec<String> = cmd.details().iter().map(|d| escape_html(d)).collect();
            let extra: Vec<String> = cmd
                .extra_details()
                .iter()
                .map(|d| escape_html(d))
                .collect();
            let row = format!(
                r#"<tr><td>{time}</td><td>{}</td><td>{elapsed}</td><td style="width: 300px">{}</td><td>{}</td><td>{}</td></tr>"#,
                escape_html(cmd.name()),
                escape_html(&result),
                details.join("<br>"),
                extra.join("<br>")
            );
            writeln!(self.out, "{row}")?;
            self.complete_list.insert(time, row);
        }
        if !commands.is_empty() {
            writeln!(self.out, "</table>\n")?;
            writeln!(self.out, "</p>")?;
        }
        Ok(success_rate)
    }

    /// Write the chronological table and the HTML epilogue, returning the writer
    pub fn finish(mut self) -> std::io::Result<W> {
        if self.html {
            writeln!(self.out, "<HR>")?;
            writeln!(self.out, "<H2>All logs in temporal order</H2>")?;
            writeln!(self.out, "<p>")?;
            writeln!(self.out, "{TABLE_OPEN}")?;
            writeln!(self.out, "{COMMAND_HEADER}")?;
            for row in self.complete_list.values() {
                writeln!(self.out, "{row}")?;
            }
            writeln!(self.out, "</table>\n")?;
            writeln!(self.out, "</p>")?;
            writeln!(self.out, "\n</body>\n</html>")?;
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::event::EventKind;
    use std::rc::Rc;

    const T0: f64 = 1614816000.0;

    fn commands() -> Vec<CommandRef> {
        let mut ok = Command::atomic("OffsetXY", "1.0,2.0", T0);
        ok.end_time = Some(T0 + 2.5);
        ok.success = Some(true);
        let mut failed = Command::atomic("OffsetXY", "3.0,4.0", T0 + 10.0);
        failed.success = Some(false);
        failed.error = String::from("<timeout>");
        vec![Rc::new(ok), Rc::new(failed)]
    }

    #[test]
    fn test_text_report() {
        let mut report = ReportWriter::new(Vec::new(), false);
        report.begin("20210304").unwrap();
        let rate = report.write_commands("OffsetXY", &commands()).unwrap();
        assert_eq!(rate, 0.5);
        let out = String::from_utf8(report.finish().unwrap()).unwrap();
        assert_eq!(
            out,
            "\nOffsetXY\nTotal: 2 - Success rate: 50%\n\
             20210304 00:00:00 Success X=1.00, Y=2.00 mm\n\
             20210304 00:00:10 Failure: <timeout> X=3.00, Y=4.00 mm\n"
        );
    }

    #[test]
    fn test_text_events_deduplicated() {
        let event = PointEvent {
            kind: EventKind::RIP,
            timestamp: T0,
            details: String::from("Detected by HouseKeeper"),
            actuator: None,
        };
        let mut report = ReportWriter::new(Vec::new(), false);
        report
            .write_events("Events", &[event.clone(), event])
            .unwrap();
        let out = String::from_utf8(report.finish().unwrap()).unwrap();
        assert_eq!(
            out,
            "\nEvents\nTotal: 1\n20210304 00:00:00 RIP Detected by HouseKeeper\n"
        );
    }

    #[test]
    fn test_html_report() {
        let mut report = ReportWriter::new(Vec::new(), true);
        report.begin("20210304").unwrap();
        report.write_commands("OffsetXY", &commands()).unwrap();
        report.write_commands("Pause", &[]).unwrap();
        let out = String::from_utf8(report.finish().unwrap()).unwrap();
        assert!(out.contains("<title>AO commands statistics for 20210304</title>"));
        assert!(out.contains("<td>  2.5 s</td>"));
        assert!(out.contains("&lt;timeout&gt;"));
        assert!(out.contains("<p>Total: 0 - Success rate: 0%</p>"));
        assert!(out.contains("<H2>All logs in temporal order</H2>"));
        assert_eq!(out.matches("<td>20210304 00:00:10</td>").count(), 2);
        assert!(out.trim_end().ends_with("</html>"));
    }
}
