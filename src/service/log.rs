use super::ClassificationResult;
use chrono::{DateTime, Local, TimeZone};
use std::io::Write;

const DELIMITER: &str = "============================";

/// Audit log of completed requests.
///
/// Each entry is a timestamped delimiter line, the input text, the raw label
/// and score, and a blank line.
pub struct QueryLog<W: Write> {
    out: W,
}

impl<W: Write> QueryLog<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Record a request at the current local time.
    pub fn record(&mut self, text: &str, result: &ClassificationResult) -> std::io::Result<()> {
        self.record_at(Local::now(), text, result)
    }

    pub fn record_at<Tz>(
        &mut self,
        at: DateTime<Tz>,
        text: &str,
        result: &ClassificationResult,
    ) -> std::io::Result<()>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        writeln!(
            self.out,
            "{DELIMITER}{}{DELIMITER}",
            at.format("%d-%m-%Y %H:%M:%S")
        )?;
        writeln!(self.out, "{text}")?;
        writeln!(self.out, "{}, {}", result.label, result.score)?;
        writeln!(self.out)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_entry_layout() {
        let mut log = QueryLog::new(Vec::new());
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        let result = ClassificationResult {
            label: "POS".to_string(),
            score: 0.75,
        };

        log.record_at(at, "Tuyệt vời", &result).unwrap();

        let written = String::from_utf8(log.into_inner()).unwrap();
        assert_eq!(
            written,
            "============================07-03-2024 09:05:02============================\n\
             Tuyệt vời\n\
             POS, 0.75\n\
             \n"
        );
    }

    #[test]
    fn test_entries_append() {
        let mut log = QueryLog::new(Vec::new());
        let result = ClassificationResult {
            label: "NEGATIVE".to_string(),
            score: 0.5,
        };
        log.record("a", &result).unwrap();
        log.record("b", &result).unwrap();

        let written = String::from_utf8(log.into_inner()).unwrap();
        assert_eq!(written.lines().count(), 8);
        assert!(written.contains("\nb\nNEGATIVE, 0.5\n"));
    }
}
