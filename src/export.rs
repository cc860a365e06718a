use crate::solve::SessionHistory;
use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write the history as CSV: one header row, then one row per solve
pub fn write_csv<W: Write>(history: &SessionHistory, out: W) -> Result<usize, ExportError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["n", "time", "scramble", "timestamp"])?;

    for (i, record) in history.records().iter().enumerate() {
        writer.write_record([
            (i + 1).to_string(),
            format!("{:.2}", record.elapsed_seconds),
            record.scramble.to_string(),
            record.timestamp.to_rfc3339(),
        ])?;
    }

    writer.flush()?;
    Ok(history.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solve::SolveRecord;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_write_csv_rows() {
        let mut history = SessionHistory::new();
        history.append(SolveRecord::new(
            11.5,
            "R U' F2".parse().unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        ));

        let mut buf = Vec::new();
        let rows = write_csv(&history, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(rows, 1);
        assert_eq!(
            text,
            "n,time,scramble,timestamp\n1,11.50,R U' F2,2024-01-02T03:04:05+00:00\n"
        );
    }

    #[test]
    fn test_empty_history_writes_header_only() {
        let mut buf = Vec::new();
        assert_eq!(write_csv(&SessionHistory::new(), &mut buf).unwrap(), 0);
        assert_eq!(String::from_utf8(buf).unwrap(), "n,time,scramble,timestamp\n");
    }
}
