//! 运行报告 - 进度输出与运行汇总

use super::worker::Action;
use serde::Serialize;
use shared::util::format_optional_millis;
use shared::{BitstreamInfo, ChecksumResult, DsoRecord, MostRecentChecksum};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

/// Progress markers per output line in non-verbose mode
const MARKERS_PER_LINE: usize = 80;

/// 运行汇总
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub action: Action,
    /// Results seen during the run (CHECK: attempts, PRINT: current status)
    pub counts: BTreeMap<ChecksumResult, usize>,
    /// Candidates handled
    pub total: usize,
    /// Candidates handled by an action that only reports
    pub unimplemented: usize,
    /// PRINT candidates that were never verified
    pub unchecked: usize,
    /// Status records created by reconciliation
    pub reconciled: usize,
    /// Unix millis
    pub started_at: i64,
    /// Unix millis
    pub finished_at: i64,
}

impl RunSummary {
    pub fn new(run_id: impl Into<String>, action: Action, started_at: i64) -> Self {
        Self {
            run_id: run_id.into(),
            action,
            counts: BTreeMap::new(),
            total: 0,
            unimplemented: 0,
            unchecked: 0,
            reconciled: 0,
            started_at,
            finished_at: started_at,
        }
    }

    pub fn record(&mut self, result: ChecksumResult) {
        *self.counts.entry(result).or_insert(0) += 1;
    }

    pub fn count(&self, result: ChecksumResult) -> usize {
        self.counts.get(&result).copied().unwrap_or(0)
    }

    /// Results other than MATCH / MARKED_DELETED
    pub fn failures(&self) -> usize {
        self.counts
            .iter()
            .filter(|(result, _)| result.is_failure())
            .map(|(_, n)| n)
            .sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failures() == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Summary run={} action={}", self.run_id, self.action)?;
        writeln!(
            f,
            "# Started {} finished {}",
            format_optional_millis(Some(self.started_at)),
            format_optional_millis(Some(self.finished_at))
        )?;
        writeln!(f, "# New status records: {}", self.reconciled)?;
        for (result, n) in &self.counts {
            writeln!(f, "# {}: {}", result, n)?;
        }
        if self.unchecked > 0 {
            writeln!(f, "# Never checked: {}", self.unchecked)?;
        }
        if self.unimplemented > 0 {
            writeln!(f, "# Not implemented ({}): {}", self.action, self.unimplemented)?;
        }
        write!(
            f,
            "# Total: {} ({})",
            self.total,
            if self.is_clean() { "clean" } else { "FAILURES" }
        )
    }
}

/// Writes the run report to an output stream
pub struct ProgressReporter<W: Write> {
    out: W,
    verbose: bool,
    markers: usize,
}

impl<W: Write> ProgressReporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self {
            out,
            verbose,
            markers: 0,
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// `# ...` line, verbose mode only
    pub fn comment(&mut self, text: impl fmt::Display) -> io::Result<()> {
        if self.verbose {
            writeln!(self.out, "# {}", text)?;
        }
        Ok(())
    }

    pub fn line(&mut self, text: impl fmt::Display) -> io::Result<()> {
        writeln!(self.out, "{}", text)
    }

    /// One `#` per item, wrapped every 80 items
    pub fn marker(&mut self) -> io::Result<()> {
        write!(self.out, "#")?;
        self.markers += 1;
        if self.markers % MARKERS_PER_LINE == 0 {
            writeln!(self.out)?;
        }
        Ok(())
    }

    /// Placeholder row for actions that only report
    pub fn unimplemented(&mut self, row: usize, bitstream_id: u64, action: Action) -> io::Result<()> {
        writeln!(self.out, "{}: {}\tTODO {}", row, bitstream_id, action)
    }

    /// Status row, plus checksum and ancestry rows when verbose
    pub fn bitstream_rows(
        &mut self,
        row: usize,
        status: Option<&MostRecentChecksum>,
        info: Option<&BitstreamInfo>,
        bitstream_id: u64,
        ancestors: &[DsoRecord],
    ) -> io::Result<()> {
        let result = status
            .and_then(|s| s.result)
            .map(|r| r.code())
            .unwrap_or("-");
        let deleted = info
            .map(|i| i.deleted)
            .or(status.map(|s| s.marked_deleted))
            .unwrap_or(false);

        writeln!(
            self.out,
            "{} BITSTREAM.{} {} internalId={} delete={} lastDate={}",
            row,
            bitstream_id,
            result,
            info.map(|i| i.internal_id.as_str()).unwrap_or("-"),
            deleted,
            format_optional_millis(status.and_then(|s| s.process_end_date)),
        )?;

        if !self.verbose {
            return Ok(());
        }

        let algorithm = info
            .map(|i| i.checksum_algorithm.as_str())
            .or(status.map(|s| s.checksum_algorithm.as_str()))
            .unwrap_or("-");
        let expected = info
            .map(|i| i.checksum.as_str())
            .or(status.map(|s| s.expected_checksum.as_str()))
            .unwrap_or("-");
        let calculated = status
            .and_then(|s| s.current_checksum.as_deref())
            .unwrap_or("-");
        writeln!(
            self.out,
            "{} BITSTREAM.{} {} algo={} expected={} calculated={}",
            row, bitstream_id, result, algorithm, expected, calculated
        )?;

        write!(self.out, "{} BITSTREAM.{} {} ", row, bitstream_id, result)?;
        for parent in ancestors {
            write!(
                self.out,
                "{}:{} ",
                parent.object.kind,
                parent.handle.as_deref().unwrap_or("-")
            )?;
        }
        writeln!(self.out)
    }

    /// Terminate the marker line and flush
    pub fn finish(&mut self) -> io::Result<()> {
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
    use shared::{DsoRef, DsoType};

    fn reporter(verbose: bool) -> ProgressReporter<Vec<u8>> {
        ProgressReporter::new(Vec::new(), verbose)
    }

    fn output(reporter: ProgressReporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_markers_wrap_every_80() {
        let mut r = reporter(false);
        for _ in 0..81 {
            r.marker().unwrap();
        }
        r.finish().unwrap();
        let text = output(r);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["#".repeat(80).as_str(), "#"]);
    }

    #[test]
    fn test_comment_only_when_verbose() {
        let mut quiet = reporter(false);
        quiet.comment("Action check").unwrap();
        assert!(output(quiet).is_empty());

        let mut loud = reporter(true);
        loud.comment("Action check").unwrap();
        assert_eq!(output(loud), "# Action check\n");
    }

    #[test]
    fn test_verbose_rows() {
        let info = BitstreamInfo {
            bitstream_id: 7,
            internal_id: "abc123".to_string(),
            checksum: "aaa".to_string(),
            checksum_algorithm: "MD5".to_string(),
            deleted: false,
        };
        let mut status = MostRecentChecksum::unprocessed(&info);
        status.result = Some(ChecksumResult::NoMatch);
        status.current_checksum = Some("bbb".to_string());

        let ancestors = vec![
            DsoRecord {
                object: DsoRef::new(DsoType::Item, 3),
                handle: Some("123456789/3".to_string()),
                parent: Some(DsoRef::new(DsoType::Collection, 2)),
            },
            DsoRecord {
                object: DsoRef::new(DsoType::Collection, 2),
                handle: None,
                parent: None,
            },
        ];

        let mut r = reporter(true);
        r.bitstream_rows(0, Some(&status), Some(&info), 7, &ancestors).unwrap();
        let text = output(r);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "0 BITSTREAM.7 CHECKSUM_NO_MATCH internalId=abc123 delete=false lastDate=-"
        );
        assert_eq!(
            lines[1],
            "0 BITSTREAM.7 CHECKSUM_NO_MATCH algo=MD5 expected=aaa calculated=bbb"
        );
        assert_eq!(
            lines[2],
            "0 BITSTREAM.7 CHECKSUM_NO_MATCH ITEM:123456789/3 COLLECTION:- "
        );
    }

    #[test]
    fn test_unimplemented_row() {
        let mut r = reporter(false);
        r.unimplemented(3, 42, Action::History).unwrap();
        assert_eq!(output(r), "3: 42\tTODO history\n");
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::new("run-1", Action::Check, 0);
        summary.record(ChecksumResult::Match);
        summary.record(ChecksumResult::Match);
        summary.record(ChecksumResult::MarkedDeleted);
        assert!(summary.is_clean());

        summary.record(ChecksumResult::NotFound);
        assert_eq!(summary.count(ChecksumResult::Match), 2);
        assert_eq!(summary.count(ChecksumResult::NoMatch), 0);
        assert_eq!(summary.failures(), 1);
        assert!(!summary.is_clean());

        let text = summary.to_string();
        assert!(text.contains("# CHECKSUM_MATCH: 2"));
        assert!(text.contains("# BITSTREAM_NOT_FOUND: 1"));
        assert!(text.ends_with("(FAILURES)"));
    }

    #[test]
    fn test_summary_serializes_counts_by_code() {
        let mut summary = RunSummary::new("run-1", Action::Check, 0);
        summary.record(ChecksumResult::NoMatch);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["counts"]["CHECKSUM_NO_MATCH"], 1);
        assert_eq!(json["action"], "check");
    }
}
