//! Report formatting and printing utilities.
//!
//! Separate from orchestration logic so the engine can be driven as a
//! library without pulling in terminal formatting.

use std::io::{self, Write};

use colored::Colorize;

use crate::orchestrator::{RunKind, RunSummary};

pub const SUCCESS_MARK: &str = "\u{2713}"; // check
pub const FAILURE_MARK: &str = "\u{2718}"; // cross

pub fn report(kind: RunKind, summary: &RunSummary) {
    report_to(kind, summary, &mut io::stdout().lock());
}

pub fn report_to<W: Write>(kind: RunKind, summary: &RunSummary, writer: &mut W) {
    for error in &summary.errors {
        let _ = writeln!(writer, "{} {}", FAILURE_MARK.red(), error.red());
    }

    if kind == RunKind::Status {
        print_status(summary, writer);
        return;
    }

    for file in &summary.files {
        if file.translated_keys == 0 {
            continue;
        }
        let verb = match kind {
            RunKind::Ci => "would translate",
            _ => "translated",
        };
        let _ = writeln!(
            writer,
            "{} {} {} key(s) in {}",
            SUCCESS_MARK.green(),
            verb,
            file.translated_keys,
            file.target_path.display()
        );
        if file.failed_keys > 0 {
            let _ = writeln!(
                writer,
                "{} {} key(s) skipped (too large for the provider) in {}",
                FAILURE_MARK.red(),
                file.failed_keys,
                file.target_path.display()
            );
        }
    }

    print_summary_line(kind, summary, writer);
}

fn print_status<W: Write>(summary: &RunSummary, writer: &mut W) {
    for file in &summary.files {
        let total = file.translated_keys + file.skipped_keys;
        let percent = if total == 0 { 100.0 } else { (file.skipped_keys as f64 / total as f64) * 100.0 };
        let _ = writeln!(writer, "{}: {:.1}% complete ({})", file.locale, percent, file.target_path.display());
    }
}

fn print_summary_line<W: Write>(kind: RunKind, summary: &RunSummary, writer: &mut W) {
    let total = summary.total_translated();
    if total == 0 && summary.errors.is_empty() {
        let _ = writeln!(writer, "{} {}", SUCCESS_MARK.green(), "everything is already up to date".green());
        return;
    }

    match kind {
        RunKind::Ci if total > 0 => {
            let _ = writeln!(
                writer,
                "{} {}",
                FAILURE_MARK.red(),
                format!("{total} key(s) are missing or outdated").red()
            );
        }
        _ => {
            let _ = writeln!(writer, "{} {}", SUCCESS_MARK.green(), format!("translated {total} key(s)").green());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::FileSummary;
    use std::path::PathBuf;

    #[test]
    fn ci_with_outstanding_keys_prints_failure_summary() {
        let summary = RunSummary {
            files: vec![FileSummary {
                source_path: PathBuf::from("en.json"),
                target_path: PathBuf::from("fr.json"),
                locale: "fr".to_string(),
                translated_keys: 2,
                skipped_keys: 0,
                failed_keys: 0,
                wrote_in_place: false,
            }],
            errors: Vec::new(),
        };
        let mut buf = Vec::new();
        report_to(RunKind::Ci, &summary, &mut buf);
        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("2 key(s) are missing or outdated"));
    }

    #[test]
    fn clean_run_prints_up_to_date_message() {
        let summary = RunSummary::default();
        let mut buf = Vec::new();
        report_to(RunKind::Update, &summary, &mut buf);
        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("already up to date"));
    }
}
