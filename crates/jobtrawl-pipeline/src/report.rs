//! Plain-text keyword reports.

use crate::pagination::slugify;
use jobtrawl_core::EnrichedRecord;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Column limit of report text.
pub const REPORT_WIDTH: usize = 70;

/// Skills listed per record.
const TOP_SKILLS: usize = 5;

/// File name of the report for `keyword`.
#[must_use]
pub fn report_file_name(keyword: &str) -> String {
    format!("Job_Report_keyword-{}.txt", slugify(keyword))
}

/// Render every record of a keyword as a wrapped text report.
#[must_use]
pub fn render_report(keyword: &str, records: &[EnrichedRecord]) -> String {
    let keyword = keyword.trim();
    let count = records.len();
    let mut out = String::new();
    push_wrapped(
        &mut out,
        &format!("Job report for '{keyword}': {count} listing(s)"),
        "",
        "",
    );
    out.push_str(&"=".repeat(REPORT_WIDTH));
    out.push('\n');

    for (n, record) in records.iter().enumerate() {
        out.push('\n');
        let title = record.title.as_deref().unwrap_or("(untitled)");
        push_wrapped(&mut out, &format!("{}. {title}", n + 1), "", "   ");

        let fields = [
            ("Organization", record.organization.clone()),
            ("Location", record.location.clone()),
            ("Salary", record.salary.clone()),
            (
                "Skills",
                (!record.skills.is_empty()).then(|| {
                    record
                        .skills
                        .iter()
                        .take(TOP_SKILLS)
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                }),
            ),
            ("Source", Some(record.source_url.clone())),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                push_wrapped(&mut out, &format!("{label}: {value}"), "   ", "      ");
            }
        }
    }
    out
}

/// Write the report for `keyword` into `dir`, creating it if needed.
pub fn write_report(
    dir: &Path,
    keyword: &str,
    records: &[EnrichedRecord],
) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(keyword));
    std::fs::write(&path, render_report(keyword, records))?;
    tracing::info!(path = %path.display(), records = records.len(), "report written");
    Ok(path)
}

/// Greedy word wrap. The first line starts with `first`, continuation
/// lines with `rest`; words longer than the width stay whole.
fn push_wrapped(out: &mut String, text: &str, first: &str, rest: &str) {
    let mut line = first.to_string();
    let mut has_word = false;
    for word in text.split_whitespace() {
        if has_word && line.chars().count() + 1 + word.chars().count() > REPORT_WIDTH {
            let _ = writeln!(out, "{line}");
            line = rest.to_string();
            has_word = false;
        }
        if has_word {
            line.push(' ');
        }
        line.push_str(word);
        has_word = true;
    }
    let _ = writeln!(out, "{}", line.trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobtrawl_core::Identity;

    fn record(id: &str) -> EnrichedRecord {
        EnrichedRecord {
            identity: Identity::new(id).expect("non-empty identity"),
            source_url: format!("https://hk.jobsdb.com/job/{id}"),
            search_keyword: "data analyst".to_string(),
            title: Some("Data Analyst".to_string()),
            organization: Some("Acme Logistics".to_string()),
            responsibilities: Vec::new(),
            qualifications: Vec::new(),
            experience_notes: Vec::new(),
            skills: ["SQL", "Python", "Tableau", "Excel", "Power BI", "Statistics"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            salary: None,
            location: Some("Kwun Tong".to_string()),
        }
    }

    #[test]
    fn test_file_name_uses_slug() {
        assert_eq!(
            report_file_name(" Data Analyst "),
            "Job_Report_keyword-data-analyst.txt"
        );
    }

    #[test]
    fn test_render_report() {
        let report = render_report("data analyst", &[record("1"), record("2")]);

        assert!(report.starts_with("Job report for 'data analyst': 2 listing(s)\n"));
        assert!(report.contains("1. Data Analyst\n"));
        assert!(report.contains("2. Data Analyst\n"));
        assert!(report.contains("   Organization: Acme Logistics\n"));
        assert!(report.contains("   Skills: SQL, Python, Tableau, Excel, Power BI\n"));
        assert!(!report.contains("Statistics"));
        assert!(!report.contains("Salary"));
    }

    #[test]
    fn test_lines_are_wrapped() {
        let mut long = record("1");
        long.title = Some("word ".repeat(40));
        let report = render_report("k", &[long]);

        assert!(report.lines().all(|l| l.chars().count() <= REPORT_WIDTH));
        assert!(report.lines().any(|l| l.starts_with("   word")));
    }

    #[test]
    fn test_empty_report() {
        let report = render_report("k", &[]);
        assert_eq!(report.lines().count(), 2);
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let target = dir.path().join("reports");

        let path = write_report(&target, "data analyst", &[record("1")]).expect("write report");
        assert_eq!(path, target.join("Job_Report_keyword-data-analyst.txt"));
        let contents = std::fs::read_to_string(&path).expect("read report");
        assert!(contents.contains("Kwun Tong"));
    }
}
