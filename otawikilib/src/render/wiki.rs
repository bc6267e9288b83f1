//! Wiki table markup renderer.
//!
//! One forward pass over the sorted sequence. Every merged cell is driven
//! by the precomputed plan: when the plan holds an instruction for
//! (row, family) the row opens that group and emits the cell, otherwise
//! the row is covered by an earlier span and contributes nothing to that
//! column. The output grammar is fixture-tested byte for byte; change it
//! only together with the fixtures.

use std::fmt::Write;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::criteria::Criteria;
use crate::error::OtaError;
use crate::record::Record;
use crate::rowspan::{plan_spans, ColumnFamily, Span};

/// Quick shape check for a beta prerequisite build (13A4293g and the
/// like). Not bulletproof, but matches the wiki's own convention.
static BETA_BUILD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}[A-Z][4-6]\d{3}[a-z]?$").expect("valid regex"));

/// Release files are named by their SHA-1.
static ZIP_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9a-f]{40}\.zip").expect("valid regex"));

/// Builds that anchor the watch 1.0.x rows; their version cells suppress
/// the marketing text so the purported-version cell stands alone.
const WATCH_PSEUDO_PREREQ_BUILDS: &[&str] = &["12S507", "12S632"];

/// Placeholder version cell for the hardware family whose catalog entries
/// carry no marketing version at all.
const MARKETING_PLACEHOLDER: &str = "[MARKETING VERSION]";

/// Render the sorted sequence as wiki table markup.
///
/// With `full_table` the output is a complete table (header row and
/// closing marker); otherwise it is a row fragment for pasting into an
/// existing table. Fails with [`OtaError::SpanPlanLeftover`] if the merge
/// plan still holds instructions after the final row.
pub fn render_wiki(
    records: &[Record],
    criteria: &Criteria,
    full_table: bool,
) -> Result<String, OtaError> {
    let mut plan = plan_spans(records, criteria);
    let mut out = String::new();

    if full_table {
        out.push_str("{| class=\"wikitable\" style=\"font-size: smaller; text-align: center;\"\n");
        out.push_str("|-\n");
        out.push_str("! Version\n");
        out.push_str("! Build\n");
        out.push_str("! Prerequisite Version\n");
        out.push_str("! Prerequisite Build\n");

        if criteria.is_watch() {
            out.push_str("! Compatibility Version\n");
        }

        out.push_str("! Release Date\n");
        out.push_str("! Release Type\n");
        out.push_str("! OTA Download URL\n");
        out.push_str("! File Size\n");
    }

    for (row, record) in records.iter().enumerate() {
        out.push_str("|-\n");

        if let Some(span) = plan.take(row, ColumnFamily::MarketingVersion) {
            push_marketing_cells(&mut out, record, criteria, span);
        }

        if let Some(span) = plan.take(row, ColumnFamily::Build) {
            push_build_cell(&mut out, record, span);
        }

        if let Some(span) = plan.take(row, ColumnFamily::PrereqVersion) {
            push_prereq_version_cell(&mut out, record, span);
        }

        if !record.is_full_install() {
            if let Some(span) = plan.take(row, ColumnFamily::PrereqBuild) {
                out.push_str("| ");
                push_span_attr(&mut out, span);
                out.push_str(&record.prerequisite_build);
                out.push('\n');
            }
        }

        if record.compatibility_version > 0 {
            let _ = writeln!(out, "| {}", record.compatibility_version);
        }

        if let Some(span) = plan.take(row, ColumnFamily::Date) {
            push_date_cell(&mut out, record, span);
        }

        match record.reported_release_type.as_str() {
            "Public" => out.push_str("| {{n/a}}\n"),
            other => {
                let _ = writeln!(out, "| {other}");
            }
        }

        if let Some(span) = plan.take(row, ColumnFamily::File) {
            push_file_cells(&mut out, record, span);
        }
    }

    if full_table {
        out.push_str("|}");
    }

    let leftover = plan.remaining();
    if leftover > 0 {
        return Err(OtaError::SpanPlanLeftover { leftover });
    }

    debug!("rendered {} table rows", records.len());

    Ok(out)
}

fn push_span_attr(out: &mut String, span: Span) {
    if span.display > 1 && !span.forced_unspanned {
        let _ = write!(out, "rowspan=\"{}\" | ", span.display);
    }
}

fn push_marketing_cells(out: &mut String, record: &Record, criteria: &Criteria, span: Span) {
    if span.display > 1 {
        if criteria.is_legacy_tv() {
            let _ = writeln!(out, "| rowspan=\"{}\" | {MARKETING_PLACEHOLDER}", span.display);
        }
        let _ = write!(out, "| rowspan=\"{}\" ", span.display);
    } else if criteria.is_legacy_tv() {
        let _ = writeln!(out, "| {MARKETING_PLACEHOLDER}");
    }

    // The watch 1.0.x anchor rows show only the purported version below.
    if !WATCH_PSEUDO_PREREQ_BUILDS.contains(&record.prerequisite_build.as_str()) {
        out.push_str("| ");
        out.push_str(&record.marketing_version);
    }

    if record.beta_number > 0 {
        if let Some(label) = record.release_type.wiki_label() {
            out.push(' ');
            out.push_str(label);
        }
        if record.beta_number > 1 {
            let _ = write!(out, " {}", record.beta_number);
        }
    }

    if let Some(suffix) = &record.suffix {
        if !suffix.is_empty() {
            out.push(' ');
            out.push_str(suffix);
        }
    }

    out.push('\n');

    // The watch 1.0.x rows advertised an internal version of their own.
    if record.marketing_version.contains("1.0") && record.os_version.contains("8.2") {
        let _ = writeln!(out, "| rowspan=\"{}\" | {}", span.display, record.os_version);
    }
}

fn push_build_cell(out: &mut String, record: &Record, span: Span) {
    out.push_str("| ");
    push_span_attr(out, span);
    out.push_str(&record.actual_build);

    if !record.is_honest_build {
        out.push_str("<ref name=\"inflated\" />");
    }

    out.push('\n');
}

fn push_prereq_version_cell(out: &mut String, record: &Record, span: Span) {
    out.push_str("| ");

    if span.display > 1 {
        let _ = write!(out, "rowspan=\"{}\" ", span.display);
        if !record.is_full_install() {
            out.push_str("| ");
        }
    }

    if record.is_full_install() {
        out.push_str("colspan=\"2\" {{n/a}}\n");
        return;
    }

    let version = &record.prerequisite_version;
    if version.contains(" GM") {
        let _ = writeln!(out, "{}", version.replace("GM", "[[Golden Master|GM]]"));
    } else if BETA_BUILD.is_match(&record.prerequisite_build) && !version.contains("beta") {
        let _ = writeln!(out, "{version} beta #");
    } else {
        let _ = writeln!(out, "{version}");
    }
}

fn push_date_cell(out: &mut String, record: &Record, span: Span) {
    out.push_str("| ");
    push_span_attr(out, span);

    match &record.release_date {
        Some(date) => {
            let _ = writeln!(out, "{{{{date|{}|{}|{}}}}}", date.year(), date.month(), date.day());
        }
        None => out.push_str("{{n/a}}\n"),
    }
}

fn push_file_cells(out: &mut String, record: &Record, span: Span) {
    let file_name = ZIP_NAME
        .find(&record.url)
        .map(|m| m.as_str())
        .unwrap_or_default();

    out.push_str("| ");
    push_span_attr(out, span);
    let _ = writeln!(out, "[{} {}]", record.url, file_name);

    out.push_str("| ");
    push_span_attr(out, span);
    let _ = writeln!(out, "{}", record.size_display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawRecord;
    use crate::select::select;

    fn raw(os_version: &str, build: &str, prereq: Option<(&str, &str)>) -> RawRecord {
        RawRecord {
            supported_devices: vec!["iPhone6,1".to_string()],
            build: Some(build.to_string()),
            os_version: Some(os_version.to_string()),
            prerequisite_build: prereq.map(|(b, _)| b.to_string()),
            prerequisite_version: prereq.map(|(_, v)| v.to_string()),
            download_size: Some(1_234_567),
            base_url: Some(format!(
                "https://mesu.example.com/assets/091-0001.20160119.{build}{}/",
                prereq.map(|(b, _)| b).unwrap_or("full")
            )),
            relative_path: Some(
                "0123456789abcdef0123456789abcdef01234567.zip".to_string(),
            ),
            ..Default::default()
        }
    }

    fn render(catalog: &[RawRecord], criteria: &Criteria, full: bool) -> String {
        let records = select(catalog, criteria).unwrap();
        render_wiki(&records, criteria, full).unwrap()
    }

    #[test]
    fn test_single_row_fragment() {
        let catalog = vec![raw("9.2", "13C75", Some(("13A344", "9.0")))];
        let output = render(&catalog, &Criteria::new("iPhone6,1"), false);

        assert_eq!(
            output,
            "|-\n\
             | 9.2\n\
             | 13C75\n\
             | 9.0\n\
             | 13A344\n\
             | {{date|2016|01|19}}\n\
             | {{n/a}}\n\
             | [https://mesu.example.com/assets/091-0001.20160119.13C7513A344/0123456789abcdef0123456789abcdef01234567.zip 0123456789abcdef0123456789abcdef01234567.zip]\n\
             | 1,234,567\n"
        );
    }

    #[test]
    fn test_shared_marketing_version_spans_two_rows() {
        let catalog = vec![
            raw("9.2", "13C75", None),
            raw("9.2", "13C75", Some(("13A344", "9.0"))),
            raw("9.3", "13E233", None),
        ];
        let output = render(&catalog, &Criteria::new("iPhone6,1"), false);

        assert_eq!(output.matches("rowspan=\"2\" | 9.2\n").count(), 1);
        assert_eq!(output.matches("| 9.3\n").count(), 1);
        assert_eq!(output.matches("|-\n").count(), 3);
    }

    #[test]
    fn test_full_install_gets_combined_na_cell() {
        let catalog = vec![raw("9.2", "13C75", None)];
        let output = render(&catalog, &Criteria::new("iPhone6,1"), false);

        assert!(output.contains("| colspan=\"2\" {{n/a}}\n"));
        assert!(!output.contains("| N/A\n"));
    }

    #[test]
    fn test_spanned_na_cell_carries_both_attributes() {
        let catalog = vec![raw("9.2", "13C75", None), raw("9.2", "13C75", None)];
        let output = render(&catalog, &Criteria::new("iPhone6,1"), false);

        assert!(output.contains("| rowspan=\"2\" colspan=\"2\" {{n/a}}\n"));
    }

    #[test]
    fn test_full_table_framing() {
        let catalog = vec![raw("9.2", "13C75", None)];
        let output = render(&catalog, &Criteria::new("iPhone6,1"), true);

        assert!(output.starts_with(
            "{| class=\"wikitable\" style=\"font-size: smaller; text-align: center;\"\n|-\n! Version\n"
        ));
        assert!(output.contains("! OTA Download URL\n! File Size\n|-\n"));
        assert!(output.ends_with("|}"));
        assert!(!output.contains("! Compatibility Version"));
    }

    #[test]
    fn test_watch_table_has_compatibility_column() {
        let mut entry = raw("2.1", "13S661", None);
        entry.supported_devices = vec!["Watch1,1".to_string()];
        entry.compatibility_version = Some(2);

        let output = render(&[entry], &Criteria::new("Watch1,1"), true);

        assert!(output.contains("! Compatibility Version\n"));
        assert!(output.contains("| 2\n"));
    }

    #[test]
    fn test_beta_version_cell_label() {
        let mut entry = raw("9.3", "13E5181d", None);
        entry.release_type = Some("Beta".to_string());
        entry.documentation_id = Some("iOS93Seed2".to_string());

        let output = render(&[entry], &Criteria::new("iPhone6,1").include_beta(true), false);

        assert!(output.contains("| 9.3 beta 2\n"));
        assert!(output.contains("| Beta\n"));
    }

    #[test]
    fn test_beta_prerequisite_gets_hash_qualifier() {
        let catalog = vec![raw("9.2", "13C75", Some(("13C5055d", "9.2")))];
        let output = render(&catalog, &Criteria::new("iPhone6,1"), false);

        assert!(output.contains("| 9.2 beta #\n"));
    }

    #[test]
    fn test_golden_master_link_substitution() {
        let catalog = vec![raw("11.0", "15A372", Some(("15A372", "11.0 GM")))];
        let output = render(&catalog, &Criteria::new("iPhone6,1"), false);

        assert!(output.contains("| 11.0 [[Golden Master|GM]]\n"));
    }

    #[test]
    fn test_inflated_build_footnote() {
        let catalog = vec![raw("9.3.6", "13G4034", None)];
        let output = render(&catalog, &Criteria::new("iPhone6,1"), false);

        assert!(output.contains("| 13G34<ref name=\"inflated\" />\n"));
    }

    #[test]
    fn test_legacy_tv_placeholder_cell() {
        let mut entry = raw("6.2", "10B809", None);
        entry.supported_devices = vec!["AppleTV3,1".to_string()];

        let output = render(&[entry], &Criteria::new("AppleTV3,1"), false);

        assert!(output.contains("| [MARKETING VERSION]\n"));
        // The synthesized marketing version still gets its own cell.
        assert!(output.contains("| 6.2\n"));
    }

    #[test]
    fn test_missing_date_renders_na() {
        let mut entry = raw("9.2", "13C75", None);
        entry.base_url = Some("https://mesu.example.com/assets/latest/".to_string());

        let output = render(&[entry], &Criteria::new("iPhone6,1"), false);

        assert!(!output.contains("{{date|"));
        assert_eq!(output.matches("| {{n/a}}\n").count(), 2);
    }

    #[test]
    fn test_nonpublic_release_type_cell() {
        let mut entry = raw("9.2", "13C75", None);
        entry.release_type = Some("Internal".to_string());

        let output = render(&[entry], &Criteria::new("iPhone6,1").include_beta(true), false);

        assert!(output.contains("| Internal\n"));
    }

    #[test]
    fn test_suffix_appended_to_version_cell() {
        let mut entry = raw("9.2", "13C75", None);
        entry.suffix = Some("(revised)".to_string());

        let output = render(&[entry], &Criteria::new("iPhone6,1"), false);

        assert!(output.contains("| 9.2 (revised)\n"));
    }

    #[test]
    fn test_shared_file_spans_url_and_size_cells() {
        let mut a = raw("9.2", "13C75", Some(("13A405", "9.0.2")));
        let mut b = raw("9.2", "13C75", Some(("13B143", "9.1")));
        let url = "https://mesu.example.com/assets/091-0001.20160119.same/".to_string();
        a.base_url = Some(url.clone());
        b.base_url = Some(url);

        let output = render(&[a, b], &Criteria::new("iPhone6,1"), false);

        let spanned_files = output
            .lines()
            .filter(|l| l.starts_with("| rowspan=\"2\" | [https://"))
            .count();
        let spanned_sizes = output
            .lines()
            .filter(|l| *l == "| rowspan=\"2\" | 1,234,567")
            .count();
        assert_eq!(spanned_files, 1);
        assert_eq!(spanned_sizes, 1);
    }

    #[test]
    fn test_watch_pseudo_prereq_suppresses_marketing_text() {
        let mut entry = raw("8.2", "12S507", Some(("12S507", "1.0")));
        entry.supported_devices = vec!["Watch1,1".to_string()];
        entry.marketing_version = Some("1.0.1".to_string());

        let output = render(&[entry], &Criteria::new("Watch1,1"), false);

        assert!(!output.contains("| 1.0.1\n"));
        // The purported internal version is shown instead.
        assert!(output.contains("| rowspan=\"1\" | 8.2\n"));
    }
}
