//! Human-readable report renderer. One labeled block per record, no state
//! shared across rows.

use std::fmt::Write;

use crate::criteria::Criteria;
use crate::record::Record;

/// Render the sorted sequence as one descriptive block per record.
pub fn render_plain(records: &[Record], criteria: &Criteria) -> String {
    let os_name = criteria.device_family().os_name();
    let mut out = String::new();

    for record in records {
        let _ = write!(out, "{os_name} {}", record.marketing_version);

        if let Some(label) = record.release_type.plain_label() {
            let _ = write!(out, " {label}");
            if record.beta_number > 1 {
                let _ = write!(out, " {}", record.beta_number);
            }
        }

        let _ = writeln!(out, " (Build {})", record.actual_build);
        let _ = writeln!(
            out,
            "Listed as: {} (Build {})",
            record.os_version, record.declared_build
        );
        let _ = writeln!(
            out,
            "Reported Release Type: {}",
            record.reported_release_type
        );

        if record.is_full_install() {
            out.push_str("Requires: Not specified\n");
        } else {
            let _ = writeln!(
                out,
                "Requires: {} (Build {})",
                record.prerequisite_version, record.prerequisite_build
            );
        }

        match &record.release_date {
            Some(date) => {
                let _ = writeln!(
                    out,
                    "Timestamp: {}/{}/{}",
                    date.year(),
                    date.month(),
                    date.day()
                );
            }
            None => out.push_str("Timestamp: Not Available\n"),
        }

        if record.compatibility_version > 0 {
            let _ = writeln!(out, "Compatibility Version: {}", record.compatibility_version);
        }

        let _ = writeln!(out, "URL: {}", record.url);
        let _ = writeln!(out, "File size: {}\n", record.size_display());
    }

    out
}
