//! Cell-merge planning for the wiki table.
//!
//! Consecutive rows of the sorted sequence often repeat a value — the same
//! marketing version across a beta train, the same file reused by many
//! deltas — and the table collapses those runs into one spanned cell.
//! [`plan_spans`] precomputes the whole merge plan up front: an explicit
//! set of instructions keyed by (row index, column family), each saying how
//! many rows the cell at that row covers. The renderer consults and
//! consumes the plan during its single forward pass; it never recomputes or
//! mutates group state of its own.
//!
//! The historical irregularities of the catalog (files reused
//! non-contiguously, mis-advertised deltas, display-only rows on one
//! platform) live here as const lookup tables, so a new exception is a new
//! table entry rather than new branching.

use std::collections::HashMap;
use std::hash::Hash;

use crate::criteria::Criteria;
use crate::record::Record;
use crate::version::Version;

/// The independently merged column groups of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnFamily {
    /// Marketing version; keyed by the displayed version string.
    MarketingVersion,
    /// Build number; keyed by the declared build, so the entry pointing
    /// betas at a final build stays separate from the final itself.
    Build,
    /// Prerequisite OS version, scoped per declared build.
    PrereqVersion,
    /// Prerequisite build, scoped per declared build. Full installs have
    /// no cell in this family (the version cell absorbs both columns).
    PrereqBuild,
    /// Release date; keyed by the actual build, because distinct builds
    /// can legitimately share a calendar date.
    Date,
    /// Release file URL and size, merged together under one span.
    File,
}

/// One merge instruction: the cell emitted at this row covers `rows` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Rows covered by this cell.
    pub rows: usize,
    /// Count written into the `rowspan` attribute. Usually equals `rows`;
    /// differs where display-only rows inflate the visible span.
    pub display: usize,
    /// Render without a `rowspan` attribute even when `display > 1`.
    pub forced_unspanned: bool,
}

impl Span {
    fn of(rows: usize) -> Span {
        Span {
            rows,
            display: rows,
            forced_unspanned: false,
        }
    }

    fn unspanned() -> Span {
        Span {
            rows: 1,
            display: 1,
            forced_unspanned: true,
        }
    }
}

/// Rows that must stay out of their URL's file span. The iPod touch 5G
/// 8.4.1 delta from 10B141 shares its file with the universal entry but is
/// listed on the wiki as its own row.
struct FileSpanExclusion {
    device: &'static str,
    os_version: &'static str,
    prerequisite_build: &'static str,
}

const FILE_SPAN_EXCLUSIONS: &[FileSpanExclusion] = &[FileSpanExclusion {
    device: "iPod5,1",
    os_version: "8.4.1",
    prerequisite_build: "10B141",
}];

/// Deltas the vendor shipped broken; their rows render file cells
/// unspanned so the wiki can annotate them individually.
struct BorkedDelta {
    device: &'static str,
    prerequisite_build: &'static str,
}

const BORKED_DELTAS: &[BorkedDelta] = &[BorkedDelta {
    device: "iPod5,1",
    prerequisite_build: "10B141",
}];

/// How the OS version of a group's first row is matched by a
/// [`FileSpanReduction`].
enum VersionRule {
    Exact(&'static str),
    AtLeast(&'static str),
}

/// Some firmware files appear in multiple runs of the catalog separated by
/// unrelated files (FILE_A, FILE_A, FILE_B, FILE_A, ...). A plain URL
/// grouping would merge across the gap, so these entries shave a fixed
/// number of rows off the computed span; the shaved rows start a span of
/// their own.
struct FileSpanReduction {
    prerequisite_build: &'static str,
    os_version: VersionRule,
    /// Search devices the rule applies to; empty means every device.
    devices: &'static [&'static str],
    /// Restrict the rule to final releases, leaving betas alone.
    finals_only: bool,
    reduce_by: usize,
}

const FILE_SPAN_REDUCTIONS: &[FileSpanReduction] = &[
    FileSpanReduction {
        prerequisite_build: "N/A",
        os_version: VersionRule::Exact("9.2"),
        devices: &["iPhone4,1", "iPhone5,1", "iPhone5,2"],
        finals_only: true,
        reduce_by: 4,
    },
    FileSpanReduction {
        prerequisite_build: "N/A",
        os_version: VersionRule::Exact("9.2.1"),
        devices: &[],
        finals_only: true,
        reduce_by: 2,
    },
    FileSpanReduction {
        prerequisite_build: "13A340",
        os_version: VersionRule::Exact("9.2"),
        devices: &[],
        finals_only: false,
        reduce_by: 2,
    },
    FileSpanReduction {
        prerequisite_build: "13A344",
        os_version: VersionRule::Exact("9.2.1"),
        devices: &[],
        finals_only: false,
        reduce_by: 1,
    },
    // The iOS 10.2 delta is reused from 11.2 onward, but 10.3.3 beta 6
    // sits between the runs and splits it.
    FileSpanReduction {
        prerequisite_build: "14C92",
        os_version: VersionRule::AtLeast("11.2"),
        devices: &[],
        finals_only: false,
        reduce_by: 1,
    },
    FileSpanReduction {
        prerequisite_build: "14E277",
        os_version: VersionRule::AtLeast("11.2"),
        devices: &[],
        finals_only: false,
        reduce_by: 1,
    },
];

/// Marketing-version groups whose visible span exceeds the row count.
/// The watch platform's "9.0" section carries two display-only rows for
/// the purported pre-release numbering.
const WATCH_MARKETING_SPAN_BUMPS: &[(&str, usize)] = &[("9.0", 2)];

/// The computed merge plan for one render of one sorted sequence.
///
/// Instructions are consumed exactly once via [`MergePlan::take`]; the
/// renderer checks [`MergePlan::remaining`] after its final row.
#[derive(Debug)]
pub struct MergePlan {
    instructions: HashMap<(usize, ColumnFamily), Span>,
}

impl MergePlan {
    /// Remove and return the instruction at (row, family), if this row
    /// starts a group in that family.
    pub fn take(&mut self, row: usize, family: ColumnFamily) -> Option<Span> {
        self.instructions.remove(&(row, family))
    }

    /// Instructions not yet consumed.
    pub fn remaining(&self) -> usize {
        self.instructions.len()
    }
}

/// Compute the merge plan for a sorted sequence.
///
/// Rows are addressed by their index in `records`. The plan is only valid
/// for the exact sequence it was computed from and for a single render.
pub fn plan_spans(records: &[Record], criteria: &Criteria) -> MergePlan {
    let mut instructions = HashMap::new();

    plan_family(records, ColumnFamily::MarketingVersion, &mut instructions, |r| {
        Some(r.marketing_version.clone())
    });
    plan_family(records, ColumnFamily::Build, &mut instructions, |r| {
        Some(r.declared_build.clone())
    });
    plan_family(records, ColumnFamily::PrereqVersion, &mut instructions, |r| {
        Some((r.declared_build.clone(), r.prerequisite_version.clone()))
    });
    plan_family(records, ColumnFamily::PrereqBuild, &mut instructions, |r| {
        if r.is_full_install() {
            None
        } else {
            Some((r.declared_build.clone(), r.prerequisite_build.clone()))
        }
    });
    plan_family(records, ColumnFamily::Date, &mut instructions, |r| {
        Some(r.actual_build.clone())
    });

    if criteria.is_watch() {
        apply_marketing_bumps(records, &mut instructions);
    }

    plan_files(records, criteria, &mut instructions);

    MergePlan { instructions }
}

/// Group rows by key and drop one instruction at each group's first row.
fn plan_family<K, F>(
    records: &[Record],
    family: ColumnFamily,
    instructions: &mut HashMap<(usize, ColumnFamily), Span>,
    key_of: F,
) where
    K: Eq + Hash,
    F: Fn(&Record) -> Option<K>,
{
    let mut groups: HashMap<K, (usize, usize)> = HashMap::new();

    for (row, record) in records.iter().enumerate() {
        if let Some(key) = key_of(record) {
            groups
                .entry(key)
                .and_modify(|(_, rows)| *rows += 1)
                .or_insert((row, 1));
        }
    }

    for (first_row, rows) in groups.into_values() {
        instructions.insert((first_row, family), Span::of(rows));
    }
}

fn apply_marketing_bumps(
    records: &[Record],
    instructions: &mut HashMap<(usize, ColumnFamily), Span>,
) {
    for (version, bump) in WATCH_MARKETING_SPAN_BUMPS {
        let first_row = records
            .iter()
            .position(|r| r.marketing_version == *version);

        if let Some(row) = first_row {
            if let Some(span) = instructions.get_mut(&(row, ColumnFamily::MarketingVersion)) {
                span.display += bump;
            }
        }
    }
}

/// Group rows by release-file URL, carving out the excluded and borked
/// rows as standalone unspanned cells, then split each group wherever a
/// reduction rule says the catalog interleaved the file with others.
fn plan_files(
    records: &[Record],
    criteria: &Criteria,
    instructions: &mut HashMap<(usize, ColumnFamily), Span>,
) {
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();

    for (row, record) in records.iter().enumerate() {
        if excluded_from_file_span(record) || is_borked_delta(record) {
            instructions.insert((row, ColumnFamily::File), Span::unspanned());
        } else {
            groups.entry(record.url.as_str()).or_default().push(row);
        }
    }

    for members in groups.into_values() {
        let mut rest: &[usize] = &members;

        while !rest.is_empty() {
            let first = rest[0];
            let reduce = file_span_reduction(&records[first], criteria);
            let take = rest.len().saturating_sub(reduce).max(1);

            instructions.insert((first, ColumnFamily::File), Span::of(take));
            rest = &rest[take..];
        }
    }
}

fn excluded_from_file_span(record: &Record) -> bool {
    FILE_SPAN_EXCLUSIONS.iter().any(|rule| {
        record.supported_devices.iter().any(|d| d == rule.device)
            && record.os_version == rule.os_version
            && record.prerequisite_build == rule.prerequisite_build
    })
}

fn is_borked_delta(record: &Record) -> bool {
    BORKED_DELTAS.iter().any(|rule| {
        record.supported_devices.iter().any(|d| d == rule.device)
            && record.prerequisite_build == rule.prerequisite_build
    })
}

fn file_span_reduction(record: &Record, criteria: &Criteria) -> usize {
    FILE_SPAN_REDUCTIONS
        .iter()
        .filter(|rule| rule.prerequisite_build == record.prerequisite_build)
        .filter(|rule| rule.devices.is_empty() || rule.devices.contains(&criteria.device.as_str()))
        .filter(|rule| !rule.finals_only || record.beta_number == 0)
        .find(|rule| match &rule.os_version {
            VersionRule::Exact(version) => record.os_version == *version,
            VersionRule::AtLeast(floor) => match Version::parse(floor) {
                Ok(floor) => record.sort_version >= floor,
                Err(_) => false,
            },
        })
        .map(|rule| rule.reduce_by)
        .unwrap_or(0)
}
