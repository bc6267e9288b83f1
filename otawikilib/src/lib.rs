//! # otawikilib
//!
//! Filters an OTA software-update catalog and renders the result either as
//! a human-readable report or as wiki table markup with merged cells.
//!
//! ## Overview
//!
//! The catalog loader hands this library the raw `Assets` entries of an
//! update catalog. The pipeline then runs in three stages:
//!
//! - **Select**: build a typed [`Record`] per entry, drop the ones the
//!   [`Criteria`] rule out, and sort by OS version then build number.
//! - **Plan**: precompute which consecutive rows merge into spanned table
//!   cells, per column family, including the documented historical
//!   exceptions ([`rowspan::plan_spans`]).
//! - **Render**: emit either one labeled block per record or the merged
//!   wiki table, byte-stable for fixture tests.
//!
//! The library performs no I/O; fetching and deserializing the catalog is
//! the caller's concern.
//!
//! ## Example
//!
//! ```rust
//! use otawikilib::{report, Criteria, OutputMode, RawRecord};
//!
//! let entry = RawRecord {
//!     supported_devices: vec!["iPhone6,1".to_string()],
//!     build: Some("13C75".to_string()),
//!     os_version: Some("9.2".to_string()),
//!     download_size: Some(1_234_567),
//!     base_url: Some("https://mesu.example.com/assets/091-0001.20151208.abc/".to_string()),
//!     relative_path: Some("0123456789abcdef0123456789abcdef01234567.zip".to_string()),
//!     ..Default::default()
//! };
//!
//! let criteria = Criteria::new("iPhone6,1");
//! let output = report(&[entry], &criteria, OutputMode::Plain, false).unwrap();
//! assert!(output.starts_with("iOS 9.2 (Build 13C75)"));
//! ```

pub mod criteria;
pub mod error;
pub mod record;
pub mod render;
pub mod rowspan;
pub mod select;
pub mod version;

pub use criteria::{Criteria, DeviceFamily};
pub use error::OtaError;
pub use record::{RawRecord, RealUpdateAttributes, Record, ReleaseDate, ReleaseType};
pub use render::{render_plain, render_wiki};
pub use select::select;
pub use version::{BuildNumber, Version};

/// Convenience alias for pipeline results.
pub type Result<T> = std::result::Result<T, OtaError>;

/// Which renderer [`report`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One labeled text block per record.
    Plain,
    /// Wiki table markup with merged cells.
    Wiki,
}

/// Run the whole pipeline: filter, sort, and render.
///
/// `full_table` only affects [`OutputMode::Wiki`], where it wraps the rows
/// in a complete table with a header and closing marker.
pub fn report(
    raw: &[RawRecord],
    criteria: &Criteria,
    mode: OutputMode,
    full_table: bool,
) -> Result<String> {
    let records = select(raw, criteria)?;

    match mode {
        OutputMode::Plain => Ok(render_plain(&records, criteria)),
        OutputMode::Wiki => render_wiki(&records, criteria, full_table),
    }
}
