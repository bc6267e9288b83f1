//! Output renderers.
//!
//! Two renderers consume the sorted sequence: [`wiki`] emits the merged
//! table markup driven by a [`crate::rowspan::MergePlan`], and [`plain`]
//! emits one labeled text block per record with no cross-row state.

pub mod plain;
pub mod wiki;

pub use plain::render_plain;
pub use wiki::render_wiki;
