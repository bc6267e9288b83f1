//! Filter/sort engine.
//!
//! [`select`] evaluates the criteria against every raw record independently
//! and returns one totally ordered sequence. Evaluation is embarrassingly
//! parallel: the catalog is split across scoped worker threads, each worker
//! keeps a private accumulator, and the results are merged once every
//! worker is done. No ordering exists between workers — the final stable
//! sort re-establishes the only ordering contract the renderers rely on.

use std::thread;

use log::debug;

use crate::criteria::Criteria;
use crate::error::OtaError;
use crate::record::{RawRecord, Record};
use crate::version::Version;

/// Filter the raw catalog against the criteria and sort the survivors.
///
/// Fails up front with a validation error for bad criteria, and with
/// [`OtaError::MalformedRecord`] if any raw record is unusable — the whole
/// load fails rather than silently desynchronizing span counts.
pub fn select(raw: &[RawRecord], criteria: &Criteria) -> Result<Vec<Record>, OtaError> {
    criteria.validate()?;

    let mut records = evaluate_all(raw, criteria)?;
    records.sort_by(|a, b| {
        a.sort_version
            .cmp(&b.sort_version)
            .then_with(|| a.sort_build.cmp(&b.sort_build))
    });

    debug!("kept {} of {} catalog records", records.len(), raw.len());

    Ok(records)
}

/// Fan out the per-record predicate across worker threads and fan the
/// surviving records back in, in catalog order.
fn evaluate_all(raw: &[RawRecord], criteria: &Criteria) -> Result<Vec<Record>, OtaError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(raw.len());
    let chunk_size = raw.len().div_ceil(workers);

    let per_worker = thread::scope(|scope| {
        let handles: Vec<_> = raw
            .chunks(chunk_size)
            .enumerate()
            .map(|(chunk_index, chunk)| {
                scope.spawn(move || {
                    let base = chunk_index * chunk_size;
                    let mut kept = Vec::new();
                    for (offset, entry) in chunk.iter().enumerate() {
                        if let Some(record) = evaluate(entry, base + offset, criteria)? {
                            kept.push(record);
                        }
                    }
                    Ok::<_, OtaError>(kept)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().expect("filter worker panicked"))
            .collect::<Result<Vec<_>, OtaError>>()
    })?;

    Ok(per_worker.into_iter().flatten().collect())
}

/// Evaluate one raw record; `Ok(None)` means it was filtered out.
fn evaluate(
    entry: &RawRecord,
    position: usize,
    criteria: &Criteria,
) -> Result<Option<Record>, OtaError> {
    let record = Record::from_raw(entry, position)?;

    if !criteria.include_beta && !record.release_type.is_public() {
        return Ok(None);
    }

    if criteria.remove_stubs && !record.allowable_ota {
        return Ok(None);
    }

    if !record.supported_devices.iter().any(|d| d == &criteria.device) {
        return Ok(None);
    }

    if criteria.requires_model() {
        // Skip unless the entry names models and ours is among them.
        let wanted = criteria.model.as_deref().unwrap_or("");
        if !record.supported_models.iter().any(|m| m == wanted) {
            return Ok(None);
        }
    }

    if criteria.minimum.is_some() || criteria.maximum.is_some() {
        let marketing = Version::parse(&record.marketing_version).map_err(|_| {
            OtaError::MalformedRecord {
                position,
                reason: format!(
                    "unparseable MarketingVersion '{}'",
                    record.marketing_version
                ),
            }
        })?;

        if let Some(maximum) = &criteria.maximum {
            if &marketing > maximum {
                return Ok(None);
            }
        }
        if let Some(minimum) = &criteria.minimum {
            if &marketing < minimum {
                return Ok(None);
            }
        }
    }

    Ok(Some(record))
}
