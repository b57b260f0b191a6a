//! Bulk loading of record summaries.
//!
//! A fixed pool of scoped worker threads pulls indices from a shared
//! counter, reads one record per index, and keeps `(index, slot)` pairs
//! locally. Nothing is consumed until every worker has joined; slots are then
//! placed by index, so the output order is the input order no matter how
//! many workers ran or in which order they finished.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::io::layout::StoreLayout;
use crate::model::config::LoaderConfig;
use crate::model::record::{Partition, RecordSummary};
use crate::ops::record_store::{list_records, read_record};
use crate::ops::timestamp::{sort_by_recency, sort_by_recency_lenient};

/// Shared flag for abandoning a load that is no longer wanted
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Worker threads; `None` = available parallelism
    pub workers: Option<usize>,
    /// Reads not started by this instant are reported as timed out
    pub deadline: Option<Instant>,
    pub cancel: Option<CancelToken>,
    /// Set aside file names without a timestamp instead of failing
    pub skip_malformed_names: bool,
}

impl LoadOptions {
    pub fn from_config(config: &LoaderConfig) -> Self {
        LoadOptions {
            workers: (config.workers > 0).then_some(config.workers),
            deadline: (config.deadline_ms > 0)
                .then(|| Instant::now() + Duration::from_millis(config.deadline_ms)),
            cancel: None,
            skip_malformed_names: config.skip_malformed_names,
        }
    }

    fn worker_count(&self, jobs: usize) -> usize {
        let wanted = self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });
        wanted.clamp(1, jobs.max(1))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }
}

/// Outcome of loading one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummarySlot {
    Loaded(RecordSummary),
    Failed { path: PathBuf, reason: String },
    TimedOut { path: PathBuf },
}

impl SummarySlot {
    pub fn path(&self) -> &Path {
        match self {
            SummarySlot::Loaded(s) => &s.path,
            SummarySlot::Failed { path, .. } | SummarySlot::TimedOut { path } => path,
        }
    }

    pub fn summary(&self) -> Option<&RecordSummary> {
        match self {
            SummarySlot::Loaded(s) => Some(s),
            _ => None,
        }
    }

    fn checked(&self) -> bool {
        self.summary().is_some_and(|s| s.checked)
    }
}

/// Load one summary per path, in input order.
///
/// Per-path failures become `Failed` slots and never affect siblings.
/// Returns `LoadCancelled` if the cancel token is set by the time the pool
/// has joined.
pub fn load_summaries(
    layout: &StoreLayout,
    paths: &[PathBuf],
    options: &LoadOptions,
) -> StoreResult<Vec<SummarySlot>> {
    load_summaries_with_progress(layout, paths, options, &|_| {})
}

/// Like [`load_summaries`], calling `progress` from the worker threads with
/// the input index of each slot as soon as it is filled.
pub fn load_summaries_with_progress(
    layout: &StoreLayout,
    paths: &[PathBuf],
    options: &LoadOptions,
    progress: &(dyn Fn(usize) + Sync),
) -> StoreResult<Vec<SummarySlot>> {
    if options.is_cancelled() {
        return Err(StoreError::LoadCancelled);
    }

    let workers = options.worker_count(paths.len());
    let next = AtomicUsize::new(0);
    let started = Instant::now();

    let tagged: Vec<Vec<(usize, SummarySlot)>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| s.spawn(|| run_worker(layout, paths, options, &next, progress)))
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(done) => done,
                Err(_) => {
                    tracing::warn!("bulk load worker panicked");
                    Vec::new()
                }
            })
            .collect()
    });

    if options.is_cancelled() {
        tracing::debug!(paths = paths.len(), "bulk load cancelled");
        return Err(StoreError::LoadCancelled);
    }

    let mut slots: Vec<Option<SummarySlot>> = vec![None; paths.len()];
    for (index, slot) in tagged.into_iter().flatten() {
        slots[index] = Some(slot);
    }
    let slots: Vec<SummarySlot> = slots
        .into_iter()
        .zip(paths)
        .map(|(slot, path)| {
            slot.unwrap_or_else(|| SummarySlot::Failed {
                path: path.clone(),
                reason: "worker stopped before reading this record".into(),
            })
        })
        .collect();

    tracing::debug!(
        paths = paths.len(),
        workers,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "bulk load finished"
    );
    Ok(slots)
}

fn run_worker(
    layout: &StoreLayout,
    paths: &[PathBuf],
    options: &LoadOptions,
    next: &AtomicUsize,
    progress: &(dyn Fn(usize) + Sync),
) -> Vec<(usize, SummarySlot)> {
    let mut done = Vec::new();
    loop {
        let index = next.fetch_add(1, Ordering::Relaxed);
        let Some(path) = paths.get(index) else {
            break;
        };
        if options.is_cancelled() {
            break;
        }
        let slot = if options.deadline.is_some_and(|d| Instant::now() >= d) {
            SummarySlot::TimedOut { path: path.clone() }
        } else {
            load_one(layout, path)
        };
        done.push((index, slot));
        progress(index);
    }
    done
}

fn load_one(layout: &StoreLayout, path: &Path) -> SummarySlot {
    let partition = layout
        .locate(path)
        .map(|(_, p)| p)
        .unwrap_or(Partition::Inbox);
    match read_record(path) {
        Ok(record) => SummarySlot::Loaded(RecordSummary {
            primary_value: record.primary_value().to_string(),
            path: path.to_path_buf(),
            checked: record.checked,
            partition,
        }),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not load record");
            SummarySlot::Failed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        }
    }
}

/// Stable resort: unchecked entries first, original order kept within each
/// bucket. Entries that did not load count as unchecked.
pub fn order_unchecked_first(slots: &mut [SummarySlot]) {
    slots.sort_by_key(|s| s.checked());
}

/// List a partition, sort it most recent first, load it, and put unchecked
/// entries first.
pub fn load_partition(
    layout: &StoreLayout,
    list_name: &str,
    partition: Partition,
    options: &LoadOptions,
) -> StoreResult<Vec<SummarySlot>> {
    let paths = list_records(layout, list_name, partition)?;
    let sorted = if options.skip_malformed_names {
        sort_by_recency_lenient(paths).0
    } else {
        sort_by_recency(paths)?
    };
    let mut slots = load_summaries(layout, &sorted, options)?;
    order_unchecked_first(&mut slots);
    Ok(slots)
}

/// Case-insensitive literal match on the display title of loaded entries.
pub fn search_summaries<'a>(slots: &'a [SummarySlot], query: &str) -> Vec<&'a RecordSummary> {
    let Ok(re) = regex::RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    else {
        return Vec::new();
    };
    slots
        .iter()
        .filter_map(SummarySlot::summary)
        .filter(|s| re.is_match(&s.primary_value))
        .collect()
}
