//! Moving records between a list's inbox and archive.
//!
//! A record must live in exactly one partition. Every move checks both
//! locations first and refuses with `MoveConflict` rather than guess when
//! the record is found in both.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::io::layout::StoreLayout;
use crate::model::record::{Partition, RecordSummary};

/// Where a record is now and where it would go
struct Placement {
    inbox: PathBuf,
    archive: PathBuf,
}

impl Placement {
    fn of(layout: &StoreLayout, path: &Path) -> StoreResult<Placement> {
        let (inbox, archive) = layout
            .counterpart(path, Partition::Inbox)
            .zip(layout.counterpart(path, Partition::Archive))
            .ok_or_else(|| StoreError::RecordNotFound(path.to_path_buf()))?;
        Ok(Placement { inbox, archive })
    }

    fn at(&self, partition: Partition) -> &Path {
        match partition {
            Partition::Inbox => &self.inbox,
            Partition::Archive => &self.archive,
        }
    }

    /// Partition the record currently occupies
    fn current(&self) -> StoreResult<Partition> {
        match (self.inbox.is_file(), self.archive.is_file()) {
            (true, false) => Ok(Partition::Inbox),
            (false, true) => Ok(Partition::Archive),
            (true, true) => Err(StoreError::MoveConflict {
                path: self.inbox.clone(),
            }),
            (false, false) => Err(StoreError::RecordNotFound(self.inbox.clone())),
        }
    }
}

/// Move a record from the inbox to the archive. Returns the new path.
pub fn archive_record(layout: &StoreLayout, path: &Path) -> StoreResult<PathBuf> {
    move_record(layout, path, Partition::Inbox, Partition::Archive)
}

/// Move a record from the archive back to the inbox. Returns the new path.
pub fn restore_record(layout: &StoreLayout, path: &Path) -> StoreResult<PathBuf> {
    move_record(layout, path, Partition::Archive, Partition::Inbox)
}

/// Move a record to whichever partition it is not in.
pub fn transition_record(layout: &StoreLayout, path: &Path) -> StoreResult<PathBuf> {
    let placement = Placement::of(layout, path)?;
    let from = placement.current()?;
    relocate(&placement, from, from.opposite())
}

fn move_record(
    layout: &StoreLayout,
    path: &Path,
    from: Partition,
    to: Partition,
) -> StoreResult<PathBuf> {
    let placement = Placement::of(layout, path)?;
    let current = placement.current()?;
    if current != from {
        return Err(StoreError::RecordNotFound(placement.at(from).to_path_buf()));
    }
    relocate(&placement, from, to)
}

fn relocate(placement: &Placement, from: Partition, to: Partition) -> StoreResult<PathBuf> {
    let source = placement.at(from);
    let dest = placement.at(to);
    if let Some(dir) = dest.parent() {
        fs::create_dir_all(dir).map_err(|e| StoreError::io("create", dir, e))?;
    }
    // rename(2) replaces silently; the destination was checked by current()
    // but may have appeared since
    if dest.exists() {
        return Err(StoreError::MoveConflict {
            path: dest.to_path_buf(),
        });
    }
    fs::rename(source, dest).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => StoreError::RecordNotFound(source.to_path_buf()),
        _ => StoreError::io("move", source, e),
    })?;
    tracing::info!(from = %source.display(), to = %dest.display(), "moved record to {}", to);
    Ok(dest.to_path_buf())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub moved: Vec<PathBuf>,
    pub failed: Vec<MoveFailure>,
}

/// Move every eligible record out of `partition`: checked records leave the
/// inbox, unchecked records leave the archive. One failure does not stop
/// the rest.
pub fn bulk_transition(
    layout: &StoreLayout,
    batch: &[RecordSummary],
    partition: Partition,
) -> BulkReport {
    let mut report = BulkReport::default();
    for summary in batch.iter().filter(|s| partition.is_eligible(s.checked)) {
        let result = match partition {
            Partition::Inbox => archive_record(layout, &summary.path),
            Partition::Archive => restore_record(layout, &summary.path),
        };
        match result {
            Ok(dest) => report.moved.push(dest),
            Err(e) => {
                tracing::warn!(path = %summary.path.display(), error = %e, "could not move record");
                report.failed.push(MoveFailure {
                    path: summary.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    report
}
