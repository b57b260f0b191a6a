use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::{StoreError, StoreResult};

/// Creation timestamp format embedded in record file names
pub const STAMP_FORMAT: &str = "%Y-%m-%d %H%M%S";
const STAMP_LEN: usize = "YYYY-MM-DD HHMMSS".len();

/// Parsed `{timestamp}[-{seq}]` suffix of a record file name. Orders by
/// time first, then by the same-second sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordStamp {
    pub at: NaiveDateTime,
    pub seq: u32,
}

impl RecordStamp {
    pub fn file_stem(&self, list_name: &str) -> String {
        let at = self.at.format(STAMP_FORMAT);
        if self.seq == 0 {
            format!("{}_{}", list_name, at)
        } else {
            format!("{}_{}-{}", list_name, at, self.seq)
        }
    }
}

/// Parse the stamp from the text after the last `_` and before the first
/// `.` of a file name.
pub fn parse_stamp(path: &Path) -> StoreResult<RecordStamp> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let err = || StoreError::TimestampParse(name.to_string());

    let (_, suffix) = name.rsplit_once('_').ok_or_else(err)?;
    let stem = suffix.split('.').next().unwrap_or(suffix);
    let stamp = stem.get(..STAMP_LEN).ok_or_else(err)?;
    let at = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).map_err(|_| err())?;

    let seq = match &stem[STAMP_LEN..] {
        "" => 0,
        rest => rest
            .strip_prefix('-')
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or_else(err)?,
    };
    Ok(RecordStamp { at, seq })
}

/// Sort record paths most recent first. Fails on the first name without a
/// timestamp suffix.
pub fn sort_by_recency<P: AsRef<Path>>(paths: Vec<P>) -> StoreResult<Vec<P>> {
    let mut keyed = Vec::with_capacity(paths.len());
    for path in paths {
        let stamp = parse_stamp(path.as_ref())?;
        keyed.push((stamp, path));
    }
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(keyed.into_iter().map(|(_, p)| p).collect())
}

/// Like [`sort_by_recency`], but names without a timestamp are set aside
/// and returned separately instead of failing the whole batch.
pub fn sort_by_recency_lenient<P: AsRef<Path>>(paths: Vec<P>) -> (Vec<P>, Vec<P>) {
    let mut keyed = Vec::with_capacity(paths.len());
    let mut rejected = Vec::new();
    for path in paths {
        match parse_stamp(path.as_ref()) {
            Ok(stamp) => keyed.push((stamp, path)),
            Err(e) => {
                tracing::warn!("{}", e);
                rejected.push(path);
            }
        }
    }
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    (keyed.into_iter().map(|(_, p)| p).collect(), rejected)
}
