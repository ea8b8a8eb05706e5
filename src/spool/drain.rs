//! Ordered draining of ready spool entries.
//!
//! A drain processes every ready entry in ascending sequence order by
//! scanning the directory once for the smallest and largest numbers and
//! then walking the inclusive range. Each integrated file is unlinked
//! immediately, which is what shrinks the range the next drain sees.

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::types::SeqNum;

use super::{SpoolError, PARTIAL_SUFFIX};

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drained {
    /// At least one entry was integrated.
    Published,
    /// The spool had nothing ready.
    Empty,
}

/// Drains the spool, feeding each ready entry to `integrate` in ascending
/// sequence order and unlinking it afterwards.
///
/// `*.partial` entries are ignored; any other non-numeric name is fatal
/// [`SpoolError::InvalidFilenameInOutDir`]. A file missing from the
/// interior of the range (an interrupted delete from a previous run) is
/// logged and skipped; a missing endpoint is an unexpected fatal
/// condition, since the scan just observed it.
pub fn drain<E, F>(spool_dir: &Path, mut integrate: F) -> std::result::Result<Drained, E>
where
    E: From<SpoolError>,
    F: FnMut(&Path) -> std::result::Result<(), E>,
{
    let Some((min, max)) = pending_range(spool_dir)? else {
        warn!("drain found nothing to publish");
        return Ok(Drained::Empty);
    };

    let mut published = false;
    for seq in min.0..=max.0 {
        let path = spool_dir.join(SeqNum(seq).to_string());
        match fs::metadata(&path) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if seq != min.0 && seq != max.0 {
                    warn!(seq, "spool entry missing mid-range, skipping");
                    continue;
                }
                return Err(SpoolError::Io(e).into());
            }
            Err(e) => return Err(SpoolError::Io(e).into()),
        }
        integrate(&path)?;
        fs::remove_file(&path).map_err(SpoolError::Io)?;
        published = true;
    }

    Ok(if published {
        Drained::Published
    } else {
        Drained::Empty
    })
}

/// One pass over the directory for the smallest and largest ready numbers.
fn pending_range(spool_dir: &Path) -> std::result::Result<Option<(SeqNum, SeqNum)>, SpoolError> {
    let mut range: Option<(SeqNum, SeqNum)> = None;
    for entry in fs::read_dir(spool_dir).map_err(SpoolError::Io)? {
        let entry = entry.map_err(SpoolError::Io)?;
        let name = entry.file_name();
        let text = name
            .to_str()
            .ok_or_else(|| SpoolError::InvalidFilenameInOutDir(name.clone()))?;
        if text.ends_with(PARTIAL_SUFFIX) {
            continue;
        }
        let seq = SeqNum::parse(text)
            .ok_or_else(|| SpoolError::InvalidFilenameInOutDir(name.clone()))?;
        range = Some(match range {
            None => (seq, seq),
            Some((min, max)) => (min.min(seq), max.max(seq)),
        });
    }
    Ok(range)
}
