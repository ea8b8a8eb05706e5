//! Crash-safe writer for numbered spool files.
//!
//! Entries are written to `<seq>.partial`, synced, and renamed to `<seq>`;
//! the rename is the publication commit point, so a reader never sees a
//! truncated entry under a final name. Sequence numbers are monotonic
//! within one writer process, which is the only writer for its directory.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::types::SeqNum;

use super::{Result, SpoolError, PARTIAL_SUFFIX};

/// Writer handing out sequence numbers and emitting spool entries.
#[derive(Debug)]
pub struct SpoolWriter {
    dir: PathBuf,
    next_seq: SeqNum,
}

impl SpoolWriter {
    /// Opens a spool directory, recovering the next sequence number.
    ///
    /// Leftover `*.partial` files from an interrupted run are deleted.
    /// Every remaining entry must be named by a sequence number; anything
    /// else is fatal [`SpoolError::InvalidFilenameInOutDir`]. The next
    /// number is one past the largest found, or 0 for an empty directory.
    pub fn open(dir: &Path) -> Result<SpoolWriter> {
        let mut max: Option<SeqNum> = None;
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let text = name
                .to_str()
                .ok_or_else(|| SpoolError::InvalidFilenameInOutDir(name.clone()))?;
            if text.ends_with(PARTIAL_SUFFIX) {
                debug!(file = text, "removing leftover partial spool file");
                fs::remove_file(entry.path())?;
                continue;
            }
            let seq = SeqNum::parse(text)
                .ok_or_else(|| SpoolError::InvalidFilenameInOutDir(name.clone()))?;
            max = Some(max.map_or(seq, |m| m.max(seq)));
        }
        let next_seq = max.map_or(SeqNum(0), SeqNum::next);
        debug!(dir = %dir.display(), next_seq = %next_seq, "opened spool");
        Ok(SpoolWriter {
            dir: dir.to_path_buf(),
            next_seq,
        })
    }

    /// The sequence number the next append will use.
    pub fn next_seq(&self) -> SeqNum {
        self.next_seq
    }

    /// Emits one spool entry, returning its sequence number.
    ///
    /// If the directory is observed empty and the counter has moved past 0,
    /// numbering restarts at 0 first; a consumer that keeps up thus keeps
    /// the numbers small. The check-then-write window against a concurrent
    /// drain is accepted (see DESIGN.md).
    pub fn append(&mut self, timestamp: u64, sender: &str, body: &str) -> Result<SeqNum> {
        if self.next_seq != SeqNum(0) && self.is_empty()? {
            debug!("spool observed empty, restarting numbering at 0");
            self.next_seq = SeqNum(0);
        }
        let seq = self.next_seq;

        let final_path = self.dir.join(seq.to_string());
        let partial_path = self.dir.join(format!("{}{}", seq, PARTIAL_SUFFIX));
        {
            let mut file = File::create(&partial_path)?;
            write!(file, "{}\n{}\n{}", timestamp, sender, body)?;
            file.sync_all()?;
        }
        fs::rename(&partial_path, &final_path)?;

        debug!(seq = %seq, timestamp, sender, "spooled message");
        self.next_seq = seq.next();
        Ok(seq)
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(fs::read_dir(&self.dir)?.next().is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read_entry(dir: &Path, seq: u32) -> String {
        String::from_utf8(fs::read(dir.join(seq.to_string())).unwrap()).unwrap()
    }

    #[test]
    fn append_writes_entry_format() {
        let dir = tempdir().unwrap();
        let mut writer = SpoolWriter::open(dir.path()).unwrap();

        let seq = writer
            .append(1622782862, "fred!fred@host", "hello there")
            .unwrap();
        assert_eq!(seq, SeqNum(0));
        assert_eq!(
            read_entry(dir.path(), 0),
            "1622782862\nfred!fred@host\nhello there"
        );
    }

    #[test]
    fn appends_are_numbered_consecutively() {
        let dir = tempdir().unwrap();
        let mut writer = SpoolWriter::open(dir.path()).unwrap();

        for i in 0..5u32 {
            let seq = writer.append(100 + u64::from(i), "who", "msg").unwrap();
            assert_eq!(seq, SeqNum(i));
        }
        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn no_partial_file_remains_after_append() {
        let dir = tempdir().unwrap();
        let mut writer = SpoolWriter::open(dir.path()).unwrap();
        writer.append(1, "a", "b").unwrap();

        let partials: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_str()
                    .is_some_and(|n| n.ends_with(PARTIAL_SUFFIX))
            })
            .collect();
        assert!(partials.is_empty());
    }

    #[test]
    fn open_resumes_after_largest_entry() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("3"), "1\na\nb").unwrap();
        fs::write(dir.path().join("7"), "1\na\nb").unwrap();

        let writer = SpoolWriter::open(dir.path()).unwrap();
        assert_eq!(writer.next_seq(), SeqNum(8));
    }

    #[test]
    fn open_removes_leftover_partials() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("4.partial"), "trunc").unwrap();
        fs::write(dir.path().join("2"), "1\na\nb").unwrap();

        let writer = SpoolWriter::open(dir.path()).unwrap();
        assert_eq!(writer.next_seq(), SeqNum(3));
        assert!(!dir.path().join("4.partial").exists());
        assert!(dir.path().join("2").exists());
    }

    #[test]
    fn open_rejects_foreign_filenames() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "junk").unwrap();

        let err = SpoolWriter::open(dir.path()).unwrap_err();
        assert!(matches!(err, SpoolError::InvalidFilenameInOutDir(_)));
    }

    #[test]
    fn open_rejects_leading_zero_names() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("007"), "1\na\nb").unwrap();

        let err = SpoolWriter::open(dir.path()).unwrap_err();
        assert!(matches!(err, SpoolError::InvalidFilenameInOutDir(_)));
    }

    #[test]
    fn numbering_restarts_when_directory_observed_empty() {
        let dir = tempdir().unwrap();
        let mut writer = SpoolWriter::open(dir.path()).unwrap();
        writer.append(1, "a", "one").unwrap();
        writer.append(2, "a", "two").unwrap();

        // Consumer drains everything between appends.
        fs::remove_file(dir.path().join("0")).unwrap();
        fs::remove_file(dir.path().join("1")).unwrap();

        let seq = writer.append(3, "a", "three").unwrap();
        assert_eq!(seq, SeqNum(0));
        assert_eq!(read_entry(dir.path(), 0), "3\na\nthree");
    }

    #[test]
    fn numbering_does_not_restart_while_entries_remain() {
        let dir = tempdir().unwrap();
        let mut writer = SpoolWriter::open(dir.path()).unwrap();
        writer.append(1, "a", "one").unwrap();
        writer.append(2, "a", "two").unwrap();

        // Only the first entry was consumed.
        fs::remove_file(dir.path().join("0")).unwrap();

        let seq = writer.append(3, "a", "three").unwrap();
        assert_eq!(seq, SeqNum(2));
    }

    #[test]
    fn body_may_contain_newlines() {
        let dir = tempdir().unwrap();
        let mut writer = SpoolWriter::open(dir.path()).unwrap();
        writer.append(9, "who", "line1\nline2").unwrap();
        assert_eq!(read_entry(dir.path(), 0), "9\nwho\nline1\nline2");
    }
}
