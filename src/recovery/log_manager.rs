//! Log Manager - append-only sink for write-ahead records.
//!
//! The buffer pool carries a [`LogManager`] handle for the layers above
//! it (recovery, transactions); none of the pool's own paths append to
//! the log. Records are opaque byte strings stamped with a
//! monotonically increasing sequence number.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use log::trace;
use parking_lot::Mutex;

use crate::common::Result;

/// Log sequence number.
pub type Lsn = u64;

struct LogState {
    file: File,
    /// Records appended but not yet fsynced.
    buffer: Vec<u8>,
    next_lsn: Lsn,
}

/// An append-only record log.
///
/// Appends accumulate in memory; [`flush`] writes them out and fsyncs.
/// Each record is framed as a little-endian `u32` length followed by
/// the payload.
///
/// [`flush`]: LogManager::flush
pub struct LogManager {
    state: Mutex<LogState>,
}

impl LogManager {
    /// Create a new log file. Fails if the file already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            state: Mutex::new(LogState {
                file,
                buffer: Vec::new(),
                next_lsn: 0,
            }),
        })
    }

    /// Append one record, returning its sequence number.
    ///
    /// The record is durable only after the next [`flush`].
    ///
    /// [`flush`]: LogManager::flush
    pub fn append_record(&self, record: &[u8]) -> Lsn {
        let mut state = self.state.lock();

        let lsn = state.next_lsn;
        state.next_lsn += 1;

        let len = record.len() as u32;
        state.buffer.extend_from_slice(&len.to_le_bytes());
        state.buffer.extend_from_slice(record);

        trace!("appended log record {} ({} bytes)", lsn, record.len());
        lsn
    }

    /// Write all buffered records to the file and fsync.
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        let state = &mut *state;

        if state.buffer.is_empty() {
            return Ok(());
        }
        state.file.write_all(&state.buffer)?;
        state.file.sync_all()?;
        state.buffer.clear();

        Ok(())
    }

    /// Sequence number the next append will receive.
    pub fn next_lsn(&self) -> Lsn {
        self.state.lock().next_lsn
    }

    /// Read every record out of a log file. Intended for tooling and
    /// tests; recovery proper lives above this crate.
    pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<u8>>> {
        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;

        let mut records = Vec::new();
        let mut pos = 0;
        while pos + 4 <= bytes.len() {
            let len = u32::from_le_bytes([
                bytes[pos],
                bytes[pos + 1],
                bytes[pos + 2],
                bytes[pos + 3],
            ]) as usize;
            pos += 4;
            if pos + len > bytes.len() {
                break; // torn tail write; ignore the partial record
            }
            records.push(bytes[pos..pos + len].to_vec());
            pos += len;
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lsns_are_sequential() {
        let dir = tempdir().unwrap();
        let lm = LogManager::create(dir.path().join("test.log")).unwrap();

        assert_eq!(lm.append_record(b"a"), 0);
        assert_eq!(lm.append_record(b"b"), 1);
        assert_eq!(lm.next_lsn(), 2);
    }

    #[test]
    fn test_flush_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        let lm = LogManager::create(&path).unwrap();
        lm.append_record(b"first");
        lm.append_record(b"");
        lm.append_record(b"third record");
        lm.flush().unwrap();

        let records = LogManager::read_records(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], b"first");
        assert_eq!(records[1], b"");
        assert_eq!(records[2], b"third record");
    }

    #[test]
    fn test_unflushed_records_stay_buffered() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        let lm = LogManager::create(&path).unwrap();
        lm.append_record(b"pending");

        assert!(LogManager::read_records(&path).unwrap().is_empty());
        lm.flush().unwrap();
        assert_eq!(LogManager::read_records(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_flush_empty_is_noop() {
        let dir = tempdir().unwrap();
        let lm = LogManager::create(dir.path().join("test.log")).unwrap();
        lm.flush().unwrap();
        assert_eq!(lm.next_lsn(), 0);
    }
}
