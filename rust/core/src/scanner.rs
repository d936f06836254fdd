// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fast record scanner - walks record headers without building a tree
//!
//! O(n) in the number of records. Useful for statistics and for listing the
//! external files a database depends on before importing it.

use rustc_hash::FxHashMap;

use crate::opcode::Opcode;
use crate::stream::{null_terminated, RecordStream};

/// Header of one scanned record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedRecord {
    pub opcode: Opcode,
    pub offset: usize,
    pub length: u16,
}

pub struct RecordScanner<'a> {
    data: &'a [u8],
    stream: RecordStream<'a>,
    failed: bool,
}

impl<'a> RecordScanner<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            stream: RecordStream::new(data),
            failed: false,
        }
    }

    /// Next record header, `None` at the end or at the first corrupt header
    pub fn next_record(&mut self) -> Option<ScannedRecord> {
        if self.failed {
            return None;
        }
        match self.stream.begin_record() {
            Ok(true) => Some(ScannedRecord {
                opcode: self.stream.opcode(),
                offset: self.stream.offset(),
                length: self.stream.length(),
            }),
            Ok(false) => None,
            Err(err) => {
                tracing::debug!(error = %err, "Record scan stopped");
                self.failed = true;
                None
            }
        }
    }

    /// Whether the scan stopped on a corrupt header
    pub fn hit_corruption(&self) -> bool {
        self.failed
    }

    /// All records with `opcode`
    pub fn find_by_opcode(&mut self, opcode: Opcode) -> Vec<ScannedRecord> {
        std::iter::from_fn(|| self.next_record())
            .filter(|r| r.opcode == opcode)
            .collect()
    }

    /// Count records by opcode
    pub fn count_by_opcode(&mut self) -> FxHashMap<Opcode, usize> {
        let mut counts = FxHashMap::default();
        while let Some(record) = self.next_record() {
            *counts.entry(record.opcode).or_insert(0) += 1;
        }
        counts
    }

    /// Paths named by External Reference records, in file order
    pub fn external_references(&mut self) -> Vec<String> {
        self.find_by_opcode(Opcode::ExternalReference)
            .into_iter()
            .filter_map(|r| {
                let start = r.offset + 4;
                let end = (start + 200).min(r.offset + r.length as usize);
                self.data.get(start..end).map(null_terminated)
            })
            .filter(|path| !path.is_empty())
            .collect()
    }

    /// Reset scanner to beginning
    pub fn reset(&mut self) {
        self.stream = RecordStream::new(self.data);
        self.failed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::FltWriter;

    #[test]
    fn test_count_and_reset() {
        let mut w = FltWriter::new();
        w.header("db").push().group("a").group("b").pop();
        let data = w.finish();

        let mut scanner = RecordScanner::new(&data);
        let counts = scanner.count_by_opcode();
        assert_eq!(counts[&Opcode::Group], 2);
        assert_eq!(counts[&Opcode::Header], 1);

        scanner.reset();
        assert_eq!(scanner.find_by_opcode(Opcode::PushLevel).len(), 1);
    }

    #[test]
    fn test_external_reference_paths() {
        let mut w = FltWriter::new();
        w.header("db")
            .push()
            .external_reference("tree.flt", 0)
            .external_reference("house.flt", 0)
            .pop();
        let data = w.finish();
        let paths = RecordScanner::new(&data).external_references();
        assert_eq!(paths, ["tree.flt", "house.flt"]);
    }

    #[test]
    fn test_stops_on_corruption() {
        let mut data = FltWriter::new().header("db").finish();
        data.extend_from_slice(&[0, 2, 0, 1]); // length 1 < 4
        let mut scanner = RecordScanner::new(&data);
        assert!(scanner.next_record().is_some());
        assert!(scanner.next_record().is_none());
        assert!(scanner.hit_corruption());
    }
}
