//! Persisted state layout.
//!
//! The state blob is a flat little-endian array of `3 * N` doubles, one
//! `(in, out, slowness)` record per parameter set in index order. Readers
//! tolerate truncation: restoring stops at the first incomplete record and
//! reports how many records were applied.

use crate::param_set::ParamSet;
use std::io::{self, Read, Write};

/// Bytes per persisted parameter set.
pub const RECORD_BYTES: usize = 3 * size_of::<f64>();

/// Write one record per set.
pub fn write_state<W: Write + ?Sized>(sets: &[ParamSet], writer: &mut W) -> io::Result<()> {
    let mut record = [0u8; RECORD_BYTES];
    for set in sets {
        for (chunk, value) in record.chunks_exact_mut(8).zip(set.to_array()) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        writer.write_all(&record)?;
    }
    Ok(())
}

/// Read records into `sets` in order, returning how many were read.
///
/// Sets past the end of the stream are left untouched. An I/O error other
/// than end-of-stream is propagated.
pub fn read_state<R: Read + ?Sized>(sets: &mut [ParamSet], reader: &mut R) -> io::Result<usize> {
    let mut record = [0u8; RECORD_BYTES];
    for (read, set) in sets.iter_mut().enumerate() {
        match reader.read_exact(&mut record) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(read),
            Err(err) => return Err(err),
        }
        let mut values = [0.0; 3];
        for (value, chunk) in values.iter_mut().zip(record.chunks_exact(8)) {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            *value = f64::from_le_bytes(bytes);
        }
        *set = ParamSet::from_array(values);
    }
    Ok(sets.len())
}
