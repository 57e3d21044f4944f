//! Gzip staging of raw log files into the container the converter reads.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

/// Compresses `source` into a gzip file at `dest`, returning the number of input
/// bytes consumed. `dest` is created or truncated.
pub fn gzip_file(source: &Path, dest: &Path) -> io::Result<u64> {
    let mut reader = BufReader::new(File::open(source)?);
    let writer = BufWriter::new(File::create(dest)?);

    let mut encoder = GzEncoder::new(writer, Compression::default());
    let copied = io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.flush()?;
    Ok(copied)
}
