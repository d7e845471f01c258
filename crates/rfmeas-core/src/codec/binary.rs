//! Binary-format reader and writer
//!
//! Layout: two little-endian `u32` values (row count, column count)
//! followed by `rows * cols` little-endian `f64` values in row-major
//! order. Column semantics are identical to the text format; header and
//! comments are not stored.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{implied_ports, CodecError, CodecOptions, ExtensionInfo, RawTable};

/// Read a binary-format file.
pub fn read_binary<P: AsRef<Path>>(
    path: P,
    info: &ExtensionInfo,
    options: &CodecOptions,
) -> Result<RawTable, CodecError> {
    let file = File::open(path)?;
    read_binary_from(BufReader::new(file), info, options)
}

/// Read the binary format from any reader.
pub fn read_binary_from<R: Read>(
    mut reader: R,
    info: &ExtensionInfo,
    options: &CodecOptions,
) -> Result<RawTable, CodecError> {
    let nrows = reader.read_u32::<LittleEndian>()? as usize;
    let ncols = reader.read_u32::<LittleEndian>()? as usize;

    if ncols != info.expected_columns() {
        return Err(CodecError::MalformedFile {
            expected: info.num_ports,
            implied: implied_ports(ncols, info.waves.len()),
        });
    }

    let mut rows = Vec::with_capacity(nrows);
    for _ in 0..nrows {
        let mut row = Vec::with_capacity(ncols);
        for _ in 0..ncols {
            row.push(reader.read_f64::<LittleEndian>()?);
        }
        rows.push(row);
    }

    // Binary files carry no header or comments.
    Ok(RawTable {
        rows,
        header: options.default_header,
        comments: options.default_comments.clone(),
    })
}

/// Write the binary format to any writer.
pub fn write_binary_to<W: Write>(writer: &mut W, rows: &[Vec<f64>]) -> Result<(), CodecError> {
    let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
    writer.write_u32::<LittleEndian>(rows.len() as u32)?;
    writer.write_u32::<LittleEndian>(ncols as u32)?;
    for row in rows {
        for &v in row {
            writer.write_f64::<LittleEndian>(v)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_extension;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    #[test]
    fn test_binary_round_trip_in_memory() {
        let rows = vec![
            vec![1.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8],
            vec![2.0, 1.1, 1.2, 1.3, 1.4, 1.5, 1.6, 1.7, 1.8],
        ];
        let mut buf = Vec::new();
        write_binary_to(&mut buf, &rows).unwrap();
        // 2 u32 + 18 f64
        assert_eq!(buf.len(), 8 + 18 * 8);

        let info = parse_extension("x.s2p_binary").unwrap();
        let raw = read_binary_from(Cursor::new(buf), &info, &CodecOptions::default()).unwrap();
        assert_eq!(raw.rows.len(), 2);
        assert_relative_eq!(raw.rows[1][4], 1.4, epsilon = 1e-15);
        assert_eq!(raw.header, crate::header::Header::default());
    }

    #[test]
    fn test_column_count_mismatch() {
        let rows = vec![vec![1.0, 0.1, 0.2]]; // one-port row
        let mut buf = Vec::new();
        write_binary_to(&mut buf, &rows).unwrap();

        let info = parse_extension("x.s2p_binary").unwrap();
        let err = read_binary_from(Cursor::new(buf), &info, &CodecOptions::default()).unwrap_err();
        match err {
            CodecError::MalformedFile { expected, implied } => {
                assert_eq!(expected, 2);
                assert_eq!(implied, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_truncated_file_is_an_io_error() {
        let mut buf = Vec::new();
        write_binary_to(&mut buf, &[vec![1.0, 0.1, 0.2]]).unwrap();
        buf.truncate(buf.len() - 4);

        let info = parse_extension("x.s1p_binary").unwrap();
        assert!(matches!(
            read_binary_from(Cursor::new(buf), &info, &CodecOptions::default()),
            Err(CodecError::Io(_))
        ));
    }
}
