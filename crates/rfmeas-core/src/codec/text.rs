//! Text-format reader and writer
//!
//! `!` lines are comments, a single `#` line is the header, and every
//! remaining line contributes numeric tokens to the data table. Logical
//! rows may be wrapped across physical lines (common for >2-port
//! files); tokens accumulate until a full row's worth is available.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Write};
use std::path::Path;

use super::{implied_ports, CodecError, CodecOptions, ExtensionInfo, RawTable};
use crate::header::Header;
use crate::matrix::NetworkParameterMatrix;

/// Read a text-format file.
pub fn read_text<P: AsRef<Path>>(
    path: P,
    info: &ExtensionInfo,
    options: &CodecOptions,
) -> Result<RawTable, CodecError> {
    let file = File::open(path)?;
    read_text_from(BufReader::new(file), info, options)
}

/// Read the text format from any buffered reader.
pub fn read_text_from<R: BufRead>(
    reader: R,
    info: &ExtensionInfo,
    options: &CodecOptions,
) -> Result<RawTable, CodecError> {
    let expected = info.expected_columns();
    let mut header = options.default_header;
    let mut comments: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut buffer: Vec<f64> = Vec::new();
    let mut first_data_cols: Option<usize> = None;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(comment) = trimmed.strip_prefix('!') {
            comments.push(comment.trim().to_string());
            continue;
        }

        if trimmed.starts_with('#') {
            if options.read_header {
                // An unrecognized header keeps the previous one.
                if let Some(parsed) = Header::parse(trimmed) {
                    header = parsed;
                }
            }
            continue;
        }

        let mut count = 0usize;
        for token in trimmed
            .split(|c| c == ' ' || c == ',' || c == '\t')
            .filter(|t| !t.is_empty())
        {
            let value = token.parse::<f64>().map_err(|_| CodecError::Parse {
                line: index + 1,
                message: format!("invalid number {:?}", token),
            })?;
            buffer.push(value);
            count += 1;
        }

        if first_data_cols.is_none() {
            first_data_cols = Some(count);
            // A physical line holding one or more full logical rows
            // must tile exactly; anything else is a port-count mismatch.
            if count >= expected && count % expected != 0 {
                return Err(CodecError::MalformedFile {
                    expected: info.num_ports,
                    implied: implied_ports(count, info.waves.len()),
                });
            }
        }

        while buffer.len() >= expected {
            rows.push(buffer.drain(..expected).collect());
        }
    }

    if !buffer.is_empty() {
        return Err(CodecError::MalformedFile {
            expected: info.num_ports,
            implied: implied_ports(first_data_cols.unwrap_or(0), info.waves.len()),
        });
    }

    if comments.is_empty() {
        comments = options.default_comments.clone();
    }

    Ok(RawTable {
        rows,
        header,
        comments,
    })
}

/// Write the text format to any writer.
pub fn write_text_to<W: Write>(
    writer: &mut W,
    rows: &[Vec<f64>],
    header: &Header,
    comments: &[String],
) -> Result<(), CodecError> {
    for comment in comments {
        writeln!(writer, "!{}", comment)?;
    }
    writeln!(writer, "#{}", header.to_line())?;
    for row in rows {
        let mut line = String::with_capacity(row.len() * 20);
        for (k, &v) in row.iter().enumerate() {
            if k > 0 {
                line.push(' ');
            }
            line.push_str(&fmt_upper_exp(v));
        }
        writeln!(writer, "{}", line)?;
    }
    Ok(())
}

/// Uppercase exponential with a signed two-digit exponent,
/// e.g. `1.000000000000E+09`.
fn fmt_upper_exp(v: f64) -> String {
    let s = format!("{:.12E}", v);
    match s.split_once('E') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exponent),
            };
            format!("{}E{}{:0>2}", mantissa, sign, digits)
        }
        None => s,
    }
}

impl fmt::Display for NetworkParameterMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = super::rows_from_matrix(self);
        let mut buf = Vec::new();
        let mut cursor = Cursor::new(&mut buf);
        if write_text_to(&mut cursor, &rows, &self.header, &self.comments).is_err() {
            return Err(fmt::Error);
        }
        write!(f, "{}", String::from_utf8_lossy(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_extension;
    use approx::assert_relative_eq;

    fn s2p_info() -> ExtensionInfo {
        parse_extension("x.s2p").unwrap()
    }

    #[test]
    fn test_read_simple_two_port() {
        let content = "\
! measured on bench 3
#GHz S RI 50
1.0 0.1 0.2 0.3 0.4 0.5 0.6 0.7 0.8
2.0 1.1 1.2 1.3 1.4 1.5 1.6 1.7 1.8
";
        let raw = read_text_from(
            Cursor::new(content),
            &s2p_info(),
            &CodecOptions::default(),
        )
        .unwrap();

        assert_eq!(raw.rows.len(), 2);
        assert_eq!(raw.rows[0].len(), 9);
        assert_eq!(raw.comments, vec!["measured on bench 3"]);
        assert_relative_eq!(raw.rows[1][0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(raw.rows[1][8], 1.8, epsilon = 1e-12);
    }

    #[test]
    fn test_delimiters_and_wrapped_rows() {
        // One logical row split across three physical lines, with mixed
        // comma/tab/space delimiters.
        let content = "#GHz S RI 50\n1.0, 0.1\t0.2 0.3 0.4\n0.5 0.6\n0.7 0.8\n";
        let raw = read_text_from(
            Cursor::new(content),
            &s2p_info(),
            &CodecOptions::default(),
        )
        .unwrap();
        assert_eq!(raw.rows.len(), 1);
        assert_relative_eq!(raw.rows[0][8], 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_bad_header_keeps_default() {
        let content = "#furlongs S RI 50\n1.0 0.1 0.2 0.3 0.4 0.5 0.6 0.7 0.8\n";
        let raw = read_text_from(
            Cursor::new(content),
            &s2p_info(),
            &CodecOptions::default(),
        )
        .unwrap();
        assert_eq!(raw.header, Header::default());
    }

    #[test]
    fn test_column_mismatch_is_malformed() {
        // Three-port rows in a file claiming two ports.
        let row: Vec<String> = (0..19).map(|k| format!("{}.0", k)).collect();
        let content = format!("#GHz S RI 50\n{}\n", row.join(" "));
        let err = read_text_from(
            Cursor::new(content.as_str()),
            &s2p_info(),
            &CodecOptions::default(),
        )
        .unwrap_err();
        match err {
            CodecError::MalformedFile { expected, implied } => {
                assert_eq!(expected, 2);
                assert_eq!(implied, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_leftover_tokens_are_malformed() {
        let content = "#GHz S RI 50\n1.0 0.1 0.2 0.3 0.4 0.5 0.6 0.7 0.8\n2.0 0.1\n";
        assert!(matches!(
            read_text_from(Cursor::new(content), &s2p_info(), &CodecOptions::default()),
            Err(CodecError::MalformedFile { .. })
        ));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let content = "#GHz S RI 50\n1.0 bogus 0.2 0.3 0.4 0.5 0.6 0.7 0.8\n";
        match read_text_from(Cursor::new(content), &s2p_info(), &CodecOptions::default()) {
            Err(CodecError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_fmt_upper_exp() {
        assert_eq!(fmt_upper_exp(1e9), "1.000000000000E+09");
        assert_eq!(fmt_upper_exp(-0.25), "-2.500000000000E-01");
        assert_eq!(fmt_upper_exp(0.0), "0.000000000000E+00");
    }
}
