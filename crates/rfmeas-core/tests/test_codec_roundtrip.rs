//! Codec round-trip tests
//!
//! Write/read cycles through both encodings, cross-format equality, and
//! the extension/column sanity checks.

use approx::assert_relative_eq;
use num_complex::Complex64;
use rfmeas_core::codec::{self, CodecError, CodecOptions, Format};
use rfmeas_core::header::{Header, Unit};
use rfmeas_core::matrix::{NetworkParameterMatrix, Wave};
use tempfile::tempdir;

/// 2-port, 3-frequency fixture with S21 = [1, j, -1].
fn two_port_fixture() -> NetworkParameterMatrix {
    let mut m = NetworkParameterMatrix::with_port_count(
        2,
        vec![Wave::S],
        vec![1e9, 2e9, 3e9],
        Header::default(),
    );
    m.set_column(
        Wave::S,
        21,
        &[
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 1.0),
            Complex64::new(-1.0, 0.0),
        ],
    )
    .unwrap();
    for (offset, pair) in [(0.0, 11u32), (0.25, 12), (0.5, 22)] {
        m.set_column(
            Wave::S,
            pair,
            &[
                Complex64::new(0.1 + offset, -0.1),
                Complex64::new(0.2 + offset, -0.2),
                Complex64::new(0.3 + offset, -0.3),
            ],
        )
        .unwrap();
    }
    m
}

#[test]
fn test_text_and_binary_agree() {
    let dir = tempdir().unwrap();
    let m = two_port_fixture();
    let options = CodecOptions::default();

    let text_path = codec::write(&m, dir.path().join("dut.s2p"), Format::Text, true).unwrap();
    let bin_path = codec::write(&m, dir.path().join("dut.s2p"), Format::Binary, true).unwrap();
    assert!(bin_path.to_string_lossy().ends_with(".s2p_binary"));

    let from_text = codec::read(&text_path, &options).unwrap();
    let from_binary = codec::read(&bin_path, &options).unwrap();

    assert_eq!(from_text, m);
    assert_eq!(from_binary, m);
    assert_eq!(from_text, from_binary);
}

#[test]
fn test_binary_round_trip_preserves_s21_and_pair_order() {
    let dir = tempdir().unwrap();
    let m = two_port_fixture();

    let path = codec::write(&m, dir.path().join("dut.s2p"), Format::Binary, true).unwrap();
    let back = codec::read(&path, &CodecOptions::default()).unwrap();

    assert_eq!(back.pairs(), &[11, 21, 12, 22]);
    let s21 = back.series(Wave::S, 21).unwrap();
    assert_eq!(s21.values()[0], Complex64::new(1.0, 0.0));
    assert_eq!(s21.values()[1], Complex64::new(0.0, 1.0));
    assert_eq!(s21.values()[2], Complex64::new(-1.0, 0.0));
    assert_eq!(back.frequencies(), &[1e9, 2e9, 3e9]);
}

#[test]
fn test_fix_extension_corrects_stale_names() {
    let dir = tempdir().unwrap();
    let m = two_port_fixture();

    // The caller's extension claims nine ports; the written name must
    // reflect the true count.
    let path = codec::write(&m, dir.path().join("stale.s9p"), Format::Text, true).unwrap();
    assert_eq!(path.extension().unwrap(), "s2p");
    assert!(codec::read(&path, &CodecOptions::default()).is_ok());
}

#[test]
fn test_port_count_mismatch_is_rejected() {
    let dir = tempdir().unwrap();
    let three_port = NetworkParameterMatrix::with_port_count(
        3,
        vec![Wave::S],
        vec![1e9, 2e9],
        Header::default(),
    );
    let written = codec::write(
        &three_port,
        dir.path().join("dut.s3p"),
        Format::Text,
        false,
    )
    .unwrap();

    // Rename so the extension implies two ports.
    let lying = dir.path().join("dut.s2p");
    std::fs::rename(written, &lying).unwrap();

    match codec::read(&lying, &CodecOptions::default()) {
        Err(CodecError::MalformedFile { expected, implied }) => {
            assert_eq!(expected, 2);
            assert_eq!(implied, 3);
        }
        other => panic!("expected MalformedFile, got {other:?}"),
    }
}

#[test]
fn test_header_unit_scales_the_axis() {
    let dir = tempdir().unwrap();
    let mut header = Header::default();
    header.unit = Unit::MHz;
    let mut m =
        NetworkParameterMatrix::with_port_count(1, vec![Wave::S], vec![1e6, 2e6], header);
    m.set_column(
        Wave::S,
        11,
        &[Complex64::new(0.5, 0.0), Complex64::new(0.6, 0.0)],
    )
    .unwrap();
    m.comments.push("swept on the short cable".to_string());

    let path = codec::write(&m, dir.path().join("dut.s1p"), Format::Text, false).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("!swept on the short cable\n#MHz S RI 50\n"));
    // Axis column is written in MHz.
    assert!(content.contains("1.000000000000E+00"));

    let back = codec::read(&path, &CodecOptions::default()).unwrap();
    assert_eq!(back.frequencies(), &[1e6, 2e6]);
    assert_eq!(back.header.unit, Unit::MHz);
    assert_eq!(back.comments, vec!["swept on the short cable"]);
    assert_relative_eq!(
        back.series(Wave::S, 11).unwrap().values()[1].re,
        0.6,
        epsilon = 1e-12
    );
}

#[test]
fn test_wave_parameter_files() {
    let dir = tempdir().unwrap();
    let mut m = NetworkParameterMatrix::with_port_count(
        2,
        vec![Wave::A, Wave::B],
        vec![1e9, 2e9],
        Header::default(),
    );
    for &w in &[Wave::A, Wave::B] {
        for &p in &[11u32, 12, 21, 22] {
            let bias = if w == Wave::A { 0.0 } else { 10.0 };
            m.set_column(
                w,
                p,
                &[
                    Complex64::new(bias + p as f64, 0.5),
                    Complex64::new(bias - (p as f64), -0.5),
                ],
            )
            .unwrap();
        }
    }

    let path = codec::write(&m, dir.path().join("dut.bin"), Format::Text, true).unwrap();
    assert_eq!(path.extension().unwrap(), "w2p");

    let back = codec::read(&path, &CodecOptions::default()).unwrap();
    assert_eq!(back, m);
    assert_eq!(back.pairs(), &[11, 12, 21, 22]);
}
