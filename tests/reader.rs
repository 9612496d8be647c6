use classcode::{error::ReadError, reader};

mod common;

#[test]
fn well_formed_utf8_comma_file_round_trips_shape() {
    let bytes = b"ref,m2,label\nP1,111111,one\nP2,222222,two\nP3,333333,three\n";
    let table = reader::read_bytes("catalogue.csv", bytes).expect("table");
    assert_eq!(table.columns, vec!["ref", "m2", "label"]);
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.cell(2, 2), Some("three"));
}

#[test]
fn latin1_bytes_fall_back_past_utf8() {
    // "Référence" in ISO-8859-1: 0xE9 is not valid UTF-8.
    let bytes = b"R\xE9f\xE9rence;code\nP1;FAM-A\n";
    let table = reader::read_bytes("client.csv", bytes).expect("table");
    assert_eq!(table.columns[0], "Référence");
    assert_eq!(table.cell(0, 1), Some("FAM-A"));
}

#[test]
fn semicolon_and_comma_encodings_yield_identical_tables() {
    let with_semicolons = reader::read_bytes("a.csv", b"ref;m2\nP1;111\nP2;222\n").expect("table");
    let with_commas = reader::read_bytes("b.csv", b"ref,m2\nP1,111\nP2,222\n").expect("table");
    assert_eq!(with_semicolons, with_commas);
}

#[test]
fn pipe_and_tab_delimiters_are_detected() {
    let piped = reader::read_bytes("a.csv", b"ref|m2\nP1|111\n").expect("table");
    assert_eq!(piped.columns, vec!["ref", "m2"]);
    let tabbed = reader::read_bytes("b.csv", b"ref\tm2\nP1\t111\n").expect("table");
    assert_eq!(piped.rows, tabbed.rows);
}

#[test]
fn malformed_rows_are_skipped_not_fatal() {
    let bytes = b"ref,m2\nP1,111\nthis row is broken\nP2,222\nP3,333,extra\n";
    let table = reader::read_bytes("history.csv", bytes).expect("table");
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.cell(0, 0), Some("P1"));
    assert_eq!(table.cell(1, 0), Some("P2"));
}

#[test]
fn undelimited_stream_is_unreadable() {
    let err = reader::read_bytes("plain.csv", b"justonecolumn\nanother\n").unwrap_err();
    assert!(matches!(err, ReadError::UnreadableFile(_)));
}

#[test]
fn unknown_extension_is_unsupported() {
    let err = reader::read_bytes("report.pdf", b"ref,m2\nP1,111\n").unwrap_err();
    assert!(matches!(err, ReadError::UnsupportedFormat(_)));
}

#[test]
fn multibyte_character_straddling_the_sniff_sample_stays_utf8() {
    // Place "é" (0xC3 0xA9) across the 2048-byte sample boundary; the file
    // is valid UTF-8 and must not fall back to an 8-bit decoder.
    let mut bytes = b"ref,m2\nP1,".to_vec();
    while bytes.len() < 2047 {
        bytes.push(b'a');
    }
    bytes.extend_from_slice("é".as_bytes());
    bytes.extend_from_slice(b"\nP2,ok\n");

    let table = reader::read_bytes("t.csv", &bytes).expect("table");
    let value = table.cell(0, 1).expect("cell");
    assert!(value.ends_with('é'));
    assert!(!value.contains('Ã'));
    assert_eq!(table.cell(1, 1), Some("ok"));
}

#[test]
fn detection_is_deterministic_for_identical_bytes() {
    let bytes = b"a;b,c\n1;2,3\n4;5,6\n";
    let first = reader::read_bytes("x.csv", bytes).expect("table");
    for _ in 0..5 {
        let again = reader::read_bytes("x.csv", bytes).expect("table");
        assert_eq!(first, again);
    }
}

#[cfg(feature = "spreadsheet")]
#[test]
fn worklist_workbook_reads_back_through_the_reader() {
    use classcode::{columns, export, table::Table};

    let workspace = common::TestWorkspace::new();
    let mut missing = Table::new(vec![
        columns::REFERENCE.to_string(),
        "MACH2_FAM".to_string(),
        columns::CLIENT_CODE.to_string(),
    ]);
    missing.push_row(vec![Some("P9".into()), Some("F01".into()), None]);
    let path = workspace.path().join("CODES_CLIENT_ACME_240615.xlsx");
    export::write_worklist(&missing, &["MACH2_FAM".to_string()], &path).expect("write worklist");

    let table = reader::read_path(&path).expect("read workbook");
    assert_eq!(
        table.columns,
        vec![columns::REFERENCE, "MACH2_FAM", columns::CLIENT_CODE]
    );
    assert_eq!(table.cell(0, 0), Some("P9"));
    assert_eq!(table.rows[0][2], None);
}
