// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CSV serialization of takeoff records.
//!
//! Plain UTF-8 with a fixed header row, RFC 4180 quoting.

use std::io::{Read, Write};

use thiserror::Error;

use crate::record::ElementRecord;

/// Column order of the exported table
pub const CSV_HEADER: [&str; 6] = ["type", "name", "description", "size", "weight", "length"];

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected CSV header: {0}")]
    Header(String),
}

/// Write the header and one row per record.
pub fn write_csv<W: Write>(writer: W, records: &[ElementRecord]) -> Result<(), CsvError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render records as an in-memory CSV document
pub fn to_csv_bytes(records: &[ElementRecord]) -> Result<Vec<u8>, CsvError> {
    let mut buf = Vec::new();
    write_csv(&mut buf, records)?;
    Ok(buf)
}

/// Parse a document produced by [`write_csv`].
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<ElementRecord>, CsvError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr.headers()?;
    if headers.iter().ne(CSV_HEADER.iter().copied()) {
        return Err(CsvError::Header(headers.iter().collect::<Vec<_>>().join(",")));
    }

    rdr.deserialize()
        .map(|row| row.map_err(CsvError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MemberKind, UNDEFINED};

    fn sample() -> Vec<ElementRecord> {
        vec![
            ElementRecord {
                kind: MemberKind::Beam,
                name: "B-1".into(),
                description: UNDEFINED.into(),
                size: "H-400x200x8x13".into(),
                weight: "66kg".into(),
                length: "6000mm".into(),
            },
            ElementRecord {
                kind: MemberKind::Column,
                name: "C-1, \"corner\"".into(),
                description: "line one\nline two".into(),
                size: "BCR295 300x300x12".into(),
                weight: "7.85kg".into(),
                length: "3500mm".into(),
            },
        ]
    }

    #[test]
    fn test_header_and_rows() {
        let bytes = to_csv_bytes(&sample()[..1]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "type,name,description,size,weight,length\n\
             Beam,B-1,未定義,H-400x200x8x13,66kg,6000mm\n"
        );
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let bytes = to_csv_bytes(&[]).unwrap();
        assert_eq!(bytes, b"type,name,description,size,weight,length\n");
        assert!(read_csv(bytes.as_slice()).unwrap().is_empty());
    }

    #[test]
    fn test_quoting_survives_reading_back() {
        let records = sample();
        let bytes = to_csv_bytes(&records).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("\"C-1, \"\"corner\"\"\""));
        assert_eq!(read_csv(bytes.as_slice()).unwrap(), records);
    }

    #[test]
    fn test_rejects_foreign_header() {
        let err = read_csv("a,b,c\n1,2,3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, CsvError::Header(_)));
    }
}
