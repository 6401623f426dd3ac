//! Delimited-text export, one chunk at a time.

use crate::export::{ExportError, ExportSpec, cell_text};
use crate::Row;

/// UTF-8 byte-order mark so spreadsheet tools detect the encoding.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encodes the header and each chunk independently so callers can stream
/// the output without holding the full result set.
#[derive(Debug, Clone)]
pub struct CsvEncoder {
    spec: ExportSpec,
}

impl CsvEncoder {
    pub fn new(spec: ExportSpec) -> Self {
        Self { spec }
    }

    /// BOM followed by the header record.
    pub fn header(&self) -> Result<Vec<u8>, ExportError> {
        let mut out = UTF8_BOM.to_vec();
        out.extend(encode_records(std::iter::once(self.spec.headers().to_vec()))?);
        Ok(out)
    }

    pub fn encode_chunk(&self, rows: &[Row]) -> Result<Vec<u8>, ExportError> {
        encode_records(rows.iter().map(|row| {
            self.spec
                .project(row)
                .iter()
                .map(cell_text)
                .collect::<Vec<_>>()
        }))
    }
}

fn encode_records<I>(records: I) -> Result<Vec<u8>, ExportError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = ::csv::WriterBuilder::new().from_writer(Vec::new());
    for record in records {
        writer
            .write_record(&record)
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    fn encoder() -> CsvEncoder {
        CsvEncoder::new(
            ExportSpec::new(
                vec!["name".into(), "note".into()],
                vec!["Name".into(), "Note".into()],
            )
            .unwrap(),
        )
    }

    #[test]
    fn header_starts_with_bom() {
        let bytes = encoder().header().unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert_eq!(text.trim_end(), "Name,Note");
    }

    #[test]
    fn nulls_are_empty_and_commas_quoted() {
        let rows = vec![
            Row::new(1i64).with("name", "a, b").with("note", Value::Null),
            Row::new(2i64).with("name", "c"),
        ];
        let bytes = encoder().encode_chunk(&rows).unwrap();
        let text = String::from_utf8(bytes).unwrap().replace("\r\n", "\n");
        assert_eq!(text, "\"a, b\",\nc,\n");
    }
}
