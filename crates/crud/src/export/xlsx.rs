//! Spreadsheet export.

use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::export::{ExportError, ExportSpec};
use crate::Value;

const MAX_SHEET_NAME: usize = 31;

fn xlsx_err(e: XlsxError) -> ExportError {
    ExportError::Xlsx(e.to_string())
}

/// Worksheet names: at most 31 characters, none of `[]:*?/\`.
pub fn sheet_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() { "Sheet1".to_string() } else { cleaned }
}

/// Render a single-sheet workbook: bold header row, then one row per record.
pub fn render_xlsx(spec: &ExportSpec, sheet: &str, rows: &[Vec<Value>]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(sheet)).map_err(xlsx_err)?;

        for (col, header) in spec.headers().iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, header, &bold)
                .map_err(xlsx_err)?;
        }

        for (idx, values) in rows.iter().enumerate() {
            let row = (idx + 1) as u32;
            for (col, value) in values.iter().enumerate() {
                let col = col as u16;
                match value {
                    Value::Null => {}
                    Value::Bool(b) => {
                        worksheet.write_boolean(row, col, *b).map_err(xlsx_err)?;
                    }
                    Value::Int(n) => {
                        worksheet.write_number(row, col, *n as f64).map_err(xlsx_err)?;
                    }
                    Value::Timestamp(t) => {
                        // Naive local text; spreadsheet timestamps carry no zone.
                        let text = t.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string();
                        worksheet.write_string(row, col, text).map_err(xlsx_err)?;
                    }
                    other => {
                        worksheet.write_string(row, col, other.to_text()).map_err(xlsx_err)?;
                    }
                }
            }
        }
    }
    workbook.save_to_buffer().map_err(xlsx_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_names_are_truncated_and_cleaned() {
        assert_eq!(sheet_name("Members: acme/eu"), "Members_ acme_eu");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
        assert_eq!(sheet_name("  "), "Sheet1");
    }

    #[test]
    fn renders_a_zip_container() {
        let spec = ExportSpec::new(
            vec!["name".into(), "qty".into(), "ok".into()],
            vec!["Name".into(), "Qty".into(), "Ok".into()],
        )
        .unwrap();
        let rows = vec![
            vec![Value::from("widget"), Value::Int(3), Value::Bool(true)],
            vec![Value::Null, Value::Int(-1), Value::Bool(false)],
        ];
        let bytes = render_xlsx(&spec, "Items", &rows).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
