// 📄 Import readers - CSV (UTF-8 / EUC-KR) and workbooks (first sheet)
//
// Both produce a `Sheet`: cleaned headers plus rows of typed cells.

use crate::error::{Error, Result};
use crate::helpers::normalize_text;
use crate::matcher::best_match;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

// ============================================================================
// CELLS & SHEETS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(value: &str) -> Cell {
        if value.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) => Cell::text(s),
            Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s),
            Data::Error(_) | Data::Empty => Cell::Empty,
        }
    }
}

/// A header row plus data rows
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Build a sheet; headers are cleaned and blank rows dropped
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Sheet {
            headers: headers.iter().map(|h| normalize_text(h)).collect(),
            rows: rows
                .into_iter()
                .filter(|row| row.iter().any(|c| !c.is_empty()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the header best matching any alias
    pub fn column(&self, aliases: &[&str]) -> Option<usize> {
        best_match(&self.headers, aliases).map(|m| m.index)
    }

    /// Like `column`, but a miss is an error naming the detected headers
    pub fn require_column(&self, field: &str, aliases: &[&str]) -> Result<usize> {
        self.column(aliases).ok_or_else(|| Error::MissingColumn {
            column: field.to_string(),
            headers: self.headers.clone(),
        })
    }

    /// Cell at (row, col); short rows and absent columns read as empty
    pub fn cell(&self, row: usize, col: Option<usize>) -> &Cell {
        const EMPTY: &Cell = &Cell::Empty;
        col.and_then(|c| self.rows.get(row)?.get(c)).unwrap_or(EMPTY)
    }
}

// ============================================================================
// FORMAT DETECTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Workbook,
}

/// Format from the file extension
pub fn detect_format(path: &Path) -> Result<InputFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "csv" | "txt" => Ok(InputFormat::Csv),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(InputFormat::Workbook),
        _ => Err(Error::Import(format!(
            "unsupported file type: {}",
            path.display()
        ))),
    }
}

/// Read an import file from disk
pub fn read_path(path: &Path) -> Result<Sheet> {
    let format = detect_format(path)?;
    let bytes = std::fs::read(path)?;
    debug!(path = %path.display(), ?format, bytes = bytes.len(), "reading import file");
    read_bytes(format, bytes)
}

pub fn read_bytes(format: InputFormat, bytes: Vec<u8>) -> Result<Sheet> {
    match format {
        InputFormat::Csv => parse_csv(&decode_csv_bytes(&bytes)),
        InputFormat::Workbook => read_workbook(bytes),
    }
}

// ============================================================================
// CSV
// ============================================================================

/// Decode as UTF-8 or EUC-KR, whichever yields fewer replacement characters
/// (UTF-8 on a tie)
pub fn decode_csv_bytes(bytes: &[u8]) -> String {
    let utf8 = String::from_utf8_lossy(bytes);
    let (euc_kr, _) = encoding_rs::EUC_KR.decode_without_bom_handling(bytes);

    let bad = |s: &str| s.chars().filter(|c| *c == char::REPLACEMENT_CHARACTER).count();
    let text = if bad(euc_kr.as_ref()) < bad(utf8.as_ref()) { euc_kr } else { utf8 };

    text.trim_start_matches('\u{FEFF}').to_string()
}

/// Comma-delimited, optionally quoted, header row required
pub fn parse_csv(text: &str) -> Result<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(Cell::text).collect());
    }

    Ok(Sheet::new(headers, rows))
}

// ============================================================================
// WORKBOOK
// ============================================================================

/// First sheet of an xlsx / xls / ods workbook
pub fn read_workbook(bytes: Vec<u8>) -> Result<Sheet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Import("workbook has no sheets".to_string()))??;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|d| match Cell::from(d) {
                Cell::Empty => String::new(),
                Cell::Text(s) => s,
                Cell::Number(n) => n.to_string(),
            })
            .collect(),
        None => return Err(Error::EmptyInput),
    };

    let data = rows.map(|row| row.iter().map(Cell::from).collect()).collect();
    Ok(Sheet::new(headers, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_parse_csv_quoted_and_bom() {
        let sheet = parse_csv("\u{FEFF}현장명,예산\n\"포항 환호, 1블럭\",\"30,000,000\"\n,\n").unwrap();

        assert_eq!(sheet.headers, vec!["현장명", "예산"]);
        assert_eq!(sheet.rows.len(), 1, "blank row dropped");
        assert_eq!(sheet.rows[0][0], Cell::Text("포항 환호, 1블럭".into()));
    }

    #[test]
    fn test_decode_prefers_euc_kr_for_legacy_bytes() {
        let (bytes, _, _) = encoding_rs::EUC_KR.encode("작업자,일자\n김철수,2025-01-01\n");
        let text = decode_csv_bytes(&bytes);
        assert!(text.starts_with("작업자,일자"));
    }

    #[test]
    fn test_decode_keeps_utf8() {
        let text = decode_csv_bytes("\u{FEFF}작업자,일자\n".as_bytes());
        assert_eq!(text, "작업자,일자\n");
    }

    #[test]
    fn test_missing_column_names_headers() {
        let sheet = Sheet::new(vec!["날짜".into(), "금액".into()], vec![]);
        let err = sheet.require_column("현장명", &["현장명", "현장"]).unwrap_err();

        assert!(err.to_string().contains("날짜, 금액"));
    }

    #[test]
    fn test_short_rows_read_empty() {
        let sheet = Sheet::new(
            vec!["a".into(), "b".into()],
            vec![vec![Cell::Text("x".into())]],
        );
        assert_eq!(sheet.cell(0, Some(1)), &Cell::Empty);
        assert_eq!(sheet.cell(0, None), &Cell::Empty);
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(Path::new("a.CSV")).unwrap(), InputFormat::Csv);
        assert_eq!(detect_format(Path::new("b.xlsx")).unwrap(), InputFormat::Workbook);
        assert!(detect_format(Path::new("c.pdf")).is_err());
    }

    #[test]
    fn test_read_workbook_first_sheet() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "현장").unwrap();
        sheet.write_string(0, 1, "금액").unwrap();
        sheet.write_string(1, 0, "용인 둔전").unwrap();
        sheet.write_number(1, 1, 35000).unwrap();
        workbook.add_worksheet().write_string(0, 0, "ignored").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expenses.xlsx");
        std::fs::write(&path, bytes).unwrap();

        let sheet = read_path(&path).unwrap();
        assert_eq!(sheet.headers, vec!["현장", "금액"]);
        assert_eq!(sheet.rows, vec![vec![Cell::Text("용인 둔전".into()), Cell::Number(35000.0)]]);
    }
}
