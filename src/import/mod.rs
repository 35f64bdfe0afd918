// 📥 Import pipelines
//
// Every pipeline takes the current snapshot plus a parsed `Sheet` and returns
// the next snapshot together with an aggregate `ImportSummary`. Per-row
// failures are skipped and counted, never reported one by one.
//
//   reader        → Sheet (CSV with encoding detection, first workbook sheet)
//   sites         → create / update sites from a site list
//   expenses      → append expense transactions
//   work_logs     → payroll CSV → workers, sites and work logs
//   expense_sites → fill missing expense sites from work logs

pub mod expense_sites;
pub mod expenses;
pub mod reader;
pub mod sites;
pub mod work_logs;

pub use expense_sites::assign_expense_sites;
pub use expenses::import_expenses;
pub use reader::{detect_format, read_bytes, read_path, Cell, InputFormat, Sheet};
pub use sites::import_sites;
pub use work_logs::import_work_logs;

use crate::helpers::{excel_serial_to_date, find_ymd, format_currency, parse_korean_date, parse_num};
use crate::snapshot::Snapshot;
use crate::store::{Notice, NoticeLevel};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Sites,
    Expenses,
    WorkLogs,
    ExpenseSites,
}

/// Aggregate result of one import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub kind: ImportKind,

    /// Primary entities created (sites, transactions or work logs)
    pub added: usize,

    /// Existing entities changed
    pub updated: usize,

    /// Rows dropped by validation or deduplication
    pub skipped: usize,

    /// Sites synthesized for names that did not exist yet
    pub created_sites: usize,

    /// Workers synthesized for names that did not exist yet
    pub created_workers: usize,

    /// Most recent date among imported rows
    pub latest_date: Option<NaiveDate>,
}

impl ImportSummary {
    pub fn new(kind: ImportKind) -> Self {
        ImportSummary {
            kind,
            added: 0,
            updated: 0,
            skipped: 0,
            created_sites: 0,
            created_workers: 0,
            latest_date: None,
        }
    }

    /// Nothing was added or changed
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.created_sites == 0 && self.created_workers == 0
    }

    fn saw_date(&mut self, date: NaiveDate) {
        if self.latest_date.map_or(true, |latest| date > latest) {
            self.latest_date = Some(date);
        }
    }

    /// User-facing notice for this outcome
    pub fn notice(&self) -> Notice {
        match self.kind {
            ImportKind::Sites if self.is_noop() => Notice::new(NoticeLevel::Info, "변경할 현장이 없습니다."),
            ImportKind::Sites => {
                let mut parts = Vec::new();
                if self.added > 0 {
                    parts.push(format!("{}개 추가", self.added));
                }
                if self.updated > 0 {
                    parts.push(format!("{}개 업데이트", self.updated));
                }
                Notice::new(NoticeLevel::Success, format!("현장 {}되었습니다.", parts.join(", ")))
            }
            ImportKind::Expenses => Notice::new(
                NoticeLevel::Success,
                format!("{}건의 경비 내역이 등록되었습니다.", format_currency(self.added as i64)),
            ),
            ImportKind::WorkLogs => Notice::new(
                NoticeLevel::Success,
                format!("CSV 반영 완료 · 작업일지 {}건", format_currency(self.added as i64)),
            ),
            ImportKind::ExpenseSites if self.is_noop() => {
                Notice::new(NoticeLevel::Info, "현장을 찾을 경비 내역이 없습니다.")
            }
            ImportKind::ExpenseSites => Notice::new(
                NoticeLevel::Success,
                format!("경비 {}건의 현장이 지정되었습니다.", self.updated),
            ),
        }
    }
}

/// Next snapshot plus what changed
#[derive(Debug, Clone)]
pub struct Imported {
    pub snapshot: Snapshot,
    pub summary: ImportSummary,
}

// ============================================================================
// CELL COERCION
// ============================================================================

/// Cell as trimmed text; whole numbers lose their ".0"
pub(crate) fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(s) => crate::helpers::normalize_text(s),
        Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        Cell::Number(n) => n.to_string(),
    }
}

/// Monetary cell: numbers as-is, text without thousands separators, else 0
pub(crate) fn cell_amount(cell: &Cell) -> i64 {
    match cell {
        Cell::Number(n) if n.is_finite() => n.round() as i64,
        Cell::Text(s) => parse_num(&s.replace(',', ""), 0.0).round() as i64,
        _ => 0,
    }
}

/// Fractional quantity cell (man-days, gross pay)
pub(crate) fn cell_number(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) if n.is_finite() => *n,
        Cell::Text(s) => parse_num(s, 0.0),
        _ => 0.0,
    }
}

/// Date cell: spreadsheet serial, `Y-M-D` (any of `-./`), Korean long form,
/// or a general format
pub(crate) fn cell_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Empty => None,
        Cell::Number(serial) => excel_serial_to_date(*serial),
        Cell::Text(s) => find_ymd(s).or_else(|| parse_korean_date(s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_amount_variants() {
        assert_eq!(cell_amount(&Cell::Number(35000.0)), 35000);
        assert_eq!(cell_amount(&Cell::Text("1,234,000".into())), 1_234_000);
        assert_eq!(cell_amount(&Cell::Text("무료".into())), 0);
        assert_eq!(cell_amount(&Cell::Empty), 0);
    }

    #[test]
    fn test_cell_date_variants() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        assert_eq!(cell_date(&Cell::Number(45658.0)), Some(expected));
        assert_eq!(cell_date(&Cell::Text("2025.1.1".into())), Some(expected));
        assert_eq!(cell_date(&Cell::Text("2025/01/01 09:30".into())), Some(expected));
        assert_eq!(cell_date(&Cell::Text("25년1월1일(수)".into())), Some(expected));
        assert_eq!(cell_date(&Cell::Text("어제".into())), None);
    }

    #[test]
    fn test_cell_text_drops_trailing_zero() {
        assert_eq!(cell_text(&Cell::Number(150000.0)), "150000");
        assert_eq!(cell_text(&Cell::Number(1.5)), "1.5");
        assert_eq!(cell_text(&Cell::Text(" 현장A ".into())), "현장A");
    }

    #[test]
    fn test_site_notice_messages() {
        let mut summary = ImportSummary::new(ImportKind::Sites);
        assert_eq!(summary.notice().level, NoticeLevel::Info);

        summary.added = 2;
        summary.updated = 1;
        assert_eq!(summary.notice().message, "현장 2개 추가, 1개 업데이트되었습니다.");
    }
}
