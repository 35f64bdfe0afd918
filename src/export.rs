// 📤 Workbook export - payroll sheet, profit report, expense upload template
//
// Each builder returns the .xlsx bytes; callers decide where they go.

use crate::error::Result;
use crate::reports::{PayrollReport, SiteStats};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

pub const PAYROLL_SHEET: &str = "출력현황";
pub const PROFIT_SHEET: &str = "수익보고서";
pub const TEMPLATE_SHEET: &str = "경비지출";

pub const PAYROLL_HEADERS: [&str; 9] = [
    "작업자", "일자", "거래처", "현장", "공수", "총급여", "세금(3.3%)", "실수령액", "메모",
];
pub const PROFIT_HEADERS: [&str; 8] = [
    "거래처", "현장명", "예산", "노무비(총급여)", "세금(3.3%)", "실지급액", "경비(지출)", "순수익",
];
pub const TEMPLATE_HEADERS: [&str; 6] = ["날짜", "현장", "작업자", "항목", "내용", "금액"];

/// Default file names
pub fn payroll_file_name(year: i32, month: u32) -> String {
    format!("출력현황_{}_{:02}.xlsx", year, month)
}

pub fn profit_file_name(today: NaiveDate) -> String {
    format!("현장별_수익보고서_{}.xlsx", today.format("%Y-%m-%d"))
}

pub const TEMPLATE_FILE_NAME: &str = "경비지출_업로드양식.xlsx";

fn write_headers(sheet: &mut Worksheet, headers: &[&str]) -> Result<()> {
    let bold = Format::new().set_bold();
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    Ok(())
}

// ============================================================================
// PAYROLL
// ============================================================================

/// 출력현황: one row per work log, tax shown negative, trailing 합계 row
pub fn payroll_workbook(report: &PayrollReport) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(PAYROLL_SHEET)?;
    write_headers(sheet, &PAYROLL_HEADERS)?;

    let mut row: u32 = 1;
    for r in &report.rows {
        sheet.write_string(row, 0, &r.worker_name)?;
        sheet.write_string(row, 1, r.date.format("%Y-%m-%d").to_string())?;
        sheet.write_string(row, 2, &r.company_name)?;
        sheet.write_string(row, 3, &r.site_name)?;
        sheet.write_number(row, 4, r.md)?;
        sheet.write_number(row, 5, r.gross as f64)?;
        sheet.write_number(row, 6, -r.tax as f64)?;
        sheet.write_number(row, 7, r.net as f64)?;
        sheet.write_string(row, 8, &r.note)?;
        row += 1;
    }

    let totals = &report.totals;
    let bold = Format::new().set_bold();
    sheet.write_string_with_format(row, 0, "합계", &bold)?;
    sheet.write_number_with_format(row, 4, totals.md, &bold)?;
    sheet.write_number_with_format(row, 5, totals.gross as f64, &bold)?;
    sheet.write_number_with_format(row, 6, -totals.tax as f64, &bold)?;
    sheet.write_number_with_format(row, 7, totals.net as f64, &bold)?;

    Ok(workbook.save_to_buffer()?)
}

// ============================================================================
// PROFIT
// ============================================================================

/// 수익보고서: one row per site, costs shown negative
pub fn profit_workbook(stats: &[SiteStats]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(PROFIT_SHEET)?;
    write_headers(sheet, &PROFIT_HEADERS)?;

    for (i, s) in stats.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &s.company_name)?;
        sheet.write_string(row, 1, &s.name)?;
        sheet.write_number(row, 2, s.budget as f64)?;
        sheet.write_number(row, 3, -s.labor_gross as f64)?;
        sheet.write_number(row, 4, -s.labor_tax as f64)?;
        sheet.write_number(row, 5, -s.labor_net as f64)?;
        sheet.write_number(row, 6, -s.expense_cost as f64)?;
        sheet.write_number(row, 7, s.profit as f64)?;
    }

    Ok(workbook.save_to_buffer()?)
}

// ============================================================================
// EXPENSE TEMPLATE
// ============================================================================

const TEMPLATE_SAMPLES: [(&str, &str, &str, &str, &str, i64); 3] = [
    ("2026-01-15", "광주첨단센트럴", "홍길동", "점심", "식당 이름", 35_000),
    ("2026-01-15", "", "", "주유", "주유소명", 80_000),
    ("2026-01-16", "서대구힐스테이트", "김철수", "자재", "자재 품목", 150_000),
];

const TEMPLATE_WIDTHS: [f64; 6] = [12.0, 20.0, 10.0, 10.0, 20.0, 12.0];

/// 경비지출 upload template with three sample rows
pub fn expense_template() -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(TEMPLATE_SHEET)?;
    write_headers(sheet, &TEMPLATE_HEADERS)?;

    for (col, width) in TEMPLATE_WIDTHS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }

    for (i, (date, site, worker, category, description, amount)) in TEMPLATE_SAMPLES.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, *date)?;
        sheet.write_string(row, 1, *site)?;
        sheet.write_string(row, 2, *worker)?;
        sheet.write_string(row, 3, *category)?;
        sheet.write_string(row, 4, *description)?;
        sheet.write_number(row, 5, *amount as f64)?;
    }

    Ok(workbook.save_to_buffer()?)
}
