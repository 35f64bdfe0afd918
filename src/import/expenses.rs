// 💸 Expense import
//
// One transaction per row with a positive amount. Unknown site names get a
// placeholder site; unknown worker names leave the worker empty. Dates that
// cannot be read fall back to `today`.

use super::{cell_amount, cell_date, cell_text, ImportKind, ImportSummary, Imported, Sheet};
use crate::entities::{Site, Transaction};
use crate::error::{Error, Result};
use crate::matcher::{match_name, MatchRank};
use crate::snapshot::Snapshot;
use chrono::NaiveDate;
use tracing::info;

pub const SITE_COLUMNS: [&str; 3] = ["현장", "현장_표준화", "site"];
pub const WORKER_COLUMNS: [&str; 3] = ["작업자", "작업자(수동입력)", "worker"];
pub const CATEGORY_COLUMNS: [&str; 3] = ["항목", "카테고리", "category"];
pub const DESCRIPTION_COLUMNS: [&str; 4] = ["내용", "설명", "description", "이용하신 가맹점명"];
pub const AMOUNT_COLUMNS: [&str; 3] = ["금액", "이용금액", "amount"];
pub const DATE_COLUMNS: [&str; 3] = ["날짜", "일자", "date"];

const DEFAULT_CATEGORY: &str = "기타";

pub fn import_expenses(snapshot: &Snapshot, sheet: &Sheet, today: NaiveDate) -> Result<Imported> {
    if sheet.is_empty() {
        return Err(Error::EmptyInput);
    }

    let amount_col = sheet.require_column("금액", &AMOUNT_COLUMNS)?;
    let site_col = sheet.column(&SITE_COLUMNS);
    let worker_col = sheet.column(&WORKER_COLUMNS);
    let category_col = sheet.column(&CATEGORY_COLUMNS);
    let description_col = sheet.column(&DESCRIPTION_COLUMNS);
    let date_col = sheet.column(&DATE_COLUMNS);

    let mut next = snapshot.clone();
    let mut summary = ImportSummary::new(ImportKind::Expenses);
    let worker_names: Vec<&str> = snapshot.workers.iter().map(|w| w.name.as_str()).collect();

    for row in 0..sheet.rows.len() {
        let amount = cell_amount(sheet.cell(row, Some(amount_col)));
        if amount <= 0 {
            summary.skipped += 1;
            continue;
        }

        let site_name = cell_text(sheet.cell(row, site_col));
        let site_id = if site_name.is_empty() {
            None
        } else {
            Some(resolve_site(&mut next.sites, &site_name, &mut summary)?)
        };

        let worker_name = cell_text(sheet.cell(row, worker_col));
        let worker_id = match_name(&worker_names, &worker_name, MatchRank::Normalized)
            .map(|idx| snapshot.workers[idx].id.clone());

        let mut category = cell_text(sheet.cell(row, category_col));
        if category.is_empty() {
            category = DEFAULT_CATEGORY.to_string();
        }
        let description = cell_text(sheet.cell(row, description_col));
        let date = cell_date(sheet.cell(row, date_col)).unwrap_or(today);

        summary.saw_date(date);
        next.transactions.push(Transaction::new(
            date,
            site_id,
            worker_id,
            &category,
            &description,
            amount,
        ));
        summary.added += 1;
    }

    info!(
        added = summary.added,
        skipped = summary.skipped,
        created_sites = summary.created_sites,
        "expense import"
    );
    Ok(Imported {
        snapshot: next,
        summary,
    })
}

/// Id of the site named `name`, creating a placeholder when nothing close exists
fn resolve_site(sites: &mut Vec<Site>, name: &str, summary: &mut ImportSummary) -> Result<String> {
    let names: Vec<&str> = sites.iter().map(|s| s.name.as_str()).collect();
    if let Some(idx) = match_name(&names, name, MatchRank::Contains) {
        return Ok(sites[idx].id.clone());
    }

    let site = Site::placeholder(name, None)?;
    let id = site.id.clone();
    sites.push(site);
    summary.created_sites += 1;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{SiteStatus, Worker};
    use crate::import::reader::{parse_csv, Cell};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn create_test_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.sites = vec![Site::new("포항 환호 1블럭", 0, None, SiteStatus::Active).unwrap()];
        snapshot.workers = vec![Worker::new("김철수", 150_000)];
        snapshot
    }

    #[test]
    fn test_rows_become_transactions() {
        let sheet = parse_csv(
            "날짜,현장,작업자,항목,내용,금액\n\
             2026-01-15,포항환호1블럭,김철수,점심,한식뷔페,\"35,000\"\n\
             2026.01.16,세종 신축,모르는사람,주유,,80000\n\
             2026-01-17,,,,,0\n",
        )
        .unwrap();
        let snapshot = create_test_snapshot();

        let imported = import_expenses(&snapshot, &sheet, today()).unwrap();
        let txs = &imported.snapshot.transactions;

        assert_eq!(imported.summary.added, 2);
        assert_eq!(imported.summary.skipped, 1);
        assert_eq!(imported.summary.created_sites, 1);

        assert_eq!(txs[0].amount, 35_000);
        assert_eq!(txs[0].site_id.as_deref(), Some(snapshot.sites[0].id.as_str()));
        assert_eq!(txs[0].worker_id.as_deref(), Some(snapshot.workers[0].id.as_str()));

        let created = &imported.snapshot.sites[1];
        assert_eq!(created.name, "세종 신축");
        assert_eq!((created.budget, created.status), (0, SiteStatus::Active));
        assert_eq!(txs[1].site_id.as_deref(), Some(created.id.as_str()));
        assert_eq!(txs[1].worker_id, None);
        assert_eq!(txs[1].description, "주유", "blank description falls back to category");
        assert_eq!(txs[1].date, NaiveDate::from_ymd_opt(2026, 1, 16).unwrap());
    }

    #[test]
    fn test_card_statement_columns_and_defaults() {
        let sheet = Sheet::new(
            vec!["이용일".into(), "이용하신 가맹점명".into(), "이용금액".into()],
            vec![vec![Cell::Text("??".into()), Cell::Text("GS칼텍스".into()), Cell::Number(55000.0)]],
        );
        let imported = import_expenses(&Snapshot::new(), &sheet, today()).unwrap();
        let tx = &imported.snapshot.transactions[0];

        assert_eq!(tx.category, "기타");
        assert_eq!(tx.description, "GS칼텍스");
        assert_eq!(tx.date, today());
        assert_eq!(tx.site_id, None);
    }

    #[test]
    fn test_new_site_reused_within_batch() {
        let sheet = parse_csv("현장,금액\n세종,1000\n세종,2000\n").unwrap();
        let imported = import_expenses(&Snapshot::new(), &sheet, today()).unwrap();

        assert_eq!(imported.snapshot.sites.len(), 1);
        assert_eq!(imported.summary.created_sites, 1);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let sheet = parse_csv("날짜,금액\n").unwrap();
        assert!(matches!(
            import_expenses(&Snapshot::new(), &sheet, today()),
            Err(Error::EmptyInput)
        ));
    }
}
