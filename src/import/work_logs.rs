// 📋 Work-log (payroll CSV) import
//
// Each valid row (worker, date, md > 0) becomes a work log. Along the
// way the import:
//   - infers each worker's daily rate as the median of round(gross/md, 100)
//     over every row naming that worker, valid or not
//   - picks each site's company as its most frequent non-empty company
//   - creates missing workers and sites
//   - skips rows whose (date, worker, site, md, note) key already exists,
//     either earlier in the file or in the current snapshot

use super::{cell_date, cell_number, cell_text, ImportKind, ImportSummary, Imported, Sheet};
use crate::entities::{Site, WorkLog, Worker};
use crate::error::{Error, Result};
use crate::helpers::median;
use crate::matcher::{match_name, MatchRank};
use crate::snapshot::Snapshot;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

pub const WORKER_COLUMNS: [&str; 2] = ["작업자", "worker"];
pub const DATE_COLUMNS: [&str; 2] = ["일자", "date"];
pub const COMPANY_COLUMNS: [&str; 2] = ["거래처", "company"];
pub const SITE_COLUMNS: [&str; 3] = ["현장", "예산현장명", "site"];
pub const MD_COLUMNS: [&str; 2] = ["공수", "md"];
pub const GROSS_COLUMNS: [&str; 2] = ["총급여", "gross"];
pub const NOTE_COLUMNS: [&str; 2] = ["메모", "note"];

/// Site name for rows that do not name one
pub const UNASSIGNED_SITE: &str = "미지정";

/// One validated CSV row
#[derive(Debug, Clone)]
struct PayrollRow {
    worker: String,
    date: NaiveDate,
    company: String,
    site: String,
    md: f64,
    note: String,
}

/// Daily rate implied by one row, rounded to the nearest 100
pub fn row_daily_rate(gross: f64, md: f64) -> Option<i64> {
    if gross > 0.0 && md > 0.0 {
        Some(((gross / md) / 100.0).round() as i64 * 100)
    } else {
        None
    }
}

pub fn import_work_logs(snapshot: &Snapshot, sheet: &Sheet, default_daily_rate: i64) -> Result<Imported> {
    if sheet.is_empty() {
        return Err(Error::EmptyInput);
    }

    let worker_col = sheet.require_column("작업자", &WORKER_COLUMNS)?;
    let date_col = sheet.require_column("일자", &DATE_COLUMNS)?;
    let md_col = sheet.require_column("공수", &MD_COLUMNS)?;
    let company_col = sheet.column(&COMPANY_COLUMNS);
    let site_col = sheet.column(&SITE_COLUMNS);
    let gross_col = sheet.column(&GROSS_COLUMNS);
    let note_col = sheet.column(&NOTE_COLUMNS);

    let mut summary = ImportSummary::new(ImportKind::WorkLogs);

    // ------------------------------------------------------------------
    // Validate rows; rate candidates come from every row naming a worker
    // ------------------------------------------------------------------
    let mut rows = Vec::with_capacity(sheet.rows.len());
    let mut rates: HashMap<String, Vec<i64>> = HashMap::new();
    for row in 0..sheet.rows.len() {
        let worker = cell_text(sheet.cell(row, Some(worker_col)));
        let date = cell_date(sheet.cell(row, Some(date_col)));
        let md = cell_number(sheet.cell(row, Some(md_col)));
        let gross = cell_number(sheet.cell(row, gross_col));
        let mut site = cell_text(sheet.cell(row, site_col));
        if site.is_empty() {
            site = UNASSIGNED_SITE.to_string();
        }

        if !worker.is_empty() {
            if let Some(rate) = row_daily_rate(gross, md) {
                rates.entry(worker.clone()).or_default().push(rate);
            }
        }

        match date {
            Some(date) if !worker.is_empty() && md > 0.0 => rows.push(PayrollRow {
                worker,
                date,
                company: cell_text(sheet.cell(row, company_col)),
                site,
                md,
                note: cell_text(sheet.cell(row, note_col)),
            }),
            _ => summary.skipped += 1,
        }
    }

    if rows.is_empty() {
        return Err(Error::Import(
            "no valid rows; check the 작업자/일자/현장/공수 columns".to_string(),
        ));
    }

    let mut next = snapshot.clone();

    // ------------------------------------------------------------------
    // Workers: median daily rate
    // ------------------------------------------------------------------
    let mut worker_order: Vec<&str> = Vec::new();
    for r in &rows {
        if !worker_order.contains(&r.worker.as_str()) {
            worker_order.push(r.worker.as_str());
        }
    }

    let mut worker_ids: HashMap<&str, String> = HashMap::new();
    for name in worker_order {
        let rate = median(rates.get(name).map(Vec::as_slice).unwrap_or(&[]));
        let names: Vec<&str> = next.workers.iter().map(|w| w.name.as_str()).collect();

        match match_name(&names, name, MatchRank::Normalized) {
            Some(idx) => {
                let worker = &mut next.workers[idx];
                if rate > 0 && worker.daily != rate {
                    debug!(worker = %worker.name, from = worker.daily, to = rate, "daily rate updated");
                    worker.daily = rate;
                    summary.updated += 1;
                }
                worker_ids.insert(name, worker.id.clone());
            }
            None => {
                let worker = Worker::new(name, if rate > 0 { rate } else { default_daily_rate });
                worker_ids.insert(name, worker.id.clone());
                next.workers.push(worker);
                summary.created_workers += 1;
            }
        }
    }

    // ------------------------------------------------------------------
    // Sites: most frequent company
    // ------------------------------------------------------------------
    let mut companies: HashMap<&str, Vec<(&str, usize)>> = HashMap::new();
    let mut site_order: Vec<&str> = Vec::new();
    for r in &rows {
        let counts = companies.entry(r.site.as_str()).or_insert_with(|| {
            site_order.push(r.site.as_str());
            Vec::new()
        });
        if r.company.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(c, _)| *c == r.company) {
            Some((_, n)) => *n += 1,
            None => counts.push((r.company.as_str(), 1)),
        }
    }

    let mut site_ids: HashMap<&str, String> = HashMap::new();
    for name in site_order {
        let top = companies.get(name).and_then(|counts| most_frequent(counts));
        let names: Vec<&str> = next.sites.iter().map(|s| s.name.as_str()).collect();

        match match_name(&names, name, MatchRank::Normalized) {
            Some(idx) => {
                let site = &mut next.sites[idx];
                if let Some(company) = top {
                    if site.company_name.as_deref() != Some(company) {
                        site.company_name = Some(company.to_string());
                        summary.updated += 1;
                    }
                }
                site_ids.insert(name, site.id.clone());
            }
            None => {
                let site = Site::placeholder(name, top.map(str::to_string))?;
                site_ids.insert(name, site.id.clone());
                next.sites.push(site);
                summary.created_sites += 1;
            }
        }
    }

    // ------------------------------------------------------------------
    // Work logs: dedup against the snapshot and the file itself
    // ------------------------------------------------------------------
    let mut seen: HashSet<String> = snapshot.work_logs.iter().map(WorkLog::dedup_key).collect();

    for r in &rows {
        let (Some(worker_id), Some(site_id)) = (worker_ids.get(r.worker.as_str()), site_ids.get(r.site.as_str()))
        else {
            summary.skipped += 1;
            continue;
        };

        let log = WorkLog::new(r.date, site_id, worker_id, r.md, Some(r.note.clone()));
        if !seen.insert(log.dedup_key()) {
            summary.skipped += 1;
            continue;
        }

        summary.saw_date(log.date);
        next.work_logs.push(log);
        summary.added += 1;
    }

    info!(
        added = summary.added,
        skipped = summary.skipped,
        created_workers = summary.created_workers,
        created_sites = summary.created_sites,
        latest = ?summary.latest_date,
        "work log import"
    );
    Ok(Imported {
        snapshot: next,
        summary,
    })
}

/// Highest count wins; ties go to the first seen
fn most_frequent<'a>(counts: &[(&'a str, usize)]) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &(company, n) in counts {
        if best.map_or(true, |(_, top)| n > top) {
            best = Some((company, n));
        }
    }
    best.map(|(company, _)| company)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SiteStatus;
    use crate::import::reader::parse_csv;

    const HEADER: &str = "작업자,일자,거래처,현장,공수,총급여,메모\n";

    fn sheet(rows: &str) -> Sheet {
        parse_csv(&format!("{}{}", HEADER, rows)).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_korean_date_round_trip() {
        let imported = import_work_logs(
            &Snapshot::new(),
            &sheet("김철수,25년1월1일,현대건설,포항 환호,1,150000,\n"),
            150_000,
        )
        .unwrap();

        assert_eq!(imported.snapshot.work_logs[0].date, ymd(2025, 1, 1));
        assert_eq!(imported.summary.latest_date, Some(ymd(2025, 1, 1)));
    }

    #[test]
    fn test_median_daily_rate() {
        // 148000, 152000, 300000 per man-day
        let imported = import_work_logs(
            &Snapshot::new(),
            &sheet(
                "A,2025-01-01,,현장1,1,148000,\n\
                 A,2025-01-02,,현장1,2,304000,\n\
                 A,2025-01-03,,현장1,0.5,150000,\n",
            ),
            150_000,
        )
        .unwrap();

        assert_eq!(imported.snapshot.workers.len(), 1);
        assert_eq!(imported.snapshot.workers[0].daily, 152_000);
    }

    #[test]
    fn test_median_rate_counts_rows_with_bad_dates() {
        let imported = import_work_logs(
            &Snapshot::new(),
            &sheet(
                "A,2025-01-01,,현장1,1,148000,\n\
                 A,날짜없음,,현장1,1,152000,\n\
                 A,,,현장1,1,300000,\n",
            ),
            150_000,
        )
        .unwrap();

        assert_eq!(imported.snapshot.workers[0].daily, 152_000);
        assert_eq!(imported.snapshot.work_logs.len(), 1);
        assert_eq!(imported.summary.skipped, 2);
    }

    #[test]
    fn test_rate_defaults_and_existing_workers() {
        let mut snapshot = Snapshot::new();
        snapshot.workers.push(Worker::new("이영희", 170_000));

        let imported = import_work_logs(
            &snapshot,
            &sheet(
                "이영희,2025-01-01,,현장1,1,,\n\
                 박민수,2025-01-01,,현장1,1,,\n\
                 최현우,2025-01-01,,현장1,1,181049,\n",
            ),
            150_000,
        )
        .unwrap();
        let workers = &imported.snapshot.workers;

        assert_eq!(workers[0].daily, 170_000, "no gross keeps the existing rate");
        assert_eq!(workers[0].id, snapshot.workers[0].id);
        assert_eq!(workers[1].daily, 150_000);
        assert_eq!(workers[2].daily, 181_000);
        assert_eq!(imported.summary.created_workers, 2);
    }

    #[test]
    fn test_duplicate_rows_in_batch_yield_one_log() {
        let imported = import_work_logs(
            &Snapshot::new(),
            &sheet(
                "김철수,2025-01-01,,포항,1,150000,야간\n\
                 김철수,2025-01-01,,포항,1,150000,야간\n\
                 김철수,2025-01-01,,포항,1,150000,\n",
            ),
            150_000,
        )
        .unwrap();

        assert_eq!(imported.snapshot.work_logs.len(), 2);
        assert_eq!(imported.summary.added, 2);
        assert_eq!(imported.summary.skipped, 1);
    }

    #[test]
    fn test_reimport_adds_nothing() {
        let csv = sheet(
            "김철수,2025-01-01,현대,포항,1,150000,\n\
             이영희,2025-01-02,현대,포항,1.5,240000,\n",
        );
        let first = import_work_logs(&Snapshot::new(), &csv, 150_000).unwrap();
        let second = import_work_logs(&first.snapshot, &csv, 150_000).unwrap();

        assert_eq!(second.snapshot.work_logs, first.snapshot.work_logs);
        assert_eq!(second.snapshot.workers, first.snapshot.workers);
        assert_eq!(second.snapshot.sites, first.snapshot.sites);
        assert_eq!(second.summary.added, 0);
        assert!(second.summary.is_noop());
    }

    #[test]
    fn test_invalid_rows_skipped_and_site_defaults() {
        let imported = import_work_logs(
            &Snapshot::new(),
            &sheet(
                ",2025-01-01,,포항,1,150000,\n\
                 김철수,날짜없음,,포항,1,150000,\n\
                 김철수,2025-01-01,,포항,0,150000,\n\
                 김철수,2025-01-01,,,1,150000,\n",
            ),
            150_000,
        )
        .unwrap();

        assert_eq!(imported.summary.skipped, 3);
        assert_eq!(imported.snapshot.work_logs.len(), 1);
        assert_eq!(imported.snapshot.sites[0].name, "미지정");
        assert_eq!(imported.snapshot.sites[0].status, SiteStatus::Active);
    }

    #[test]
    fn test_site_company_most_frequent() {
        let mut snapshot = Snapshot::new();
        snapshot
            .sites
            .push(Site::new("용인", 0, Some("기존".into()), SiteStatus::Active).unwrap());

        let imported = import_work_logs(
            &snapshot,
            &sheet(
                "A,2025-01-01,한화,포항,1,,\n\
                 A,2025-01-02,GS,포항,1,,\n\
                 A,2025-01-03,GS,포항,1,,\n\
                 A,2025-01-04,,용인,1,,\n\
                 A,2025-01-05,삼성,세종,1,,\n\
                 A,2025-01-06,현대,세종,1,,\n",
            ),
            150_000,
        )
        .unwrap();
        let company = |name: &str| {
            imported
                .snapshot
                .sites
                .iter()
                .find(|s| s.name == name)
                .and_then(|s| s.company_name.clone())
        };

        assert_eq!(company("포항").as_deref(), Some("GS"));
        assert_eq!(company("용인").as_deref(), Some("기존"));
        assert_eq!(company("세종").as_deref(), Some("삼성"), "tie goes to first seen");
    }

    #[test]
    fn test_missing_required_column() {
        let csv = parse_csv("이름,날짜\n김철수,2025-01-01\n").unwrap();
        let err = import_work_logs(&Snapshot::new(), &csv, 150_000).unwrap_err();
        assert!(err.to_string().contains("이름, 날짜"));
    }

    #[test]
    fn test_row_daily_rate_rounding() {
        assert_eq!(row_daily_rate(270_000.0, 1.5), Some(180_000));
        assert_eq!(row_daily_rate(150_049.0, 1.0), Some(150_000));
        assert_eq!(row_daily_rate(150_050.0, 1.0), Some(150_100));
        assert_eq!(row_daily_rate(0.0, 1.0), None);
    }
}
