// 🔗 Expense site inference
//
// Card-statement expenses often arrive without a site but with the spender in
// the description: "GS칼텍스 (김철수)". For those, take the site of the first
// work log by that worker on the same day.

use super::{ImportKind, ImportSummary, Imported};
use crate::snapshot::Snapshot;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::info;

/// Worker name from a trailing "(name)" in a description
pub fn trailing_worker_name(description: &str) -> Option<&str> {
    let trimmed = description.trim_end();
    let inner = trimmed.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let name = inner[open + 1..].trim();
    (!name.is_empty()).then_some(name)
}

pub fn assign_expense_sites(snapshot: &Snapshot) -> Imported {
    let mut summary = ImportSummary::new(ImportKind::ExpenseSites);

    // (date, worker id) → site id of the first matching log
    let mut site_by_day: HashMap<(NaiveDate, &str), &str> = HashMap::new();
    for log in &snapshot.work_logs {
        site_by_day
            .entry((log.date, log.worker_id.as_str()))
            .or_insert(log.site_id.as_str());
    }

    let mut next = snapshot.clone();
    for tx in next.transactions.iter_mut().filter(|tx| tx.site_id.is_none()) {
        let site = trailing_worker_name(&tx.description)
            .and_then(|name| snapshot.workers.iter().find(|w| w.name == name))
            .and_then(|worker| site_by_day.get(&(tx.date, worker.id.as_str())));

        match site {
            Some(site_id) => {
                tx.site_id = Some(site_id.to_string());
                summary.updated += 1;
            }
            None => summary.skipped += 1,
        }
    }

    info!(updated = summary.updated, remaining = summary.skipped, "expense site assignment");
    Imported {
        snapshot: next,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Site, SiteStatus, Transaction, WorkLog, Worker};

    #[test]
    fn test_trailing_worker_name() {
        assert_eq!(trailing_worker_name("GS칼텍스 (김철수)"), Some("김철수"));
        assert_eq!(trailing_worker_name("식당(이영희) "), Some("이영희"));
        assert_eq!(trailing_worker_name("(주)한솔 식당"), None);
        assert_eq!(trailing_worker_name("빈 괄호 ()"), None);
    }

    #[test]
    fn test_assigns_site_from_same_day_log() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let mut snapshot = Snapshot::new();
        snapshot.sites = vec![
            Site::new("포항", 0, None, SiteStatus::Active).unwrap(),
            Site::new("용인", 0, None, SiteStatus::Active).unwrap(),
        ];
        snapshot.workers = vec![Worker::new("김철수", 150_000)];
        let (pohang, yongin, worker) = (
            snapshot.sites[0].id.clone(),
            snapshot.sites[1].id.clone(),
            snapshot.workers[0].id.clone(),
        );
        snapshot.work_logs = vec![
            WorkLog::new(date, &pohang, &worker, 1.0, None),
            WorkLog::new(date, &yongin, &worker, 0.5, None),
        ];
        snapshot.transactions = vec![
            Transaction::new(date, None, None, "주유", "GS칼텍스 (김철수)", 50_000),
            Transaction::new(date, None, None, "점심", "식당 (모르는사람)", 9_000),
            Transaction::new(date, Some(yongin.clone()), None, "저녁", "고깃집 (김철수)", 60_000),
        ];

        let imported = assign_expense_sites(&snapshot);
        let txs = &imported.snapshot.transactions;

        assert_eq!(txs[0].site_id.as_deref(), Some(pohang.as_str()), "first log wins");
        assert_eq!(txs[1].site_id, None);
        assert_eq!(txs[2].site_id.as_deref(), Some(yongin.as_str()), "existing site untouched");
        assert_eq!(imported.summary.updated, 1);
        assert_eq!(imported.summary.skipped, 1);
    }
}
