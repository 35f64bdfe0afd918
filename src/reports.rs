// 📊 Reports - payroll listing and per-site profit
//
// Payroll: gross = daily × md, 3.3% withholding (floored), net = gross − tax.
// Dangling references render as "미등록" / "삭제된 현장".

use crate::snapshot::Snapshot;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// Withholding rate in thousandths (3.3%)
const TAX_PER_MILLE: i64 = 33;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Payroll {
    pub gross: i64,
    pub tax: i64,
    pub net: i64,
}

/// Pay for `md` man-days at `daily`
pub fn calc_payroll(daily: i64, md: f64) -> Payroll {
    let gross = if md.is_finite() {
        (daily as f64 * md).round() as i64
    } else {
        0
    };
    let tax = (gross * TAX_PER_MILLE).div_euclid(1000);

    Payroll {
        gross,
        tax,
        net: gross - tax,
    }
}

// ============================================================================
// PAYROLL ROWS
// ============================================================================

/// Which work logs a payroll listing covers
#[derive(Debug, Clone, Default)]
pub struct PayrollFilter {
    /// `(year, month)`; `None` lists every month
    pub month: Option<(i32, u32)>,
    pub worker_id: Option<String>,
    pub site_id: Option<String>,
    pub company: Option<String>,
    pub oldest_first: bool,
}

impl PayrollFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn month(mut self, year: i32, month: u32) -> Self {
        self.month = Some((year, month));
        self
    }

    pub fn worker(mut self, worker_id: &str) -> Self {
        self.worker_id = Some(worker_id.to_string());
        self
    }

    pub fn site(mut self, site_id: &str) -> Self {
        self.site_id = Some(site_id.to_string());
        self
    }

    pub fn company(mut self, company: &str) -> Self {
        self.company = Some(company.to_string());
        self
    }

    pub fn oldest_first(mut self) -> Self {
        self.oldest_first = true;
        self
    }

    /// "YYYY-MM" prefix for the month filter
    fn month_prefix(&self) -> Option<String> {
        self.month.map(|(y, m)| format!("{:04}-{:02}", y, m))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayrollRow {
    pub log_id: String,
    pub date: NaiveDate,
    pub worker_name: String,
    pub site_name: String,

    /// Site company, "-" when unknown
    pub company_name: String,

    pub md: f64,
    pub gross: i64,
    pub tax: i64,
    pub net: i64,
    pub note: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PayrollTotals {
    pub md: f64,
    pub gross: i64,
    pub tax: i64,
    pub net: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayrollReport {
    pub rows: Vec<PayrollRow>,
    pub totals: PayrollTotals,
}

pub fn payroll_report(snapshot: &Snapshot, filter: &PayrollFilter) -> PayrollReport {
    let prefix = filter.month_prefix();
    let sites: HashMap<&str, _> = snapshot.sites.iter().map(|s| (s.id.as_str(), s)).collect();
    let workers: HashMap<&str, _> = snapshot.workers.iter().map(|w| (w.id.as_str(), w)).collect();

    let mut logs: Vec<_> = snapshot
        .work_logs
        .iter()
        .filter(|l| {
            prefix
                .as_deref()
                .map_or(true, |p| l.date.format("%Y-%m").to_string() == p)
        })
        .filter(|l| filter.worker_id.as_deref().map_or(true, |w| l.worker_id == w))
        .filter(|l| filter.site_id.as_deref().map_or(true, |s| l.site_id == s))
        .filter(|l| {
            filter.company.as_deref().map_or(true, |c| {
                sites
                    .get(l.site_id.as_str())
                    .and_then(|s| s.company_name.as_deref())
                    == Some(c)
            })
        })
        .collect();

    // Stable sort keeps input order within a day
    if filter.oldest_first {
        logs.sort_by(|a, b| a.date.cmp(&b.date));
    } else {
        logs.sort_by(|a, b| b.date.cmp(&a.date));
    }

    let mut totals = PayrollTotals::default();
    let rows = logs
        .into_iter()
        .map(|log| {
            let worker = workers.get(log.worker_id.as_str());
            let site = sites.get(log.site_id.as_str());
            let pay = calc_payroll(worker.map_or(0, |w| w.daily), log.md);

            totals.md += log.md;
            totals.gross += pay.gross;
            totals.tax += pay.tax;
            totals.net += pay.net;

            PayrollRow {
                log_id: log.id.clone(),
                date: log.date,
                worker_name: worker.map_or("미등록", |w| w.name.as_str()).to_string(),
                site_name: site.map_or("삭제된 현장", |s| s.name.as_str()).to_string(),
                company_name: site
                    .and_then(|s| s.company_name.as_deref())
                    .unwrap_or("-")
                    .to_string(),
                md: log.md,
                gross: pay.gross,
                tax: pay.tax,
                net: pay.net,
                note: log.note.clone().unwrap_or_default(),
            }
        })
        .collect();

    PayrollReport { rows, totals }
}

// ============================================================================
// SITE PROFIT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteStats {
    pub site_id: String,
    pub name: String,
    pub company_name: String,
    pub budget: i64,
    pub labor_gross: i64,
    pub labor_tax: i64,
    pub labor_net: i64,
    pub expense_cost: i64,
    pub total_cost: i64,
    pub profit: i64,
}

impl SiteStats {
    /// Share of the budget spent, capped at 100 (a zero budget counts as 1)
    pub fn spent_percent(&self) -> f64 {
        let budget = self.budget.max(1) as f64;
        (self.total_cost as f64 * 100.0 / budget).min(100.0)
    }
}

/// One entry per site, in site order; `search` filters by name (case-insensitive)
pub fn site_stats(snapshot: &Snapshot, search: Option<&str>) -> Vec<SiteStats> {
    let daily: HashMap<&str, i64> = snapshot
        .workers
        .iter()
        .map(|w| (w.id.as_str(), w.daily))
        .collect();
    let needle = search.map(str::to_lowercase).filter(|s| !s.is_empty());

    snapshot
        .sites
        .iter()
        .filter(|site| {
            needle
                .as_deref()
                .map_or(true, |n| site.name.to_lowercase().contains(n))
        })
        .map(|site| {
            let (mut gross, mut tax, mut net) = (0, 0, 0);
            for log in snapshot.work_logs.iter().filter(|l| l.site_id == site.id) {
                let pay = calc_payroll(daily.get(log.worker_id.as_str()).copied().unwrap_or(0), log.md);
                gross += pay.gross;
                tax += pay.tax;
                net += pay.net;
            }
            let expense_cost: i64 = snapshot
                .transactions
                .iter()
                .filter(|t| t.site_id.as_deref() == Some(site.id.as_str()))
                .map(|t| t.amount)
                .sum();
            let total_cost = gross + expense_cost;

            SiteStats {
                site_id: site.id.clone(),
                name: site.name.clone(),
                company_name: site.company_or_dash().to_string(),
                budget: site.budget,
                labor_gross: gross,
                labor_tax: tax,
                labor_net: net,
                expense_cost,
                total_cost,
                profit: site.budget - total_cost,
            }
        })
        .collect()
}
