// 🏗️ Site list import
//
// Columns: name (required), budget, company. Known sites (matched by
// normalized name) are updated when the budget differs or a non-empty company
// differs; unknown names become new active sites.

use super::{cell_amount, cell_text, ImportKind, ImportSummary, Imported, Sheet};
use crate::entities::{Site, SiteStatus};
use crate::error::{Error, Result};
use crate::matcher::{match_name, MatchRank};
use crate::snapshot::Snapshot;
use tracing::info;

pub const NAME_COLUMNS: [&str; 4] = ["현장명", "현장", "name", "site"];
pub const BUDGET_COLUMNS: [&str; 3] = ["예산", "budget", "amount"];
pub const COMPANY_COLUMNS: [&str; 4] = ["거래처", "건설사", "company", "customer"];

pub fn import_sites(snapshot: &Snapshot, sheet: &Sheet) -> Result<Imported> {
    if sheet.is_empty() {
        return Err(Error::EmptyInput);
    }

    let name_col = sheet.require_column("현장명", &NAME_COLUMNS)?;
    let budget_col = sheet.column(&BUDGET_COLUMNS);
    let company_col = sheet.column(&COMPANY_COLUMNS);

    let mut next = snapshot.clone();
    let mut summary = ImportSummary::new(ImportKind::Sites);
    let existing = snapshot.sites.len();
    let mut touched = vec![false; existing];

    for row in 0..sheet.rows.len() {
        let name = cell_text(sheet.cell(row, Some(name_col)));
        if name.is_empty() {
            summary.skipped += 1;
            continue;
        }
        let budget = cell_amount(sheet.cell(row, budget_col));
        let company = cell_text(sheet.cell(row, company_col));

        let names: Vec<&str> = next.sites.iter().map(|s| s.name.as_str()).collect();
        match match_name(&names, &name, MatchRank::Normalized) {
            Some(idx) => {
                let site = &mut next.sites[idx];
                let company_changed = !company.is_empty() && site.company_name.as_deref() != Some(company.as_str());
                if site.budget == budget && !company_changed {
                    continue;
                }
                site.budget = budget;
                if company_changed {
                    site.company_name = Some(company);
                }
                // Repeated rows for a site created by this import stay "added"
                if idx < existing && !touched[idx] {
                    touched[idx] = true;
                    summary.updated += 1;
                }
            }
            None => {
                let company = (!company.is_empty()).then_some(company);
                next.sites.push(Site::new(&name, budget, company, SiteStatus::Active)?);
                summary.added += 1;
            }
        }
    }

    info!(added = summary.added, updated = summary.updated, skipped = summary.skipped, "site import");
    Ok(Imported {
        snapshot: next,
        summary,
    })
}
