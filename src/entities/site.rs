// 🏗️ Site Entity - a construction site with a budget

use super::{new_id, non_empty, Entity};
use crate::error::{Error, Result};
use crate::remote::{nullable, row_i64, row_id, row_str, Row, Table};
use serde::{Deserialize, Serialize};
use serde_json::json;

// ============================================================================
// SITE STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Scheduled,
    Active,
    Completed,
}

impl SiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteStatus::Scheduled => "scheduled",
            SiteStatus::Active => "active",
            SiteStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<SiteStatus> {
        match value {
            "scheduled" => Some(SiteStatus::Scheduled),
            "active" => Some(SiteStatus::Active),
            "completed" => Some(SiteStatus::Completed),
            _ => None,
        }
    }
}

// ============================================================================
// SITE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,

    /// Never empty
    pub name: String,

    /// Contract budget (KRW)
    pub budget: i64,

    /// Client company (건설사 / 거래처)
    pub company_name: Option<String>,

    pub status: SiteStatus,
}

impl Site {
    /// New site with a fresh id. Fails on a blank name.
    pub fn new(name: &str, budget: i64, company_name: Option<String>, status: SiteStatus) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Import("site name must not be empty".to_string()));
        }

        Ok(Site {
            id: new_id(),
            name: name.to_string(),
            budget,
            company_name: company_name.and_then(non_empty),
            status,
        })
    }

    /// Site synthesized from a name seen in an import: active, no budget
    pub fn placeholder(name: &str, company_name: Option<String>) -> Result<Self> {
        Site::new(name, 0, company_name, SiteStatus::Active)
    }

    pub fn company_or_dash(&self) -> &str {
        self.company_name.as_deref().unwrap_or("-")
    }
}

impl Entity for Site {
    const TABLE: Table = Table::Sites;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), json!(self.id));
        row.insert("name".into(), json!(self.name));
        row.insert("budget".into(), json!(self.budget));
        row.insert("company_name".into(), nullable(&self.company_name));
        row.insert("status".into(), json!(self.status.as_str()));
        row
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Site {
            id: row_id(row, Table::Sites)?,
            name: row_str(row, "name").unwrap_or_default(),
            budget: row_i64(row, "budget").unwrap_or(0),
            company_name: row_str(row, "company_name").and_then(non_empty),
            status: row_str(row, "status")
                .and_then(|s| SiteStatus::parse(&s))
                .unwrap_or(SiteStatus::Active),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_rejected() {
        assert!(Site::new("  ", 0, None, SiteStatus::Active).is_err());
    }

    #[test]
    fn test_placeholder_defaults() {
        let site = Site::placeholder(" 용인 둔전 ", Some(String::new())).unwrap();

        assert_eq!(site.name, "용인 둔전");
        assert_eq!(site.budget, 0);
        assert_eq!(site.status, SiteStatus::Active);
        assert_eq!(site.company_name, None);
        assert!(!site.id.is_empty());
    }

    #[test]
    fn test_row_defaults_when_columns_missing() {
        let row = json!({"id": "s1", "name": "동탄 파크릭스", "budget": null})
            .as_object()
            .cloned()
            .unwrap();
        let site = Site::from_row(&row).unwrap();

        assert_eq!(site.budget, 0);
        assert_eq!(site.status, SiteStatus::Active);
        assert_eq!(site.company_name, None);
    }

    #[test]
    fn test_empty_company_written_as_null() {
        let site = Site::new("창원 마크로엔", 90_000_000, None, SiteStatus::Scheduled).unwrap();
        let row = site.to_row();

        assert_eq!(row["company_name"], serde_json::Value::Null);
        assert_eq!(row["status"], json!("scheduled"));
        assert_eq!(Site::from_row(&row).unwrap(), site);
    }
}
