//! Mart plan: an optional allow-list of marts to build
//!
//! Plan documents look like `{"mart_list": ["dim_customer", "fact_sales"]}`.
//! An absent, malformed or empty plan enables every mart.

use super::catalog::MartKind;
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MartPlan {
    allowed: Option<BTreeSet<MartKind>>,
    unknown: Vec<String>,
}

#[derive(Deserialize)]
struct PlanDocument {
    #[serde(default)]
    mart_list: Vec<String>,
}

impl MartPlan {
    /// Plan that enables every mart
    pub fn all() -> Self {
        Self::default()
    }

    /// Plan from mart names. Unknown names are kept aside for reporting;
    /// if no known name remains the plan enables every mart.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed = BTreeSet::new();
        let mut unknown = Vec::new();
        for name in names {
            let name = name.as_ref();
            if name.trim().is_empty() {
                continue;
            }
            match MartKind::from_name(name) {
                Ok(kind) => {
                    allowed.insert(kind);
                }
                Err(_) => unknown.push(name.trim().to_string()),
            }
        }
        Self {
            allowed: if allowed.is_empty() {
                None
            } else {
                Some(allowed)
            },
            unknown,
        }
    }

    /// Parse a JSON plan document, falling back to `all()` when malformed.
    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str::<PlanDocument>(text) {
            Ok(doc) => Self::from_names(doc.mart_list),
            Err(_) => Self::all(),
        }
    }

    pub fn is_enabled(&self, mart: MartKind) -> bool {
        self.allowed
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&mart))
    }

    /// True when no allow-list is in effect
    pub fn is_unrestricted(&self) -> bool {
        self.allowed.is_none()
    }

    /// Names in the enabled set, in catalog order
    pub fn enabled_names(&self) -> Vec<String> {
        MartKind::ALL
            .iter()
            .filter(|m| self.is_enabled(**m))
            .map(|m| m.name().to_string())
            .collect()
    }

    /// Names from the plan that did not match any mart
    pub fn unknown_names(&self) -> &[String] {
        &self.unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_enables_everything() {
        let plan = MartPlan::all();
        assert!(MartKind::ALL.iter().all(|m| plan.is_enabled(*m)));
        assert!(plan.is_unrestricted());
    }

    #[test]
    fn test_plan_restricts_to_listed_marts() {
        let plan = MartPlan::from_json(r#"{"mart_list": ["fact_sales", "dim_customer"]}"#);
        assert!(plan.is_enabled(MartKind::FactSales));
        assert!(plan.is_enabled(MartKind::DimCustomer));
        assert!(!plan.is_enabled(MartKind::DimProduct));
        assert_eq!(plan.enabled_names(), vec!["dim_customer", "fact_sales"]);
    }

    #[test]
    fn test_malformed_or_empty_plan_enables_everything() {
        for text in ["not json", r#"{"mart_list": []}"#, "{}", r#"{"mart_list": ["bogus"]}"#] {
            let plan = MartPlan::from_json(text);
            assert!(plan.is_unrestricted(), "plan {:?} should be unrestricted", text);
        }
    }

    #[test]
    fn test_unknown_names_are_reported() {
        let plan = MartPlan::from_names(["fact_sales", "kpi_totals"]);
        assert_eq!(plan.unknown_names(), &["kpi_totals".to_string()]);
        assert!(!plan.is_unrestricted());
    }
}
