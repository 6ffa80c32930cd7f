use serde::{Deserialize, Serialize};
use std::fmt;

/// Category a canonical ratio belongs to. Unknown keys map to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RatioCategory {
    Liquidity,
    Activity,
    Leverage,
    Profitability,
    Other,
}

impl fmt::Display for RatioCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RatioCategory::Liquidity => "Liquidity",
            RatioCategory::Activity => "Activity",
            RatioCategory::Leverage => "Leverage",
            RatioCategory::Profitability => "Profitability",
            RatioCategory::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

/// Static definition of a canonical financial ratio.
#[derive(Debug, Clone, Copy)]
pub struct RatioDefinition {
    pub key: &'static str,
    pub display_name: &'static str,
    pub formula: &'static str,
    pub category: RatioCategory,
    /// Smaller values are favorable (leverage, days of inventory).
    pub lower_is_better: bool,
}

/// The 10 canonical ratios, in presentation order.
static CANONICAL_RATIOS: [RatioDefinition; 10] = [
    RatioDefinition {
        key: "current_ratio",
        display_name: "Current Ratio",
        formula: "Current assets / Current liabilities",
        category: RatioCategory::Liquidity,
        lower_is_better: false,
    },
    RatioDefinition {
        key: "acid_test",
        display_name: "Acid Test",
        formula: "(Current assets - Inventory) / Current liabilities",
        category: RatioCategory::Liquidity,
        lower_is_better: false,
    },
    RatioDefinition {
        key: "working_capital",
        display_name: "Working Capital",
        formula: "Current assets - Current liabilities",
        category: RatioCategory::Liquidity,
        lower_is_better: false,
    },
    RatioDefinition {
        key: "inventory_turnover",
        display_name: "Inventory Turnover",
        formula: "Cost of goods sold / Average inventory",
        category: RatioCategory::Activity,
        lower_is_better: false,
    },
    RatioDefinition {
        key: "days_inventory",
        display_name: "Days of Inventory",
        formula: "365 / Inventory turnover",
        category: RatioCategory::Activity,
        lower_is_better: true,
    },
    RatioDefinition {
        key: "asset_turnover",
        display_name: "Asset Turnover",
        formula: "Net sales / Total assets",
        category: RatioCategory::Activity,
        lower_is_better: false,
    },
    RatioDefinition {
        key: "debt_ratio",
        display_name: "Debt Ratio",
        formula: "Total liabilities / Total assets",
        category: RatioCategory::Leverage,
        lower_is_better: true,
    },
    RatioDefinition {
        key: "debt_to_equity",
        display_name: "Debt to Equity",
        formula: "Total liabilities / Shareholders' equity",
        category: RatioCategory::Leverage,
        lower_is_better: true,
    },
    RatioDefinition {
        key: "roe",
        display_name: "Return on Equity (ROE)",
        formula: "Net income / Shareholders' equity",
        category: RatioCategory::Profitability,
        lower_is_better: false,
    },
    RatioDefinition {
        key: "roa",
        display_name: "Return on Assets (ROA)",
        formula: "Net income / Total assets",
        category: RatioCategory::Profitability,
        lower_is_better: false,
    },
];

/// Immutable registry of the canonical ratio definitions.
///
/// Injected into every comparison engine so display names, formulas,
/// categories and polarity flags come from a single table.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatioCatalog;

impl RatioCatalog {
    pub fn new() -> Self {
        Self
    }

    /// Look up the definition for a ratio key, if it is canonical.
    pub fn definition(&self, key: &str) -> Option<&'static RatioDefinition> {
        CANONICAL_RATIOS.iter().find(|d| d.key == key)
    }

    /// Category of a key; `Other` when the key is not canonical.
    pub fn category(&self, key: &str) -> RatioCategory {
        self.definition(key)
            .map(|d| d.category)
            .unwrap_or(RatioCategory::Other)
    }

    /// Polarity of a key; unknown keys default to higher-is-better.
    pub fn lower_is_better(&self, key: &str) -> bool {
        self.definition(key).map(|d| d.lower_is_better).unwrap_or(false)
    }

    /// Canonical keys in presentation order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        CANONICAL_RATIOS.iter().map(|d| d.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_ten_canonical_keys() {
        let catalog = RatioCatalog::new();
        assert_eq!(catalog.keys().count(), 10);
    }

    #[test]
    fn leverage_ratios_are_lower_is_better() {
        let catalog = RatioCatalog::new();
        assert!(catalog.lower_is_better("debt_ratio"));
        assert!(catalog.lower_is_better("debt_to_equity"));
        assert!(catalog.lower_is_better("days_inventory"));
        assert!(!catalog.lower_is_better("roe"));
        assert!(!catalog.lower_is_better("current_ratio"));
    }

    #[test]
    fn unknown_key_categorizes_as_other() {
        let catalog = RatioCatalog::new();
        assert_eq!(catalog.category("ebitda_margin"), RatioCategory::Other);
        assert!(catalog.definition("ebitda_margin").is_none());
    }

    #[test]
    fn known_key_resolves_definition() {
        let catalog = RatioCatalog::new();
        let def = catalog.definition("roe").unwrap();
        assert_eq!(def.display_name, "Return on Equity (ROE)");
        assert_eq!(def.category, RatioCategory::Profitability);
    }
}
