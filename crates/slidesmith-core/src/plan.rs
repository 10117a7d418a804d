use crate::classify::Tier;
use crate::model::request::{OutputFormat, PlanTier};
use serde::{Deserialize, Serialize};

/// Per-plan policy caps. `generations_per_month = -1` disables that cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PlanLimits {
    pub generations_per_month: i64,
    pub max_entities_per_diagram: usize,
    pub allowed_model_tiers: Vec<Tier>,
    pub allowed_output_formats: Vec<OutputFormat>,
    pub artifact_ttl_hours: u64,
}

impl PlanLimits {
    pub fn allows_tier(&self, tier: Tier) -> bool {
        self.allowed_model_tiers.contains(&tier)
    }

    pub fn allows_format(&self, format: OutputFormat) -> bool {
        self.allowed_output_formats.contains(&format)
    }

    pub fn monthly_cap(&self) -> Option<u64> {
        (self.generations_per_month >= 0).then_some(self.generations_per_month as u64)
    }
}

/// The full per-tier policy table. Shipped defaults below; deployments
/// override via the `plan-limits` config option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanCatalog {
    pub free: PlanLimits,
    pub pro: PlanLimits,
    pub business: PlanLimits,
    pub enterprise: PlanLimits,
}

impl PlanCatalog {
    pub fn get(&self, plan: PlanTier) -> &PlanLimits {
        match plan {
            PlanTier::Free => &self.free,
            PlanTier::Pro => &self.pro,
            PlanTier::Business => &self.business,
            PlanTier::Enterprise => &self.enterprise,
        }
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self {
            free: PlanLimits {
                generations_per_month: 10,
                max_entities_per_diagram: 10,
                allowed_model_tiers: vec![Tier::Fast],
                allowed_output_formats: vec![OutputFormat::Svg],
                artifact_ttl_hours: 24,
            },
            pro: PlanLimits {
                generations_per_month: 200,
                max_entities_per_diagram: 12,
                allowed_model_tiers: vec![Tier::Fast, Tier::Standard],
                allowed_output_formats: vec![OutputFormat::Svg, OutputFormat::EditableSlide],
                artifact_ttl_hours: 168,
            },
            business: PlanLimits {
                generations_per_month: 1000,
                max_entities_per_diagram: 15,
                allowed_model_tiers: vec![Tier::Fast, Tier::Standard, Tier::Premium, Tier::Vision],
                allowed_output_formats: vec![
                    OutputFormat::Svg,
                    OutputFormat::EditableSlide,
                    OutputFormat::Raster,
                ],
                artifact_ttl_hours: 720,
            },
            enterprise: PlanLimits {
                generations_per_month: -1,
                max_entities_per_diagram: 15,
                allowed_model_tiers: vec![Tier::Fast, Tier::Standard, Tier::Premium, Tier::Vision],
                allowed_output_formats: vec![
                    OutputFormat::Svg,
                    OutputFormat::EditableSlide,
                    OutputFormat::Raster,
                ],
                artifact_ttl_hours: 720,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_plan_is_fast_and_svg_only() {
        let catalog = PlanCatalog::default();
        let free = catalog.get(PlanTier::Free);
        assert!(free.allows_tier(Tier::Fast));
        assert!(!free.allows_tier(Tier::Premium));
        assert!(free.allows_format(OutputFormat::Svg));
        assert!(!free.allows_format(OutputFormat::EditableSlide));
        assert_eq!(free.monthly_cap(), Some(10));
    }

    #[test]
    fn enterprise_has_no_monthly_cap() {
        let catalog = PlanCatalog::default();
        assert_eq!(catalog.get(PlanTier::Enterprise).monthly_cap(), None);
    }
}
