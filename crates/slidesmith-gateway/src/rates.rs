use std::collections::HashMap;

/// Posted per-million-token pricing for one model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateCard {
    pub input_per_mtok_usd: f64,
    pub output_per_mtok_usd: f64,
}

/// Pricing table keyed by full `provider/model` identifier.
///
/// Unknown models fall back to a conservative default card rather than
/// pricing at zero; cost must stay monotone non-negative even for models
/// added to a chain before the table learns about them.
#[derive(Debug, Clone)]
pub struct RateTable {
    cards: HashMap<String, RateCard>,
    fallback: RateCard,
}

impl RateTable {
    pub fn new(fallback: RateCard) -> Self {
        Self {
            cards: HashMap::new(),
            fallback,
        }
    }

    pub fn with_card(mut self, model_id: impl Into<String>, card: RateCard) -> Self {
        self.cards.insert(model_id.into(), card);
        self
    }

    pub fn card(&self, model_id: &str) -> RateCard {
        self.cards.get(model_id).copied().unwrap_or(self.fallback)
    }

    pub fn cost_usd(&self, model_id: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        let card = self.card(model_id);
        let cost = input_tokens as f64 / 1_000_000.0 * card.input_per_mtok_usd
            + output_tokens as f64 / 1_000_000.0 * card.output_per_mtok_usd;
        cost.max(0.0)
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::new(RateCard {
            input_per_mtok_usd: 5.0,
            output_per_mtok_usd: 15.0,
        })
        .with_card(
            "openai/gpt-4o-mini",
            RateCard {
                input_per_mtok_usd: 0.15,
                output_per_mtok_usd: 0.60,
            },
        )
        .with_card(
            "openai/gpt-4o",
            RateCard {
                input_per_mtok_usd: 2.50,
                output_per_mtok_usd: 10.0,
            },
        )
        .with_card(
            "anthropic/claude-3-5-haiku",
            RateCard {
                input_per_mtok_usd: 0.80,
                output_per_mtok_usd: 4.0,
            },
        )
        .with_card(
            "anthropic/claude-sonnet-4",
            RateCard {
                input_per_mtok_usd: 3.0,
                output_per_mtok_usd: 15.0,
            },
        )
        .with_card(
            "anthropic/claude-opus-4",
            RateCard {
                input_per_mtok_usd: 15.0,
                output_per_mtok_usd: 75.0,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_uses_the_model_card() {
        let rates = RateTable::default();
        let cost = rates.cost_usd("openai/gpt-4o", 1_000_000, 100_000);
        assert!((cost - (2.50 + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn unknown_models_price_at_the_fallback_card() {
        let rates = RateTable::default();
        let cost = rates.cost_usd("acme/brand-new", 1_000_000, 0);
        assert!((cost - 5.0).abs() < 1e-9);
    }

    #[test]
    fn cost_is_never_negative() {
        let rates = RateTable::default();
        assert_eq!(rates.cost_usd("openai/gpt-4o", 0, 0), 0.0);
    }
}
