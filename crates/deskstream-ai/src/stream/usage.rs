//! Token usage aggregation

use serde::{Deserialize, Serialize};

use crate::app::AppUsage;

/// Token usage attached to the finishing event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Resolve usage from a frame: direct counts first; when both are zero,
    /// sum the per-model entries agent responses report instead.
    pub fn from_app(usage: &AppUsage) -> Self {
        let mut input_tokens = usage.input_tokens;
        let mut output_tokens = usage.output_tokens;

        if input_tokens == 0 && output_tokens == 0 {
            for model in &usage.models {
                input_tokens += model.input_tokens;
                output_tokens += model.output_tokens;
            }
        }

        Self {
            input_tokens,
            output_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ModelUsage;

    #[test]
    fn direct_counts_take_precedence() {
        let usage = AppUsage {
            input_tokens: 3,
            output_tokens: 5,
            models: vec![ModelUsage {
                input_tokens: 100,
                output_tokens: 100,
            }],
        };
        assert_eq!(
            TokenUsage::from_app(&usage),
            TokenUsage {
                input_tokens: 3,
                output_tokens: 5,
            }
        );
    }

    #[test]
    fn zero_direct_counts_sum_model_entries() {
        let usage = AppUsage {
            input_tokens: 0,
            output_tokens: 0,
            models: vec![
                ModelUsage {
                    input_tokens: 10,
                    output_tokens: 4,
                },
                ModelUsage {
                    input_tokens: 7,
                    output_tokens: 2,
                },
            ],
        };
        assert_eq!(
            TokenUsage::from_app(&usage),
            TokenUsage {
                input_tokens: 17,
                output_tokens: 6,
            }
        );
    }

    #[test]
    fn empty_usage_is_zero() {
        assert_eq!(TokenUsage::from_app(&AppUsage::default()), TokenUsage::default());
    }
}
