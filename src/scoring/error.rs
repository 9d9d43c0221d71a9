use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("{pass}.{field} must be within [0, 1], got {value}")]
    OutOfRange {
        pass: &'static str,
        field: &'static str,
        value: f32,
    },

    #[error("{pass} weights sum to {sum}, which exceeds 1")]
    WeightSumExceeded { pass: &'static str, sum: f32 },

    #[error("{pass}.price_tolerance must be within [0, 1), got {value}")]
    InvalidPriceTolerance { pass: &'static str, value: f64 },

    #[error("{pass}.brand_match_bonus must be finite and non-negative, got {value}")]
    InvalidBonus { pass: &'static str, value: f32 },

    #[error("hard pass category_weight must be 0 (category is already equal), got {value}")]
    HardCategoryWeight { value: f32 },

    #[error("fallback pass cannot require a brand match while excluding equal brands")]
    FallbackRequiresBrand,

    #[error("fallback pass must exclude equal brands")]
    FallbackAllowsEqualBrands,

    #[error("top_k must be positive")]
    ZeroTopK,
}
