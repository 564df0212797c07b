use chrono::NaiveDate;
use thiserror::Error;

use crate::store::StoreError;

/// Reasons a price cannot be produced. None of them is defaulted away.
#[derive(Debug, Error)]
pub enum PricingError {
    #[error("insufficient data: no defined consumption forecast for year {year}")]
    UndefinedForecast { year: i32 },

    #[error("insufficient data: growth undefined, consumption for year {year} is zero")]
    UndefinedGrowth { year: i32 },

    #[error("insufficient data: no consumption recorded for region '{region}' between {from} and {to}")]
    EmptyLoadWindow {
        region: String,
        from: NaiveDate,
        to: NaiveDate,
    },

    #[error("price overflows for the given household")]
    NonFinitePrice,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PricingError {
    pub fn is_insufficient_data(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::NonFinitePrice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_family() {
        assert!(PricingError::UndefinedForecast { year: 2026 }.is_insufficient_data());
        assert!(PricingError::UndefinedGrowth { year: 2026 }.is_insufficient_data());
        assert!(!PricingError::Store(StoreError::Backend("down".into())).is_insufficient_data());
        assert!(!PricingError::NonFinitePrice.is_insufficient_data());
    }

    #[test]
    fn test_messages_name_the_missing_piece() {
        let err = PricingError::EmptyLoadWindow {
            region: "Normandie".into(),
            from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "insufficient data: no consumption recorded for region 'Normandie' between 2024-01-01 and 2024-01-31"
        );
    }
}
