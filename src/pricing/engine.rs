//! Household price computation
//!
//! Annual household consumption is estimated from floor area and occupants with
//! fixed per-unit coefficients, then priced at the base rate plus a regional
//! demand surcharge scaled by municipal growth, plus the yearly contract fee.

use serde::Deserialize;

use super::PricingError;
use crate::domain::{Household, PriceQuote};

pub const HEATING_PER_M2: f64 = 110.0;
pub const HOT_WATER_PER_OCCUPANT: f64 = 800.0;
pub const COOKING_PER_OCCUPANT: f64 = 200.0;
pub const APPLIANCES_FLAT: f64 = 1100.0;

/// Upper bound of the demand-sensitivity coefficient
pub const DEMAND_CAP: f64 = 0.05;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Tariff {
    pub base_rate: f64,
    pub fixed_monthly_fee: f64,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            base_rate: 0.1558,
            fixed_monthly_fee: 6.0,
        }
    }
}

impl Tariff {
    pub fn yearly_fee(&self) -> f64 {
        12.0 * self.fixed_monthly_fee
    }
}

/// Breakdown of the yearly household estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumptionEstimate {
    pub heating: f64,
    pub hot_water: f64,
    pub cooking: f64,
    pub appliances: f64,
}

impl ConsumptionEstimate {
    pub fn for_household(household: &Household) -> Self {
        let occupants = f64::from(household.occupants);
        Self {
            heating: HEATING_PER_M2 * household.floor_area_m2,
            hot_water: HOT_WATER_PER_OCCUPANT * occupants,
            cooking: COOKING_PER_OCCUPANT * occupants,
            appliances: APPLIANCES_FLAT,
        }
    }

    pub fn total(&self) -> f64 {
        self.heating + self.hot_water + self.cooking + self.appliances
    }
}

/// `M`: regional load sensitivity, capped at [`DEMAND_CAP`]
pub fn demand_coefficient(regional_load_mean: f64) -> f64 {
    (0.01 * regional_load_mean / 4000.0).min(DEMAND_CAP)
}

/// Rounded yearly price. Ties round to even. Inputs that overflow `f64` are
/// rejected rather than quoted.
pub fn price(
    household: &Household,
    alpha: f64,
    regional_load_mean: f64,
    tariff: &Tariff,
) -> Result<PriceQuote, PricingError> {
    let total = ConsumptionEstimate::for_household(household).total();
    let m = demand_coefficient(regional_load_mean);
    let raw = (tariff.base_rate + alpha * m) * total + tariff.yearly_fee();
    if !raw.is_finite() {
        return Err(PricingError::NonFinitePrice);
    }
    Ok(PriceQuote {
        price: raw.round_ties_even(),
    })
}
