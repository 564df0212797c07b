use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body of a `/price` request. Field names follow the public API.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct PricingRequest {
    #[serde(rename = "libelle_region")]
    pub region_name: String,
    #[serde(rename = "nom_commune")]
    pub municipality_name: String,
    #[serde(rename = "code_commune")]
    pub municipality_code: String,
    #[serde(rename = "nb_personne")]
    pub household_occupants: u32,
    #[serde(rename = "nb_m2")]
    #[validate(range(min = 0.0))]
    pub floor_area_m2: f64,
}

impl PricingRequest {
    /// Fields that must all be present in the JSON body
    pub const REQUIRED_FIELDS: [&'static str; 5] = [
        "libelle_region",
        "nom_commune",
        "code_commune",
        "nb_personne",
        "nb_m2",
    ];

    pub fn household(&self) -> Household {
        Household {
            occupants: self.household_occupants,
            floor_area_m2: self.floor_area_m2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Household {
    pub occupants: u32,
    pub floor_area_m2: f64,
}

/// Yearly price in the tariff currency
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub price: f64,
}
