// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Emission calculation records and their typed inputs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of a logged activity. Also the fixed key set for breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Electricity,
    Vehicle,
    Shipping,
    SupplyChain,
}

impl ActivityType {
    pub const ALL: [ActivityType; 4] = [
        ActivityType::Electricity,
        ActivityType::Vehicle,
        ActivityType::Shipping,
        ActivityType::SupplyChain,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Electricity => "electricity",
            ActivityType::Vehicle => "vehicle",
            ActivityType::Shipping => "shipping",
            ActivityType::SupplyChain => "supply_chain",
        }
    }

    /// Human readable label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            ActivityType::Electricity => "Electricity",
            ActivityType::Vehicle => "Vehicles",
            ActivityType::Shipping => "Shipping",
            ActivityType::SupplyChain => "Supply chain",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "electricity" => Ok(ActivityType::Electricity),
            "vehicle" => Ok(ActivityType::Vehicle),
            "shipping" => Ok(ActivityType::Shipping),
            "supply_chain" => Ok(ActivityType::SupplyChain),
            other => Err(UnknownVariant::new("activity type", other)),
        }
    }
}

/// A string that did not match any variant of a closed enum.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ─── Electricity ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectricitySource {
    Grid,
    Solar,
    Wind,
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectricityInputs {
    pub kwh: f64,
    pub source: ElectricitySource,
}

// ─── Vehicle ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Bike,
    Car,
    Suv,
    Van,
    Truck,
}

impl FromStr for VehicleClass {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bike" => Ok(VehicleClass::Bike),
            "car" => Ok(VehicleClass::Car),
            "suv" => Ok(VehicleClass::Suv),
            "van" => Ok(VehicleClass::Van),
            "truck" => Ok(VehicleClass::Truck),
            other => Err(UnknownVariant::new("vehicle class", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Petrol,
    Diesel,
    Hybrid,
    Electric,
    Lpg,
    Cng,
}

impl FuelType {
    pub const ALL: [FuelType; 6] = [
        FuelType::Petrol,
        FuelType::Diesel,
        FuelType::Hybrid,
        FuelType::Electric,
        FuelType::Lpg,
        FuelType::Cng,
    ];
}

impl FromStr for FuelType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "petrol" => Ok(FuelType::Petrol),
            "diesel" => Ok(FuelType::Diesel),
            "hybrid" => Ok(FuelType::Hybrid),
            "electric" => Ok(FuelType::Electric),
            "lpg" => Ok(FuelType::Lpg),
            "cng" => Ok(FuelType::Cng),
            other => Err(UnknownVariant::new("fuel type", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleInputs {
    pub vehicle_class: VehicleClass,
    pub fuel: FuelType,
    /// L/100km, or kWh/100km for electric vehicles
    pub efficiency: f64,
    pub distance_km: f64,
}

// ─── Shipping ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMode {
    Road,
    Rail,
    Sea,
    Air,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingInputs {
    pub distance_km: f64,
    pub weight_tons: f64,
    pub mode: ShippingMode,
    pub frequency_per_month: f64,
}

// ─── Supply Chain ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplyCategory {
    Manufacturing,
    Services,
    Materials,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyChainInputs {
    pub spend_usd: f64,
    pub category: SupplyCategory,
}

/// Type-specific inputs for one activity, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CalculationInputs {
    Electricity(ElectricityInputs),
    Vehicle(VehicleInputs),
    Shipping(ShippingInputs),
    SupplyChain(SupplyChainInputs),
}

impl CalculationInputs {
    pub fn activity_type(&self) -> ActivityType {
        match self {
            CalculationInputs::Electricity(_) => ActivityType::Electricity,
            CalculationInputs::Vehicle(_) => ActivityType::Vehicle,
            CalculationInputs::Shipping(_) => ActivityType::Shipping,
            CalculationInputs::SupplyChain(_) => ActivityType::SupplyChain,
        }
    }
}

/// Stored calculation record in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    /// Document ID (UUID v4)
    pub id: String,
    /// Owner
    pub user_id: String,
    /// Mirrors the `inputs` tag so the store can filter on it
    pub activity_type: ActivityType,
    pub inputs: CalculationInputs,
    /// Metric tons CO2e, full precision
    pub emissions: f64,
    /// RFC3339 UTC, millisecond precision
    pub created_at: String,
    pub updated_at: String,
}

impl Calculation {
    /// Build a new record. `emissions` must come from the calculator.
    pub fn new(user_id: &str, inputs: CalculationInputs, emissions: f64, now: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            activity_type: inputs.activity_type(),
            inputs,
            emissions,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    /// Apply an explicit edit, keeping identity and creation time.
    pub fn apply_edit(&mut self, inputs: CalculationInputs, emissions: f64, now: &str) {
        self.activity_type = inputs.activity_type();
        self.inputs = inputs;
        self.emissions = emissions;
        self.updated_at = now.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_tagged_json() {
        let json = r#"{"type":"electricity","kwh":5000,"source":"grid"}"#;
        let inputs: CalculationInputs = serde_json::from_str(json).unwrap();

        assert_eq!(inputs.activity_type(), ActivityType::Electricity);
        assert_eq!(
            inputs,
            CalculationInputs::Electricity(ElectricityInputs {
                kwh: 5000.0,
                source: ElectricitySource::Grid,
            })
        );
    }

    #[test]
    fn test_unknown_enum_value_is_rejected() {
        let json = r#"{"type":"electricity","kwh":10,"source":"coal"}"#;
        assert!(serde_json::from_str::<CalculationInputs>(json).is_err());

        let json = r#"{"type":"teleport","distance_km":10}"#;
        assert!(serde_json::from_str::<CalculationInputs>(json).is_err());
    }

    #[test]
    fn test_activity_type_from_str() {
        assert_eq!(
            "supply_chain".parse::<ActivityType>(),
            Ok(ActivityType::SupplyChain)
        );
        let err = "gas".parse::<ActivityType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown activity type: 'gas'");
    }

    #[test]
    fn test_apply_edit_keeps_identity() {
        let inputs = CalculationInputs::SupplyChain(SupplyChainInputs {
            spend_usd: 100.0,
            category: SupplyCategory::Services,
        });
        let mut calc = Calculation::new("user-1", inputs, 0.008, "2026-01-01T00:00:00.000Z");
        let id = calc.id.clone();

        let edited = CalculationInputs::Electricity(ElectricityInputs {
            kwh: 10.0,
            source: ElectricitySource::Wind,
        });
        calc.apply_edit(edited, 0.00011, "2026-01-02T00:00:00.000Z");

        assert_eq!(calc.id, id);
        assert_eq!(calc.activity_type, ActivityType::Electricity);
        assert_eq!(calc.created_at, "2026-01-01T00:00:00.000Z");
        assert_eq!(calc.updated_at, "2026-01-02T00:00:00.000Z");
    }
}
