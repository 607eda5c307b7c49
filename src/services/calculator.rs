// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Emission factor tables and the activity → tCO2e calculator.
//!
//! Every function here is pure. Factors are kgCO2e per activity unit;
//! results are metric tons CO2e.

use serde::Serialize;

use crate::models::calculation::{
    ElectricityInputs, ElectricitySource, FuelType, ShippingInputs, ShippingMode,
    SupplyCategory, SupplyChainInputs, VehicleClass, VehicleInputs,
};
use crate::models::CalculationInputs;

const KG_PER_TONNE: f64 = 1000.0;

/// Grid intensity used for electric vehicles (kg/kWh).
pub const GRID_FACTOR: f64 = 0.475;

/// kgCO2e per kWh.
pub fn electricity_factor(source: ElectricitySource) -> f64 {
    match source {
        ElectricitySource::Grid => GRID_FACTOR,
        ElectricitySource::Solar => 0.041,
        ElectricitySource::Wind => 0.011,
        ElectricitySource::Hybrid => 0.243,
    }
}

/// kgCO2 per litre (CNG is per kg, treated as a litre equivalent).
/// Electric uses the grid factor per kWh.
pub fn fuel_factor(fuel: FuelType) -> f64 {
    match fuel {
        FuelType::Petrol => 2.31,
        FuelType::Diesel => 2.68,
        FuelType::Hybrid => 1.5,
        FuelType::Lpg => 1.51,
        FuelType::Cng => 2.75,
        FuelType::Electric => GRID_FACTOR,
    }
}

/// kgCO2e per ton-km.
pub fn shipping_factor(mode: ShippingMode) -> f64 {
    match mode {
        ShippingMode::Road => 0.062,
        ShippingMode::Rail => 0.022,
        ShippingMode::Sea => 0.008,
        ShippingMode::Air => 0.602,
    }
}

/// kgCO2e per USD spent.
pub fn supply_chain_factor(category: SupplyCategory) -> f64 {
    match category {
        SupplyCategory::Manufacturing => 0.45,
        SupplyCategory::Services => 0.08,
        SupplyCategory::Materials => 0.95,
    }
}

/// Suggested efficiency for pre-filling the UI (L/100km, kWh/100km for
/// electric). Never used to override what the user entered.
pub fn vehicle_default_efficiency(class: VehicleClass, fuel: FuelType) -> Option<f64> {
    use FuelType::*;
    use VehicleClass::*;

    let value = match (class, fuel) {
        (Bike, Petrol) => 3.5,
        (Bike, Hybrid) => 2.5,
        (Bike, Electric) => 5.0,
        (Bike, Diesel | Lpg | Cng) => return None,

        (Car, Petrol) => 7.5,
        (Car, Diesel) => 6.0,
        (Car, Hybrid) => 4.5,
        (Car, Electric) => 17.0,
        (Car, Lpg) => 9.5,
        (Car, Cng) => 5.5,

        (Suv, Petrol) => 10.5,
        (Suv, Diesel) => 8.5,
        (Suv, Hybrid) => 6.5,
        (Suv, Electric) => 22.0,
        (Suv, Lpg) => 13.0,
        (Suv, Cng) => 7.5,

        (Van, Petrol) => 11.5,
        (Van, Diesel) => 9.0,
        (Van, Hybrid) => 7.5,
        (Van, Electric) => 27.0,
        (Van, Lpg) => 14.0,
        (Van, Cng) => 8.5,

        (Truck, Diesel) => 30.0,
        (Truck, Electric) => 120.0,
        (Truck, Cng) => 28.0,
        (Truck, Hybrid) => 24.0,
        (Truck, Petrol | Lpg) => return None,
    };
    Some(value)
}

/// Rejected calculator input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("inputs are too large to produce a finite result")]
    Overflow,
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, CalcError> {
    if !value.is_finite() {
        return Err(CalcError::NotFinite { field });
    }
    if value < 0.0 {
        return Err(CalcError::Negative { field, value });
    }
    Ok(value)
}

/// Convert one activity into metric tons CO2e.
pub fn calculate(inputs: &CalculationInputs) -> Result<f64, CalcError> {
    let emissions = match inputs {
        CalculationInputs::Electricity(i) => electricity(i),
        CalculationInputs::Vehicle(i) => vehicle(i),
        CalculationInputs::Shipping(i) => shipping(i),
        CalculationInputs::SupplyChain(i) => supply_chain(i),
    }?;

    // Finite inputs can still multiply out to infinity
    if !emissions.is_finite() {
        return Err(CalcError::Overflow);
    }
    Ok(emissions)
}

fn electricity(inputs: &ElectricityInputs) -> Result<f64, CalcError> {
    let kwh = non_negative("kwh", inputs.kwh)?;
    Ok(kwh * electricity_factor(inputs.source) / KG_PER_TONNE)
}

fn vehicle(inputs: &VehicleInputs) -> Result<f64, CalcError> {
    let distance = non_negative("distance_km", inputs.distance_km)?;
    let efficiency = non_negative("efficiency", inputs.efficiency)?;
    Ok((distance / 100.0) * efficiency * fuel_factor(inputs.fuel) / KG_PER_TONNE)
}

fn shipping(inputs: &ShippingInputs) -> Result<f64, CalcError> {
    let distance = non_negative("distance_km", inputs.distance_km)?;
    let weight = non_negative("weight_tons", inputs.weight_tons)?;
    let frequency = non_negative("frequency_per_month", inputs.frequency_per_month)?;
    Ok(distance * weight * shipping_factor(inputs.mode) * frequency / KG_PER_TONNE)
}

fn supply_chain(inputs: &SupplyChainInputs) -> Result<f64, CalcError> {
    let spend = non_negative("spend_usd", inputs.spend_usd)?;
    Ok(spend * supply_chain_factor(inputs.category) / KG_PER_TONNE)
}

// ─── Published Tables ───────────────────────────────────────

/// One row of a published factor table.
#[derive(Debug, Clone, Serialize)]
pub struct FactorEntry {
    pub key: &'static str,
    pub factor: f64,
    pub unit: &'static str,
}

/// Suggested efficiency for one (class, fuel) pair.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleDefault {
    pub vehicle_class: VehicleClass,
    pub fuel: FuelType,
    pub efficiency: f64,
}

/// All factor tables, for display.
#[derive(Debug, Clone, Serialize)]
pub struct FactorTables {
    pub electricity: Vec<FactorEntry>,
    pub fuel: Vec<FactorEntry>,
    pub shipping: Vec<FactorEntry>,
    pub supply_chain: Vec<FactorEntry>,
    pub vehicle_defaults: Vec<VehicleDefault>,
}

pub fn factor_tables() -> FactorTables {
    fn entry(key: &'static str, factor: f64, unit: &'static str) -> FactorEntry {
        FactorEntry { key, factor, unit }
    }

    let electricity = [
        ("grid", ElectricitySource::Grid),
        ("solar", ElectricitySource::Solar),
        ("wind", ElectricitySource::Wind),
        ("hybrid", ElectricitySource::Hybrid),
    ]
    .into_iter()
    .map(|(key, s)| entry(key, electricity_factor(s), "kgCO2e/kWh"))
    .collect();

    let fuel = [
        ("petrol", FuelType::Petrol, "kgCO2/L"),
        ("diesel", FuelType::Diesel, "kgCO2/L"),
        ("hybrid", FuelType::Hybrid, "kgCO2/L"),
        ("lpg", FuelType::Lpg, "kgCO2/L"),
        ("cng", FuelType::Cng, "kgCO2/kg"),
        ("electric", FuelType::Electric, "kgCO2e/kWh"),
    ]
    .into_iter()
    .map(|(key, f, unit)| entry(key, fuel_factor(f), unit))
    .collect();

    let shipping = [
        ("road", ShippingMode::Road),
        ("rail", ShippingMode::Rail),
        ("sea", ShippingMode::Sea),
        ("air", ShippingMode::Air),
    ]
    .into_iter()
    .map(|(key, m)| entry(key, shipping_factor(m), "kgCO2e/ton-km"))
    .collect();

    let supply_chain = [
        ("manufacturing", SupplyCategory::Manufacturing),
        ("services", SupplyCategory::Services),
        ("materials", SupplyCategory::Materials),
    ]
    .into_iter()
    .map(|(key, c)| entry(key, supply_chain_factor(c), "kgCO2e/USD"))
    .collect();

    let classes = [
        VehicleClass::Bike,
        VehicleClass::Car,
        VehicleClass::Suv,
        VehicleClass::Van,
        VehicleClass::Truck,
    ];
    let vehicle_defaults = classes
        .into_iter()
        .flat_map(|class| {
            FuelType::ALL.into_iter().filter_map(move |fuel| {
                vehicle_default_efficiency(class, fuel).map(|efficiency| VehicleDefault {
                    vehicle_class: class,
                    fuel,
                    efficiency,
                })
            })
        })
        .collect();

    FactorTables {
        electricity,
        fuel,
        shipping,
        supply_chain,
        vehicle_defaults,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn electricity_inputs(kwh: f64, source: ElectricitySource) -> CalculationInputs {
        CalculationInputs::Electricity(ElectricityInputs { kwh, source })
    }

    fn vehicle_inputs(fuel: FuelType, efficiency: f64, distance_km: f64) -> CalculationInputs {
        CalculationInputs::Vehicle(VehicleInputs {
            vehicle_class: VehicleClass::Car,
            fuel,
            efficiency,
            distance_km,
        })
    }

    #[test]
    fn test_electricity_grid_scenario() {
        let result = calculate(&electricity_inputs(5000.0, ElectricitySource::Grid)).unwrap();
        assert!((result - 2.375).abs() < EPSILON);
    }

    #[test]
    fn test_electricity_is_monotonic_in_kwh() {
        for source in [
            ElectricitySource::Grid,
            ElectricitySource::Solar,
            ElectricitySource::Wind,
            ElectricitySource::Hybrid,
        ] {
            let mut previous = -1.0;
            for kwh in [0.0, 1.0, 10.0, 250.5, 5000.0, 1e6] {
                let result = calculate(&electricity_inputs(kwh, source)).unwrap();
                assert!((result - kwh * electricity_factor(source) / 1000.0).abs() < EPSILON);
                assert!(result > previous);
                previous = result;
            }
        }
    }

    #[test]
    fn test_vehicle_petrol_scenario() {
        let result = calculate(&vehicle_inputs(FuelType::Petrol, 8.5, 15000.0)).unwrap();
        assert!((result - 2.94525).abs() < EPSILON);
    }

    #[test]
    fn test_switching_to_electric_lowers_emissions() {
        for fuel in [
            FuelType::Petrol,
            FuelType::Diesel,
            FuelType::Hybrid,
            FuelType::Lpg,
            FuelType::Cng,
        ] {
            assert!(GRID_FACTOR < fuel_factor(fuel));
            let ice = calculate(&vehicle_inputs(fuel, 8.0, 1200.0)).unwrap();
            let ev = calculate(&vehicle_inputs(FuelType::Electric, 8.0, 1200.0)).unwrap();
            assert!(ev < ice, "{:?}: {} !< {}", fuel, ev, ice);
        }
    }

    #[test]
    fn test_shipping_air_scenario() {
        let inputs = CalculationInputs::Shipping(ShippingInputs {
            distance_km: 500.0,
            weight_tons: 2.5,
            mode: ShippingMode::Air,
            frequency_per_month: 1.0,
        });
        assert!((calculate(&inputs).unwrap() - 0.7525).abs() < EPSILON);
    }

    #[test]
    fn test_supply_chain_materials() {
        let inputs = CalculationInputs::SupplyChain(SupplyChainInputs {
            spend_usd: 10_000.0,
            category: SupplyCategory::Materials,
        });
        assert!((calculate(&inputs).unwrap() - 9.5).abs() < EPSILON);
    }

    #[test]
    fn test_negative_inputs_are_rejected() {
        let err = calculate(&electricity_inputs(-1.0, ElectricitySource::Solar)).unwrap_err();
        assert_eq!(
            err,
            CalcError::Negative {
                field: "kwh",
                value: -1.0
            }
        );

        let err = calculate(&vehicle_inputs(FuelType::Diesel, -6.0, 100.0)).unwrap_err();
        assert!(matches!(err, CalcError::Negative { field: "efficiency", .. }));

        let inputs = CalculationInputs::Shipping(ShippingInputs {
            distance_km: 10.0,
            weight_tons: 1.0,
            mode: ShippingMode::Sea,
            frequency_per_month: -2.0,
        });
        assert!(matches!(
            calculate(&inputs),
            Err(CalcError::Negative {
                field: "frequency_per_month",
                ..
            })
        ));
    }

    #[test]
    fn test_non_finite_inputs_are_rejected() {
        let err = calculate(&electricity_inputs(f64::NAN, ElectricitySource::Grid)).unwrap_err();
        assert_eq!(err, CalcError::NotFinite { field: "kwh" });
    }

    #[test]
    fn test_overflowing_product_is_rejected() {
        let inputs = CalculationInputs::Shipping(ShippingInputs {
            distance_km: 1e200,
            weight_tons: 1e200,
            mode: ShippingMode::Road,
            frequency_per_month: 1.0,
        });
        assert_eq!(calculate(&inputs), Err(CalcError::Overflow));

        let err = calculate(&vehicle_inputs(FuelType::Cng, f64::MAX, f64::MAX)).unwrap_err();
        assert_eq!(err, CalcError::Overflow);

        // Large but representable results are still accepted
        let result = calculate(&electricity_inputs(1e300, ElectricitySource::Grid)).unwrap();
        assert!(result.is_finite());
    }

    #[test]
    fn test_vehicle_defaults() {
        assert_eq!(
            vehicle_default_efficiency(VehicleClass::Car, FuelType::Petrol),
            Some(7.5)
        );
        assert_eq!(
            vehicle_default_efficiency(VehicleClass::Bike, FuelType::Cng),
            None
        );

        let tables = factor_tables();
        assert_eq!(tables.electricity.len(), 4);
        assert!(tables
            .vehicle_defaults
            .iter()
            .all(|d| d.efficiency > 0.0));
    }
}
