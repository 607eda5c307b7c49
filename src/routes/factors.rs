// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only emission factor tables.

use crate::error::{AppError, Result};
use crate::extract::ApiQuery;
use crate::models::calculation::{FuelType, VehicleClass};
use crate::services::calculator::{self, FactorTables};
use crate::AppState;
use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/factors", get(get_factors))
        .route("/api/factors/vehicle-default", get(get_vehicle_default))
}

async fn get_factors() -> Json<FactorTables> {
    Json(calculator::factor_tables())
}

#[derive(Deserialize)]
struct VehicleDefaultQuery {
    vehicle_class: String,
    fuel: String,
}

#[derive(Serialize)]
pub struct VehicleDefaultResponse {
    pub vehicle_class: VehicleClass,
    pub fuel: FuelType,
    /// L/100km, or kWh/100km for electric
    pub efficiency: f64,
}

/// Suggested efficiency to pre-fill the vehicle form.
async fn get_vehicle_default(
    ApiQuery(params): ApiQuery<VehicleDefaultQuery>,
) -> Result<Json<VehicleDefaultResponse>> {
    let vehicle_class: VehicleClass = params.vehicle_class.parse()?;
    let fuel: FuelType = params.fuel.parse()?;

    let efficiency = calculator::vehicle_default_efficiency(vehicle_class, fuel).ok_or_else(|| {
        AppError::NotFound(format!(
            "No default efficiency for {} with {} fuel",
            params.vehicle_class, params.fuel
        ))
    })?;

    Ok(Json(VehicleDefaultResponse {
        vehicle_class,
        fuel,
        efficiency,
    }))
}
