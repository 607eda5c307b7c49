use carbon_tracker::models::calculation::{
    ElectricityInputs, ElectricitySource, FuelType, ShippingInputs, ShippingMode, VehicleClass,
    VehicleInputs,
};
use carbon_tracker::models::{Calculation, CalculationInputs, TrendBucket};
use carbon_tracker::services::{aggregator, calculator};
use carbon_tracker::time_utils::format_utc_rfc3339;
use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// A year of mixed activity, roughly three records a day.
fn history(count: usize) -> Vec<Calculation> {
    let start = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();

    (0..count)
        .map(|i| {
            let inputs = match i % 3 {
                0 => CalculationInputs::Electricity(ElectricityInputs {
                    kwh: 100.0 + (i % 50) as f64,
                    source: ElectricitySource::Grid,
                }),
                1 => CalculationInputs::Vehicle(VehicleInputs {
                    vehicle_class: VehicleClass::Van,
                    fuel: FuelType::Diesel,
                    efficiency: 9.0,
                    distance_km: 40.0 + (i % 30) as f64,
                }),
                _ => CalculationInputs::Shipping(ShippingInputs {
                    distance_km: 250.0,
                    weight_tons: 1.5,
                    mode: ShippingMode::Road,
                    frequency_per_month: 4.0,
                }),
            };
            let emissions = calculator::calculate(&inputs).expect("valid inputs");
            let created_at = format_utc_rfc3339(start + Duration::hours(8 * i as i64));
            Calculation::new("bench-user", inputs, emissions, &created_at)
        })
        .collect()
}

fn benchmark_aggregation(c: &mut Criterion) {
    let records = history(1000);
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

    let mut group = c.benchmark_group("aggregation");

    group.bench_function("dashboard_summary_1000", |b| {
        b.iter(|| aggregator::dashboard_summary(black_box(&records), &[], now))
    });

    group.bench_function("weekly_trend_one_year", |b| {
        b.iter(|| {
            aggregator::trend(
                black_box(&records),
                TrendBucket::Week,
                now - Duration::days(365),
                now,
            )
        })
    });

    group.bench_function("category_breakdown_1000", |b| {
        b.iter(|| aggregator::category_breakdown(black_box(&records)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_aggregation);
criterion_main!(benches);
