use ridepool_core::Rejection;

use super::ScheduleLeg;
use crate::sweep::SweepResult;

pub(crate) fn export_schedule_impl(
    legs: &[ScheduleLeg],
    file: std::fs::File,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_writer(file);

    wtr.write_record([
        "vehicle_id",
        "vehicle_name",
        "stop_index",
        "from_lat",
        "from_lng",
        "to_lat",
        "to_lng",
        "departure_ms",
        "driving_ms",
        "pause_ms",
        "scheduled_ms",
        "distance_km",
        "role",
        "request_id",
        "passengers",
        "occupancy",
    ])?;

    for leg in legs {
        wtr.write_record([
            &leg.vehicle_id.to_string(),
            &leg.vehicle_name,
            &leg.stop_index.to_string(),
            &leg.from.lat.to_string(),
            &leg.from.lng.to_string(),
            &leg.to.lat.to_string(),
            &leg.to.lng.to_string(),
            &leg.departure_ms.to_string(),
            &leg.driving_ms.to_string(),
            &leg.pause_ms.to_string(),
            &leg.scheduled_ms.to_string(),
            &format!("{:.3}", leg.distance_km),
            &leg.role.to_string(),
            &leg.request_id.to_string(),
            &leg.passengers.to_string(),
            &leg.occupancy.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub(crate) fn export_rejections_impl(
    rejections: &[Rejection],
    file: std::fs::File,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record(["request_id", "reason"])?;
    for rejection in rejections {
        wtr.write_record([rejection.request_id.to_string(), rejection.reason.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub(crate) fn export_sweep_impl(
    results: &[SweepResult],
    scores: &[f64],
    file: std::fs::File,
) -> Result<(), Box<dyn std::error::Error>> {
    if results.len() != scores.len() {
        return Err(format!(
            "Results length ({}) doesn't match scores length ({})",
            results.len(),
            scores.len()
        )
        .into());
    }

    let mut wtr = csv::Writer::from_writer(file);

    wtr.write_record([
        "run_id",
        "delay_weight",
        "pooling_weight",
        "balance_weight",
        "distance_weight",
        "total_requests",
        "committed",
        "rejected",
        "acceptance_rate",
        "pooled_share",
        "avg_pickup_delay_ms",
        "p90_pickup_delay_ms",
        "avg_dropoff_delay_ms",
        "p90_dropoff_delay_ms",
        "total_distance_km",
        "passenger_km",
        "score",
    ])?;

    for (result, score) in results.iter().zip(scores) {
        let weights = &result.point.weights;
        let summary = &result.summary;
        wtr.write_record([
            &result.point.run_id.to_string(),
            &weights.delay.to_string(),
            &weights.pooling.to_string(),
            &weights.balance.to_string(),
            &weights.distance.to_string(),
            &summary.total_requests.to_string(),
            &summary.committed.to_string(),
            &summary.rejected.to_string(),
            &summary.acceptance_rate.to_string(),
            &summary.pooled_share.to_string(),
            &summary.avg_pickup_delay_ms.to_string(),
            &summary.p90_pickup_delay_ms.to_string(),
            &summary.avg_dropoff_delay_ms.to_string(),
            &summary.p90_dropoff_delay_ms.to_string(),
            &summary.total_distance_km.to_string(),
            &summary.passenger_km.to_string(),
            &score.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
