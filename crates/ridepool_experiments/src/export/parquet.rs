use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use super::ScheduleLeg;

pub(crate) fn export_schedule_impl(
    legs: &[ScheduleLeg],
    file: std::fs::File,
) -> Result<(), Box<dyn std::error::Error>> {
    let batch = build_record_batch(legs)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

fn build_record_batch(legs: &[ScheduleLeg]) -> Result<RecordBatch, arrow::error::ArrowError> {
    let schema = Arc::new(parquet_schema());
    let arrays = build_arrays(legs);

    RecordBatch::try_new(schema, arrays)
}

fn parquet_schema() -> Schema {
    Schema::new(vec![
        Field::new("vehicle_id", DataType::UInt32, false),
        Field::new("stop_index", DataType::UInt64, false),
        Field::new("request_id", DataType::UInt64, false),
        Field::new("role", DataType::Utf8, false),
        Field::new("lat", DataType::Float64, false),
        Field::new("lng", DataType::Float64, false),
        Field::new("scheduled_ms", DataType::UInt64, false),
        Field::new("distance_km", DataType::Float64, false),
        Field::new("passengers", DataType::UInt32, false),
        Field::new("occupancy", DataType::UInt32, false),
    ])
}

fn build_arrays(legs: &[ScheduleLeg]) -> Vec<ArrayRef> {
    vec![
        Arc::new(UInt32Array::from(
            legs.iter().map(|leg| leg.vehicle_id.0).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            legs.iter()
                .map(|leg| leg.stop_index as u64)
                .collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            legs.iter().map(|leg| leg.request_id.0).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            legs.iter()
                .map(|leg| leg.role.to_string())
                .collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            legs.iter().map(|leg| leg.to.lat).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            legs.iter().map(|leg| leg.to.lng).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            legs.iter().map(|leg| leg.scheduled_ms).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            legs.iter().map(|leg| leg.distance_km).collect::<Vec<_>>(),
        )),
        Arc::new(UInt32Array::from(
            legs.iter().map(|leg| leg.passengers).collect::<Vec<_>>(),
        )),
        Arc::new(UInt32Array::from(
            legs.iter().map(|leg| leg.occupancy).collect::<Vec<_>>(),
        )),
    ]
}
