use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, TimestampMicrosecondArray, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::AnalysisError;
use crate::indicators::EnrichedCandle;

/// Columns of the processed-data export. Indicators are nullable; a null is a value
/// that could not be computed yet.
pub fn enriched_schema() -> Schema {
    let price = |name: &str| Field::new(name, DataType::Float64, false);
    let indicator = |name: &str| Field::new(name, DataType::Float64, true);

    Schema::new(vec![
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        price("open"),
        price("high"),
        price("low"),
        price("close"),
        Field::new("volume", DataType::UInt64, false),
        Field::new("open_interest", DataType::Int64, false),
        indicator("daily_return"),
        indicator("volatility"),
        price("body_size"),
        price("upper_shadow"),
        price("lower_shadow"),
        price("price_range"),
        price("mid_price"),
        Field::new("is_green", DataType::Boolean, false),
        indicator("sma_5"),
        indicator("sma_20"),
        indicator("sma_50"),
        indicator("rsi"),
        indicator("bb_middle"),
        indicator("bb_upper"),
        indicator("bb_lower"),
    ])
}

pub fn enriched_to_record_batch(records: &[EnrichedCandle]) -> Result<RecordBatch, AnalysisError> {
    let schema = Arc::new(enriched_schema());

    let values = |f: fn(&EnrichedCandle) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(records.iter().map(f).collect::<Vec<_>>()))
    };
    let optional = |f: fn(&EnrichedCandle) -> Option<f64>| -> ArrayRef {
        Arc::new(Float64Array::from(records.iter().map(f).collect::<Vec<_>>()))
    };

    let timestamps: Vec<i64> = records
        .iter()
        .map(|r| r.candle.timestamp.timestamp_micros())
        .collect();
    let volumes: Vec<u64> = records.iter().map(|r| r.candle.volume).collect();
    let open_interest: Vec<i64> = records.iter().map(|r| r.candle.open_interest).collect();
    let is_green: Vec<bool> = records.iter().map(|r| r.is_green).collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")),
        values(|r| r.candle.open),
        values(|r| r.candle.high),
        values(|r| r.candle.low),
        values(|r| r.candle.close),
        Arc::new(UInt64Array::from(volumes)),
        Arc::new(Int64Array::from(open_interest)),
        optional(|r| r.daily_return),
        optional(|r| r.volatility),
        values(|r| r.body_size),
        values(|r| r.upper_shadow),
        values(|r| r.lower_shadow),
        values(|r| r.price_range),
        values(|r| r.mid_price),
        Arc::new(BooleanArray::from(is_green)),
        optional(|r| r.sma_5),
        optional(|r| r.sma_20),
        optional(|r| r.sma_50),
        optional(|r| r.rsi),
        optional(|r| r.bb_middle),
        optional(|r| r.bb_upper),
        optional(|r| r.bb_lower),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Write the enriched table to a Parquet file, replacing any existing file.
pub fn write_parquet(path: &Path, records: &[EnrichedCandle]) -> Result<(), AnalysisError> {
    let batch = enriched_to_record_batch(records)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}
