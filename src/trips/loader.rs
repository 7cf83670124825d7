use std::{fs::File, path::Path};

use log::{debug, info};
use polars::prelude::*;

use super::record::{DROPOFF, FEATURES, PICKUP, TripRecord};
use crate::error::DataError;

/// Reads the trip dataset from a parquet file.
///
/// # Errors
/// - `DataError::Io` / `DataError::Parquet` if the file cannot be read.
/// - `DataError::MissingColumn` if a timestamp or feature column is absent.
/// - `DataError::InvalidTimestamp` if a timestamp column is not a datetime.
/// - `DataError::InvalidNumeric` if a feature column cannot be cast to `f64`.
pub fn load_trips(path: &Path) -> Result<Vec<TripRecord>, DataError> {
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let df = ParquetReader::new(file).finish()?;
    info!("loaded {} rows from {}", df.height(), path.display());
    trips_from_frame(&df)
}

/// Extracts trip records from an in-memory frame.
pub fn trips_from_frame(df: &DataFrame) -> Result<Vec<TripRecord>, DataError> {
    for name in [PICKUP, DROPOFF].into_iter().chain(FEATURES) {
        if df.get_column_index(name).is_none() {
            return Err(DataError::MissingColumn(name.to_string()));
        }
    }

    let pickup = timestamps(df, PICKUP)?;
    let dropoff = timestamps(df, DROPOFF)?;
    let [pu, dol, distance, passengers, fare, total] = FEATURES.map(|name| floats(df, name));
    let (pu, dol, distance) = (pu?, dol?, distance?);
    let (passengers, fare, total) = (passengers?, fare?, total?);

    let records = (0..df.height())
        .map(|i| TripRecord {
            pickup_us: pickup[i],
            dropoff_us: dropoff[i],
            pu_location_id: pu[i],
            do_location_id: dol[i],
            trip_distance: distance[i],
            passenger_count: passengers[i],
            fare_amount: fare[i],
            total_amount: total[i],
        })
        .collect();

    Ok(records)
}

fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series, DataError> {
    df.column(name)
        .map(Column::as_materialized_series)
        .map_err(|_| DataError::MissingColumn(name.to_string()))
}

/// Reads a datetime column of any unit as microseconds since the epoch.
///
/// A value that does not fit in microseconds fails the whole column.
fn timestamps(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>, DataError> {
    let s = series(df, name)?;
    let invalid = || DataError::InvalidTimestamp(name.to_string());

    let DataType::Datetime(unit, _) = s.dtype() else {
        debug!("column {name} has dtype {:?}", s.dtype());
        return Err(invalid());
    };
    let unit = *unit;

    let raw = s.cast(&DataType::Int64).map_err(|_| invalid())?;
    if raw.null_count() != s.null_count() {
        return Err(invalid());
    }

    raw.i64()
        .map_err(|_| invalid())?
        .into_iter()
        .map(|value| match value {
            Some(v) => to_micros(v, unit).map(Some).ok_or_else(invalid),
            None => Ok(None),
        })
        .collect()
}

/// Converts a timestamp in `unit` to microseconds, `None` on overflow.
fn to_micros(value: i64, unit: TimeUnit) -> Option<i64> {
    match unit {
        TimeUnit::Nanoseconds => Some(value.div_euclid(1_000)),
        TimeUnit::Microseconds => Some(value),
        TimeUnit::Milliseconds => value.checked_mul(1_000),
    }
}

/// Reads a numeric column of any integer or float type as `f64`.
fn floats(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, DataError> {
    let numeric = |source| DataError::InvalidNumeric {
        column: name.to_string(),
        source,
    };

    let cast = series(df, name)?
        .strict_cast(&DataType::Float64)
        .map_err(numeric)?;
    let values = cast.f64().map_err(numeric)?;
    Ok(values.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2021-09-01T10:00:00Z in milliseconds.
    const TEN_AM_MS: i64 = 1_630_490_400_000;

    fn datetime(name: &str, values: &[Option<i64>], unit: TimeUnit) -> Column {
        Series::new(name.into(), values)
            .cast(&DataType::Datetime(unit, None))
            .unwrap()
            .into()
    }

    fn frame() -> DataFrame {
        let mut columns = vec![
            datetime(PICKUP, &[Some(TEN_AM_MS), Some(TEN_AM_MS)], TimeUnit::Milliseconds),
            datetime(
                DROPOFF,
                &[Some(TEN_AM_MS + 15 * 60_000), None],
                TimeUnit::Milliseconds,
            ),
        ];
        columns.push(Series::new(FEATURES[0].into(), &[74i32, 41]).into());
        columns.push(Series::new(FEATURES[1].into(), &[168i64, 42]).into());
        for name in &FEATURES[2..] {
            columns.push(Series::new((*name).into(), &[Some(2.5), None]).into());
        }
        DataFrame::new(columns).unwrap()
    }

    #[test]
    fn frame_rows_become_records() {
        let records = trips_from_frame(&frame()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].duration_minutes(), Some(15.0));
        assert_eq!(records[0].pu_location_id, Some(74.0));
        assert_eq!(records[0].do_location_id, Some(168.0));
        assert_eq!(records[0].passenger_count, Some(2.5));
        assert_eq!(records[1].dropoff_us, None);
        assert_eq!(records[1].fare_amount, None);
    }

    #[test]
    fn missing_column_is_reported() {
        let df = frame().drop(FEATURES[4]).unwrap();
        let err = trips_from_frame(&df).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(ref c) if c == "fare_amount"));
    }

    #[test]
    fn string_timestamps_are_rejected() {
        let mut df = frame();
        df.replace(PICKUP, Series::new(PICKUP.into(), &["2021-09-01", "2021-09-01"]))
            .unwrap();
        let err = trips_from_frame(&df).unwrap_err();
        assert!(matches!(err, DataError::InvalidTimestamp(ref c) if c == PICKUP));
    }

    #[test]
    fn out_of_range_timestamps_are_rejected() {
        let mut df = frame();
        df.replace_column(
            0,
            datetime(PICKUP, &[Some(i64::MAX / 10), Some(TEN_AM_MS)], TimeUnit::Milliseconds),
        )
        .unwrap();

        let err = trips_from_frame(&df).unwrap_err();
        assert!(matches!(err, DataError::InvalidTimestamp(ref c) if c == PICKUP));
    }

    #[test]
    fn units_are_normalised_to_micros() {
        assert_eq!(to_micros(1_500, TimeUnit::Nanoseconds), Some(1));
        assert_eq!(to_micros(-1, TimeUnit::Nanoseconds), Some(-1));
        assert_eq!(to_micros(7, TimeUnit::Microseconds), Some(7));
        assert_eq!(to_micros(7, TimeUnit::Milliseconds), Some(7_000));
        assert_eq!(to_micros(i64::MIN / 10, TimeUnit::Milliseconds), None);
    }

    #[test]
    fn parquet_file_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.parquet");
        let mut df = frame();
        ParquetWriter::new(File::create(&path).unwrap())
            .finish(&mut df)
            .unwrap();

        let records = load_trips(&path).unwrap();
        assert_eq!(records, trips_from_frame(&df).unwrap());
    }

    #[test]
    fn absent_file_is_an_io_error() {
        let err = load_trips(Path::new("/definitely/not/here.parquet")).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
