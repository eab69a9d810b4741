#![forbid(unsafe_code)]

use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use indexmap::IndexMap;
use serde_json::Value;
use tb_columnar::{Column, ColumnError};
use tb_frame::{DataFrame, FrameError};
use tb_types::Scalar;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("csv input has no headers")]
    MissingHeaders,
    #[error("expected a JSON array of records")]
    ExpectedArray,
    #[error("record {index} is not a JSON object")]
    ExpectedObject { index: usize },
    #[error("field {column:?} holds a nested JSON value; flatten before loading")]
    NestedValue { column: String },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub fn read_csv_str(input: &str) -> Result<DataFrame, IoError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let headers = reader.headers().cloned()?;
    if headers.is_empty() {
        return Err(IoError::MissingHeaders);
    }

    let mut columns = headers
        .iter()
        .map(|name| (name.to_owned(), Vec::<Scalar>::new()))
        .collect::<IndexMap<_, _>>();

    for row in reader.records() {
        let record = row?;
        for (idx, header) in headers.iter().enumerate() {
            let field = record.get(idx).unwrap_or_default();
            if let Some(values) = columns.get_mut(header) {
                values.push(parse_scalar(field));
            }
        }
    }

    let pairs = columns
        .into_iter()
        .map(|(name, values)| Ok((name, Column::from_values(values)?)))
        .collect::<Result<Vec<_>, ColumnError>>()?;

    Ok(DataFrame::from_columns(pairs)?)
}

pub fn read_csv_path(path: impl AsRef<Path>) -> Result<DataFrame, IoError> {
    let input = fs::read_to_string(path)?;
    read_csv_str(&input)
}

pub fn write_csv_string(frame: &DataFrame) -> Result<String, IoError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    let headers = frame.column_names();
    writer.write_record(&headers)?;

    for row_idx in 0..frame.len() {
        let row = frame
            .columns()
            .map(|(_, column)| {
                column
                    .value(row_idx)
                    .map_or_else(String::new, scalar_to_csv)
            })
            .collect::<Vec<_>>();
        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

pub fn write_csv_path(frame: &DataFrame, path: impl AsRef<Path>) -> Result<(), IoError> {
    let out = write_csv_string(frame)?;
    fs::write(path, out)?;
    Ok(())
}

fn parse_scalar(field: &str) -> Scalar {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Scalar::Null;
    }

    if let Ok(value) = trimmed.parse::<i64>() {
        return Scalar::Int64(value);
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        return Scalar::Float64(value);
    }
    if let Ok(value) = trimmed.parse::<bool>() {
        return Scalar::Bool(value);
    }

    Scalar::Utf8(trimmed.to_owned())
}

fn scalar_to_csv(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Null => String::new(),
        Scalar::Bool(v) => v.to_string(),
        Scalar::Int64(v) => v.to_string(),
        Scalar::Float64(v) => {
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        }
        Scalar::Utf8(v) => v.clone(),
    }
}

fn scalar_from_json(column: &str, value: &Value) -> Result<Scalar, IoError> {
    match value {
        Value::Null => Ok(Scalar::Null),
        Value::Bool(v) => Ok(Scalar::Bool(*v)),
        Value::Number(v) => {
            if let Some(v) = v.as_i64() {
                Ok(Scalar::Int64(v))
            } else if let Some(v) = v.as_f64() {
                Ok(Scalar::Float64(v))
            } else {
                // u64 beyond i64 range; keep magnitude as float.
                Ok(Scalar::Float64(v.as_u64().map_or(f64::NAN, |v| v as f64)))
            }
        }
        Value::String(v) => Ok(Scalar::Utf8(v.clone())),
        Value::Array(_) | Value::Object(_) => Err(IoError::NestedValue {
            column: column.to_owned(),
        }),
    }
}

/// Build a frame from a JSON array of flat objects. The column set is the
/// union of keys in first-appearance order; absent keys null-fill.
pub fn frame_from_records(value: &Value) -> Result<DataFrame, IoError> {
    let records = value.as_array().ok_or(IoError::ExpectedArray)?;

    let mut names = Vec::<String>::new();
    for (index, record) in records.iter().enumerate() {
        let object = record.as_object().ok_or(IoError::ExpectedObject { index })?;
        for key in object.keys() {
            if !names.iter().any(|name| name == key) {
                names.push(key.clone());
            }
        }
    }

    let mut columns: IndexMap<String, Vec<Scalar>> = names
        .into_iter()
        .map(|name| (name, Vec::with_capacity(records.len())))
        .collect();

    for (index, record) in records.iter().enumerate() {
        let object = record.as_object().ok_or(IoError::ExpectedObject { index })?;
        for (name, values) in &mut columns {
            let scalar = match object.get(name) {
                Some(value) => scalar_from_json(name, value)?,
                None => Scalar::Null,
            };
            values.push(scalar);
        }
    }

    let pairs = columns
        .into_iter()
        .map(|(name, values)| Ok((name, Column::from_values(values)?)))
        .collect::<Result<Vec<_>, ColumnError>>()?;

    Ok(DataFrame::from_columns(pairs)?)
}

pub fn frame_from_json_str(input: &str) -> Result<DataFrame, IoError> {
    let value: Value = serde_json::from_str(input)?;
    frame_from_records(&value)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tb_types::{DType, Scalar};

    use super::{
        IoError, frame_from_records, read_csv_path, read_csv_str, write_csv_path,
        write_csv_string,
    };

    #[test]
    fn csv_round_trip_preserves_shape_and_missing_cells() {
        let input = "id,value,tag\n1,10,x\n2,,y\n3,3.5,\n";
        let frame = read_csv_str(input).expect("read");

        assert_eq!(frame.column_names(), vec!["id", "value", "tag"]);
        assert_eq!(frame.column("value").expect("value").dtype(), DType::Float64);
        assert!(frame.column("value").expect("value").values()[1].is_missing());

        let out = write_csv_string(&frame).expect("write");
        let back = read_csv_str(&out).expect("re-read");
        assert_eq!(back.column_names(), frame.column_names());
        assert!(
            back.column("value")
                .expect("value")
                .semantic_eq(frame.column("value").expect("value"))
        );
        assert!(
            back.column("tag")
                .expect("tag")
                .semantic_eq(frame.column("tag").expect("tag"))
        );
    }

    #[test]
    fn csv_file_round_trip_uses_the_same_shape() {
        let frame = read_csv_str("a,b\n1,x\n2,y\n").expect("read");
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frame.csv");

        write_csv_path(&frame, &path).expect("write");
        let back = read_csv_path(&path).expect("read back");
        assert_eq!(back, frame);
    }

    #[test]
    fn records_build_union_columns_in_first_appearance_order() {
        let value = json!([
            {"mag": 4.2, "place": "somewhere"},
            {"mag": 5.0, "place": "elsewhere", "tsunami": 1},
        ]);

        let frame = frame_from_records(&value).expect("frame");
        assert_eq!(frame.column_names(), vec!["mag", "place", "tsunami"]);
        assert_eq!(
            frame.column("tsunami").expect("tsunami").values(),
            &[Scalar::Null, Scalar::Int64(1)]
        );
    }

    #[test]
    fn nested_record_values_are_rejected() {
        let value = json!([{"geometry": {"type": "Point"}}]);
        let err = frame_from_records(&value).expect_err("must fail");
        assert!(matches!(err, IoError::NestedValue { column } if column == "geometry"));
    }

    #[test]
    fn non_array_documents_are_rejected() {
        let err = frame_from_records(&serde_json::json!({"a": 1})).expect_err("must fail");
        assert!(matches!(err, IoError::ExpectedArray));
    }
}
