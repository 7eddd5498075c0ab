//! Conversion of JSON record arrays into [`RawTable`]s.

use serde_json::Value;

use crate::core::raw::{FieldName, RawColumn, RawTable, RawValue};
use crate::core::source::FetchError;

fn flatten_into(prefix: &mut Vec<String>, value: &Value, out: &mut Vec<(FieldName, RawValue)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                prefix.push(key.clone());
                flatten_into(prefix, nested, out);
                prefix.pop();
            }
        }
        scalar => out.push((FieldName::new(prefix.iter().cloned()), RawValue::from(scalar))),
    }
}

/// Builds one column per (possibly nested) field, in first-seen order.
/// Records missing a field get `Null` in that column.
pub fn records_to_table(symbol: &str, records: &[Value]) -> Result<RawTable, FetchError> {
    let mut columns: Vec<RawColumn> = Vec::new();

    for (row, record) in records.iter().enumerate() {
        if !record.is_object() {
            return Err(FetchError::malformed(symbol, "record is not an object"));
        }
        let mut cells = Vec::new();
        flatten_into(&mut Vec::new(), record, &mut cells);

        for (name, value) in cells {
            match columns.iter_mut().find(|c| c.name == name) {
                Some(column) => column.values.push(value),
                None => {
                    let mut values = vec![RawValue::Null; row];
                    values.push(value);
                    columns.push(RawColumn { name, values });
                }
            }
        }
        for column in columns.iter_mut() {
            column.values.resize(row + 1, RawValue::Null);
        }
    }

    RawTable::new(columns).map_err(|e| FetchError::malformed(symbol, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_fields_become_composite_columns() {
        let records = vec![
            json!({"date": "2024-01-02", "price": {"close": 10.0, "adjClose": 9.5}}),
            json!({"date": "2024-01-03", "price": {"close": 11.0}, "dividend": 0.2}),
        ];
        let table = records_to_table("X", &records).unwrap();

        let names: Vec<String> = table.columns().iter().map(|c| c.name.flatten()).collect();
        assert_eq!(names, vec!["date", "price_close", "price_adjClose", "dividend"]);
        assert_eq!(table.row_count(), 2);
        assert!(table.columns()[2].values[1].is_null());
        assert!(table.columns()[3].values[0].is_null());
        assert_eq!(table.columns()[3].values[1], RawValue::Number(0.2));
    }

    #[test]
    fn test_non_object_record_is_malformed() {
        let records = vec![json!([1, 2, 3])];
        assert!(matches!(
            records_to_table("X", &records),
            Err(FetchError::Malformed { .. })
        ));
    }
}
