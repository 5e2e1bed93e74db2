//! CSV export
//!
//! Pure serialization of the current display sequence. Each derived column
//! contributes two extra synthesized columns: `<label> (Confidence)` as a
//! percentage string and `<label> (Reasoning)` as free text. Values are
//! escaped per standard CSV quoting rules.

use crate::model::Row;
use crate::registry::ColumnRegistry;
use crate::resolve::resolve;
use crate::store::{DerivedCell, DerivedValueStore};

/// Serialize the display rows to CSV, visible columns only.
pub fn to_csv(
    rows: &[&Row],
    registry: &ColumnRegistry,
    store: &DerivedValueStore,
    key_field: &str,
) -> String {
    let columns: Vec<_> = registry.columns().iter().filter(|c| c.visible).collect();

    let mut header: Vec<String> = Vec::new();
    for column in &columns {
        header.push(column.label.clone());
        if column.is_derived() {
            header.push(format!("{} (Confidence)", column.label));
            header.push(format!("{} (Reasoning)", column.label));
        }
    }

    let mut out = String::new();
    write_record(&mut out, &header);

    for row in rows {
        let mut record: Vec<String> = Vec::new();
        for column in &columns {
            record.push(resolve(row, column, store, key_field).display());
            if column.is_derived() {
                let row_id = row.identity(key_field);
                match store.get(&column.id, &row_id) {
                    Some(DerivedCell::Judged {
                        confidence,
                        explanation,
                        ..
                    }) => {
                        record.push(format!("{}%", (confidence * 100.0).round() as i64));
                        record.push(explanation.clone());
                    }
                    _ => {
                        record.push(String::new());
                        record.push(String::new());
                    }
                }
            }
        }
        write_record(&mut out, &record);
    }

    out
}

fn write_record(out: &mut String, fields: &[String]) {
    let escaped: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    out.push_str(&escaped.join(","));
    out.push('\n');
}

/// Wrap in quotes and double any embedded quote when the value contains a
/// comma, quote, or newline.
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
