//! CSV / JSON record tables → candidate records.
//!
//! Cells are shaped, not validated:
//!   - empty cell            → field absent
//!   - list column           → array split on [`LIST_DELIMITER`]
//!   - `certainty`           → number when numeric, else left as text
//!   - `payload`             → parsed JSON when valid, else left as text
//!   - anything else         → text
//!
//! Columns the schema does not declare are passed through untouched so the
//! closed schema can reject them.

use std::io::Read;

use kindred_core::{record::RecordKind, schema::Schema};
use serde_json::{Map, Number, Value};

use crate::{Error, Result};

/// Separator between ids in list-valued cells (`who`, `source_ids`).
/// Never legal inside an id.
pub const LIST_DELIMITER: char = ';';

/// The fixed column set of a record table, in declaration order.
pub fn columns(kind: RecordKind) -> Vec<&'static str> {
  Schema::for_kind(kind).fields().iter().map(|f| f.name).collect()
}

fn is_list_column(kind: RecordKind, column: &str) -> bool {
  match kind {
    RecordKind::Person => column == "source_ids",
    RecordKind::Event => matches!(column, "who" | "source_ids"),
    RecordKind::Source => false,
  }
}

fn decode_cell(kind: RecordKind, column: &str, cell: &str) -> Value {
  if is_list_column(kind, column) {
    return Value::Array(
      cell
        .split(LIST_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Value::String(s.to_owned()))
        .collect(),
    );
  }

  match (kind, column) {
    (RecordKind::Event, "certainty") => cell
      .parse::<f64>()
      .ok()
      .and_then(Number::from_f64)
      .map_or_else(|| Value::String(cell.to_owned()), Value::Number),
    (RecordKind::Event, "payload") => serde_json::from_str(cell)
      .unwrap_or_else(|_| Value::String(cell.to_owned())),
    _ => Value::String(cell.to_owned()),
  }
}

/// Decode a CSV record table of `kind` into candidate records, in row order.
pub fn decode_table<R: Read>(
  kind: RecordKind,
  reader: R,
) -> Result<Vec<Value>> {
  let mut rdr = csv::ReaderBuilder::new()
    .trim(csv::Trim::All)
    .from_reader(reader);
  let headers = rdr.headers()?.clone();

  let mut rows = Vec::new();
  for record in rdr.records() {
    let record = record?;
    let object: Map<String, Value> = headers
      .iter()
      .zip(record.iter())
      .filter(|(_, cell)| !cell.is_empty())
      .map(|(column, cell)| {
        (column.to_owned(), decode_cell(kind, column, cell))
      })
      .collect();
    rows.push(Value::Object(object));
  }
  Ok(rows)
}

/// Decode a JSON array of candidate records. Elements are passed through
/// as-is.
pub fn decode_json<R: Read>(reader: R) -> Result<Vec<Value>> {
  match serde_json::from_reader(reader)? {
    Value::Array(rows) => Ok(rows),
    _ => Err(Error::NotAnArray),
  }
}

#[cfg(test)]
mod tests {
  use kindred_core::{
    schema::Rule,
    store::{LineageStore, MemoryStore},
  };
  use serde_json::json;

  use super::*;

  #[test]
  fn person_columns_match_schema() {
    assert_eq!(columns(RecordKind::Person), vec![
      "id",
      "name",
      "sex",
      "born",
      "born_place",
      "died",
      "died_place",
      "father_id",
      "mother_id",
      "notes",
      "source_ids",
    ]);
    assert_eq!(columns(RecordKind::Source).len(), 6);
  }

  #[test]
  fn empty_cells_are_absent() {
    let csv = "id,name,sex,born,father_id\nC1,Anna,female,1926,\n";
    let rows = decode_table(RecordKind::Person, csv.as_bytes()).unwrap();
    assert_eq!(rows, vec![json!({
      "id": "C1",
      "name": "Anna",
      "sex": "female",
      "born": "1926",
    })]);
  }

  #[test]
  fn list_cells_are_split() {
    let csv = "id,type,t,who,source_ids\n\
               M1,marriage,1950-06-01,A; B,S1;S2\n";
    let rows = decode_table(RecordKind::Event, csv.as_bytes()).unwrap();
    assert_eq!(rows[0]["who"], json!(["A", "B"]));
    assert_eq!(rows[0]["source_ids"], json!(["S1", "S2"]));
  }

  #[test]
  fn certainty_and_payload_are_shaped() {
    let csv = "id,type,t,who,certainty,payload\n\
               E1,custom,1901,A,0.75,\"{\"\"label\"\":\"\"emigration\"\"}\"\n\
               E2,custom,1902,A,likely,free text\n";
    let rows = decode_table(RecordKind::Event, csv.as_bytes()).unwrap();
    assert_eq!(rows[0]["certainty"], json!(0.75));
    assert_eq!(rows[0]["payload"], json!({ "label": "emigration" }));
    assert_eq!(rows[1]["certainty"], json!("likely"));
    assert_eq!(rows[1]["payload"], json!("free text"));
  }

  #[test]
  fn undeclared_columns_reach_the_validator() {
    let csv = "id,name,sex,nickname\nA,Anna,female,Annie\n";
    let rows = decode_table(RecordKind::Person, csv.as_bytes()).unwrap();

    let mut store = MemoryStore::new();
    let err = store.load(RecordKind::Person, rows).unwrap_err();
    let v = &err.violations()[0];
    assert_eq!(v.field, "nickname");
    assert_eq!(v.rule, Rule::Undeclared);
  }

  #[test]
  fn decoded_tables_load_into_store() {
    let people = "id,name,sex,born,father_id,source_ids\n\
                  F1,Founder,male,1758,,S1\n\
                  C1,Child,male,1926,F1,\n";
    let events = "id,type,t,who,certainty\nE1,death,1955,C1,0.9\n";
    let sources = "id,title,hash\nS1,Register,\n";

    let mut store = MemoryStore::new();
    store
      .load(
        RecordKind::Person,
        decode_table(RecordKind::Person, people.as_bytes()).unwrap(),
      )
      .unwrap();
    store
      .load(
        RecordKind::Event,
        decode_table(RecordKind::Event, events.as_bytes()).unwrap(),
      )
      .unwrap();
    store
      .load(
        RecordKind::Source,
        decode_table(RecordKind::Source, sources.as_bytes()).unwrap(),
      )
      .unwrap();
    store.check_integrity().unwrap();

    assert_eq!(store.person("C1").unwrap().father_id.as_deref(), Some("F1"));
    assert_eq!(store.event("E1").unwrap().certainty, 0.9);
    assert!(store.source("S1").unwrap().hash.is_none());
  }

  #[test]
  fn json_tables_must_be_arrays() {
    let rows = decode_json(r#"[{"id":"S1","title":"Register"}]"#.as_bytes())
      .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(matches!(
      decode_json(r#"{"id":"S1"}"#.as_bytes()),
      Err(Error::NotAnArray)
    ));
  }
}
