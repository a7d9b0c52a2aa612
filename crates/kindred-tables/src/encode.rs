//! Derived rows → CSV.

use std::io::Write;

use serde::Serialize;

use crate::Result;

/// Write `rows` as CSV with a header taken from the row type's field names.
pub fn encode_rows<W, T>(writer: W, rows: &[T]) -> Result<()>
where
  W: Write,
  T: Serialize,
{
  let mut wtr = csv::Writer::from_writer(writer);
  for row in rows {
    wtr.serialize(row)?;
  }
  wtr.flush()?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use serde::Serialize;

  use super::*;

  #[derive(Serialize)]
  struct Row {
    parent_id: &'static str,
    child_id:  &'static str,
    gap:       i32,
  }

  #[test]
  fn writes_header_and_rows() {
    let rows = [
      Row {
        parent_id: "F1",
        child_id:  "C1",
        gap:       168,
      },
      Row {
        parent_id: "C1",
        child_id:  "C2",
        gap:       -3,
      },
    ];
    let mut out = Vec::new();
    encode_rows(&mut out, &rows).unwrap();
    assert_eq!(
      String::from_utf8(out).unwrap(),
      "parent_id,child_id,gap\nF1,C1,168\nC1,C2,-3\n"
    );
  }

  #[test]
  fn empty_input_writes_nothing() {
    let mut out = Vec::new();
    encode_rows::<_, Row>(&mut out, &[]).unwrap();
    assert!(out.is_empty());
  }
}
