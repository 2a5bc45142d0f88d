//! Decoding and paging of tabular message rows.
//!
//! Rows arrive from a cursor as untyped `(column, value)` pairs. [`decode`] turns each one into a
//! [`DecodedRecord`] through a fixed column dispatch, and [`QuerySpec::paginate`] filters, skips
//! and truncates the decoded stream in a single forward pass.

mod column;
mod query;
mod record;
mod row;

pub use column::{Column, ColumnClass};
pub use query::{query_rows, run, MessageBox, Paginated, QuerySpec};
pub use record::{decode, DecodedRecord, FieldValue};
pub use row::{RawRow, RawValue};
