use smsbridge_record_query::{
    decode, query_rows, run, DecodedRecord, FieldValue, MessageBox, QuerySpec, RawRow, RawValue,
};
use std::cell::Cell;

fn message(id: i64, thread_id: i64, address: &str) -> RawRow {
    RawRow::new()
        .with("_id", id)
        .with("thread_id", thread_id)
        .with("address", address)
        .with("body", format!("message {id}"))
        .with("date", 1_700_000_000_000 + id)
}

fn records(rows: Vec<RawRow>) -> Vec<DecodedRecord> {
    rows.into_iter().map(decode).collect()
}

fn ids(page: &[DecodedRecord]) -> Vec<i64> {
    page.iter()
        .map(|record| record.get("_id").and_then(FieldValue::as_i64).unwrap())
        .collect()
}

#[test]
fn address_and_body_always_decode_as_text() {
    let row = RawRow::new()
        .with("address", 555i64)
        .with("body", RawValue::Real(1.5));
    let record = decode(row);
    assert_eq!(record.get("address"), Some(&FieldValue::Text("555".into())));
    assert_eq!(record.get("body"), Some(&FieldValue::Text("1.5".into())));
}

#[test]
fn timestamps_pass_through_unchanged() {
    let row = RawRow::new()
        .with("date", i64::MAX)
        .with("date_sent", -1i64);
    let record = decode(row);
    assert_eq!(record.get("date"), Some(&FieldValue::Long(i64::MAX)));
    assert_eq!(record.get("date_sent"), Some(&FieldValue::Long(-1)));
}

#[test]
fn malformed_cells_become_null_without_dropping_columns() {
    let row = RawRow::new()
        .with("thread_id", "not a number")
        .with("read", i64::from(i32::MAX) + 1)
        .with("date", RawValue::Blob(vec![0xff]))
        .with("address", RawValue::Null)
        .with("seen", " 1 ");
    let record = decode(row);

    assert_eq!(record.len(), 5);
    assert!(record.get("thread_id").unwrap().is_null());
    assert!(record.get("read").unwrap().is_null());
    assert!(record.get("date").unwrap().is_null());
    assert!(record.get("address").unwrap().is_null());
    assert_eq!(record.get("seen"), Some(&FieldValue::Int(1)));
}

#[test]
fn decoded_record_serializes_in_column_order() {
    let record = decode(message(7, 3, "555"));
    let json = serde_json::to_string(&record).unwrap();
    assert_eq!(
        json,
        r#"{"_id":7,"thread_id":3,"address":"555","body":"message 7","date":1700000000007}"#
    );
}

#[test]
fn offset_and_limit_select_a_window() {
    let input = records((0..10).map(|id| message(id, 1, "555")).collect());
    let spec = QuerySpec::new(MessageBox::Inbox).with_offset(3).with_limit(4);

    let page = run(input, &spec);

    assert_eq!(ids(&page), vec![3, 4, 5, 6]);
}

#[test]
fn offset_is_consumed_only_by_matching_records() {
    let input = records(vec![
        message(0, 1, "555"),
        message(1, 1, "555"),
        message(2, 2, "555"),
        message(3, 1, "555"),
    ]);
    let spec = QuerySpec::new(MessageBox::Inbox)
        .with_thread_id(1)
        .with_offset(1)
        .with_limit(1);

    let page = run(input, &spec);

    assert_eq!(ids(&page), vec![1]);
}

#[test]
fn address_filter_is_exact() {
    let input = records(vec![
        message(0, 1, "555"),
        message(1, 1, "5551"),
        message(2, 1, "555"),
    ]);
    let spec = QuerySpec::new(MessageBox::Inbox).with_address("555");

    assert_eq!(ids(&run(input, &spec)), vec![0, 2]);
}

#[test]
fn records_without_the_filtered_field_are_skipped() {
    let input = records(vec![
        RawRow::new().with("_id", 0i64),
        message(1, 4, "555"),
    ]);
    let spec = QuerySpec::new(MessageBox::Inbox).with_thread_id(4);

    assert_eq!(ids(&run(input, &spec)), vec![1]);
}

#[test]
fn empty_and_overshooting_pages_are_empty() {
    let spec = QuerySpec::new(MessageBox::Inbox).with_thread_id(999);
    assert!(run(records((0..5).map(|id| message(id, 1, "555")).collect()), &spec).is_empty());

    let spec = QuerySpec::new(MessageBox::Inbox).with_offset(50);
    assert!(run(records((0..5).map(|id| message(id, 1, "555")).collect()), &spec).is_empty());
}

#[test]
fn unbounded_limit_scans_to_exhaustion() {
    let spec = QuerySpec::new(MessageBox::Sent);
    let page = run(records((0..6).map(|id| message(id, 1, "555")).collect()), &spec);
    assert_eq!(page.len(), 6);
}

#[test]
fn scanning_stops_at_the_limit() {
    let pulled = Cell::new(0usize);
    let rows = (0..100).map(|id| {
        pulled.set(pulled.get() + 1);
        message(id, 1, "555")
    });
    let spec = QuerySpec::new(MessageBox::Inbox).with_limit(2);

    let page = query_rows(rows, &spec);

    assert_eq!(ids(&page), vec![0, 1]);
    assert_eq!(pulled.get(), 2);
}
