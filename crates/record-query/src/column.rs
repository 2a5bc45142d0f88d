//! Column dispatch for SMS provider rows.

/// Decoding class of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnClass {
    /// UTF-8 string.
    Text,
    /// Epoch milliseconds, 64-bit.
    Timestamp,
    /// 32-bit integer.
    Integer,
}

/// Columns of the SMS content provider, plus a catch-all for anything the source adds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    Id,
    ThreadId,
    Address,
    Person,
    Date,
    DateSent,
    Protocol,
    Read,
    Status,
    Type,
    ReplyPathPresent,
    Subject,
    Body,
    ServiceCenter,
    Locked,
    SubId,
    ErrorCode,
    Creator,
    Seen,
    Unlisted,
}

impl Column {
    pub fn from_name(name: &str) -> Self {
        match name {
            "_id" => Column::Id,
            "thread_id" => Column::ThreadId,
            "address" => Column::Address,
            "person" => Column::Person,
            "date" => Column::Date,
            "date_sent" => Column::DateSent,
            "protocol" => Column::Protocol,
            "read" => Column::Read,
            "status" => Column::Status,
            "type" => Column::Type,
            "reply_path_present" => Column::ReplyPathPresent,
            "subject" => Column::Subject,
            "body" => Column::Body,
            "service_center" => Column::ServiceCenter,
            "locked" => Column::Locked,
            "sub_id" => Column::SubId,
            "error_code" => Column::ErrorCode,
            "creator" => Column::Creator,
            "seen" => Column::Seen,
            _ => Column::Unlisted,
        }
    }

    // Exhaustive on purpose: a new column must pick its class here.
    pub fn class(self) -> ColumnClass {
        match self {
            Column::Address | Column::Body => ColumnClass::Text,
            Column::Date | Column::DateSent => ColumnClass::Timestamp,
            Column::Id
            | Column::ThreadId
            | Column::Person
            | Column::Protocol
            | Column::Read
            | Column::Status
            | Column::Type
            | Column::ReplyPathPresent
            | Column::Subject
            | Column::ServiceCenter
            | Column::Locked
            | Column::SubId
            | Column::ErrorCode
            | Column::Creator
            | Column::Seen
            | Column::Unlisted => ColumnClass::Integer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_timestamp_columns_are_fixed() {
        assert_eq!(Column::from_name("address").class(), ColumnClass::Text);
        assert_eq!(Column::from_name("body").class(), ColumnClass::Text);
        assert_eq!(Column::from_name("date").class(), ColumnClass::Timestamp);
        assert_eq!(Column::from_name("date_sent").class(), ColumnClass::Timestamp);
    }

    #[test]
    fn everything_else_is_integer() {
        for name in ["thread_id", "read", "subject", "vendor_extension"] {
            assert_eq!(Column::from_name(name).class(), ColumnClass::Integer, "{name}");
        }
    }
}
