use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use smsbridge_core_types::{BridgeError, MethodCall, Payload, PermissionRight, Reply};
use smsbridge_record_query::RawRow;

use crate::device::ContentResolver;
use crate::facade::Capability;

pub const GET_USER_PROFILE_ACTION: &str = "getUserProfile";
pub const PROFILE_URI: &str = "content://com.android.contacts/profile";
pub const CONTACTS_URI: &str = "content://com.android.contacts/contacts";
pub const PHONE_MIMETYPE: &str = "vnd.android.cursor.item/phone_v2";

const PROFILE_PROJECTION: [&str; 4] = ["_id", "display_name", "photo_uri", "photo_thumb_uri"];
const ENTITY_PROJECTION: [&str; 2] = ["data1", "mimetype"];

/// Entity rows of the contact with `id`.
pub fn entity_uri(id: &str) -> String {
    format!("{CONTACTS_URI}/{id}/entity")
}

/// `getUserProfile`: the device owner's profile card and phone numbers.
pub struct UserProfile {
    resolver: Arc<dyn ContentResolver>,
}

impl UserProfile {
    pub fn new(resolver: Arc<dyn ContentResolver>) -> Self {
        Self { resolver }
    }

    async fn addresses(&self, id: &str) -> Result<Vec<String>, BridgeError> {
        let Some(rows) = self
            .resolver
            .query(&entity_uri(id), Some(&ENTITY_PROJECTION))
            .await?
        else {
            return Ok(Vec::new());
        };
        Ok(rows
            .filter(|row| text(row, "mimetype").as_deref() == Some(PHONE_MIMETYPE))
            .filter_map(|row| text(&row, "data1"))
            .collect())
    }
}

fn text(row: &RawRow, column: &str) -> Option<String> {
    row.get(column).and_then(|value| value.to_text())
}

#[async_trait]
impl Capability for UserProfile {
    type Request = ();

    const NAME: &'static str = "user_profile";
    const RIGHTS: &'static [PermissionRight] = &[PermissionRight::ReadContacts];

    fn handles(&self, action: &str) -> bool {
        action == GET_USER_PROFILE_ACTION
    }

    fn parse(&self, _call: &MethodCall) -> Result<(), BridgeError> {
        Ok(())
    }

    async fn execute(&self, _request: ()) -> Reply {
        let row = self
            .resolver
            .query(PROFILE_URI, Some(&PROFILE_PROJECTION))
            .await?
            .and_then(|mut rows| rows.next());
        let Some(row) = row else {
            return Ok(Payload::null());
        };

        let id = text(&row, "_id").ok_or_else(|| BridgeError::json("profile row has no id"))?;
        let addresses = self.addresses(&id).await?;
        Ok(Payload::Value(json!({
            "id": id,
            "name": text(&row, "display_name").map_or(Value::Null, Value::String),
            "photo": text(&row, "photo_uri").map_or(Value::Null, Value::String),
            "thumbnail": text(&row, "photo_thumb_uri").map_or(Value::Null, Value::String),
            "addresses": addresses,
        })))
    }
}
