use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use smsbridge_core_types::{BridgeError, MethodCall, Payload, PermissionRight, Reply};

use crate::device::ContentResolver;
use crate::facade::Capability;

pub const GET_CONTACT_ACTION: &str = "getContact";
pub const PHONE_LOOKUP_URI: &str = "content://com.android.contacts/phone_lookup";

const PROJECTION: [&str; 3] = ["display_name", "photo_uri", "photo_thumb_uri"];

/// Phone lookup URI for `address`, percent-encoded as a single path segment.
pub fn phone_lookup_uri(address: &str) -> String {
    format!("{PHONE_LOOKUP_URI}/{}", urlencoding::encode(address))
}

/// `getContact`: display name and photo URIs of the contact owning a phone number.
pub struct Contacts {
    resolver: Arc<dyn ContentResolver>,
}

impl Contacts {
    pub fn new(resolver: Arc<dyn ContentResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Capability for Contacts {
    type Request = String;

    const NAME: &'static str = "contacts";
    const RIGHTS: &'static [PermissionRight] = &[PermissionRight::ReadContacts];

    fn handles(&self, action: &str) -> bool {
        action == GET_CONTACT_ACTION
    }

    fn parse(&self, call: &MethodCall) -> Result<String, BridgeError> {
        call.arguments.require_str("address")
    }

    async fn execute(&self, address: String) -> Reply {
        let uri = phone_lookup_uri(&address);
        let mut contact = Map::new();
        let rows = self.resolver.query(&uri, Some(&PROJECTION)).await?;
        if let Some(row) = rows.and_then(|mut rows| rows.next()) {
            let text = |column: &str| {
                row.get(column)
                    .and_then(|value| value.to_text())
                    .map_or(Value::Null, Value::String)
            };
            contact.insert("name".into(), text("display_name"));
            contact.insert("photo".into(), text("photo_uri"));
            contact.insert("thumbnail".into(), text("photo_thumb_uri"));
        }
        Ok(Payload::Value(Value::Object(contact)))
    }
}
