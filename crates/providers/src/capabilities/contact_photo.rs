use std::sync::Arc;

use async_trait::async_trait;
use smsbridge_core_types::{BridgeError, MethodCall, Payload, PermissionRight, Reply};

use crate::device::ContentResolver;
use crate::facade::Capability;

pub const GET_CONTACT_PHOTO_ACTION: &str = "getContactPhoto";
pub const CONTACTS_AUTHORITY_URI: &str = "content://com.android.contacts";

/// Column holding thumbnail bytes on photo rows.
pub const PHOTO_COLUMN: &str = "data15";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhotoRequest {
    pub photo_uri: String,
    pub full_size: bool,
}

impl PhotoRequest {
    /// `photo_uri` resolved against the contacts authority.
    pub fn uri(&self) -> String {
        let path = self.photo_uri.trim_start_matches('/');
        format!("{CONTACTS_AUTHORITY_URI}/{path}")
    }
}

/// `getContactPhoto`: thumbnail blob by default, the full asset with `fullSize`.
pub struct ContactPhoto {
    resolver: Arc<dyn ContentResolver>,
}

impl ContactPhoto {
    pub fn new(resolver: Arc<dyn ContentResolver>) -> Self {
        Self { resolver }
    }

    async fn thumbnail(&self, uri: &str) -> Result<Option<Vec<u8>>, BridgeError> {
        let rows = self.resolver.query(uri, Some(&[PHOTO_COLUMN])).await?;
        Ok(rows
            .and_then(|mut rows| rows.next())
            .and_then(|row| row.get(PHOTO_COLUMN).and_then(|value| value.to_blob())))
    }
}

#[async_trait]
impl Capability for ContactPhoto {
    type Request = PhotoRequest;

    const NAME: &'static str = "contact_photo";
    const RIGHTS: &'static [PermissionRight] = &[PermissionRight::ReadContacts];

    fn handles(&self, action: &str) -> bool {
        action == GET_CONTACT_PHOTO_ACTION
    }

    fn parse(&self, call: &MethodCall) -> Result<PhotoRequest, BridgeError> {
        Ok(PhotoRequest {
            photo_uri: call.arguments.require_str("photoUri")?,
            full_size: call.arguments.opt_bool("fullSize")?.unwrap_or(false),
        })
    }

    async fn execute(&self, request: PhotoRequest) -> Reply {
        let uri = request.uri();
        let bytes = if request.full_size {
            self.resolver.open_asset(&uri).await?
        } else {
            self.thumbnail(&uri).await?
        };
        Ok(bytes.map_or_else(Payload::null, Payload::Bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_uri_is_appended_to_the_authority() {
        let request = PhotoRequest {
            photo_uri: "/contacts/12/photo".into(),
            full_size: false,
        };
        assert_eq!(request.uri(), "content://com.android.contacts/contacts/12/photo");
    }
}
