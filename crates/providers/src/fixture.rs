//! In-memory device backed by a YAML or JSON description.
//!
//! Serves every collaborator a [`Device`] needs, so a plugin can run end to end without a
//! phone attached. Outgoing messages are recorded and answered with `SMS_SENT` and
//! `SMS_DELIVERED` reports on the status hub.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use parking_lot::{Mutex, RwLock};
use permissions_broker::GrantState;
use serde::{Deserialize, Serialize};
use smsbridge_core_types::{BridgeError, PermissionRight};
use smsbridge_event_bus::{
    Clock, InboundSms, NotificationHub, SmsStatusNotification, SystemClock, ThreadResolver,
};
use smsbridge_record_query::{MessageBox, RawRow, RawValue};
use thiserror::Error;
use tracing::debug;

use crate::capabilities::{
    CONTACTS_AUTHORITY_URI, CONTACTS_URI, PHONE_LOOKUP_URI, PHONE_MIMETYPE, PHOTO_COLUMN,
    PROFILE_URI,
};
use crate::device::{
    ContentResolver, Device, OutgoingSms, RowCursor, SimInventory, SimSlot, SmsTransport,
};

const NAME_MIMETYPE: &str = "vnd.android.cursor.item/name";

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize fixture: {0}")]
    Deserialize(String),
    #[error("photo '{uri}' is not valid base64: {reason}")]
    Photo { uri: String, reason: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureContact {
    pub address: String,
    pub name: Option<String>,
    pub photo: Option<String>,
    pub thumbnail: Option<String>,
}

/// Photo bytes as base64, keyed in [`FixtureSpec::photos`] by the path under the contacts
/// authority.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixturePhoto {
    pub thumbnail: Option<String>,
    pub full: Option<String>,
    /// Reading the full asset fails with an I/O error.
    pub unreadable: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureProfile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub photo: Option<String>,
    pub thumbnail: Option<String>,
    pub addresses: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureSpec {
    pub inbox: Vec<RawRow>,
    pub sent: Vec<RawRow>,
    pub draft: Vec<RawRow>,
    pub contacts: Vec<FixtureContact>,
    pub photos: BTreeMap<String, FixturePhoto>,
    pub profile: Option<FixtureProfile>,
    pub sims: Vec<SimSlot>,
    pub granted: Vec<PermissionRight>,
    /// Known conversation threads by address; unknown addresses get a fresh thread.
    pub threads: BTreeMap<String, i64>,
    pub subscription_routing: bool,
    /// Addresses whose delivery report comes back as failed.
    pub undeliverable: Vec<String>,
    /// URIs whose queries the store refuses.
    pub refused: Vec<String>,
    /// Notifications replayed by [`FixtureDevice::replay_incoming`].
    pub incoming: Vec<InboundSms>,
    /// Fixed receive time; the system clock is used when absent.
    pub clock_millis: Option<i64>,
}

impl FixtureSpec {
    fn rows(&self, source: MessageBox) -> &[RawRow] {
        match source {
            MessageBox::Inbox => &self.inbox,
            MessageBox::Sent => &self.sent,
            MessageBox::Draft => &self.draft,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct PhotoData {
    thumbnail: Option<Vec<u8>>,
    full: Option<Vec<u8>>,
    unreadable: bool,
}

struct FixedClock(i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

pub struct FixtureDevice {
    spec: FixtureSpec,
    photos: HashMap<String, PhotoData>,
    granted: RwLock<HashSet<PermissionRight>>,
    threads: Mutex<BTreeMap<String, i64>>,
    outbox: Mutex<Vec<OutgoingSms>>,
    clock: Arc<dyn Clock>,
    inbound: Arc<NotificationHub<InboundSms>>,
    status: Arc<NotificationHub<SmsStatusNotification>>,
}

impl FixtureDevice {
    pub fn empty() -> Arc<Self> {
        Self::build(FixtureSpec::default(), HashMap::new())
    }

    pub fn from_spec(spec: FixtureSpec) -> Result<Arc<Self>, FixtureError> {
        let photos = spec
            .photos
            .iter()
            .map(|(uri, photo)| {
                let path = uri.trim_start_matches('/').to_string();
                Ok((path, decode_photo(uri, photo)?))
            })
            .collect::<Result<HashMap<_, _>, FixtureError>>()?;
        Ok(Self::build(spec, photos))
    }

    /// Accepts JSON first and falls back to YAML.
    pub fn parse_str(raw: &str) -> Result<Arc<Self>, FixtureError> {
        let spec: FixtureSpec = match serde_json::from_str(raw) {
            Ok(spec) => spec,
            Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
                FixtureError::Deserialize(format!(
                    "json error: {}; yaml error: {}",
                    json_err, yaml_err
                ))
            })?,
        };
        Self::from_spec(spec)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Arc<Self>, FixtureError> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&raw)
    }

    fn build(spec: FixtureSpec, photos: HashMap<String, PhotoData>) -> Arc<Self> {
        let clock: Arc<dyn Clock> = match spec.clock_millis {
            Some(millis) => Arc::new(FixedClock(millis)),
            None => Arc::new(SystemClock),
        };
        Arc::new(Self {
            granted: RwLock::new(spec.granted.iter().copied().collect()),
            threads: Mutex::new(spec.threads.clone()),
            photos,
            outbox: Mutex::new(Vec::new()),
            clock,
            inbound: NotificationHub::new(),
            status: NotificationHub::new(),
            spec,
        })
    }

    /// Collaborator bundle served by this device.
    pub fn device(self: &Arc<Self>) -> Device {
        Device {
            resolver: self.clone(),
            transport: self.clone(),
            sims: self.clone(),
            grants: self.clone(),
            threads: self.clone(),
            clock: Arc::clone(&self.clock),
            inbound: self.inbound.clone(),
            status: self.status.clone(),
        }
    }

    pub fn grant(&self, right: PermissionRight) {
        self.granted.write().insert(right);
    }

    pub fn revoke(&self, right: PermissionRight) {
        self.granted.write().remove(&right);
    }

    pub fn sent_messages(&self) -> Vec<OutgoingSms> {
        self.outbox.lock().clone()
    }

    pub fn inbound_hub(&self) -> &Arc<NotificationHub<InboundSms>> {
        &self.inbound
    }

    pub fn status_hub(&self) -> &Arc<NotificationHub<SmsStatusNotification>> {
        &self.status
    }

    /// Emit every scripted incoming message; returns how many were emitted.
    pub fn replay_incoming(&self) -> usize {
        for sms in &self.spec.incoming {
            self.inbound.emit(sms.clone());
        }
        self.spec.incoming.len()
    }

    fn lookup_rows(&self, uri: &str) -> Option<Vec<RawRow>> {
        if let Some(source) = MessageBox::ALL.into_iter().find(|source| source.uri() == uri) {
            return Some(self.spec.rows(source).to_vec());
        }
        if let Some(encoded) = uri
            .strip_prefix(PHONE_LOOKUP_URI)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            let address = urlencoding::decode(encoded).ok()?;
            return Some(
                self.spec
                    .contacts
                    .iter()
                    .filter(|contact| contact.address == address)
                    .map(contact_row)
                    .collect(),
            );
        }
        if uri == PROFILE_URI {
            return Some(self.spec.profile.iter().map(profile_row).collect());
        }
        if let Some(id) = uri
            .strip_prefix(CONTACTS_URI)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|rest| rest.strip_suffix("/entity"))
        {
            return Some(self.entity_rows(id));
        }
        let path = uri
            .strip_prefix(CONTACTS_AUTHORITY_URI)?
            .trim_start_matches('/');
        let photo = self.photos.get(path)?;
        Some(
            photo
                .thumbnail
                .iter()
                .map(|bytes| RawRow::new().with(PHOTO_COLUMN, RawValue::Blob(bytes.clone())))
                .collect(),
        )
    }

    fn entity_rows(&self, id: &str) -> Vec<RawRow> {
        let Some(profile) = self
            .spec
            .profile
            .as_ref()
            .filter(|profile| profile.id.as_deref() == Some(id))
        else {
            return Vec::new();
        };
        let name = profile
            .name
            .iter()
            .map(|name| entity_row(name, NAME_MIMETYPE));
        let phones = profile
            .addresses
            .iter()
            .map(|address| entity_row(address, PHONE_MIMETYPE));
        name.chain(phones).collect()
    }
}

fn decode_photo(uri: &str, photo: &FixturePhoto) -> Result<PhotoData, FixtureError> {
    let decode = |encoded: &Option<String>| {
        encoded
            .as_deref()
            .map(|value| base64::engine::general_purpose::STANDARD.decode(value))
            .transpose()
            .map_err(|err| FixtureError::Photo {
                uri: uri.to_string(),
                reason: err.to_string(),
            })
    };
    Ok(PhotoData {
        thumbnail: decode(&photo.thumbnail)?,
        full: decode(&photo.full)?,
        unreadable: photo.unreadable,
    })
}

fn contact_row(contact: &FixtureContact) -> RawRow {
    RawRow::new()
        .with("display_name", contact.name.clone())
        .with("photo_uri", contact.photo.clone())
        .with("photo_thumb_uri", contact.thumbnail.clone())
}

fn profile_row(profile: &FixtureProfile) -> RawRow {
    RawRow::new()
        .with("_id", profile.id.clone())
        .with("display_name", profile.name.clone())
        .with("photo_uri", profile.photo.clone())
        .with("photo_thumb_uri", profile.thumbnail.clone())
}

fn entity_row(data: &str, mimetype: &str) -> RawRow {
    RawRow::new().with("data1", data).with("mimetype", mimetype)
}

#[async_trait]
impl ContentResolver for FixtureDevice {
    async fn query(
        &self,
        uri: &str,
        projection: Option<&[&str]>,
    ) -> Result<Option<RowCursor>, BridgeError> {
        if self.spec.refused.iter().any(|refused| refused == uri) {
            debug!(target = "providers", uri, "fixture refused query");
            return Ok(None);
        }
        let Some(rows) = self.lookup_rows(uri) else {
            return Ok(None);
        };
        let rows: Vec<RawRow> = match projection {
            Some(columns) => rows.iter().map(|row| row.project(columns)).collect(),
            None => rows,
        };
        Ok(Some(Box::new(rows.into_iter())))
    }

    async fn open_asset(&self, uri: &str) -> Result<Option<Vec<u8>>, BridgeError> {
        let Some(path) = uri.strip_prefix(CONTACTS_AUTHORITY_URI) else {
            return Ok(None);
        };
        match self.photos.get(path.trim_start_matches('/')) {
            Some(photo) if photo.unreadable => {
                Err(BridgeError::io(format!("failed to read asset {uri}")))
            }
            Some(photo) => Ok(photo.full.clone()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SmsTransport for FixtureDevice {
    fn supports_subscription_routing(&self) -> bool {
        self.spec.subscription_routing
    }

    async fn send_text(&self, message: OutgoingSms) -> Result<(), BridgeError> {
        let sent_id = message.sent_id;
        let delivered = !self.spec.undeliverable.contains(&message.address);
        self.outbox.lock().push(message);
        self.status.emit(SmsStatusNotification::sent(sent_id, true));
        self.status
            .emit(SmsStatusNotification::delivered(sent_id, delivered));
        Ok(())
    }
}

impl SimInventory for FixtureDevice {
    fn sim_count(&self) -> usize {
        self.spec.sims.len()
    }

    fn sim_slot(&self, index: usize) -> Result<SimSlot, BridgeError> {
        self.spec
            .sims
            .get(index)
            .cloned()
            .ok_or_else(|| BridgeError::io(format!("no SIM slot {index}")))
    }
}

impl GrantState for FixtureDevice {
    fn is_granted(&self, right: PermissionRight) -> bool {
        self.granted.read().contains(&right)
    }
}

impl ThreadResolver for FixtureDevice {
    fn thread_id_for(&self, address: &str) -> Result<i64, BridgeError> {
        if address.is_empty() {
            return Err(BridgeError::io("cannot resolve a thread for an empty address"));
        }
        let mut threads = self.threads.lock();
        if let Some(id) = threads.get(address) {
            return Ok(*id);
        }
        let id = threads.values().copied().max().unwrap_or(0) + 1;
        threads.insert(address.to_string(), id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
inbox:
  - { _id: 2, thread_id: 7, address: "555", body: "second", date: 1700000000002 }
  - { _id: 1, thread_id: 7, address: "555", body: "first", date: 1700000000001 }
contacts:
  - { address: "+33 6", name: "Ada", photo: "/contacts/1/photo" }
photos:
  contacts/1/photo:
    thumbnail: "AQID"
    full: "BAUG"
granted: [read_sms]
threads:
  "555": 7
"#;

    fn collect(cursor: Option<RowCursor>) -> Vec<RawRow> {
        cursor.map(|rows| rows.collect()).unwrap_or_default()
    }

    #[tokio::test]
    async fn yaml_fixture_serves_message_rows_in_order() {
        let device = FixtureDevice::parse_str(FIXTURE).unwrap();
        let rows = collect(device.query("content://sms/inbox", None).await.unwrap());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("body"), Some(&RawValue::Text("second".into())));
        assert!(device.is_granted(PermissionRight::ReadSms));
        assert!(!device.is_granted(PermissionRight::SendSms));
    }

    #[tokio::test]
    async fn phone_lookup_decodes_the_address() {
        let device = FixtureDevice::parse_str(FIXTURE).unwrap();
        let uri = format!("{PHONE_LOOKUP_URI}/%2B33%206");
        let rows = collect(
            device
                .query(&uri, Some(&["display_name", "photo_uri"]))
                .await
                .unwrap(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0].get("display_name"), Some(&RawValue::Text("Ada".into())));
    }

    #[tokio::test]
    async fn photos_are_decoded_from_base64() {
        let device = FixtureDevice::parse_str(FIXTURE).unwrap();
        let uri = format!("{CONTACTS_AUTHORITY_URI}/contacts/1/photo");
        assert_eq!(device.open_asset(&uri).await.unwrap(), Some(vec![4, 5, 6]));
        let rows = collect(device.query(&uri, None).await.unwrap());
        assert_eq!(rows[0].get(PHOTO_COLUMN), Some(&RawValue::Blob(vec![1, 2, 3])));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let err = FixtureDevice::parse_str(r#"{"photos": {"p": {"full": "***"}}}"#)
            .err()
            .unwrap();
        assert!(matches!(err, FixtureError::Photo { .. }));
    }

    #[test]
    fn unknown_addresses_get_fresh_threads() {
        let device = FixtureDevice::parse_str(FIXTURE).unwrap();
        assert_eq!(device.thread_id_for("555").unwrap(), 7);
        assert_eq!(device.thread_id_for("777").unwrap(), 8);
        assert_eq!(device.thread_id_for("777").unwrap(), 8);
        assert!(device.thread_id_for("").is_err());
    }
}
