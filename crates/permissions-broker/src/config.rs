//! Permission name mapping for the gate.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use smsbridge_core_types::PermissionRight;
use thiserror::Error;

/// Mapping between logical right names and platform permission strings.
pub type PermissionMap = HashMap<String, String>;

/// Errors surfaced while loading the permission map.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize permission map: {0}")]
    Deserialize(String),
    #[error("permission map has no entry for: {0}")]
    Incomplete(String),
}

pub fn load_permission_map_from_reader<R: Read>(
    mut reader: R,
) -> Result<PermissionMap, ConfigError> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    parse_permission_map_str(&buf)
}

pub fn load_permission_map_from_path(path: impl AsRef<Path>) -> Result<PermissionMap, ConfigError> {
    let file = File::open(path.as_ref())?;
    load_permission_map_from_reader(file)
}

/// Accepts JSON first and falls back to YAML.
pub fn parse_permission_map_str(raw: &str) -> Result<PermissionMap, ConfigError> {
    let map: PermissionMap = match serde_json::from_str(raw) {
        Ok(map) => map,
        Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
            ConfigError::Deserialize(format!(
                "json error: {}; yaml error: {}",
                json_err, yaml_err
            ))
        })?,
    };
    validate_permission_map(&map)?;
    Ok(map)
}

/// Every known right must resolve to a platform name.
pub fn validate_permission_map(map: &PermissionMap) -> Result<(), ConfigError> {
    let missing: Vec<&str> = PermissionRight::ALL
        .iter()
        .map(PermissionRight::as_str)
        .filter(|name| !map.contains_key(*name))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Incomplete(missing.join(", ")))
    }
}

/// Default Android permission names.
pub fn default_permission_map() -> PermissionMap {
    let mut map = PermissionMap::new();
    map.insert("read_sms".to_string(), "android.permission.READ_SMS".to_string());
    map.insert("send_sms".to_string(), "android.permission.SEND_SMS".to_string());
    map.insert(
        "receive_sms".to_string(),
        "android.permission.RECEIVE_SMS".to_string(),
    );
    map.insert(
        "read_contacts".to_string(),
        "android.permission.READ_CONTACTS".to_string(),
    );
    map.insert(
        "read_phone_state".to_string(),
        "android.permission.READ_PHONE_STATE".to_string(),
    );
    map
}
