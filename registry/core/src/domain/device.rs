// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Value Objects
// ============================================================================

/// Unique identifier for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub Uuid);

impl DeviceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a canonical UUID string. Anything else is `InvalidId`.
    pub fn from_string(s: &str) -> Result<Self, DeviceError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| DeviceError::InvalidId(s.to_string()))
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operational state of a device. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceState {
    Available,
    InUse,
    Inactive,
}

impl DeviceState {
    pub const ALL: [DeviceState; 3] = [Self::Available, Self::InUse, Self::Inactive];

    /// Parse the textual form used on the wire and in storage.
    ///
    /// An empty string is `StateRequired`; any other unknown value is
    /// `InvalidState`.
    pub fn parse(s: &str) -> Result<Self, DeviceError> {
        match s {
            "" => Err(DeviceError::StateRequired),
            "available" => Ok(Self::Available),
            "in-use" => Ok(Self::InUse),
            "inactive" => Ok(Self::Inactive),
            other => Err(DeviceError::InvalidState(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InUse => "in-use",
            Self::Inactive => "inactive",
        }
    }

    pub fn is_in_use(&self) -> bool {
        matches!(self, Self::InUse)
    }
}

impl FromStr for DeviceState {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Aggregate
// ============================================================================

/// A tracked physical device.
///
/// Fields are private so that every mutation goes through either the
/// constructor, [`Device::set_state`], or the update policy in
/// [`crate::domain::device_policy`]. `created_at` has no mutator at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    id: DeviceId,
    name: String,
    brand: String,
    state: DeviceState,
    created_at: DateTime<Utc>,
}

impl Device {
    /// Construct and validate a new device.
    ///
    /// An empty `id` generates a fresh identifier and a missing `created_at`
    /// is replaced by the current time. Construction is all-or-nothing: the
    /// first violated invariant is returned and no device is produced.
    pub fn new(
        id: &str,
        name: impl Into<String>,
        brand: impl Into<String>,
        state: &str,
        created_at: Option<DateTime<Utc>>,
    ) -> Result<Self, DeviceError> {
        let id = if id.is_empty() {
            DeviceId::new()
        } else {
            DeviceId::from_string(id)?
        };

        let name = name.into();
        let brand = brand.into();
        require_text(&name, DeviceError::NameRequired)?;
        require_text(&brand, DeviceError::BrandRequired)?;

        let state = DeviceState::parse(state)?;

        Ok(Self {
            id,
            name,
            brand,
            state,
            created_at: created_at.unwrap_or_else(Utc::now),
        })
    }

    /// Rebuild a device from already-typed stored parts, re-running the
    /// text invariants. Used by repository adapters when reading rows.
    pub fn restore(
        id: DeviceId,
        name: String,
        brand: String,
        state: DeviceState,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DeviceError> {
        let device = Self {
            id,
            name,
            brand,
            state,
            created_at,
        };
        device.validate()?;
        Ok(device)
    }

    /// Check the invariants that can be broken after construction.
    pub fn validate(&self) -> Result<(), DeviceError> {
        require_text(&self.name, DeviceError::NameRequired)?;
        require_text(&self.brand, DeviceError::BrandRequired)?;
        Ok(())
    }

    /// Move to a new state. The device is left untouched on failure.
    pub fn set_state(&mut self, state: &str) -> Result<(), DeviceError> {
        self.state = DeviceState::parse(state).map_err(|e| match e {
            DeviceError::StateRequired => DeviceError::InvalidState(String::new()),
            other => other,
        })?;
        Ok(())
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_in_use(&self) -> bool {
        self.state.is_in_use()
    }

    pub(crate) fn apply_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub(crate) fn apply_brand(&mut self, brand: &str) {
        self.brand = brand.to_string();
    }

    pub(crate) fn apply_state(&mut self, state: DeviceState) {
        self.state = state;
    }
}

fn require_text(value: &str, err: DeviceError) -> Result<(), DeviceError> {
    if value.is_empty() {
        Err(err)
    } else {
        Ok(())
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("invalid device id: {0:?}")]
    InvalidId(String),

    #[error("name is required")]
    NameRequired,

    #[error("brand is required")]
    BrandRequired,

    #[error("state is required")]
    StateRequired,

    #[error("state {0} is invalid")]
    InvalidState(String),

    #[error("cannot delete a device in use")]
    DeleteInUse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_device_keeps_supplied_fields() {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc.with_ymd_and_hms(2025, 1, 10, 15, 4, 5).unwrap();

        let device = Device::new(&id, "Device 1", "Telec LTDA", "available", Some(created_at)).unwrap();

        assert_eq!(device.id().to_string(), id);
        assert_eq!(device.name(), "Device 1");
        assert_eq!(device.brand(), "Telec LTDA");
        assert_eq!(device.state(), DeviceState::Available);
        assert_eq!(device.created_at(), created_at);
    }

    #[test]
    fn test_new_device_generates_id_and_timestamp() {
        let before = Utc::now();
        let device = Device::new("", "Device 1", "Telec LTDA", "in-use", None).unwrap();

        assert!(Uuid::parse_str(&device.id().to_string()).is_ok());
        assert!(device.created_at() >= before);
        assert!(device.is_in_use());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = Device::new("", "A", "X", "available", None).unwrap();
        let b = Device::new("", "A", "X", "available", None).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_new_device_invalid_id() {
        let result = Device::new("sdfs", "Device 1", "Telec LTDA", "available", None);
        assert_eq!(result, Err(DeviceError::InvalidId("sdfs".to_string())));
    }

    #[test]
    fn test_new_device_name_required() {
        let result = Device::new("", "", "Telec LTDA", "available", None);
        assert_eq!(result, Err(DeviceError::NameRequired));
    }

    #[test]
    fn test_new_device_brand_required() {
        let result = Device::new("", "Device 1", "", "available", None);
        assert_eq!(result, Err(DeviceError::BrandRequired));
    }

    #[test]
    fn test_new_device_state_required() {
        let result = Device::new("", "Device 1", "Telec LTDA", "", None);
        assert_eq!(result, Err(DeviceError::StateRequired));
    }

    #[test]
    fn test_new_device_state_invalid() {
        let result = Device::new("", "Device 1", "Telec LTDA", "invalid", None);
        assert_eq!(result, Err(DeviceError::InvalidState("invalid".to_string())));
    }

    #[test]
    fn test_invalid_state_message_shows_raw_value() {
        let err = DeviceState::parse("broken").unwrap_err();
        assert_eq!(err.to_string(), "state broken is invalid");
    }

    #[test]
    fn test_state_text_forms() {
        for state in DeviceState::ALL {
            assert_eq!(DeviceState::parse(state.as_str()), Ok(state));
        }
        assert!(DeviceState::parse("In-Use").is_err());
        assert!(DeviceState::parse("in_use").is_err());
    }

    #[test]
    fn test_state_serializes_kebab_case() {
        let json = serde_json::to_string(&DeviceState::InUse).unwrap();
        assert_eq!(json, "\"in-use\"");
    }

    #[test]
    fn test_set_state() {
        let mut device = Device::new("", "Device 1", "Telec LTDA", "available", None).unwrap();

        assert!(device.set_state("inactive").is_ok());
        assert_eq!(device.state(), DeviceState::Inactive);

        let err = device.set_state("broken").unwrap_err();
        assert_eq!(err, DeviceError::InvalidState("broken".to_string()));
        assert_eq!(device.state(), DeviceState::Inactive);

        assert!(matches!(device.set_state(""), Err(DeviceError::InvalidState(_))));
        assert_eq!(device.state(), DeviceState::Inactive);
    }

    #[test]
    fn test_restore_rejects_blank_text() {
        let result = Device::restore(
            DeviceId::new(),
            "".to_string(),
            "Brand".to_string(),
            DeviceState::Available,
            Utc::now(),
        );
        assert_eq!(result, Err(DeviceError::NameRequired));
    }
}
