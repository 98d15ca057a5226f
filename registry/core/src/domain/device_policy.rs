// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Device Update Policy
//!
//! Decides, field by field, what an update request may change on a stored
//! device. While a device is in use only its name can change; differing
//! brand and state values are ignored rather than rejected. Otherwise every
//! differing field is applied.
//!
//! The functions here are pure: they mutate the in-memory device they are
//! given and never touch storage.

use serde::Serialize;
use std::fmt;

use crate::domain::device::{Device, DeviceError, DeviceState};

/// Requested values for the mutable fields of a device.
///
/// `created_at` cannot be requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub name: String,
    pub brand: String,
    pub state: String,
}

/// A field that an update may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceField {
    Name,
    Brand,
    State,
}

impl DeviceField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Brand => "brand",
            Self::State => "state",
        }
    }
}

impl fmt::Display for DeviceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which fields were applied and which were ignored, in check order
/// (name, brand, state).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    pub updated: Vec<DeviceField>,
    pub ignored: Vec<DeviceField>,
}

/// Apply `request` to `device` according to the in-use rules.
///
/// A requested state that is not a member of the closed set is rejected with
/// `InvalidState` before any field is touched. A requested state equal to the
/// current one is a no-op in both branches.
pub fn plan_update(device: &mut Device, request: &UpdateRequest) -> Result<UpdateOutcome, DeviceError> {
    // An unparseable value can never equal the current state.
    let requested_state = DeviceState::parse(&request.state)
        .map_err(|_| DeviceError::InvalidState(request.state.clone()))?;

    let mut outcome = UpdateOutcome::default();

    if request.name != device.name() {
        device.apply_name(&request.name);
        outcome.updated.push(DeviceField::Name);
    }

    if device.is_in_use() {
        if request.brand != device.brand() {
            outcome.ignored.push(DeviceField::Brand);
        }
        if requested_state != device.state() {
            outcome.ignored.push(DeviceField::State);
        }
    } else {
        if request.brand != device.brand() {
            device.apply_brand(&request.brand);
            outcome.updated.push(DeviceField::Brand);
        }
        if requested_state != device.state() {
            device.apply_state(requested_state);
            outcome.updated.push(DeviceField::State);
        }
    }

    Ok(outcome)
}

/// Devices in use cannot be deleted.
pub fn ensure_deletable(device: &Device) -> Result<(), DeviceError> {
    if device.is_in_use() {
        return Err(DeviceError::DeleteInUse);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, brand: &str, state: &str) -> Device {
        Device::new("", name, brand, state, None).unwrap()
    }

    fn request(name: &str, brand: &str, state: &str) -> UpdateRequest {
        UpdateRequest {
            name: name.to_string(),
            brand: brand.to_string(),
            state: state.to_string(),
        }
    }

    #[test]
    fn test_in_use_only_name_changes() {
        let mut d = device("A", "X", "in-use");
        let created_at = d.created_at();

        let outcome = plan_update(&mut d, &request("B", "Y", "inactive")).unwrap();

        assert_eq!(outcome.updated, vec![DeviceField::Name]);
        assert_eq!(outcome.ignored, vec![DeviceField::Brand, DeviceField::State]);
        assert_eq!(d.name(), "B");
        assert_eq!(d.brand(), "X");
        assert_eq!(d.state(), DeviceState::InUse);
        assert_eq!(d.created_at(), created_at);
    }

    #[test]
    fn test_in_use_same_state_is_not_ignored() {
        let mut d = device("A", "X", "in-use");

        let outcome = plan_update(&mut d, &request("A", "X", "in-use")).unwrap();

        assert!(outcome.updated.is_empty());
        assert!(outcome.ignored.is_empty());
    }

    #[test]
    fn test_in_use_brand_only_is_ignored() {
        let mut d = device("A", "X", "in-use");

        let outcome = plan_update(&mut d, &request("A", "Y", "in-use")).unwrap();

        assert!(outcome.updated.is_empty());
        assert_eq!(outcome.ignored, vec![DeviceField::Brand]);
        assert_eq!(d.brand(), "X");
    }

    #[test]
    fn test_available_applies_all_differing_fields() {
        let mut d = device("A", "X", "available");

        let outcome = plan_update(&mut d, &request("B", "Y", "in-use")).unwrap();

        assert_eq!(
            outcome.updated,
            vec![DeviceField::Name, DeviceField::Brand, DeviceField::State]
        );
        assert!(outcome.ignored.is_empty());
        assert_eq!(d.name(), "B");
        assert_eq!(d.brand(), "Y");
        assert_eq!(d.state(), DeviceState::InUse);
    }

    #[test]
    fn test_inactive_records_only_changed_fields() {
        let mut d = device("A", "X", "inactive");

        let outcome = plan_update(&mut d, &request("A", "Y", "inactive")).unwrap();

        assert_eq!(outcome.updated, vec![DeviceField::Brand]);
        assert!(outcome.ignored.is_empty());
        assert_eq!(d.state(), DeviceState::Inactive);
    }

    #[test]
    fn test_invalid_state_leaves_device_untouched() {
        for current in ["available", "in-use", "inactive"] {
            let mut d = device("A", "X", current);
            let before = d.clone();

            let err = plan_update(&mut d, &request("B", "Y", "broken")).unwrap_err();

            assert_eq!(err, DeviceError::InvalidState("broken".to_string()));
            assert_eq!(d, before);
        }
    }

    #[test]
    fn test_empty_state_is_invalid() {
        let mut d = device("A", "X", "available");
        let err = plan_update(&mut d, &request("A", "X", "")).unwrap_err();
        assert_eq!(err, DeviceError::InvalidState(String::new()));
    }

    #[test]
    fn test_ensure_deletable() {
        assert!(ensure_deletable(&device("A", "X", "available")).is_ok());
        assert!(ensure_deletable(&device("A", "X", "inactive")).is_ok());
        assert_eq!(
            ensure_deletable(&device("A", "X", "in-use")),
            Err(DeviceError::DeleteInUse)
        );
    }

    #[test]
    fn test_field_names() {
        assert_eq!(DeviceField::Name.to_string(), "name");
        assert_eq!(serde_json::to_string(&DeviceField::Brand).unwrap(), "\"brand\"");
    }
}
