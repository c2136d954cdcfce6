// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Backend Entities
//!
//! Value objects owned by the [`Registry`](crate::domain::registry::Registry):
//!
//! - [`Backend`]: a provider account/region, owns machines and images.
//! - [`Machine`]: a compute instance; its id is unique only inside its backend.
//! - [`Image`]: an image offered by one backend.
//!
//! Descriptors ([`BackendDescriptor`], [`MachineDescriptor`], [`ImageDescriptor`])
//! are the wire shapes returned by the server and are converted into entities
//! when they enter the store.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Server-assigned backend identifier.
    BackendId
);
string_id!(
    /// Machine identifier, unique only within the owning backend.
    MachineId
);
string_id!(
    /// Image identifier, unique only within the owning backend.
    ImageId
);

/// Composite key that identifies a machine across all backends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MachineKey {
    pub backend_id: BackendId,
    pub machine_id: MachineId,
}

impl MachineKey {
    pub fn new(backend_id: impl Into<BackendId>, machine_id: impl Into<MachineId>) -> Self {
        Self {
            backend_id: backend_id.into(),
            machine_id: machine_id.into(),
        }
    }
}

impl fmt::Display for MachineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.backend_id, self.machine_id)
    }
}

/// Which nested collection of a backend an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Machines,
    Images,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Machines => f.write_str("machines"),
            Collection::Images => f.write_str("images"),
        }
    }
}

// ============================================================================
// Wire descriptors
// ============================================================================

/// Backend as listed by `GET /backends`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub id: BackendId,

    /// Provider kind (e.g. "ec2_ap_northeast", "openstack")
    #[serde(default)]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Machines embedded in the listing, if the server inlines them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machines: Option<Vec<MachineDescriptor>>,

    /// Images embedded in the listing, if the server inlines them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageDescriptor>>,
}

impl BackendDescriptor {
    pub fn new(id: impl Into<BackendId>) -> Self {
        Self {
            id: id.into(),
            provider: String::new(),
            title: None,
            machines: None,
            images: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineDescriptor {
    pub id: MachineId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub id: ImageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub id: MachineId,
    pub backend_id: BackendId,
    pub name: Option<String>,
    pub state: Option<String>,
    /// Set by monitoring sync; never cleared by this core
    pub has_monitoring: bool,
}

impl Machine {
    pub fn from_descriptor(backend_id: &BackendId, descriptor: MachineDescriptor) -> Self {
        Self {
            id: descriptor.id,
            backend_id: backend_id.clone(),
            name: descriptor.name,
            state: descriptor.state,
            has_monitoring: false,
        }
    }

    pub fn key(&self) -> MachineKey {
        MachineKey {
            backend_id: self.backend_id.clone(),
            machine_id: self.id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub backend_id: BackendId,
    pub name: Option<String>,
}

impl Image {
    pub fn from_descriptor(backend_id: &BackendId, descriptor: ImageDescriptor) -> Self {
        Self {
            id: descriptor.id,
            backend_id: backend_id.clone(),
            name: descriptor.name,
        }
    }
}

/// A provider kind the host offers, with the title shown for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Provider kind as it appears on backends (e.g. "ec2_ap_northeast")
    pub provider: String,
    pub title: String,
}

impl Provider {
    pub fn new(provider: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            title: title.into(),
        }
    }
}

/// A provider account/region grouping machines and images.
///
/// # Invariants
///
/// - Every machine and image carries this backend's id.
/// - `machines` keeps arrival order; lookups rely on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backend {
    pub id: BackendId,
    pub provider: String,
    pub title: Option<String>,
    pub machines: Vec<Machine>,
    pub images: Vec<Image>,
    pub loading_machines: bool,
    pub loading_images: bool,
}

impl Backend {
    /// Build a backend from its listing entry.
    ///
    /// Inline collections are taken as loaded. A collection that is absent
    /// starts empty and is flagged as loading when `load_contents` is set,
    /// because a content loader will fill it in.
    pub fn from_descriptor(descriptor: BackendDescriptor, load_contents: bool) -> Self {
        let id = descriptor.id;

        let (machines, loading_machines) = match descriptor.machines {
            Some(list) => (
                list.into_iter()
                    .map(|m| Machine::from_descriptor(&id, m))
                    .collect(),
                false,
            ),
            None => (Vec::new(), load_contents),
        };

        let (images, loading_images) = match descriptor.images {
            Some(list) => (
                list.into_iter()
                    .map(|i| Image::from_descriptor(&id, i))
                    .collect(),
                false,
            ),
            None => (Vec::new(), load_contents),
        };

        Self {
            id,
            provider: descriptor.provider,
            title: descriptor.title,
            machines,
            images,
            loading_machines,
            loading_images,
        }
    }

    /// Human-readable label used in notifications.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn is_loading(&self, collection: Collection) -> bool {
        match collection {
            Collection::Machines => self.loading_machines,
            Collection::Images => self.loading_images,
        }
    }

    pub(crate) fn set_loading(&mut self, collection: Collection, loading: bool) {
        match collection {
            Collection::Machines => self.loading_machines = loading,
            Collection::Images => self.loading_images = loading,
        }
    }

    pub fn machine(&self, machine_id: &MachineId) -> Option<&Machine> {
        self.machines.iter().find(|m| &m.id == machine_id)
    }

    pub(crate) fn machine_mut(&mut self, machine_id: &MachineId) -> Option<&mut Machine> {
        self.machines.iter_mut().find(|m| &m.id == machine_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_without_contents_is_loading() {
        let backend = Backend::from_descriptor(BackendDescriptor::new("b1"), true);
        assert!(backend.loading_machines);
        assert!(backend.loading_images);
        assert!(backend.machines.is_empty());
    }

    #[test]
    fn test_descriptor_without_content_loading_is_settled() {
        let backend = Backend::from_descriptor(BackendDescriptor::new("b1"), false);
        assert!(!backend.loading_machines);
        assert!(!backend.loading_images);
    }

    #[test]
    fn test_inline_machines_are_owned_by_backend() {
        let descriptor: BackendDescriptor = serde_json::from_value(serde_json::json!({
            "id": "b1",
            "provider": "openstack",
            "machines": [{"id": "m1"}, {"id": "m2", "name": "db"}]
        }))
        .unwrap();

        let backend = Backend::from_descriptor(descriptor, true);
        assert!(!backend.loading_machines);
        assert!(backend.loading_images);
        assert_eq!(backend.machines.len(), 2);
        assert!(backend.machines.iter().all(|m| m.backend_id == BackendId::from("b1")));
        assert_eq!(backend.machines[1].name.as_deref(), Some("db"));
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let mut descriptor = BackendDescriptor::new("b1");
        let backend = Backend::from_descriptor(descriptor.clone(), false);
        assert_eq!(backend.display_name(), "b1");

        descriptor.title = Some("EC2 Tokyo".to_string());
        let backend = Backend::from_descriptor(descriptor, false);
        assert_eq!(backend.display_name(), "EC2 Tokyo");
    }
}
