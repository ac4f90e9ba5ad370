//! Location management messages and location-scoped settings.

use crate::error::SyncError;
use crate::id::GlobalId;
use crate::sync::{ClientMessage, Outbox};
use futures::channel::oneshot;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type LocationId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationPosition {
    pub x: f64,
    pub y: f64,
}

/// Move a set of users to another location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationChange {
    pub location: LocationId,
    pub users: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<LocationPosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRename {
    pub location: LocationId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationClone {
    pub location: LocationId,
    pub room: String,
}

/// A spawn point as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnInfo {
    pub uuid: GlobalId,
    pub name: String,
    pub floor: String,
    pub position: LocationPosition,
}

/// Partial update of location options. A `null` value resets the option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationOptionsSet {
    pub options: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationId>,
}

impl Outbox {
    pub fn send_location_order(&mut self, locations: Vec<LocationId>) {
        self.send(ClientMessage::LocationsOrderSet(locations));
    }

    pub fn send_location_change(&mut self, change: LocationChange) {
        self.send(ClientMessage::LocationChange(change));
    }

    pub fn send_new_location(&mut self, name: impl Into<String>) {
        self.send(ClientMessage::LocationNew(name.into()));
    }

    pub fn send_location_rename(&mut self, location: LocationId, name: impl Into<String>) {
        self.send(ClientMessage::LocationRename(LocationRename {
            location,
            name: name.into(),
        }));
    }

    pub fn send_location_remove(&mut self, location: LocationId) {
        self.send(ClientMessage::LocationDelete(location));
    }

    pub fn send_location_archive(&mut self, location: LocationId) {
        self.send(ClientMessage::LocationArchive(location));
    }

    pub fn send_location_unarchive(&mut self, location: LocationId) {
        self.send(ClientMessage::LocationUnarchive(location));
    }

    pub fn send_location_clone(&mut self, location: LocationId, room: impl Into<String>) {
        self.send(ClientMessage::LocationClone(LocationClone {
            location,
            room: room.into(),
        }));
    }

    /// Set or reset (`None`) one location option.
    pub fn send_location_option(
        &mut self,
        key: &str,
        value: Option<Value>,
        location: Option<LocationId>,
    ) {
        let mut options = Map::new();
        options.insert(key.to_string(), value.unwrap_or(Value::Null));
        self.send(ClientMessage::LocationOptionsSet(LocationOptionsSet {
            options,
            location,
        }));
    }

    /// Ask the server for the spawn points of `location`.
    ///
    /// The returned receiver completes once the transport acknowledges the
    /// request through [`Outbox::resolve_ack`]. It is canceled if the outbox
    /// is dropped first.
    pub fn request_spawn_info(
        &mut self,
        location: LocationId,
    ) -> oneshot::Receiver<Vec<SpawnInfo>> {
        let request = self.next_request;
        self.next_request += 1;
        let (sender, receiver) = oneshot::channel();
        self.spawn_requests.insert(request, sender);
        self.send(ClientMessage::SpawnInfoGet { request, location });
        receiver
    }

    /// Deliver the server's acknowledgement for `request`.
    ///
    /// A payload that fails to decode leaves the request pending so a later
    /// acknowledgement can still complete it.
    pub fn resolve_ack(&mut self, request: u64, payload: Value) -> Result<(), SyncError> {
        if !self.spawn_requests.contains_key(&request) {
            return Err(SyncError::UnknownRequest(request));
        }
        let spawns: Vec<SpawnInfo> = serde_json::from_value(payload)?;
        if let Some(sender) = self.spawn_requests.remove(&request) {
            if sender.send(spawns).is_err() {
                log::debug!("Spawn info request {request} was abandoned");
            }
        }
        Ok(())
    }

    pub fn pending_requests(&self) -> usize {
        self.spawn_requests.len()
    }
}

/// Settings of the active location that the core itself maintains.
#[derive(Debug, Clone, Default)]
pub struct LocationSettings {
    pub active_location: LocationId,
    spawn_locations: Vec<GlobalId>,
}

impl LocationSettings {
    pub fn new(active_location: LocationId) -> Self {
        Self {
            active_location,
            spawn_locations: Vec::new(),
        }
    }

    pub fn spawn_locations(&self) -> &[GlobalId] {
        &self.spawn_locations
    }

    pub fn is_spawn_location(&self, shape: GlobalId) -> bool {
        self.spawn_locations.contains(&shape)
    }

    /// Replace the spawn list, sending `spawn_locations` for `location` when
    /// `sync` is set.
    pub fn set_spawn_locations(
        &mut self,
        spawns: Vec<GlobalId>,
        location: LocationId,
        sync: bool,
        outbox: &mut Outbox,
    ) {
        if sync {
            outbox.send_location_option(
                "spawn_locations",
                Some(serde_json::json!(spawns)),
                Some(location),
            );
        }
        self.spawn_locations = spawns;
    }
}
