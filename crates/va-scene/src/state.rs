//! Immutable, versioned scene-state records (§3, §4.4).

use std::collections::BTreeMap;
use std::sync::Arc;

use va_core::AuralizationMode;
use va_directivity::DirectivityId;

use crate::ids::{PortalId, ReceiverId, SoundSourceId};
use crate::motion::MotionState;

/// A sound source as it exists in one scene-state snapshot. Immutable once
/// published; a "mutation" produces a new `Arc<SoundSourceState>`.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundSourceState {
    pub id: SoundSourceId,
    pub name: String,
    pub enabled: bool,
    pub muted: bool,
    pub sound_power: f64,
    pub directivity_id: Option<DirectivityId>,
    pub signal_source_id: Option<String>,
    pub auralization_mode: AuralizationMode,
    pub motion: MotionState,
}

impl SoundSourceState {
    pub fn new(id: SoundSourceId, name: impl Into<String>, created_at_block: u64) -> Self {
        Self {
            id,
            name: name.into(),
            enabled: true,
            muted: false,
            sound_power: 1.0,
            directivity_id: None,
            signal_source_id: None,
            auralization_mode: AuralizationMode::ALL,
            motion: MotionState::at_origin(created_at_block),
        }
    }
}

/// A sound receiver (listener) as it exists in one scene-state snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverState {
    pub id: ReceiverId,
    pub name: String,
    pub enabled: bool,
    pub muted: bool,
    pub directivity_id: Option<DirectivityId>,
    pub auralization_mode: AuralizationMode,
    pub motion: MotionState,
}

impl ReceiverState {
    pub fn new(id: ReceiverId, name: impl Into<String>, created_at_block: u64) -> Self {
        Self {
            id,
            name: name.into(),
            enabled: true,
            muted: false,
            directivity_id: None,
            auralization_mode: AuralizationMode::ALL,
            motion: MotionState::at_origin(created_at_block),
        }
    }
}

/// A portal as it exists in one scene-state snapshot. Portals are named by
/// §3 as part of the scene-state data model but their room-acoustic
/// behavior (coupling, transmission) is out of scope (§1 non-goals); only
/// identity, enablement and pose are modeled here.
#[derive(Debug, Clone, PartialEq)]
pub struct PortalState {
    pub id: PortalId,
    pub name: String,
    pub enabled: bool,
    pub motion: MotionState,
}

impl PortalState {
    pub fn new(id: PortalId, name: impl Into<String>, created_at_block: u64) -> Self {
        Self { id, name: name.into(), enabled: true, motion: MotionState::at_origin(created_at_block) }
    }
}

/// One immutable scene snapshot (§3 "Scene state"). Entities are keyed by id
/// and stored behind `Arc` so deriving a new record only clones the handful
/// of entries a transaction actually touched — every other entry's `Arc` is
/// shared with its ancestor (copy-on-write).
#[derive(Debug, Clone)]
pub struct SceneStateRecord {
    pub id: u64,
    pub timestamp_block: u64,
    pub sources: BTreeMap<i32, Arc<SoundSourceState>>,
    pub receivers: BTreeMap<i32, Arc<ReceiverState>>,
    pub portals: BTreeMap<i32, Arc<PortalState>>,
}

impl SceneStateRecord {
    pub fn empty(id: u64, timestamp_block: u64) -> Self {
        Self { id, timestamp_block, sources: BTreeMap::new(), receivers: BTreeMap::new(), portals: BTreeMap::new() }
    }

    /// Derive the next record: same entity maps (Arc-shared), new id/timestamp.
    /// Individual `Set*` calls then replace only the entries they touch.
    pub fn derive(&self, new_id: u64, timestamp_block: u64) -> Self {
        Self { id: new_id, timestamp_block, sources: self.sources.clone(), receivers: self.receivers.clone(), portals: self.portals.clone() }
    }

    pub fn active_source_count(&self) -> usize {
        self.sources.values().filter(|s| s.enabled).count()
    }

    pub fn active_receiver_count(&self) -> usize {
        self.receivers.values().filter(|r| r.enabled).count()
    }
}
</content>
