//! The event payload (§4.10, §6) and the type taxonomy carried in it.

use serde::{Deserialize, Serialize};

use va_core::{AuralizationMode, Orientation, Vec3};

/// An event's subject, either a small-integer entity id or a string id
/// (signal sources and directivities are string-keyed, scene entities are
/// not — see [`va_core::EntityId`] vs. the string ids minted by
/// `va-signal`/`va-directivity`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventObjectId {
    Int(i32),
    Str(String),
}

/// Per-channel level measurements, reported for both a device's input and
/// its output side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelMeters {
    pub peaks: Vec<f32>,
    pub rms: Vec<f32>,
}

/// A long-running operation's progress, e.g. an offline render or a file
/// load (action/subaction are free-form labels, not an enum, since the
/// set of possible operations is open-ended).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
    pub action: String,
    pub subaction: Option<String>,
}

/// The domain event kinds the core facade publishes (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    ObjectCreated,
    ObjectDeleted,
    ObjectChanged,
    PoseChanged,
    MutedChanged,
    VolumeChanged,
    StateChanged,
    AuralizationModeChanged,
    ProgressUpdate,
    MeasurementUpdate,
    ShutdownRequested,
    Initialized,
    Reset,
}

/// One broadcast event. Every field beyond `id`, `sender` and `event_type`
/// is optional: a given event type populates only the fields relevant to
/// it (a `PoseChanged` event sets `position`/`view`/`up`, a
/// `MeasurementUpdate` sets `input_meters`/`output_meters`/`cpu_load`, and
/// so on).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Assigned by the event worker at broadcast time; `0` until then.
    pub id: u64,
    pub sender: String,
    pub event_type: EventType,
    pub object_id: Option<EventObjectId>,
    pub param_id: Option<i32>,
    pub string_param: Option<String>,
    pub index: Option<usize>,
    pub auralization_mode: Option<AuralizationMode>,
    pub volume: Option<f64>,
    pub state: Option<String>,
    pub muted: Option<bool>,
    pub name: Option<String>,
    pub file_path: Option<String>,
    pub position: Option<Vec3>,
    pub view: Option<Vec3>,
    pub up: Option<Vec3>,
    pub head_above_torso_orientation: Option<Orientation>,
    pub orientation: Option<Orientation>,
    pub input_meters: Option<ChannelMeters>,
    pub output_meters: Option<ChannelMeters>,
    pub cpu_load: Option<f32>,
    pub dsp_load: Option<f32>,
    pub core_clock: Option<u64>,
    pub progress: Option<Progress>,
    pub prototype_params: Option<serde_json::Value>,
}

impl Event {
    /// A minimal event: only `sender` and `event_type` set, everything
    /// else defaulted to `None`. Callers set the fields their event type
    /// needs with the builder methods below.
    pub fn new(sender: impl Into<String>, event_type: EventType) -> Self {
        Self {
            id: 0,
            sender: sender.into(),
            event_type,
            object_id: None,
            param_id: None,
            string_param: None,
            index: None,
            auralization_mode: None,
            volume: None,
            state: None,
            muted: None,
            name: None,
            file_path: None,
            position: None,
            view: None,
            up: None,
            head_above_torso_orientation: None,
            orientation: None,
            input_meters: None,
            output_meters: None,
            cpu_load: None,
            dsp_load: None,
            core_clock: None,
            progress: None,
            prototype_params: None,
        }
    }

    pub fn with_object_id(mut self, object_id: EventObjectId) -> Self {
        self.object_id = Some(object_id);
        self
    }

    pub fn with_pose(mut self, position: Vec3, view: Vec3, up: Vec3) -> Self {
        self.position = Some(position);
        self.view = Some(view);
        self.up = Some(up);
        self
    }

    pub fn with_progress(mut self, current: u64, total: u64, action: impl Into<String>) -> Self {
        self.progress = Some(Progress { current, total, action: action.into(), subaction: None });
        self
    }
}
</content>
