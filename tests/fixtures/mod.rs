//! Test fixtures for osrm-inspector.
//!
//! Provides:
//! - Real Monaco / Jakarta locations
//! - Recording views that log every render
//! - A scripted `RouteBackend` that logs every call
//! - OSRM dataset preparation for container tests
#![allow(dead_code)]

pub mod locations;
pub mod osrm_data;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Mutex;

use osrm_inspector::request::RequestDescriptor;
use osrm_inspector::response::RouteResponse;
use osrm_inspector::traits::{
    BackendError, BackendStatus, InputView, MarkerView, RouteBackend, RouteRenderer, SlotView,
};
use osrm_inspector::{SlotId, WaypointSync};

#[allow(unused_imports)]
pub use locations::*;

// ============================================================================
// Recording views
// ============================================================================

#[derive(Debug, Default)]
pub struct ViewLog {
    pub field_renders: Vec<Vec<SlotView>>,
    pub focused_at_render: Vec<Option<SlotId>>,
    pub marker_renders: Vec<Vec<SlotView>>,
    pub invalid: Vec<(SlotId, String)>,
    pub drawn_profiles: Vec<String>,
    pub clears: usize,
    /// What the input view reports as focused.
    pub focused: Option<SlotId>,
}

pub type SharedLog = Rc<RefCell<ViewLog>>;

/// One recorder type plays every view; each boxed copy shares the log.
#[derive(Clone)]
pub struct Recorder(pub SharedLog);

impl InputView for Recorder {
    fn render_fields(&mut self, fields: &[SlotView], focused: Option<SlotId>) {
        let mut log = self.0.borrow_mut();
        log.field_renders.push(fields.to_vec());
        log.focused_at_render.push(focused);
    }

    fn focused(&self) -> Option<SlotId> {
        self.0.borrow().focused
    }

    fn flag_invalid(&mut self, slot: SlotId, reason: &str) {
        self.0.borrow_mut().invalid.push((slot, reason.to_string()));
    }
}

impl MarkerView for Recorder {
    fn render_markers(&mut self, markers: &[SlotView]) {
        self.0.borrow_mut().marker_renders.push(markers.to_vec());
    }
}

impl RouteRenderer for Recorder {
    fn draw_route(&mut self, _response: &RouteResponse, profile: &str) {
        self.0.borrow_mut().drawn_profiles.push(profile.to_string());
    }

    fn clear_route(&mut self) {
        self.0.borrow_mut().clears += 1;
    }
}

pub fn recorder() -> (Recorder, SharedLog) {
    let log = SharedLog::default();
    (Recorder(Rc::clone(&log)), log)
}

pub fn recording_sync() -> (WaypointSync, SharedLog) {
    let (recorder, log) = recorder();
    let sync = WaypointSync::new(Box::new(recorder.clone()), Box::new(recorder));
    (sync, log)
}

// ============================================================================
// Scripted backend
// ============================================================================

pub const OK_RESPONSE: &str = r#"{
    "code": "Ok",
    "routes": [{
        "distance": 1523.4,
        "duration": 245.7,
        "geometry": {"type": "LineString", "coordinates": [[7.4197, 43.7311], [7.4281, 43.7394]]},
        "legs": [{
            "distance": 1523.4,
            "duration": 245.7,
            "summary": "Boulevard Albert 1er",
            "steps": [
                {"distance": 1523.4, "duration": 245.7, "name": "Boulevard Albert 1er", "mode": "driving",
                 "maneuver": {"type": "depart", "location": [7.4197, 43.7311]}},
                {"distance": 0.0, "duration": 0.0, "name": "", "mode": "driving",
                 "maneuver": {"type": "arrive", "location": [7.4281, 43.7394]}}
            ]
        }]
    }]
}"#;

pub fn ok_response() -> RouteResponse {
    serde_json::from_str(OK_RESPONSE).expect("fixture response decodes")
}

pub fn rejected(profile: &str) -> BackendError {
    BackendError::ProfileRejected {
        profile: profile.to_string(),
        message: format!("Unknown profile {profile}"),
    }
}

/// Answers per profile as scripted. Profiles with no script are rejected,
/// the way a backend rejects a profile it does not serve.
#[derive(Default)]
pub struct MockBackend {
    routes: HashMap<String, Result<RouteResponse, BackendError>>,
    status: Option<BackendStatus>,
    probe_ok: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route_ok(mut self, profile: &str) -> Self {
        self.routes.insert(profile.to_string(), Ok(ok_response()));
        self
    }

    pub fn route_with(mut self, profile: &str, response: RouteResponse) -> Self {
        self.routes.insert(profile.to_string(), Ok(response));
        self
    }

    pub fn route_err(mut self, profile: &str, err: BackendError) -> Self {
        self.routes.insert(profile.to_string(), Err(err));
        self
    }

    pub fn status(mut self, status: BackendStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn probe_ok(mut self, profile: &str) -> Self {
        self.probe_ok.push(profile.to_string());
        self
    }

    /// Every call so far, as `route:{profile}`, `probe:{profile}`, `status`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn route_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| call.strip_prefix("route:").map(str::to_string))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RouteBackend for MockBackend {
    fn fetch_route(&self, descriptor: &RequestDescriptor) -> Result<RouteResponse, BackendError> {
        let profile = descriptor.profile();
        self.record(format!("route:{profile}"));
        self.routes
            .get(profile)
            .cloned()
            .unwrap_or_else(|| Err(rejected(profile)))
    }

    fn fetch_status(&self) -> Result<BackendStatus, BackendError> {
        self.record("status".to_string());
        self.status.clone().ok_or(BackendError::StatusUnavailable)
    }

    fn probe_profile(&self, profile: &str) -> Result<(), BackendError> {
        self.record(format!("probe:{profile}"));
        if self.probe_ok.iter().any(|p| p == profile) {
            Ok(())
        } else {
            Err(rejected(profile))
        }
    }
}
