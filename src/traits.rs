//! Capability seams between the inspector core and its collaborators.
//!
//! Views and the renderer are resolved once at construction; every method
//! has a no-op default so a collaborator implements only what it shows.

use serde::Deserialize;
use thiserror::Error;

use crate::coordinate::Coordinate;
use crate::request::RequestDescriptor;
use crate::response::RouteResponse;
use crate::waypoints::{SlotId, WaypointRole};

/// What a view needs to draw one waypoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotView {
    pub id: SlotId,
    pub role: WaypointRole,
    /// 1-based, Start = 1.
    pub display_index: usize,
    pub coordinate: Option<Coordinate>,
}

impl SlotView {
    /// Text shown in the input field: the wire form, or empty.
    pub fn text(&self) -> String {
        self.coordinate.map(|c| c.to_string()).unwrap_or_default()
    }
}

/// The list of coordinate text fields.
pub trait InputView {
    /// Replaces the displayed fields. The field identified by `focused`
    /// is being typed into and must keep its current text.
    fn render_fields(&mut self, _fields: &[SlotView], _focused: Option<SlotId>) {}

    /// The field that currently has keyboard focus, if any.
    fn focused(&self) -> Option<SlotId> {
        None
    }

    /// Marks a field as holding unparseable text.
    fn flag_invalid(&mut self, _slot: SlotId, _reason: &str) {}
}

/// The draggable markers on the map.
pub trait MarkerView {
    /// Replaces all markers. Unfilled slots carry no marker.
    fn render_markers(&mut self, _markers: &[SlotView]) {}
}

/// Draws route results. Geometry and styling are the renderer's business.
pub trait RouteRenderer {
    fn draw_route(&mut self, _response: &RouteResponse, _profile: &str) {}

    fn clear_route(&mut self) {}
}

/// Collaborator that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopView;

impl InputView for NoopView {}
impl MarkerView for NoopView {}
impl RouteRenderer for NoopView {}

/// Backend self-description from a status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BackendStatus {
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub engine: Option<String>,
}

impl BackendStatus {
    /// `algorithm`, falling back to `engine`.
    pub fn reported_algorithm(&self) -> Option<&str> {
        self.algorithm.as_deref().or(self.engine.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// HTTP 400: the backend refused the profile or the parameters.
    #[error("backend rejected profile {profile:?}: {message}")]
    ProfileRejected { profile: String, message: String },

    #[error("backend returned HTTP {status}")]
    Http { status: u16 },

    /// No route between the points, whether sent as HTTP 400 or in a
    /// success body.
    #[error("no route: {code} {message}")]
    NoRoute { code: String, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode backend response: {0}")]
    Decode(String),

    #[error("no status endpoint answered")]
    StatusUnavailable,
}

impl BackendError {
    /// Only a profile rejection is worth retrying with another profile.
    pub fn is_profile_rejection(&self) -> bool {
        matches!(self, BackendError::ProfileRejected { .. })
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            BackendError::Http {
                status: status.as_u16(),
            }
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// The routing backend as seen by the core.
pub trait RouteBackend {
    /// Issues one route request.
    fn fetch_route(&self, descriptor: &RequestDescriptor) -> Result<RouteResponse, BackendError>;

    /// Asks the backend which profile and algorithm it runs.
    fn fetch_status(&self) -> Result<BackendStatus, BackendError>;

    /// Issues a trivial two-point request to see whether `profile` works.
    fn probe_profile(&self, profile: &str) -> Result<(), BackendError>;
}

impl<B: RouteBackend + ?Sized> RouteBackend for &B {
    fn fetch_route(&self, descriptor: &RequestDescriptor) -> Result<RouteResponse, BackendError> {
        (**self).fetch_route(descriptor)
    }

    fn fetch_status(&self) -> Result<BackendStatus, BackendError> {
        (**self).fetch_status()
    }

    fn probe_profile(&self, profile: &str) -> Result<(), BackendError> {
        (**self).probe_profile(profile)
    }
}

impl<B: RouteBackend + ?Sized> RouteBackend for std::sync::Arc<B> {
    fn fetch_route(&self, descriptor: &RequestDescriptor) -> Result<RouteResponse, BackendError> {
        (**self).fetch_route(descriptor)
    }

    fn fetch_status(&self) -> Result<BackendStatus, BackendError> {
        (**self).fetch_status()
    }

    fn probe_profile(&self, profile: &str) -> Result<(), BackendError> {
        (**self).probe_profile(profile)
    }
}
