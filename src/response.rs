//! Typed view of the backend's route response.
//!
//! Only the fields the inspector reads are typed; the backend may add
//! more, and the time-dependent indicators are loosely typed on purpose
//! since different builds report them differently.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::polyline::Polyline;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RouteResponse {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub time_dependent: Option<Value>,
    #[serde(default)]
    pub traffic: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Route {
    pub distance: f64,
    pub duration: f64,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub geometry: Option<Polyline>,
    #[serde(default)]
    pub legs: Vec<Leg>,
    #[serde(default)]
    pub depart: Option<Value>,
    #[serde(default)]
    pub arrival: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Leg {
    pub distance: f64,
    pub duration: f64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub annotation: Option<Annotation>,
    #[serde(default)]
    pub traffic: Option<Value>,
    #[serde(default)]
    pub departure_time: Option<Value>,
    #[serde(default)]
    pub arrival_time: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Step {
    pub distance: f64,
    pub duration: f64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mode: String,
    pub maneuver: Maneuver,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Maneuver {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub modifier: Option<String>,
    #[serde(default)]
    pub location: Option<[f64; 2]>,
}

/// Per-segment annotations, one entry per geometry segment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub distance: Vec<f64>,
    #[serde(default)]
    pub duration: Vec<f64>,
    #[serde(default)]
    pub speed: Vec<f64>,
    #[serde(default)]
    pub nodes: Vec<u64>,
}

impl RouteResponse {
    pub fn is_ok(&self) -> bool {
        self.code == "Ok" && !self.routes.is_empty()
    }

    pub fn primary_route(&self) -> Option<&Route> {
        self.routes.first()
    }

    /// Whether the response shows any sign that time-dependent data was
    /// used. Requests with a departure time but no such sign usually mean
    /// the backend has no traffic data loaded.
    pub fn has_time_data(&self) -> bool {
        let Some(route) = self.primary_route() else {
            return false;
        };

        if present(&route.depart) || present(&route.arrival) {
            return true;
        }
        if let Some(Value::Object(metadata)) = &self.metadata {
            if metadata.get("traffic").is_some_and(is_truthy) {
                return true;
            }
        }
        if route.legs.iter().any(|leg| {
            present(&leg.traffic) || present(&leg.departure_time) || present(&leg.arrival_time)
        }) {
            return true;
        }

        matches!(self.time_dependent, Some(Value::Bool(true)))
            || matches!(self.traffic, Some(Value::Bool(true)))
    }
}

impl Route {
    pub fn step_count(&self) -> usize {
        self.legs.iter().map(|leg| leg.steps.len()).sum()
    }

    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            distance_meters: self.distance,
            duration_seconds: self.duration,
            legs: self.legs.len(),
            steps: self.step_count(),
        }
    }
}

fn present(value: &Option<Value>) -> bool {
    value.as_ref().is_some_and(is_truthy)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSummary {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub legs: usize,
    pub steps: usize,
}

impl fmt::Display for RouteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {} ({} legs, {} steps)",
            format_distance(self.distance_meters),
            format_duration(self.duration_seconds),
            self.legs,
            self.steps
        )
    }
}

/// `"850 m"` below a kilometre, `"12.34 km"` above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round() as i64)
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}

pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        return format!("{} seconds", seconds.round() as i64);
    }
    if seconds < 3600.0 {
        return format!(
            "{} minutes {} seconds",
            (seconds / 60.0).floor() as i64,
            (seconds % 60.0).round() as i64
        );
    }

    let hours = (seconds / 3600.0).floor() as i64;
    let minutes = ((seconds % 3600.0) / 60.0).floor() as i64;
    let secs = (seconds % 60.0).round() as i64;

    let mut out = format!("{} hour{}", hours, plural(hours));
    if minutes > 0 || secs > 0 {
        out.push_str(&format!(" {} minute{}", minutes, plural(minutes)));
    }
    if secs > 0 {
        out.push_str(&format!(" {} second{}", secs, plural(secs)));
    }
    out
}

fn plural(n: i64) -> &'static str {
    if n > 1 { "s" } else { "" }
}
