//! Route request descriptors and the URLs they render to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coordinate::Coordinate;

/// Fixed query parameters sent with every route request.
const ROUTE_QUERY: &str =
    "overview=full&geometries=geojson&steps=true&annotations=true&alternatives=false";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("at least 2 waypoints are needed to route, got {found}")]
    InsufficientWaypoints { found: usize },
}

/// User-facing routing options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOptions {
    pub profile: String,
    /// Reported by the backend; display only.
    pub algorithm: String,
    pub departure_time: Option<DateTime<Utc>>,
    pub curb_enabled: bool,
    pub auto_requery: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            profile: "driving".to_string(),
            algorithm: "mld".to_string(),
            departure_time: None,
            curb_enabled: false,
            auto_requery: false,
        }
    }
}

/// One concrete route request. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    base_url: String,
    profile: String,
    coordinates: Vec<Coordinate>,
    departure_time: Option<DateTime<Utc>>,
    curb: bool,
}

impl RequestDescriptor {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn departure_time(&self) -> Option<DateTime<Utc>> {
        self.departure_time
    }

    pub fn curb(&self) -> bool {
        self.curb
    }

    /// Same request against another profile.
    pub fn with_profile(&self, profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
            ..self.clone()
        }
    }

    /// `/route/v1/{profile}/{lon,lat;...}?...` without the base.
    pub fn path_and_query(&self) -> String {
        let coords = self
            .coordinates
            .iter()
            .map(Coordinate::to_string)
            .collect::<Vec<_>>()
            .join(";");

        let mut url = format!("/route/v1/{}/{}?{}", self.profile, coords, ROUTE_QUERY);
        if let Some(depart) = self.departure_time {
            url.push_str(&format!("&depart={}", depart.timestamp()));
        }
        if self.curb {
            url.push_str("&curb=true");
        }
        url
    }

    /// The full request URL. This is also the shareable text.
    pub fn to_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.path_and_query()
        )
    }
}

/// Builds descriptors against one backend base URL.
#[derive(Debug, Clone)]
pub struct RouteRequestBuilder {
    base_url: String,
}

impl RouteRequestBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build(
        &self,
        coords: &[Coordinate],
        options: &RouteOptions,
    ) -> Result<RequestDescriptor, RequestError> {
        if coords.len() < 2 {
            return Err(RequestError::InsufficientWaypoints {
                found: coords.len(),
            });
        }

        Ok(RequestDescriptor {
            base_url: self.base_url.clone(),
            profile: options.profile.clone(),
            coordinates: coords.to_vec(),
            departure_time: options.departure_time,
            curb: options.curb_enabled,
        })
    }

    /// One descriptor per candidate profile, in candidate order. Candidates
    /// equal to the primary profile, and repeats, are skipped.
    pub fn build_fallback_sequence(
        &self,
        coords: &[Coordinate],
        options: &RouteOptions,
        candidate_profiles: &[String],
    ) -> Result<Vec<RequestDescriptor>, RequestError> {
        let primary = self.build(coords, options)?;
        let mut seen = vec![options.profile.as_str()];
        let mut sequence = Vec::new();

        for profile in candidate_profiles {
            if seen.contains(&profile.as_str()) {
                continue;
            }
            seen.push(profile.as_str());
            sequence.push(primary.with_profile(profile));
        }
        Ok(sequence)
    }
}
