//! Bulk waypoint import from CSV/TXT payloads and pasted request URLs.
//!
//! CSV rows are independent, so a bad row is dropped and the rest kept. A
//! request URL is one structure, so any malformed piece rejects it whole.
//! Both paths end in a single wholesale replacement through
//! [`WaypointSync`].

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::coordinate::{self, Coordinate};
use crate::sync::{SyncError, WaypointEvent, WaypointSync};
use crate::waypoints::WaypointSlot;

/// Path segments that name an OSRM service followed by `v1/{profile}/{coords}`.
const SERVICES: &[&str] = &["route", "trip", "match"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    #[error("need at least 2 rows, found {found}")]
    TooFewRows { found: usize },

    #[error("only {parsed} of {rows} rows are valid coordinates, need at least 2")]
    AllRowsInvalid { parsed: usize, rows: usize },

    #[error("{count} waypoints exceed the limit of {max}")]
    TooManyWaypoints { count: usize, max: usize },

    #[error("payload of {bytes} bytes exceeds the limit of {max}")]
    PayloadTooLarge { bytes: usize, max: usize },

    #[error("malformed routing URL: {reason}")]
    MalformedUrl { reason: String },

    #[error("routing URL needs at least 2 coordinates, found {found}")]
    MissingCoordinates { found: usize },

    #[error(transparent)]
    Sync(#[from] SyncError),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImportLimits {
    pub max_waypoints: usize,
    pub max_bytes: usize,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            max_waypoints: 100,
            max_bytes: 1024 * 1024,
        }
    }
}

/// Coordinates recovered from a CSV payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvImport {
    pub coordinates: Vec<Coordinate>,
    /// Data rows that did not parse.
    pub rejected: usize,
}

/// Everything recovered from a pasted request URL.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlImport {
    pub profile: String,
    pub coordinates: Vec<Coordinate>,
    pub curb: bool,
    pub departure_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct BulkImporter {
    limits: ImportLimits,
}

impl BulkImporter {
    pub fn new(limits: ImportLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ImportLimits {
        &self.limits
    }

    /// Parses a CSV/TXT payload without touching any state.
    pub fn parse_csv(&self, raw: &str) -> Result<CsvImport, ImportError> {
        if raw.len() > self.limits.max_bytes {
            return Err(ImportError::PayloadTooLarge {
                bytes: raw.len(),
                max: self.limits.max_bytes,
            });
        }

        let lines: Vec<&str> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if lines.len() < 2 {
            return Err(ImportError::TooFewRows { found: lines.len() });
        }

        let format = coordinate::detect_row_format(&lines);
        let rows = if format.has_header { &lines[1..] } else { &lines[..] };
        debug!(
            has_header = format.has_header,
            order = ?format.order,
            rows = rows.len(),
            "detected row format"
        );

        let mut coordinates = Vec::with_capacity(rows.len());
        let mut rejected = 0;
        for row in rows {
            match coordinate::parse_row(row, format.order) {
                Ok(coord) => coordinates.push(coord),
                Err(err) => {
                    debug!(row, error = %err, "skipping import row");
                    rejected += 1;
                }
            }
        }

        if coordinates.len() < 2 {
            return Err(ImportError::AllRowsInvalid {
                parsed: coordinates.len(),
                rows: rows.len(),
            });
        }
        self.check_count(coordinates.len())?;

        Ok(CsvImport {
            coordinates,
            rejected,
        })
    }

    /// Replaces all waypoints with the rows of a CSV/TXT payload.
    pub fn import_csv(
        &self,
        sync: &mut WaypointSync,
        raw: &str,
    ) -> Result<Vec<WaypointSlot>, ImportError> {
        let parsed = self.parse_csv(raw)?;
        info!(
            imported = parsed.coordinates.len(),
            rejected = parsed.rejected,
            "imported waypoints from csv"
        );
        self.replace(sync, parsed.coordinates)
    }

    /// Parses a previously generated request URL without touching any
    /// state. Relative URLs such as `/api/route/v1/...` are accepted.
    pub fn parse_request_url(&self, text: &str) -> Result<UrlImport, ImportError> {
        let malformed = |reason: &str| ImportError::MalformedUrl {
            reason: reason.to_string(),
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(malformed("empty input"));
        }
        let url = parse_url(text).ok_or_else(|| malformed("not a URL"))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.collect())
            .unwrap_or_default();
        // The base URL may carry its own path, so anchor on the last
        // `{service}/v1` pair rather than the first service name.
        let service = segments
            .windows(2)
            .rposition(|pair| SERVICES.contains(&pair[0]) && pair[1] == "v1")
            .ok_or_else(|| malformed("no route, trip or match service in path"))?;
        let (Some(profile), Some(coords)) = (segments.get(service + 2), segments.get(service + 3))
        else {
            return Err(malformed("path is missing the profile or coordinates"));
        };
        if profile.is_empty() {
            return Err(malformed("empty profile"));
        }

        let coordinates = coords
            .split(';')
            .filter(|c| !c.is_empty())
            .map(coordinate::parse)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| malformed(&err.to_string()))?;
        if coordinates.len() < 2 {
            return Err(ImportError::MissingCoordinates {
                found: coordinates.len(),
            });
        }
        self.check_count(coordinates.len())?;

        let mut curb = false;
        let mut departure_time = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "curb" => curb = value == "true",
                "depart" => {
                    let secs: i64 = value
                        .parse()
                        .map_err(|_| malformed("depart is not a unix timestamp"))?;
                    departure_time = Some(
                        DateTime::from_timestamp(secs, 0)
                            .ok_or_else(|| malformed("depart is out of range"))?,
                    );
                }
                _ => {}
            }
        }

        Ok(UrlImport {
            profile: profile.to_string(),
            coordinates,
            curb,
            departure_time,
        })
    }

    /// Replaces all waypoints with the coordinates of a pasted request URL.
    /// The caller applies the returned options.
    pub fn import_from_request_url(
        &self,
        sync: &mut WaypointSync,
        text: &str,
    ) -> Result<(UrlImport, Vec<WaypointSlot>), ImportError> {
        let parsed = self.parse_request_url(text)?;
        info!(
            profile = %parsed.profile,
            waypoints = parsed.coordinates.len(),
            "imported waypoints from routing url"
        );
        let slots = self.replace(sync, parsed.coordinates.clone())?;
        Ok((parsed, slots))
    }

    fn check_count(&self, count: usize) -> Result<(), ImportError> {
        if count > self.limits.max_waypoints {
            return Err(ImportError::TooManyWaypoints {
                count,
                max: self.limits.max_waypoints,
            });
        }
        Ok(())
    }

    fn replace(
        &self,
        sync: &mut WaypointSync,
        coordinates: Vec<Coordinate>,
    ) -> Result<Vec<WaypointSlot>, ImportError> {
        sync.dispatch(WaypointEvent::ImportRequested { coordinates })?;
        Ok(sync.store().slots().to_vec())
    }
}

fn parse_url(text: &str) -> Option<Url> {
    if let Ok(url) = Url::parse(text) {
        return Some(url);
    }
    // Relative paths as produced against a proxied base such as `/api`.
    Url::parse("http://localhost/").ok()?.join(text).ok()
}
