//! Coordinate value type and its text codec.
//!
//! The backend's wire form is `lon,lat` with six decimal places. Imported
//! rows may come in either axis order, so this module also carries the
//! row splitting and axis-order sniffing used by the importer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decimal places used on the wire.
pub const WIRE_PRECISION: usize = 6;

/// Rows inspected when guessing the axis order of headerless input.
const SAMPLE_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("invalid coordinate format: {input:?} (expected \"lon,lat\")")]
    InvalidFormat { input: String },

    #[error("coordinate out of range: lon {lon}, lat {lat}")]
    OutOfRange { lon: f64, lat: f64 },
}

/// A geographic point. Always finite and within the WGS84 ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    lon: f64,
    lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Result<Self, CoordinateError> {
        let in_range = lon.is_finite()
            && lat.is_finite()
            && (-180.0..=180.0).contains(&lon)
            && (-90.0..=90.0).contains(&lat);
        if in_range {
            Ok(Self { lon, lat })
        } else {
            Err(CoordinateError::OutOfRange { lon, lat })
        }
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// True if both axes agree within `tolerance` degrees.
    pub fn approx_eq(&self, other: &Coordinate, tolerance: f64) -> bool {
        (self.lon - other.lon).abs() <= tolerance && (self.lat - other.lat).abs() <= tolerance
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.prec$},{:.prec$}",
            self.lon,
            self.lat,
            prec = WIRE_PRECISION
        )
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl TryFrom<[f64; 2]> for Coordinate {
    type Error = CoordinateError;

    fn try_from(value: [f64; 2]) -> Result<Self, Self::Error> {
        Coordinate::new(value[0], value[1])
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(value: Coordinate) -> Self {
        [value.lon, value.lat]
    }
}

/// Renders the `lon,lat` wire form.
pub fn format(coord: &Coordinate) -> String {
    coord.to_string()
}

/// Parses the `lon,lat` wire form. Surrounding whitespace is ignored.
pub fn parse(text: &str) -> Result<Coordinate, CoordinateError> {
    let invalid = || CoordinateError::InvalidFormat {
        input: text.to_string(),
    };

    let mut parts = text.trim().split(',');
    let (Some(lon), Some(lat), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;

    Coordinate::new(lon, lat)
}

/// Column order of an imported row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    LatLon,
    LonLat,
}

impl AxisOrder {
    pub fn lat_first(self) -> bool {
        self == AxisOrder::LatLon
    }
}

/// Result of sniffing an imported payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowFormat {
    pub has_header: bool,
    pub order: AxisOrder,
}

/// A header line starts with a letter or a quote.
pub fn looks_like_header(line: &str) -> bool {
    line.trim_start()
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '"' || c == '\'')
}

/// Splits a row on comma, semicolon or tab and strips one layer of quotes
/// from each cell.
pub fn split_row(line: &str) -> Vec<&str> {
    line.split([',', ';', '\t'])
        .map(|cell| {
            let cell = cell.trim();
            let cell = cell.strip_prefix(['"', '\'']).unwrap_or(cell);
            cell.strip_suffix(['"', '\'']).unwrap_or(cell)
        })
        .collect()
}

/// Parses one imported row in the given axis order. Extra columns are
/// ignored.
pub fn parse_row(line: &str, order: AxisOrder) -> Result<Coordinate, CoordinateError> {
    let cells = split_row(line);
    let invalid = || CoordinateError::InvalidFormat {
        input: line.to_string(),
    };
    if cells.len() < 2 {
        return Err(invalid());
    }
    let first: f64 = cells[0].parse().map_err(|_| invalid())?;
    let second: f64 = cells[1].parse().map_err(|_| invalid())?;

    match order {
        AxisOrder::LatLon => Coordinate::new(second, first),
        AxisOrder::LonLat => Coordinate::new(first, second),
    }
}

/// Reads the axis order from header column names. Returns `None` when the
/// header names neither axis.
pub fn detect_from_header(header: &str) -> Option<AxisOrder> {
    let columns: Vec<String> = split_row(header)
        .into_iter()
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let lat_idx = columns.iter().position(|c| c.contains("lat"));
    let lon_idx = columns
        .iter()
        .position(|c| c.contains("lon") || c.contains("lng"));

    match (lat_idx, lon_idx) {
        (Some(lat), Some(lon)) if lon < lat => Some(AxisOrder::LonLat),
        (Some(_), Some(_)) => Some(AxisOrder::LatLon),
        (Some(lat), None) if lat > 0 => Some(AxisOrder::LonLat),
        (Some(_), None) => Some(AxisOrder::LatLon),
        (None, Some(0)) => Some(AxisOrder::LonLat),
        (None, Some(_)) => Some(AxisOrder::LatLon),
        (None, None) => None,
    }
}

/// Guesses the axis order from up to five data rows.
///
/// A first column within ±90 votes lat-first; a first column in (90, 180]
/// votes lon-first; a second column in (90, 180] also votes lat-first.
/// Ties go to lat-first, so data where both columns stay within ±90 is
/// read as `lat,lon` whether or not that is right.
pub fn detect_from_rows<S: AsRef<str>>(rows: &[S]) -> AxisOrder {
    let mut lat_first = 0usize;
    let mut lon_first = 0usize;

    for row in rows.iter().take(SAMPLE_ROWS) {
        let cells = split_row(row.as_ref());
        if cells.len() < 2 {
            continue;
        }
        let (Ok(first), Ok(second)) = (cells[0].parse::<f64>(), cells[1].parse::<f64>()) else {
            continue;
        };

        if first.abs() <= 90.0 {
            lat_first += 1;
        }
        if first.abs() > 90.0 && first.abs() <= 180.0 {
            lon_first += 1;
        }
        if second.abs() > 90.0 && second.abs() <= 180.0 {
            lat_first += 1;
        }
    }

    if lat_first >= lon_first {
        AxisOrder::LatLon
    } else {
        AxisOrder::LonLat
    }
}

/// Detects header presence and axis order for a list of non-blank lines.
pub fn detect_row_format<S: AsRef<str>>(lines: &[S]) -> RowFormat {
    let Some(first) = lines.first() else {
        return RowFormat {
            has_header: false,
            order: AxisOrder::LatLon,
        };
    };

    if looks_like_header(first.as_ref()) {
        let order = detect_from_header(first.as_ref()).unwrap_or(AxisOrder::LatLon);
        RowFormat {
            has_header: true,
            order,
        }
    } else {
        RowFormat {
            has_header: false,
            order: detect_from_rows(lines),
        }
    }
}
