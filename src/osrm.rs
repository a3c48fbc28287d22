//! OSRM HTTP adapter for route queries and backend discovery.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::request::RequestDescriptor;
use crate::response::RouteResponse;
use crate::traits::{BackendError, BackendStatus, RouteBackend};

/// Trivial two-point query used to test whether a profile is served.
const PROBE_COORDINATES: &str = "0,0;1,1";

/// Response codes that mean "no route between these points" rather than a
/// problem with the profile. OSRM sends them with HTTP 400.
const NO_ROUTE_CODES: &[&str] = &["NoRoute", "NoSegment", "NoMatch", "NoTrips"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub status_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub status_paths: Vec<String>,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: 10,
            status_timeout_ms: 2000,
            probe_timeout_ms: 1000,
            status_paths: vec![
                "/status".to_string(),
                "/v1/status".to_string(),
                "/".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OsrmConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

impl RouteBackend for OsrmClient {
    fn fetch_route(&self, descriptor: &RequestDescriptor) -> Result<RouteResponse, BackendError> {
        let url = self.endpoint(&descriptor.path_and_query());
        let response = self.client.get(&url).send()?;
        let status = response.status();

        if status == StatusCode::BAD_REQUEST {
            let body = response.text().unwrap_or_default();
            return Err(classify_bad_request(&body, descriptor.profile()));
        }
        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
            });
        }

        let body: RouteResponse = response.json()?;
        if !body.is_ok() {
            return Err(BackendError::NoRoute {
                message: body.message.clone().unwrap_or_default(),
                code: body.code,
            });
        }
        Ok(body)
    }

    fn fetch_status(&self) -> Result<BackendStatus, BackendError> {
        let timeout = Duration::from_millis(self.config.status_timeout_ms);

        for path in &self.config.status_paths {
            let url = self.endpoint(path);
            let result = self
                .client
                .get(&url)
                .timeout(timeout)
                .send()
                .and_then(|resp| resp.error_for_status())
                .and_then(|resp| resp.json::<BackendStatus>());

            match result {
                Ok(status) => {
                    debug!(%url, ?status, "status endpoint answered");
                    return Ok(status);
                }
                Err(err) => debug!(%url, error = %err, "status endpoint failed"),
            }
        }

        Err(BackendError::StatusUnavailable)
    }

    fn probe_profile(&self, profile: &str) -> Result<(), BackendError> {
        let url = self.endpoint(&format!(
            "/route/v1/{}/{}?overview=false",
            profile, PROBE_COORDINATES
        ));
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_millis(self.config.probe_timeout_ms))
            .send()?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status != StatusCode::BAD_REQUEST {
            return Err(BackendError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().unwrap_or_default();
        probe_verdict(&body, profile)
    }
}

#[derive(Debug, Default, Deserialize)]
struct OsrmErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Sorts an HTTP 400 body into "no route between these points" or a
/// rejection of the profile. A body that does not decode counts as a
/// rejection.
fn classify_bad_request(body: &str, profile: &str) -> BackendError {
    let body: OsrmErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = body.code.unwrap_or_default();
    let message = body.message.unwrap_or_else(|| "bad request".to_string());

    if NO_ROUTE_CODES.contains(&code.as_str()) {
        BackendError::NoRoute { code, message }
    } else {
        BackendError::ProfileRejected {
            profile: profile.to_string(),
            message,
        }
    }
}

/// The probe points may lie outside the loaded extract, so a no-route
/// answer still means the profile was accepted.
fn probe_verdict(body: &str, profile: &str) -> Result<(), BackendError> {
    match classify_bad_request(body, profile) {
        BackendError::NoRoute { .. } => Ok(()),
        rejected => Err(rejected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let client = OsrmClient::new(OsrmConfig {
            base_url: "http://osrm:5000/".to_string(),
            ..OsrmConfig::default()
        })
        .unwrap();
        assert_eq!(client.endpoint("/status"), "http://osrm:5000/status");
    }

    #[test]
    fn test_bad_request_with_no_route_code_is_not_a_rejection() {
        for code in NO_ROUTE_CODES {
            let body = format!(r#"{{"code": "{code}", "message": "Could not find a route"}}"#);
            assert_eq!(
                classify_bad_request(&body, "car"),
                BackendError::NoRoute {
                    code: code.to_string(),
                    message: "Could not find a route".to_string(),
                }
            );
        }
    }

    #[test]
    fn test_bad_request_with_other_code_rejects_profile() {
        let body = r#"{"code": "InvalidValue", "message": "Profile van_scpa not found"}"#;
        assert_eq!(
            classify_bad_request(body, "van_scpa"),
            BackendError::ProfileRejected {
                profile: "van_scpa".to_string(),
                message: "Profile van_scpa not found".to_string(),
            }
        );
    }

    #[test]
    fn test_undecodable_bad_request_rejects_profile() {
        for body in ["", "<html>Bad Request</html>", r#"{"code": 400}"#] {
            assert_eq!(
                classify_bad_request(body, "car"),
                BackendError::ProfileRejected {
                    profile: "car".to_string(),
                    message: "bad request".to_string(),
                }
            );
        }
    }

    #[test]
    fn test_probe_no_segment_counts_as_accepted() {
        let body = r#"{"code": "NoSegment", "message": "Could not find a matching segment"}"#;
        assert_eq!(probe_verdict(body, "driving"), Ok(()));
    }

    #[test]
    fn test_probe_other_bad_request_is_rejected() {
        assert!(matches!(
            probe_verdict(r#"{"code": "InvalidUrl"}"#, "hgv"),
            Err(BackendError::ProfileRejected { profile, .. }) if profile == "hgv"
        ));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: OsrmConfig =
            serde_json::from_str(r#"{"base_url": "http://router:5000", "probe_timeout_ms": 500}"#)
                .unwrap();
        assert_eq!(config.base_url, "http://router:5000");
        assert_eq!(config.probe_timeout_ms, 500);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.status_paths.len(), 3);
    }
}
