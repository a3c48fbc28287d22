//! Active profile tracking.
//!
//! The backend is polled on a fixed interval for the profile and algorithm
//! it serves. A profile picked by the user wins over every later poll until
//! the override is cleared.

use std::fmt;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::ProfileConfig;
use crate::request::RouteOptions;
use crate::traits::RouteBackend;

/// Where the current profile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    Status,
    Probe,
    Default,
    /// A fallback profile that answered after the active one was rejected.
    Fallback,
    Manual,
}

impl fmt::Display for ProfileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProfileSource::Status => "status endpoint",
            ProfileSource::Probe => "probe",
            ProfileSource::Default => "default",
            ProfileSource::Fallback => "fallback",
            ProfileSource::Manual => "manual",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedProfile {
    pub profile: String,
    pub algorithm: String,
    pub source: ProfileSource,
}

/// Asks the status endpoints first, then probes candidate profiles, then
/// settles for the configured default. Probes run in parallel; the first
/// candidate in configured order that answers wins.
pub fn detect_profile<B>(backend: &B, config: &ProfileConfig) -> DetectedProfile
where
    B: RouteBackend + Sync,
{
    let status = backend.fetch_status().ok();
    let algorithm = status
        .as_ref()
        .and_then(|s| s.reported_algorithm())
        .unwrap_or(config.default_algorithm.as_str())
        .to_string();

    if let Some(profile) = status.as_ref().and_then(|s| s.profile.clone()) {
        info!(%profile, %algorithm, "profile from status endpoint");
        return DetectedProfile {
            profile,
            algorithm,
            source: ProfileSource::Status,
        };
    }

    let answered: Vec<bool> = config
        .probe_profiles
        .par_iter()
        .map(|profile| match backend.probe_profile(profile) {
            Ok(()) => true,
            Err(err) => {
                debug!(%profile, error = %err, "profile probe failed");
                false
            }
        })
        .collect();

    if let Some(profile) = config
        .probe_profiles
        .iter()
        .zip(&answered)
        .find_map(|(profile, ok)| ok.then(|| profile.clone()))
    {
        info!(%profile, "profile from probing");
        return DetectedProfile {
            profile,
            algorithm,
            source: ProfileSource::Probe,
        };
    }

    info!(profile = %config.default_profile, "falling back to default profile");
    DetectedProfile {
        profile: config.default_profile.clone(),
        algorithm,
        source: ProfileSource::Default,
    }
}

/// Issued by [`ProfileTracker::begin_poll`]; a poll result is only applied
/// if no manual change happened since the token was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollToken {
    revision: u64,
}

#[derive(Debug, Clone)]
pub struct ProfileTracker {
    profile: String,
    algorithm: String,
    source: ProfileSource,
    manual: bool,
    revision: u64,
    interval: Duration,
    last_poll: Option<Instant>,
}

impl ProfileTracker {
    pub fn new(config: &ProfileConfig) -> Self {
        Self {
            profile: config.default_profile.clone(),
            algorithm: config.default_algorithm.clone(),
            source: ProfileSource::Default,
            manual: false,
            revision: 0,
            interval: Duration::from_secs(config.poll_interval_secs),
            last_poll: None,
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn source(&self) -> ProfileSource {
        self.source
    }

    pub fn is_overridden(&self) -> bool {
        self.manual
    }

    pub fn poll_due(&self, now: Instant) -> bool {
        self.last_poll
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    pub fn begin_poll(&mut self, now: Instant) -> PollToken {
        self.last_poll = Some(now);
        PollToken {
            revision: self.revision,
        }
    }

    /// Applies a poll result. The algorithm is always taken; the profile
    /// only when the user has not picked one. Returns whether the profile
    /// changed.
    pub fn finish_poll(&mut self, token: PollToken, detected: DetectedProfile) -> bool {
        self.algorithm = detected.algorithm;

        if self.manual || token.revision != self.revision {
            debug!(
                kept = %self.profile,
                polled = %detected.profile,
                "manual profile wins over poll"
            );
            return false;
        }
        let changed = self.profile != detected.profile;
        self.profile = detected.profile;
        self.source = detected.source;
        changed
    }

    pub fn set_manual(&mut self, profile: impl Into<String>) {
        self.profile = profile.into();
        self.source = ProfileSource::Manual;
        self.manual = true;
        self.revision += 1;
    }

    /// Keeps a profile that answered after the active one was rejected.
    /// Unlike a manual pick, the next poll may replace it.
    pub fn adopt_fallback(&mut self, profile: impl Into<String>) {
        self.profile = profile.into();
        self.source = ProfileSource::Fallback;
        self.manual = false;
        self.revision += 1;
    }

    /// Lets the next poll decide the profile again.
    pub fn clear_override(&mut self) {
        self.manual = false;
        self.revision += 1;
    }

    pub fn apply_to(&self, options: &mut RouteOptions) {
        options.profile.clone_from(&self.profile);
        options.algorithm.clone_from(&self.algorithm);
    }
}
