//! Route query execution with profile fallback.
//!
//! The executor moves `Idle -> InFlight -> Idle` around each query. Only a
//! profile rejection (HTTP 400) walks the fallback list; every other
//! failure is reported as-is. Results of a query that was superseded by a
//! newer one are discarded, keyed by issue order rather than completion
//! order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::request::{RequestDescriptor, RequestError};
use crate::response::RouteResponse;
use crate::traits::{BackendError, RouteBackend};

/// What to do with `execute` while another query is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Refuse the new query.
    Reject,
    /// Run the new query; the older one's result is discarded.
    #[default]
    Supersede,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    InFlight { ticket: u64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("routing with profile {profile:?} failed: {source}")]
    Backend {
        profile: String,
        #[source]
        source: BackendError,
    },

    #[error("routing failed with all profiles: {}", .attempted.join(", "))]
    ExhaustedFallback { attempted: Vec<String> },

    #[error("a route query is already in flight")]
    Busy,

    #[error("query {ticket} was superseded by a newer one")]
    Superseded { ticket: u64 },
}

/// A successful query.
#[derive(Debug, Clone)]
pub struct RouteSuccess {
    /// The descriptor that produced the result, possibly a fallback.
    pub descriptor: Arc<RequestDescriptor>,
    pub response: RouteResponse,
    /// Profiles tried, in order, ending with the winner.
    pub attempted: Vec<String>,
    /// A departure time was requested but the response shows no sign of
    /// time-dependent data.
    pub missing_time_data: bool,
}

impl RouteSuccess {
    pub fn used_fallback(&self) -> bool {
        self.attempted.len() > 1
    }
}

#[derive(Debug, Default)]
struct Inner {
    issued: u64,
    in_flight: Option<u64>,
    last_success: Option<Arc<RequestDescriptor>>,
}

pub struct RouteQueryExecutor<B> {
    backend: B,
    policy: OverlapPolicy,
    inner: Mutex<Inner>,
}

impl<B: RouteBackend> RouteQueryExecutor<B> {
    pub fn new(backend: B, policy: OverlapPolicy) -> Self {
        Self {
            backend,
            policy,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> QueryState {
        match self.lock().in_flight {
            Some(ticket) => QueryState::InFlight { ticket },
            None => QueryState::Idle,
        }
    }

    /// Descriptor of the most recent query that succeeded and was not
    /// superseded.
    pub fn last_success(&self) -> Option<Arc<RequestDescriptor>> {
        self.lock().last_success.clone()
    }

    /// Runs `primary`, then `fallbacks` in order while the backend keeps
    /// rejecting the profile. Always leaves the executor idle unless a
    /// newer query has taken over.
    pub fn execute(
        &self,
        primary: RequestDescriptor,
        fallbacks: Vec<RequestDescriptor>,
    ) -> Result<RouteSuccess, QueryError> {
        let ticket = self.begin()?;
        let outcome = self.run(ticket, primary, fallbacks);
        self.finish(ticket, outcome)
    }

    fn begin(&self) -> Result<u64, QueryError> {
        let mut inner = self.lock();
        if let Some(current) = inner.in_flight {
            if self.policy == OverlapPolicy::Reject {
                debug!(current, "rejecting overlapping route query");
                return Err(QueryError::Busy);
            }
            debug!(current, "superseding in-flight route query");
        }
        inner.issued += 1;
        inner.in_flight = Some(inner.issued);
        Ok(inner.issued)
    }

    fn run(
        &self,
        ticket: u64,
        primary: RequestDescriptor,
        fallbacks: Vec<RequestDescriptor>,
    ) -> Result<(RequestDescriptor, RouteResponse, Vec<String>), QueryError> {
        let mut attempted = Vec::with_capacity(fallbacks.len() + 1);

        for descriptor in std::iter::once(primary).chain(fallbacks) {
            if !attempted.is_empty() && !self.is_current(ticket) {
                return Err(QueryError::Superseded { ticket });
            }
            attempted.push(descriptor.profile().to_string());
            debug!(
                ticket,
                profile = descriptor.profile(),
                url = %descriptor.to_url(),
                "route request"
            );

            match self.backend.fetch_route(&descriptor) {
                Ok(response) => return Ok((descriptor, response, attempted)),
                Err(err) if err.is_profile_rejection() => {
                    warn!(
                        profile = descriptor.profile(),
                        error = %err,
                        "profile rejected, trying next"
                    );
                }
                Err(source) => {
                    warn!(profile = descriptor.profile(), error = %source, "route request failed");
                    return Err(QueryError::Backend {
                        profile: descriptor.profile().to_string(),
                        source,
                    });
                }
            }
        }

        Err(QueryError::ExhaustedFallback { attempted })
    }

    fn finish(
        &self,
        ticket: u64,
        outcome: Result<(RequestDescriptor, RouteResponse, Vec<String>), QueryError>,
    ) -> Result<RouteSuccess, QueryError> {
        let mut inner = self.lock();
        if inner.in_flight != Some(ticket) {
            info!(ticket, "discarding result of superseded route query");
            return Err(QueryError::Superseded { ticket });
        }
        inner.in_flight = None;

        let (descriptor, response, attempted) = outcome?;
        let descriptor = Arc::new(descriptor);
        inner.last_success = Some(Arc::clone(&descriptor));

        let missing_time_data =
            descriptor.departure_time().is_some() && !response.has_time_data();
        if missing_time_data {
            warn!("departure time requested but the response carries no time-dependent data");
        }
        info!(ticket, profile = descriptor.profile(), attempts = attempted.len(), "route found");

        Ok(RouteSuccess {
            descriptor,
            response,
            attempted,
            missing_time_data,
        })
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.lock().in_flight == Some(ticket)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Trailing-edge debounce for automatic re-queries. Each request restarts
/// the quiet window; the query fires once the window passes untouched.
#[derive(Debug, Clone)]
pub struct RequeryDebounce {
    window: Duration,
    pending_since: Option<Instant>,
}

impl RequeryDebounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending_since: None,
        }
    }

    pub fn request(&mut self, now: Instant) {
        self.pending_since = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending_since = None;
    }

    /// True exactly once per burst of requests, after the window elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending_since {
            Some(since) if now.saturating_duration_since(since) >= self.window => {
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }
}
