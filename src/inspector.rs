//! One inspector session: waypoints, options, backend and views wired
//! together.
//!
//! Nothing here is global. A session is built at start-up, reset by
//! [`Inspector::clear`], and dropped with its views.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::InspectorConfig;
use crate::executor::{QueryError, RequeryDebounce, RouteQueryExecutor, RouteSuccess};
use crate::import::{BulkImporter, ImportError, UrlImport};
use crate::profile::{self, DetectedProfile, ProfileTracker};
use crate::request::{RouteOptions, RouteRequestBuilder};
use crate::session::RoutingUrlSession;
use crate::sync::{Reaction, SyncError, WaypointEvent, WaypointSync};
use crate::traits::{InputView, MarkerView, NoopView, RouteBackend, RouteRenderer};
use crate::waypoints::WaypointSlot;

pub struct Inspector<B> {
    sync: WaypointSync,
    options: RouteOptions,
    tracker: ProfileTracker,
    builder: RouteRequestBuilder,
    executor: Arc<RouteQueryExecutor<B>>,
    session: RoutingUrlSession,
    importer: BulkImporter,
    debounce: RequeryDebounce,
    renderer: Box<dyn RouteRenderer>,
    config: InspectorConfig,
}

impl<B: RouteBackend> Inspector<B> {
    /// A headless session.
    pub fn new(backend: B, config: InspectorConfig) -> Self {
        Self::with_views(
            backend,
            config,
            Box::new(NoopView),
            Box::new(NoopView),
            Box::new(NoopView),
        )
    }

    pub fn with_views(
        backend: B,
        config: InspectorConfig,
        inputs: Box<dyn InputView>,
        markers: Box<dyn MarkerView>,
        renderer: Box<dyn RouteRenderer>,
    ) -> Self {
        let tracker = ProfileTracker::new(&config.profiles);
        let mut options = RouteOptions {
            auto_requery: config.auto_requery,
            ..RouteOptions::default()
        };
        tracker.apply_to(&mut options);

        let mut sync = WaypointSync::new(inputs, markers);
        sync.push_store_to_views();

        Self {
            sync,
            options,
            tracker,
            builder: RouteRequestBuilder::new(config.osrm.base_url.clone()),
            executor: Arc::new(RouteQueryExecutor::new(backend, config.overlap)),
            session: RoutingUrlSession::new(config.max_url_length),
            importer: BulkImporter::new(config.import.clone()),
            debounce: RequeryDebounce::new(Duration::from_millis(config.requery_debounce_ms)),
            renderer,
            config,
        }
    }

    pub fn waypoints(&self) -> &WaypointSync {
        &self.sync
    }

    pub fn options(&self) -> &RouteOptions {
        &self.options
    }

    pub fn profile_tracker(&self) -> &ProfileTracker {
        &self.tracker
    }

    pub fn session(&self) -> &RoutingUrlSession {
        &self.session
    }

    /// Shared handle for running queries off the session thread.
    pub fn executor(&self) -> Arc<RouteQueryExecutor<B>> {
        Arc::clone(&self.executor)
    }

    /// Applies a waypoint event and, when the route input moved and
    /// auto-requery is on, arms the debounce.
    pub fn dispatch(
        &mut self,
        event: WaypointEvent,
        now: Instant,
    ) -> Result<Reaction, SyncError> {
        let cleared = matches!(event, WaypointEvent::Cleared);
        let reaction = self.sync.dispatch(event)?;

        if cleared {
            self.reset_route();
        } else if reaction.wants_requery() {
            self.schedule_requery(now);
        }
        Ok(reaction)
    }

    /// Drops waypoints, the drawn route and the recorded request.
    pub fn clear(&mut self) -> Result<(), SyncError> {
        self.sync.dispatch(WaypointEvent::Cleared)?;
        self.reset_route();
        Ok(())
    }

    /// Runs the debounced auto-requery if its window has passed.
    pub fn tick(&mut self, now: Instant) -> Option<Result<RouteSuccess, QueryError>> {
        if !self.debounce.poll(now) {
            return None;
        }
        if self.sync.store().snapshot_ordered_coordinates().len() < 2 {
            debug!("skipping auto-requery with fewer than 2 waypoints");
            return None;
        }
        Some(self.find_route())
    }

    /// Routes the current waypoints with the active profile, falling back
    /// to the configured profiles if it is rejected. A fallback that answers
    /// becomes the active profile.
    pub fn find_route(&mut self) -> Result<RouteSuccess, QueryError> {
        self.debounce.cancel();
        let coords = self.sync.store().snapshot_ordered_coordinates();
        let primary = self.builder.build(&coords, &self.options)?;
        let fallbacks = self.builder.build_fallback_sequence(
            &coords,
            &self.options,
            &self.config.profiles.fallback_profiles,
        )?;

        let success = self.executor.execute(primary, fallbacks)?;
        if success.used_fallback() {
            info!(
                rejected = %self.options.profile,
                profile = success.descriptor.profile(),
                "keeping fallback profile"
            );
            self.tracker.adopt_fallback(success.descriptor.profile());
            self.tracker.apply_to(&mut self.options);
        }
        self.session.record(Arc::clone(&success.descriptor));
        self.renderer
            .draw_route(&success.response, success.descriptor.profile());
        if let Some(route) = success.response.primary_route() {
            info!(summary = %route.summary(), "route drawn");
        }
        Ok(success)
    }

    pub fn import_csv(
        &mut self,
        raw: &str,
        now: Instant,
    ) -> Result<Vec<WaypointSlot>, ImportError> {
        let slots = self.importer.import_csv(&mut self.sync, raw)?;
        self.schedule_requery(now);
        Ok(slots)
    }

    /// Adopts a pasted request URL: its waypoints, its profile as a manual
    /// override, and its curb and departure settings.
    pub fn import_url(
        &mut self,
        text: &str,
        now: Instant,
    ) -> Result<(UrlImport, Vec<WaypointSlot>), ImportError> {
        let (parsed, slots) = self.importer.import_from_request_url(&mut self.sync, text)?;
        self.tracker.set_manual(parsed.profile.clone());
        self.tracker.apply_to(&mut self.options);
        self.options.curb_enabled = parsed.curb;
        self.options.departure_time = parsed.departure_time;
        self.schedule_requery(now);
        Ok((parsed, slots))
    }

    pub fn set_profile(&mut self, profile: impl Into<String>, now: Instant) {
        self.tracker.set_manual(profile);
        self.tracker.apply_to(&mut self.options);
        self.schedule_requery(now);
    }

    pub fn clear_profile_override(&mut self) {
        self.tracker.clear_override();
    }

    pub fn set_departure_time(&mut self, departure_time: Option<DateTime<Utc>>, now: Instant) {
        self.options.departure_time = departure_time;
        self.schedule_requery(now);
    }

    pub fn set_curb(&mut self, enabled: bool, now: Instant) {
        self.options.curb_enabled = enabled;
        self.schedule_requery(now);
    }

    pub fn set_auto_requery(&mut self, enabled: bool) {
        self.options.auto_requery = enabled;
        if !enabled {
            self.debounce.cancel();
        }
    }

    pub fn shareable_url(&self) -> Option<String> {
        self.session.to_shareable_text()
    }

    fn schedule_requery(&mut self, now: Instant) {
        if self.options.auto_requery {
            self.debounce.request(now);
        }
    }

    fn reset_route(&mut self) {
        self.debounce.cancel();
        self.session.clear();
        self.renderer.clear_route();
    }
}

impl<B: RouteBackend + Sync> Inspector<B> {
    /// Polls the backend if the poll interval has passed.
    pub fn poll_status(&mut self, now: Instant) -> Option<DetectedProfile> {
        if !self.tracker.poll_due(now) {
            return None;
        }
        Some(self.refresh_profile(now))
    }

    /// Polls the backend now, whatever the interval says.
    pub fn refresh_profile(&mut self, now: Instant) -> DetectedProfile {
        let token = self.tracker.begin_poll(now);
        let detected = profile::detect_profile(self.executor.backend(), &self.config.profiles);
        if self.tracker.finish_poll(token, detected.clone()) {
            info!(profile = self.tracker.profile(), "active profile changed");
        }
        self.tracker.apply_to(&mut self.options);
        detected
    }
}
