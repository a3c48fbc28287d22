//! The last successful request, kept for copy/export.

use std::sync::Arc;

use tracing::warn;

use crate::request::RequestDescriptor;

#[derive(Debug, Clone)]
pub struct RoutingUrlSession {
    current: Option<Arc<RequestDescriptor>>,
    max_url_length: usize,
}

impl RoutingUrlSession {
    pub fn new(max_url_length: usize) -> Self {
        Self {
            current: None,
            max_url_length,
        }
    }

    pub fn record(&mut self, descriptor: Arc<RequestDescriptor>) {
        self.current = Some(descriptor);
    }

    pub fn current(&self) -> Option<&RequestDescriptor> {
        self.current.as_deref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// The request URL, ready to paste back into the URL import. Long URLs
    /// are returned whole; some browsers and proxies may cut them.
    pub fn to_shareable_text(&self) -> Option<String> {
        let url = self.current.as_ref()?.to_url();
        if url.len() > self.max_url_length {
            warn!(
                length = url.len(),
                max = self.max_url_length,
                "shareable URL is longer than most clients accept"
            );
        }
        Some(url)
    }
}

impl Default for RoutingUrlSession {
    fn default() -> Self {
        Self::new(2048)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::Coordinate;
    use crate::request::{RouteOptions, RouteRequestBuilder};

    fn descriptor() -> RequestDescriptor {
        let coords = [
            Coordinate::new(7.4197, 43.7311).unwrap(),
            Coordinate::new(7.4246, 43.7384).unwrap(),
        ];
        RouteRequestBuilder::new("http://localhost:5000")
            .build(&coords, &RouteOptions::default())
            .unwrap()
    }

    #[test]
    fn test_empty_session_has_no_text() {
        let session = RoutingUrlSession::default();
        assert!(session.current().is_none());
        assert!(session.to_shareable_text().is_none());
    }

    #[test]
    fn test_record_and_share() {
        let mut session = RoutingUrlSession::new(16);
        let descriptor = descriptor();
        session.record(Arc::new(descriptor.clone()));

        assert_eq!(session.current(), Some(&descriptor));
        // Over the limit still yields the full URL.
        assert_eq!(session.to_shareable_text(), Some(descriptor.to_url()));

        session.clear();
        assert!(session.current().is_none());
    }
}
