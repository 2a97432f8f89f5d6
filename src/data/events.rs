use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use crate::data::cache::{Lookup, StalePolicy, TtlCache};
use crate::data::gamma_api::EventSource;
use crate::data::types::{EventFilter, MarketEvent};

/// Cached bulk event list. A failed refresh serves the last good copy.
pub struct EventFeed {
    source: Arc<dyn EventSource>,
    filter: EventFilter,
    cache: TtlCache<Arc<Vec<MarketEvent>>>,
}

impl EventFeed {
    pub fn new(source: Arc<dyn EventSource>, filter: EventFilter, ttl: Duration) -> Self {
        Self {
            source,
            filter,
            cache: TtlCache::new(ttl, StalePolicy::ServeStale),
        }
    }

    /// Events for the current cycle. Never fails: with no fresh data and no
    /// stale copy the list is empty, and every definition simply finds no match.
    pub async fn load(&self) -> Arc<Vec<MarketEvent>> {
        let key = self.filter.cache_key();
        let result = self
            .cache
            .get_or_fetch(&key, || async {
                self.source.fetch_events(&self.filter).await.map(Arc::new)
            })
            .await;

        match result {
            Ok(Lookup::Hit(events)) => events,
            Ok(lookup) => {
                let stale = lookup.is_stale();
                let events = lookup.into_inner();
                if stale {
                    warn!("Polymarket unavailable, serving {} stale events", events.len());
                } else {
                    info!("Event cache refreshed with {} events", events.len());
                }
                events
            }
            Err(e) => {
                error!("Polymarket fetch error: {:#}", e);
                Arc::new(Vec::new())
            }
        }
    }
}
