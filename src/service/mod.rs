//! Service layer
//!
//! Business logic separated from HTTP handlers. The timeline service
//! orchestrates the follow graph, tweet and timeline stores.

mod timeline;

pub use timeline::{DEFAULT_FANOUT_CONCURRENCY, TIMELINE_DISPLAY_LIMIT, TimelineService};
