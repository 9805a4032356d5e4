//! Bounded crawl pipeline.
//!
//! One producer walks the list pages and feeds discovered artifacts into a
//! bounded queue; a fixed pool of workers drains the queue and materializes
//! each artifact. See [`CrawlEngine`].

mod engine;

pub use engine::{
    CrawlEngine, CrawlStats, DEFAULT_CONCURRENCY, EngineError, MAX_CONCURRENCY, MIN_CONCURRENCY,
};
