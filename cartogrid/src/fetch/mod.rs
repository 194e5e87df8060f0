//! Fetch worker
//!
//! Consumes [`LoadRequest`](crate::grid::LoadRequest)s from the grid's load
//! channel, fetches tiles from a [`TileSource`](crate::provider::TileSource)
//! with bounded concurrency and delivers the results back to the grid.
//!
//! ```text
//! load channel ──► FetchWorker ──► Semaphore (max_concurrent)
//!                                     │
//!                                 JoinSet task ──► TileSource::fetch
//!                                     │                 │
//!                                     │      select! on request cancellation
//!                                     ▼
//!                        TileGrid::set_tile / TileGrid::abandon
//! ```

mod worker;

pub use worker::{FetchWorker, WorkerStats};
