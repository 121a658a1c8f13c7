// osn-archive-fetch/src/lib.rs
// ============================================================================
// Module: OSN Archive Fetch
// Description: Rate-limited crawler, replay pipeline, and legacy backfill.
// Purpose: Drive matches from discovery through canonical replay storage.
// Dependencies: osn-archive-core, osn-archive-store-sqlite, reqwest, tracing
// ============================================================================

//! ## Overview
//! The fetch crate walks the upstream listing one page at a time, records
//! newly discovered matches, downloads and unwraps their replays, and
//! advances each match through the status pipeline. A single rate-limited
//! fetcher serves both activities; the index walker and the replay loop
//! cooperate over two in-process channels. The backfill module feeds the
//! same store from a legacy tab-delimited dump instead of the live listing.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backfill;
pub mod fetcher;
pub mod pipeline;
pub mod walker;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use fetcher::Fetcher;
pub use fetcher::RateLimiter;
pub use fetcher::Upstream;
pub use pipeline::PipelineReport;
pub use walker::WalkOutcome;
