//! Cached, fail-soft gateways over the three external data feeds
//!
//! Every gateway method follows the same contract: consult the cache first
//! and answer without a network call while the entry is fresh; on a miss,
//! call the remote API with a bounded timeout and write through; on failure,
//! degrade to [`Availability::Unavailable`](crate::error::Availability)
//! instead of inventing a value. The single sanctioned exception is the
//! carbon gateway's explicitly tagged stale-cache fallback for the current
//! reading.

mod billing;
mod carbon;
mod power;

pub use billing::BillingGateway;
pub use carbon::{zone_for_region, CarbonGateway, DEFAULT_ZONE};
pub use power::{location_hint_for_region, PowerGateway};
