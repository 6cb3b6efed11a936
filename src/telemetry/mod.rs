//! Telemetry fan-out and periodic monitoring
//!
//! - `broadcaster` - Subscriber registry and fire-and-forget publish
//! - `sampler` - Background balance sampler and its pause switch

pub mod broadcaster;
pub mod sampler;

pub use broadcaster::{
    Subscription, SubscriberId, TelemetryBroadcaster, DEFAULT_SUBSCRIBER_BUFFER,
};
pub use sampler::{MonitoringSampler, MonitoringSwitch};
