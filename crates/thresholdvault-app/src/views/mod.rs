//! Derived view models.
//!
//! Pure computations from raw snapshots to render-ready values. Nothing in
//! here mutates state or talks to a backend; views are recomputed on read
//! from whatever the containers currently hold.

pub mod heartbeat;
pub mod lifecycle;
pub mod quorum;

pub use heartbeat::{HeartbeatView, Severity, REFRESH_TICK};
pub use lifecycle::{permitted_owner_actions, LifecycleView, OwnerAction};
pub use quorum::QuorumView;
