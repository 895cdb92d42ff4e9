//! Bridge actor
//!
//! A single task owns the [`SyncController`](crate::controller::SyncController)
//! and drains one channel of [`BridgeRequest`]s. Panel events and module
//! lines share that channel, so everything is handled one at a time, in
//! arrival order, without locks.

mod core;
mod handle;
mod messages;

pub use core::Bridge;
pub use handle::BridgeHandle;
pub use messages::BridgeRequest;
