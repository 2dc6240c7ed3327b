//! Typed publish/subscribe feeds.
//!
//! Every feed is a bounded fan-out channel: publishing never blocks,
//! each subscriber gets events in publish order, and a subscriber that
//! falls more than a queue's worth behind is dropped with a logged
//! warning rather than stalling the publisher.

pub mod events;
pub mod feed;

pub use events::{
    ChainEvent, ChainHeadEvent, ChainSideEvent, LogsEvent, RemovedLogsEvent, TxPreEvent,
};
pub use feed::{Feed, Subscription};
