//! # Contracts
//!
//! Frozen interface contracts shared by every kinestream crate.
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Flow
//! - A [`RecordSource`] scans an upstream log and hands every [`Record`] to a [`RecordHandler`]
//! - The dispatcher fans each record out to the configured [`Receiver`]s
//! - A receiver optionally reshapes the payload, then delivers it through its [`RecordSink`]

mod blueprint;
mod error;
mod receiver;
mod record;
mod sink;
mod source;

pub use blueprint::*;
pub use error::*;
pub use receiver::Receiver;
pub use record::Record;
pub use sink::*;
pub use source::*;

pub use tokio_util::sync::CancellationToken;
