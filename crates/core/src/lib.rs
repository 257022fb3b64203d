//! # VoterInfo Core
//!
//! Domain types, error definitions, and the pub/sub context store for the
//! VoterInfo tool. This crate has **zero framework dependencies** — it defines
//! the domain model that all other crates build against.
//!
//! ## Design Philosophy
//!
//! All components communicate through a shared [`Context`] rather than
//! directly with each other (mediator pattern). API agents write lookup
//! results into the context; consumers subscribe to the keys they care about.
//! The context is an explicit instance handed to every component at
//! construction, never ambient global state.

pub mod civic;
pub mod context;
pub mod error;
pub mod notice;

// Re-export key types at crate root for ergonomics
pub use civic::{Address, CivicInfoResponse, Contest, Status};
pub use context::{Context, SubscriptionId};
pub use error::{ChannelError, Error, Result};
pub use notice::{Notice, NoticeLevel};
