//! Agents for the VoterInfo tool.
//!
//! Each agent bridges one external collaborator to the shared context:
//! the civic-info agent turns address changes into lookups, the autocomplete
//! agent turns keystrokes into suggestions, and the host channel carries
//! configuration in and resize reports out.

pub mod autocomplete;
pub mod civic_info;
pub mod host;

pub use autocomplete::AutocompleteAgent;
pub use civic_info::{CivicInfoAgent, notice_for_status};
pub use host::{HostChannel, Service};
