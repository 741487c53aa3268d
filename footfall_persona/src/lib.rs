//! Synthetic shopper data for the footfall project.
//!
//! This library produces the raw material a simulated visit consumes: a
//! browser-plausible identity (uuid, user-agent, public IPv4 address) and a
//! randomized demographic profile fetched from an external person-data
//! source.

#![deny(clippy::cargo)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod agent;
pub mod identity;
pub mod profile;

pub use agent::{AgentPool, DeviceClass};
pub use identity::Identity;
pub use profile::{Client, Profile, Source};
