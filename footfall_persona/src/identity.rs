//! Shopper identity generation.
//!
//! An identity is the fixed half of a shopper: a random uuid, a
//! browser-plausible user-agent and a routable-looking IPv4 address. The
//! demographic half lives in [`crate::profile`] and is only attached when a
//! shopper registers.

use std::net::Ipv4Addr;

use tracing::debug;
use uuid::Uuid;

use crate::agent::AgentPool;

/// Upper bound on IPv4 rejection-sampling attempts. Reserved and private
/// space is a minority of the 32-bit space so this is effectively never hit,
/// but it turns a pathological RNG into an error instead of a spin.
const MAX_IP_ATTEMPTS: u32 = 1_000;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors produced when generating an [`Identity`].
pub enum Error {
    /// No routable IPv4 address was found within the attempt budget.
    #[error("no routable IPv4 address found in {MAX_IP_ATTEMPTS} attempts")]
    AttemptsExhausted,
}

/// The fixed identity fields of a shopper.
///
/// Once created these never change; registration copies them verbatim into
/// the registered shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable unique identifier for the shopper.
    pub id: Uuid,
    /// User-agent string the shopper browses with.
    pub user_agent: String,
    /// Public-looking IPv4 address the shopper browses from.
    pub ip_address: Ipv4Addr,
}

impl Identity {
    /// Generate a fresh identity.
    ///
    /// # Errors
    ///
    /// Function will return an error if IP generation exhausts its retry
    /// budget.
    pub fn generate<R>(rng: &mut R, agents: &AgentPool) -> Result<Self, Error>
    where
        R: rand::Rng + ?Sized,
    {
        Ok(Self {
            id: Uuid::new_v4(),
            user_agent: agents.sample(rng).to_owned(),
            ip_address: random_routable_ipv4(rng)?,
        })
    }
}

/// Sample a uniformly random IPv4 address outside the private-use and
/// reserved ranges.
///
/// Draws a random 32-bit value, interprets it as an address and resamples
/// until the address is routable.
///
/// # Errors
///
/// Function will return an error if no routable address is found within the
/// attempt budget.
pub fn random_routable_ipv4<R>(rng: &mut R) -> Result<Ipv4Addr, Error>
where
    R: rand::Rng + ?Sized,
{
    for attempt in 1..=MAX_IP_ATTEMPTS {
        let addr = Ipv4Addr::from(rng.random::<u32>());
        if is_routable(addr) {
            debug!(%addr, attempt, "generated IP address");
            return Ok(addr);
        }
    }
    Err(Error::AttemptsExhausted)
}

/// True when `addr` is neither private-use nor reserved per the IANA IPv4
/// special-purpose registry.
#[must_use]
pub fn is_routable(addr: Ipv4Addr) -> bool {
    let octets = addr.octets();
    let shared = octets[0] == 100 && (octets[1] & 0b1100_0000) == 64; // 100.64.0.0/10
    let ietf_protocol = octets[0] == 192 && octets[1] == 0 && octets[2] == 0; // 192.0.0.0/24
    let benchmarking = octets[0] == 198 && (octets[1] & 0b1111_1110) == 18; // 198.18.0.0/15
    let future_use = octets[0] >= 240; // 240.0.0.0/4, includes broadcast

    !(octets[0] == 0 // 0.0.0.0/8 "this network"
        || addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_documentation()
        || addr.is_multicast()
        || shared
        || ietf_protocol
        || benchmarking
        || future_use)
}
