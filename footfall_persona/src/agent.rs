//! User-agent strings, weighted by device class.

use rand::{distr::weighted::WeightedIndex, prelude::Distribution, seq::IndexedRandom};

const DESKTOP_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0",
];

const MOBILE_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; SM-G991B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Android 14; Mobile; rv:127.0) Gecko/127.0 Firefox/127.0",
];

const TABLET_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (iPad; CPU OS 17_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 13; SM-X906C) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Linux; Android 12; Lenovo TB-X606F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
];

/// Device classes a visit can browse from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// Desktop browsers.
    Desktop,
    /// Phone browsers.
    Mobile,
    /// Tablet browsers.
    Tablet,
}

const CLASSES: [DeviceClass; 3] = [
    DeviceClass::Desktop,
    DeviceClass::Mobile,
    DeviceClass::Tablet,
];

// Rough desktop/mobile/tablet split, one weight per entry in `CLASSES`.
const CLASS_WEIGHTS: [u32; 3] = [60, 30, 10];

/// Pool of plausible user-agent strings, sampled by device-class weight.
#[derive(Debug)]
pub struct AgentPool {
    class_weights: WeightedIndex<u32>,
}

impl AgentPool {
    /// Create a pool with the built-in device-class weights.
    #[must_use]
    pub fn new() -> Self {
        Self {
            class_weights: WeightedIndex::new(CLASS_WEIGHTS)
                .expect("static class weights are non-zero"),
        }
    }

    /// Draw a user-agent string, weighting the device class first.
    pub fn sample<R>(&self, rng: &mut R) -> &'static str
    where
        R: rand::Rng + ?Sized,
    {
        let class = CLASSES[self.class_weights.sample(rng)];
        self.sample_for(rng, class)
    }

    /// Draw a user-agent string for a specific device class.
    pub fn sample_for<R>(&self, rng: &mut R, class: DeviceClass) -> &'static str
    where
        R: rand::Rng + ?Sized,
    {
        let pool: &[&'static str] = match class {
            DeviceClass::Desktop => &DESKTOP_AGENTS,
            DeviceClass::Mobile => &MOBILE_AGENTS,
            DeviceClass::Tablet => &TABLET_AGENTS,
        };
        *pool.choose(rng).expect("agent pools are non-empty")
    }
}

impl Default for AgentPool {
    fn default() -> Self {
        Self::new()
    }
}
