//! This module controls configuration parsing from the end user, providing
//! a convenience mechanism for the rest of the program.

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::{fs, io};

use serde::Deserialize;

use crate::{reporter, visit};

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },
    /// The product catalog has no items
    #[error("product catalog must not be empty")]
    EmptyCatalog,
    /// A decision's branch weights sum to zero
    #[error("odds for the {decision} decision sum to zero")]
    DegenerateOdds {
        /// Which decision is unusable
        decision: &'static str,
    },
}

fn default_visits() -> u32 {
    1_000
}

fn default_max_concurrency() -> NonZeroU32 {
    NonZeroU32::new(128).expect("128 is non-zero")
}

/// Main configuration struct for this program
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The analytics destinations events fan out to; zero makes reporting
    /// a no-op
    #[serde(default)]
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub destinations: Vec<reporter::SinkConfig>,
    /// The product catalog shoppers browse; must be non-empty
    pub catalog: Vec<String>,
    /// How many visits to simulate
    #[serde(default = "default_visits")]
    pub visits: u32,
    /// Upper bound on concurrently running visits
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: NonZeroU32,
    /// Branch weights for the visit state machine
    #[serde(default)]
    pub odds: visit::Odds,
    /// Where demographic profiles come from
    #[serde(default)]
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub profile_source: footfall_persona::profile::Config,
    /// Master seed for the visit rngs; omit for OS entropy
    pub seed: Option<u64>,
}

impl Config {
    /// Parse a [`Config`] from yaml contents.
    ///
    /// # Errors
    ///
    /// Function will return an error if the yaml does not deserialize or
    /// fails validation.
    pub fn parse(contents: &str) -> Result<Self, Error> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a [`Config`] from a file on disk.
    ///
    /// # Errors
    ///
    /// Function will return an error if the file is unreadable, does not
    /// deserialize or fails validation.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.catalog.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        if let Some(decision) = self.odds.degenerate_decision() {
            return Err(Error::DegenerateOdds { decision });
        }
        Ok(())
    }
}
