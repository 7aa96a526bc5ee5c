//! Configuration for ISS detection and handling
//!
//! # Config File Format
//!
//! ```toml
//! [detection]
//! rounds_non_ancient = 26
//! round_window_capacity = 53
//! seconds_between_iss_logs = 300
//! ignored_round = 1200
//! quorum_threshold = "super_majority"
//!
//! [handler]
//! halt_on_any_iss = false
//! dump_state_on_any_iss = false
//! seconds_between_state_dumps = 21600
//! ```
//!
//! Every key is optional.

use crate::domain::{QuorumThreshold, Round};
use crate::error::{IssError, IssResult};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// ISS detector configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssDetectionConfig {
    /// Rounds before a round becomes ancient
    pub rounds_non_ancient: u64,
    /// Rounds held in the window; `None` means `2 * rounds_non_ancient + 1`
    pub round_window_capacity: Option<usize>,
    /// Minimum time between two log lines of the same severity class
    pub seconds_between_iss_logs: u64,
    /// A round whose hashes are never compared (known divergent round)
    pub ignored_round: Option<Round>,
    /// Weight fraction a hash needs to become the consensus hash
    pub quorum_threshold: QuorumThreshold,
}

impl Default for IssDetectionConfig {
    fn default() -> Self {
        Self {
            rounds_non_ancient: 26,
            round_window_capacity: None,
            seconds_between_iss_logs: 300,
            ignored_round: None,
            quorum_threshold: QuorumThreshold::SuperMajority,
        }
    }
}

impl IssDetectionConfig {
    /// Number of rounds the window holds.
    pub fn window_capacity(&self) -> usize {
        self.round_window_capacity
            .unwrap_or_else(|| (2 * self.rounds_non_ancient + 1) as usize)
    }

    pub fn validate(&self) -> IssResult<()> {
        if self.rounds_non_ancient == 0 {
            return Err(IssError::InvalidConfig {
                reason: "rounds_non_ancient must be positive".to_string(),
            });
        }
        if self.round_window_capacity == Some(0) {
            return Err(IssError::InvalidConfig {
                reason: "round_window_capacity must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// ISS handler configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IssHandlerConfig {
    /// Halt even when only another node is in ISS
    pub halt_on_any_iss: bool,
    /// Request a state dump for every ISS, not only fatal ones
    pub dump_state_on_any_iss: bool,
    /// Minimum time between two requested state dumps
    pub seconds_between_state_dumps: u64,
}

impl Default for IssHandlerConfig {
    fn default() -> Self {
        Self {
            halt_on_any_iss: false,
            dump_state_on_any_iss: false,
            seconds_between_state_dumps: 6 * 60 * 60,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    detection: DetectionSection,
    #[serde(default)]
    handler: HandlerSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DetectionSection {
    rounds_non_ancient: Option<u64>,
    round_window_capacity: Option<usize>,
    seconds_between_iss_logs: Option<u64>,
    ignored_round: Option<Round>,
    quorum_threshold: Option<QuorumThreshold>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HandlerSection {
    halt_on_any_iss: Option<bool>,
    dump_state_on_any_iss: Option<bool>,
    seconds_between_state_dumps: Option<u64>,
}

/// Both configuration sections as loaded from TOML
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IssConfigFile {
    pub detection: IssDetectionConfig,
    pub handler: IssHandlerConfig,
}

impl IssConfigFile {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> IssResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| IssError::ConfigLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            IssError::ConfigLoad { reason, .. } => IssError::ConfigLoad {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> IssResult<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| IssError::ConfigLoad {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })?;

        let defaults = IssDetectionConfig::default();
        let d = file.detection;
        let detection = IssDetectionConfig {
            rounds_non_ancient: d.rounds_non_ancient.unwrap_or(defaults.rounds_non_ancient),
            round_window_capacity: d.round_window_capacity,
            seconds_between_iss_logs: d
                .seconds_between_iss_logs
                .unwrap_or(defaults.seconds_between_iss_logs),
            ignored_round: d.ignored_round,
            quorum_threshold: d.quorum_threshold.unwrap_or(defaults.quorum_threshold),
        };
        detection.validate()?;

        let handler_defaults = IssHandlerConfig::default();
        let h = file.handler;
        let handler = IssHandlerConfig {
            halt_on_any_iss: h.halt_on_any_iss.unwrap_or(false),
            dump_state_on_any_iss: h.dump_state_on_any_iss.unwrap_or(false),
            seconds_between_state_dumps: h
                .seconds_between_state_dumps
                .unwrap_or(handler_defaults.seconds_between_state_dumps),
        };

        Ok(Self { detection, handler })
    }
}
