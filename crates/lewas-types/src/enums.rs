//! Enumeration types shared across the service.

use serde::{Deserialize, Serialize};

/// Ingestion source of an animal observation.
///
/// The source doubles as the partition label of the animal table's
/// time index: every listing fans out one range query per source.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Entered by a person observing the herd.
    #[default]
    Manual,
    /// Reported by an automated collar or camera sensor.
    Sensor,
}

impl Source {
    /// Every known source, in partition scan order.
    pub const ALL: [Self; 2] = [Self::Manual, Self::Sensor];

    /// The label stored in the `source` attribute.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Sensor => "sensor",
        }
    }
}

impl core::fmt::Display for Source {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
