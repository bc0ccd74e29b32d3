use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownTrack;

/// Track name older producers used for the customer audio channel.
pub const LEGACY_CUSTOMER_TRACK: &str = "Track_audio/L16";

/// Audio directions carried by a call recording stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackName {
    #[serde(rename = "AUDIO_FROM_CUSTOMER")]
    AudioFromCustomer,
    #[serde(rename = "AUDIO_TO_CUSTOMER")]
    AudioToCustomer,
}

impl TrackName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackName::AudioFromCustomer => "AUDIO_FROM_CUSTOMER",
            TrackName::AudioToCustomer => "AUDIO_TO_CUSTOMER",
        }
    }
}

impl fmt::Display for TrackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackName {
    type Err = UnknownTrack;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUDIO_FROM_CUSTOMER" => Ok(TrackName::AudioFromCustomer),
            "AUDIO_TO_CUSTOMER" => Ok(TrackName::AudioToCustomer),
            other => Err(UnknownTrack(other.to_string())),
        }
    }
}

/// Whether a frame on track `resolved` satisfies a request for `requested`.
///
/// The legacy customer track only stands in for `AUDIO_FROM_CUSTOMER`.
pub fn track_matches(requested: &str, resolved: &str) -> bool {
    requested == resolved
        || (resolved == LEGACY_CUSTOMER_TRACK
            && requested == TrackName::AudioFromCustomer.as_str())
}
