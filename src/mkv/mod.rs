//! mkv - Pre-parsed container elements and the sources that yield them.
//!
//! Binary EBML decoding happens upstream. This module only models the element
//! kinds the extraction core cares about and the pull contract a decoder has to
//! honour.

mod source;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

pub use source::{JsonLinesSource, MemorySource};

/// Tag carrying the contact (call session) identifier of a fragment.
pub const CONTACT_ID_TAG: &str = "ContactId";
/// Tag signalling that the producer has stopped streaming call audio.
pub const STOP_STREAMING_TAG: &str = "STOP_STREAMING";

/// One block of media data belonging to a single track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub track_number: u64,
    pub data: Bytes,
}

impl Frame {
    pub fn new(track_number: u64, data: impl Into<Bytes>) -> Self {
        Self {
            track_number,
            data: data.into(),
        }
    }
}

/// Fragment-scoped key/value metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Track entry mapping a numeric track to its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub track_number: u64,
    pub name: String,
}

impl TrackMetadata {
    pub fn new(track_number: u64, name: impl Into<String>) -> Self {
        Self {
            track_number,
            name: name.into(),
        }
    }
}

/// A parsed container element.
///
/// `FragmentStart` and `Frame` drive the extraction decisions. `Tag` and
/// `Track` only feed the fragment metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    FragmentStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fragment_number: Option<String>,
    },
    Tag(Tag),
    Track(TrackMetadata),
    Frame(Frame),
}

impl Element {
    pub fn fragment_start() -> Self {
        Element::FragmentStart {
            fragment_number: None,
        }
    }

    pub fn tag(name: impl Into<String>, value: impl Into<String>) -> Self {
        Element::Tag(Tag::new(name, value))
    }

    pub fn track(track_number: u64, name: impl Into<String>) -> Self {
        Element::Track(TrackMetadata::new(track_number, name))
    }

    pub fn frame(track_number: u64, data: impl Into<Bytes>) -> Self {
        Element::Frame(Frame::new(track_number, data))
    }
}

/// Pull contract of a streaming container decoder.
///
/// `next_if_available` returns `Ok(None)` when no complete element is buffered
/// yet; callers keep polling for as long as `might_have_next` holds.
pub trait ElementSource {
    fn might_have_next(&self) -> bool;

    fn next_if_available(&mut self) -> Result<Option<Element>, ExtractError>;
}

impl<S: ElementSource + ?Sized> ElementSource for Box<S> {
    fn might_have_next(&self) -> bool {
        (**self).might_have_next()
    }

    fn next_if_available(&mut self) -> Result<Option<Element>, ExtractError> {
        (**self).next_if_available()
    }
}
