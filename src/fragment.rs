//! Fragment-scoped metadata accumulated while elements stream past.

use std::collections::HashMap;

use crate::mkv::{Element, Tag};

/// Accumulates the tags of the current fragment.
pub trait TagState {
    /// Update internal state from one element. Called for every element.
    fn observe(&mut self, element: &Element);

    /// Value of the first tag named `name` in the current fragment.
    fn tag(&self, name: &str) -> Option<&str>;

    /// Value of the first tag named `name` in the fragment that the most
    /// recent boundary closed.
    fn closed_tag(&self, name: &str) -> Option<&str>;
}

/// Maps a numeric track to its name.
pub trait TrackResolver {
    fn track_name(&self, track_number: u64) -> Option<&str>;
}

/// Tag and track bookkeeping for one media session.
///
/// A boundary moves the live tag set aside and starts an empty one, so a
/// `STOP_STREAMING` or `ContactId` tag never leaks into the next fragment. The
/// set it replaced stays queryable through [`TagState::closed_tag`] until the
/// following boundary. Track entries are replaced per track number and never
/// cleared.
#[derive(Debug, Default, Clone)]
pub struct FragmentMetadata {
    tags: Vec<Tag>,
    closed: Vec<Tag>,
    tracks: HashMap<u64, String>,
    fragments: u64,
}

impl FragmentMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fragment boundaries observed.
    pub fn fragments(&self) -> u64 {
        self.fragments
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }
}

impl TagState for FragmentMetadata {
    fn observe(&mut self, element: &Element) {
        match element {
            Element::FragmentStart { .. } => {
                self.fragments += 1;
                self.closed = std::mem::take(&mut self.tags);
            }
            Element::Tag(tag) => self.tags.push(tag.clone()),
            Element::Track(track) => {
                self.tracks.insert(track.track_number, track.name.clone());
            }
            Element::Frame(_) => {}
        }
    }

    fn tag(&self, name: &str) -> Option<&str> {
        first_value(&self.tags, name)
    }

    fn closed_tag(&self, name: &str) -> Option<&str> {
        first_value(&self.closed, name)
    }
}

fn first_value<'a>(tags: &'a [Tag], name: &str) -> Option<&'a str> {
    tags.iter()
        .find(|t| t.name == name)
        .map(|t| t.value.as_str())
}

impl TrackResolver for FragmentMetadata {
    fn track_name(&self, track_number: u64) -> Option<&str> {
        self.tracks.get(&track_number).map(String::as_str)
    }
}
