use std::collections::VecDeque;
use std::io::BufRead;

use super::{Element, ElementSource};
use crate::error::ExtractError;

/// In-memory element source.
///
/// Each slot is either an element or a "not yet available" poll result, which
/// lets callers script the stalls of a live stream.
#[derive(Debug, Default)]
pub struct MemorySource {
    slots: VecDeque<Option<Element>>,
    polled: usize,
}

impl MemorySource {
    pub fn new(elements: impl IntoIterator<Item = Element>) -> Self {
        Self {
            slots: elements.into_iter().map(Some).collect(),
            polled: 0,
        }
    }

    pub fn push(&mut self, element: Element) {
        self.slots.push_back(Some(element));
    }

    /// Queue one poll that yields nothing.
    pub fn push_pending(&mut self) {
        self.slots.push_back(None);
    }

    /// Number of `next_if_available` calls served so far.
    pub fn polled(&self) -> usize {
        self.polled
    }

    pub fn remaining(&self) -> usize {
        self.slots.len()
    }
}

impl ElementSource for MemorySource {
    fn might_have_next(&self) -> bool {
        !self.slots.is_empty()
    }

    fn next_if_available(&mut self) -> Result<Option<Element>, ExtractError> {
        self.polled += 1;
        Ok(self.slots.pop_front().flatten())
    }
}

/// Reads newline-delimited JSON element records from a byte stream.
///
/// This is the on-disk form written by the upstream decoder when it dumps a
/// media stream. Blank lines are keep-alives and surface as "not yet
/// available".
pub struct JsonLinesSource<R> {
    reader: R,
    line: String,
    line_number: usize,
    finished: bool,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
            finished: false,
        }
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> ElementSource for JsonLinesSource<R> {
    fn might_have_next(&self) -> bool {
        !self.finished
    }

    fn next_if_available(&mut self) -> Result<Option<Element>, ExtractError> {
        if self.finished {
            return Ok(None);
        }

        self.line.clear();
        if self.reader.read_line(&mut self.line)? == 0 {
            self.finished = true;
            return Ok(None);
        }
        self.line_number += 1;

        let record = self.line.trim();
        if record.is_empty() {
            return Ok(None);
        }

        serde_json::from_str(record)
            .map(Some)
            .map_err(|e| ExtractError::Decode {
                line: self.line_number,
                reason: e.to_string(),
            })
    }
}
