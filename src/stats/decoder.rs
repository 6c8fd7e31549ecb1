//! Lazy guidepost decoding

use std::iter::FusedIterator;

use crate::observability::{Event, Logger};

use super::codec::PrefixDecoder;
use super::errors::DecodeError;
use super::guideposts::GuidePostsInfo;

/// One decoded guidepost
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guidepost {
    /// Position in decode order
    pub index: usize,
    pub key: Vec<u8>,
    pub row_count: u64,
    pub byte_count: u64,
    pub timestamp: i64,
}

/// Single-pass iterator over a snapshot's guideposts.
///
/// A malformed or short stream ends the iteration early; the cause is
/// logged once and kept in [`GuidepostDecoder::truncation`].
#[derive(Debug)]
pub struct GuidepostDecoder<'a> {
    info: &'a GuidePostsInfo,
    keys: PrefixDecoder<'a>,
    index: usize,
    truncation: Option<DecodeError>,
}

impl<'a> GuidepostDecoder<'a> {
    pub fn new(info: &'a GuidePostsInfo) -> Self {
        Self {
            info,
            keys: PrefixDecoder::new(info.encoded_keys(), info.max_key_length()),
            index: 0,
            truncation: None,
        }
    }

    /// Number of guideposts produced so far
    pub fn decoded(&self) -> usize {
        self.index
    }

    /// Why decoding stopped before `count`, if it did
    pub fn truncation(&self) -> Option<&DecodeError> {
        self.truncation.as_ref()
    }

    fn is_done(&self) -> bool {
        self.truncation.is_some() || self.index >= self.info.count()
    }

    fn truncate(&mut self, err: DecodeError) {
        let decoded = self.index.to_string();
        let expected = self.info.count().to_string();
        let reason = err.to_string();
        Logger::warn(
            Event::GuidepostDecodeTruncated,
            &[
                ("decoded", decoded.as_str()),
                ("expected", expected.as_str()),
                ("reason", reason.as_str()),
            ],
        );
        self.truncation = Some(err);
    }
}

impl Iterator for GuidepostDecoder<'_> {
    type Item = Guidepost;

    fn next(&mut self) -> Option<Guidepost> {
        if self.is_done() {
            return None;
        }

        let key = match self.keys.next_key() {
            Ok(Some(key)) => key.to_vec(),
            Ok(None) => {
                self.truncate(DecodeError::UnexpectedEof);
                return None;
            }
            Err(err) => {
                self.truncate(err);
                return None;
            }
        };

        let index = self.index;
        self.index += 1;
        Some(Guidepost {
            index,
            key,
            row_count: self.info.row_counts()[index],
            byte_count: self.info.byte_counts()[index],
            timestamp: self.info.timestamps()[index],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.is_done() {
            (0, Some(0))
        } else {
            (0, Some(self.info.count() - self.index))
        }
    }
}

impl FusedIterator for GuidepostDecoder<'_> {}
