// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! I/O request and completion objects.
//!
//! An [`IoRequest`] owns its data buffers for the duration of its processing,
//! the buffers are returned to the submitter with the [`IoCompletion`].

use crate::{error::RamdiskIoError, transfer::TransferEngine};

/// Data transfer direction, from the submitter's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoDirection {
    /// Transfer from the device into the request's buffers.
    Read,
    /// Transfer from the request's buffers to the device.
    Write,
}

/// Request classification.
///
/// Only [`Storage`](Self::Storage) requests get processed, all other kinds
/// are failed with [`RamdiskIoError::MalformedRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoRequestKind {
    /// Regular sector read or write.
    Storage,
    /// Cache flush.
    Flush,
    /// Driver specific command, e.g. a passthrough packet.
    DriverSpecific(u32),
}

/// Submitted I/O request.
///
/// Consists of an ordered list of segments, each an owned buffer spanning a
/// whole number of sectors. Segment `k` starts at the sector right after the
/// last one covered by segment `k - 1`.
#[derive(Debug)]
pub struct IoRequest {
    tag: u64,
    kind: IoRequestKind,
    direction: IoDirection,
    sector: u64,
    segments: Vec<Vec<u8>>,
    next_segment: usize,
    sectors_transferred: u64,
}

impl IoRequest {
    /// Create a single segment storage request.
    ///
    /// # Arguments:
    ///
    /// * `tag` - Submitter defined value reported back in the completion.
    /// * `direction` - The transfer direction.
    /// * `sector` - The first device sector.
    /// * `buffer` - Source or destination buffer.
    pub fn new(tag: u64, direction: IoDirection, sector: u64, buffer: Vec<u8>) -> Self {
        Self::with_segments(tag, direction, sector, vec![buffer])
    }

    /// Create a multi segment storage request.
    pub fn with_segments(tag: u64, direction: IoDirection, sector: u64, segments: Vec<Vec<u8>>) -> Self {
        Self {
            tag,
            kind: IoRequestKind::Storage,
            direction,
            sector,
            segments,
            next_segment: 0,
            sectors_transferred: 0,
        }
    }

    /// Create a request of some kind other than
    /// [`Storage`](IoRequestKind::Storage).
    pub fn with_kind(tag: u64, kind: IoRequestKind, segments: Vec<Vec<u8>>) -> Self {
        Self {
            tag,
            kind,
            direction: IoDirection::Read,
            sector: 0,
            segments,
            next_segment: 0,
            sectors_transferred: 0,
        }
    }

    pub fn tag(&self) -> u64 {
        self.tag
    }

    pub fn kind(&self) -> IoRequestKind {
        self.kind
    }

    pub fn direction(&self) -> IoDirection {
        self.direction
    }

    /// The request's first device sector.
    pub fn sector(&self) -> u64 {
        self.sector
    }

    pub fn segments(&self) -> &[Vec<u8>] {
        &self.segments
    }

    pub fn is_storage(&self) -> bool {
        self.kind == IoRequestKind::Storage
    }

    /// Check that the request may be passed on to the
    /// [`TransferEngine`].
    ///
    /// # Errors:
    ///
    /// * [`RamdiskIoError::MalformedRequest`] - Not a storage request or some
    ///   segment's length is not a multiple of the `sector_size`.
    pub(crate) fn check_well_formed(&self, sector_size: u32) -> Result<(), RamdiskIoError> {
        if !self.is_storage() {
            return Err(RamdiskIoError::MalformedRequest);
        }
        let sector_size = sector_size as usize;
        if self.segments.iter().any(|segment| segment.len() % sector_size != 0) {
            return Err(RamdiskIoError::MalformedRequest);
        }
        Ok(())
    }

    pub(crate) fn has_remaining_segments(&self) -> bool {
        self.next_segment < self.segments.len()
    }

    /// Transfer the next outstanding segment.
    ///
    /// Returns the number of sectors transferred. The request must have been
    /// [checked](Self::check_well_formed) before and it must
    /// [have remaining segments](Self::has_remaining_segments).
    pub(crate) fn transfer_next_segment(&mut self, engine: &mut TransferEngine<'_>) -> Result<u64, RamdiskIoError> {
        let segment_sector = self
            .sector
            .checked_add(self.sectors_transferred)
            .ok_or_else(|| engine.out_of_bounds(u64::MAX, 0))?;
        let buffer = self
            .segments
            .get_mut(self.next_segment)
            .ok_or(RamdiskIoError::MalformedRequest)?;
        let segment_sectors = buffer.len() as u64 / engine.sector_size() as u64;
        let transferred = engine.transfer(segment_sector, segment_sectors, buffer, self.direction)?;
        self.next_segment += 1;
        self.sectors_transferred += transferred;
        Ok(transferred)
    }

    pub(crate) fn into_segments(self) -> Vec<Vec<u8>> {
        self.segments
    }

    /// Signal the request's completion.
    pub(crate) fn complete(self, status: Result<(), RamdiskIoError>) -> IoCompletion {
        IoCompletion {
            tag: self.tag,
            segment: None,
            sectors_transferred: self.sectors_transferred,
            status,
            buffers: self.segments,
        }
    }
}

/// Completion of an [`IoRequest`] or, for
/// [`DirectSegment`](crate::DispatchStrategy::DirectSegment) dispatch, of one
/// of its segments.
#[derive(Debug)]
pub struct IoCompletion {
    /// The tag of the completed request.
    pub tag: u64,
    /// Index of the completed segment, if the completion is per segment.
    pub segment: Option<usize>,
    /// Number of sectors transferred before completion.
    pub sectors_transferred: u64,
    pub status: Result<(), RamdiskIoError>,
    /// The buffers owned by the completed request or segment, in order. Read
    /// data has been placed there.
    pub buffers: Vec<Vec<u8>>,
}

impl IoCompletion {
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Concatenate the returned buffers.
    pub fn into_data(self) -> Vec<u8> {
        let mut buffers = self.buffers;
        if buffers.len() == 1 {
            return buffers.pop().unwrap_or_default();
        }
        buffers.concat()
    }
}
