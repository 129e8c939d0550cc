// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Request queue dispatch strategies.
//!
//! All [`DispatchStrategy`] variants route data through the same
//! [`TransferEngine::transfer()`], they differ only in how requests are taken
//! off the queue and how multi-segment requests are decomposed and completed.
//! A failing request never stops the dispatch loop, the failure is reported
//! through the request's completion and dispatch continues with the next one.

use crate::{
    error::RamdiskIoError,
    request::{IoCompletion, IoRequest},
    transfer::TransferEngine,
};
use std::{collections::VecDeque, fmt};
use tracing::{info, warn};

/// Queue dispatch strategy, fixed per device at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchStrategy {
    /// Fetch a request, transfer its current segment and complete that, keep
    /// the request at the queue head until all of its segments are done.
    Simple,
    /// Fetch a request and transfer all of its segments in order before
    /// signaling one completion for the whole request.
    Full,
    /// Don't queue at all, transfer each segment right away and complete it
    /// individually.
    DirectSegment,
}

impl DispatchStrategy {
    /// The raw request mode value selecting the strategy.
    pub const fn request_mode(&self) -> i32 {
        match self {
            Self::Simple => 0,
            Self::Full => 1,
            Self::DirectSegment => 2,
        }
    }

    /// Map a raw request mode value to the associated strategy, if any.
    pub fn try_from_request_mode(request_mode: i32) -> Option<Self> {
        match request_mode {
            0 => Some(Self::Simple),
            1 => Some(Self::Full),
            2 => Some(Self::DirectSegment),
            _ => None,
        }
    }

    /// Map a raw request mode value to the associated strategy.
    ///
    /// Unknown values fall back to [`Simple`](Self::Simple) with a warning.
    pub fn from_request_mode(request_mode: i32) -> Self {
        match Self::try_from_request_mode(request_mode) {
            Some(strategy) => strategy,
            None => {
                warn!(request_mode, "bad request mode, using simple");
                Self::Simple
            }
        }
    }

    /// Whether requests are queued before getting dispatched.
    pub fn is_queued(&self) -> bool {
        !matches!(self, Self::DirectSegment)
    }

    /// Dispatch newly submitted requests.
    ///
    /// Queued strategies append the `requests` to the `queue` and drain it.
    /// [`DirectSegment`](Self::DirectSegment) bypasses the queue.
    /// Completions are appended to `completions` in the order they're
    /// signaled.
    pub(crate) fn dispatch<I: IntoIterator<Item = IoRequest>>(
        &self,
        queue: &mut RequestQueue,
        requests: I,
        engine: &mut TransferEngine<'_>,
        completions: &mut Vec<IoCompletion>,
    ) {
        match self {
            Self::Simple => {
                queue.extend(requests);
                drain_simple(queue, engine, completions);
            }
            Self::Full => {
                queue.extend(requests);
                drain_full(queue, engine, completions);
            }
            Self::DirectSegment => {
                for request in requests {
                    make_request(request, engine, completions);
                }
            }
        }
    }
}

impl fmt::Display for DispatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Simple => "simple",
            Self::Full => "full",
            Self::DirectSegment => "direct-segment",
        })
    }
}

/// FIFO of submitted, not yet completed requests.
#[derive(Debug, Default)]
pub(crate) struct RequestQueue {
    pending: VecDeque<IoRequest>,
}

impl RequestQueue {
    pub(crate) fn extend<I: IntoIterator<Item = IoRequest>>(&mut self, requests: I) {
        self.pending.extend(requests);
    }

    fn fetch(&mut self) -> Option<IoRequest> {
        self.pending.pop_front()
    }

    fn requeue(&mut self, request: IoRequest) {
        self.pending.push_front(request);
    }

    /// Fail all pending requests with `error`.
    pub(crate) fn fail_all(&mut self, error: RamdiskIoError, completions: &mut Vec<IoCompletion>) {
        completions.extend(self.pending.drain(..).map(|request| request.complete(Err(error))));
    }
}

fn check_request(request: &IoRequest, engine: &TransferEngine<'_>) -> Result<(), RamdiskIoError> {
    let result = request.check_well_formed(engine.sector_size());
    if result.is_err() {
        info!(tag = request.tag(), kind = ?request.kind(), "skip malformed request");
    }
    result
}

fn drain_simple(queue: &mut RequestQueue, engine: &mut TransferEngine<'_>, completions: &mut Vec<IoCompletion>) {
    while let Some(mut request) = queue.fetch() {
        if let Err(e) = check_request(&request, engine) {
            completions.push(request.complete(Err(e)));
            continue;
        }
        if !request.has_remaining_segments() {
            completions.push(request.complete(Ok(())));
            continue;
        }

        // End the current segment only, the remainder gets picked up again by
        // the next fetch.
        match request.transfer_next_segment(engine) {
            Ok(_) => {
                if request.has_remaining_segments() {
                    queue.requeue(request);
                } else {
                    completions.push(request.complete(Ok(())));
                }
            }
            Err(e) => completions.push(request.complete(Err(e))),
        }
    }
}

fn drain_full(queue: &mut RequestQueue, engine: &mut TransferEngine<'_>, completions: &mut Vec<IoCompletion>) {
    while let Some(mut request) = queue.fetch() {
        if let Err(e) = check_request(&request, engine) {
            completions.push(request.complete(Err(e)));
            continue;
        }

        let mut status = Ok(());
        while request.has_remaining_segments() {
            if let Err(e) = request.transfer_next_segment(engine) {
                status = Err(e);
                break;
            }
        }
        completions.push(request.complete(status));
    }
}

fn make_request(request: IoRequest, engine: &mut TransferEngine<'_>, completions: &mut Vec<IoCompletion>) {
    let tag = request.tag();
    if !request.is_storage() {
        info!(tag, kind = ?request.kind(), "skip non-storage request");
        completions.push(request.complete(Err(RamdiskIoError::MalformedRequest)));
        return;
    } else if request.segments().is_empty() {
        completions.push(request.complete(Ok(())));
        return;
    } else if let Err(e) = check_request(&request, engine) {
        // Fail every segment, none gets transferred.
        completions.extend(
            request
                .into_segments()
                .into_iter()
                .enumerate()
                .map(|(index, buffer)| IoCompletion {
                    tag,
                    segment: Some(index),
                    sectors_transferred: 0,
                    status: Err(e),
                    buffers: vec![buffer],
                }),
        );
        return;
    }

    let direction = request.direction();
    let sector_size = engine.sector_size() as u64;
    let mut segment_sector = Some(request.sector());
    for (index, mut buffer) in request.into_segments().into_iter().enumerate() {
        let segment_sectors = buffer.len() as u64 / sector_size;
        let status = match segment_sector {
            Some(segment_sector) => engine.transfer(segment_sector, segment_sectors, &mut buffer, direction),
            None => Err(engine.out_of_bounds(u64::MAX, buffer.len() as u64)),
        };
        segment_sector = segment_sector.and_then(|segment_sector| segment_sector.checked_add(segment_sectors));

        let (sectors_transferred, status) = match status {
            Ok(sectors_transferred) => (sectors_transferred, Ok(())),
            Err(e) => (0, Err(e)),
        };
        completions.push(IoCompletion {
            tag,
            segment: Some(index),
            sectors_transferred,
            status,
            buffers: vec![buffer],
        });
    }
}
