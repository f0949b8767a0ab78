//! Chunked transfer framing
//!
//! Bulk payloads (images, character files) cross the link as a run of `Data`
//! packets closed by one `EndData` packet. This module holds the pure part of
//! that: splitting an outbound buffer and reassembling an inbound one into
//! caller-provided memory. Driving the I/O is up to the caller.

use crate::{
    error::{Error, Result},
    packet::{Packet, PacketType},
};

/// Number of packets needed to carry `len` bytes in chunks of `max_payload`
pub fn chunk_count(len: usize, max_payload: usize) -> usize {
    len.div_ceil(max_payload)
}

/// Split `data` into packet-sized chunks
///
/// Every chunk except the last is tagged `Data`; the last is tagged `EndData`.
///
/// # Errors
///
/// Returns `PayloadTooLarge` if `max_payload` is zero or exceeds
/// `Packet::MAX_PAYLOAD_SIZE`.
///
/// # Examples
///
/// ```
/// use zfm_core::{chunk, PacketType};
///
/// let data = [0u8; 300];
/// let chunks: Vec<_> = chunk::split(&data, 128).unwrap().collect();
///
/// assert_eq!(chunks.len(), 3);
/// assert_eq!(chunks[0].0, PacketType::Data);
/// assert_eq!(chunks[2].0, PacketType::EndData);
/// assert_eq!(chunks[2].1.len(), 44);
/// ```
pub fn split(data: &[u8], max_payload: usize) -> Result<Chunks<'_>> {
    if max_payload == 0 || max_payload > Packet::MAX_PAYLOAD_SIZE {
        return Err(Error::PayloadTooLarge {
            size: max_payload,
            max: Packet::MAX_PAYLOAD_SIZE,
        });
    }

    Ok(Chunks {
        inner: data.chunks(max_payload),
        remaining: chunk_count(data.len(), max_payload),
    })
}

/// Iterator over `(packet type, chunk)` pairs produced by [`split`]
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    inner: std::slice::Chunks<'a, u8>,
    remaining: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = (PacketType, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.inner.next()?;
        self.remaining -= 1;

        let packet_type = if self.remaining == 0 {
            PacketType::EndData
        } else {
            PacketType::Data
        };

        Some((packet_type, chunk))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Chunks<'_> {}

/// Outcome of feeding one packet to a [`Reassembler`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Progress {
    /// More data packets are expected
    More,

    /// The `EndData` packet arrived
    Done,
}

/// Reassembles inbound data packets into caller memory
///
/// Once the payload outgrows the destination, further bytes are counted but
/// discarded so the transfer can still be drained to its end; [`finish`]
/// then reports the size that would have been needed.
///
/// [`finish`]: Reassembler::finish
#[derive(Debug)]
pub struct Reassembler<'a> {
    out: &'a mut [u8],
    received: usize,
    packets: usize,
    done: bool,
}

impl<'a> Reassembler<'a> {
    /// Reassemble into `out`; its length is the capacity
    pub fn new(out: &'a mut [u8]) -> Self {
        Self {
            out,
            received: 0,
            packets: 0,
            done: false,
        }
    }

    /// Feed the next received packet
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedPacket` for anything other than `Data`/`EndData`
    /// and `InvalidSessionState` once the transfer is complete.
    pub fn push(&mut self, packet: &Packet) -> Result<Progress> {
        if self.done {
            return Err(Error::InvalidSessionState(
                "data packet after end of transfer".into(),
            ));
        }

        if !packet.packet_type.is_data() {
            return Err(Error::UnexpectedPacket {
                expected: PacketType::Data,
                actual: packet.packet_type,
            });
        }

        let start = self.received;
        let end = start + packet.payload.len();

        if end <= self.out.len() {
            self.out[start..end].copy_from_slice(&packet.payload);
        }

        self.received = end;
        self.packets += 1;

        if packet.is_end_data() {
            self.done = true;
            Ok(Progress::Done)
        } else {
            Ok(Progress::More)
        }
    }

    /// Bytes received so far, including any that did not fit
    pub fn received(&self) -> usize {
        self.received
    }

    /// Packets received so far
    pub fn packets(&self) -> usize {
        self.packets
    }

    /// Check if the payload outgrew the destination
    pub fn overflowed(&self) -> bool {
        self.received > self.out.len()
    }

    /// Complete the transfer, returning the number of bytes written
    ///
    /// # Errors
    ///
    /// Returns `CapacityExceeded` with the full transfer size if the payload
    /// did not fit, and `InvalidSessionState` if `EndData` never arrived.
    pub fn finish(self) -> Result<usize> {
        if !self.done {
            return Err(Error::InvalidSessionState(
                "transfer finished before end of data".into(),
            ));
        }

        if self.overflowed() {
            return Err(Error::CapacityExceeded {
                required: self.received,
                capacity: self.out.len(),
            });
        }

        Ok(self.received)
    }
}
