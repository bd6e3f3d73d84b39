/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of CBMTAPE, a Rust library for Commodore tape pulse codecs.

    For the full copyright notice, see the lib.rs file.
*/
//! Push mode container decoding.
use core::num::NonZeroU32;
use core::time::Duration;

#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

use cbmtape_core::pulse::{PulseClock, StreamParams};

use crate::error::TapeError;
use crate::header::{ContainerHeader, HEADER_SIZE};
use crate::overflow::{FieldDecode, PulseCodec, PulseScale};

/// The state of [PulseFramer].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FramerState {
    /// Less than [HEADER_SIZE] bytes have been received so far.
    AwaitingHeader,
    /// The header is valid and pulses are being decoded.
    StreamingPulses,
    /// The stream can't be decoded any further.
    Invalid(TapeError)
}

/// Decodes a container from bytes arriving in chunks of any size.
///
/// Bytes are pushed with [PulseFramer::push_bytes] and pulses are pulled with [PulseFramer::next_pulse].
/// When no complete pulse is buffered [TapeError::TruncatedInput] is returned, and the same call
/// can be repeated once more bytes are pushed. After [PulseFramer::finish] there will be no more bytes,
/// so truncated data becomes fatal.
///
/// Any other error is fatal: the framer enters [FramerState::Invalid] and keeps returning the same error
/// until [PulseFramer::reset].
///
/// ```
/// use cbmtape_formats::{framing::PulseFramer, PulseScale, TapeError};
///
/// let mut framer = PulseFramer::new(PulseScale::Cycles);
/// framer.push_bytes(b"C64-TAPE-RAW\x01\x00\x00\x00\x05\x00\x00\x00\x64\x00");
/// assert_eq!(800, framer.next_pulse().unwrap().unwrap().get());
/// assert_eq!(Err(TapeError::TruncatedInput), framer.next_pulse());
/// framer.push_bytes(&[0x10, 0x00, 0x00]);
/// framer.finish();
/// assert_eq!(0x10, framer.next_pulse().unwrap().unwrap().get());
/// assert_eq!(Ok(None), framer.next_pulse());
/// ```
#[derive(Clone, Debug)]
pub struct PulseFramer {
    scale: PulseScale,
    state: FramerState,
    stream: Option<FramedStream>,
    buffer: Vec<u8>,
    cursor: usize,
    offset: u64,
    finished: bool
}

#[derive(Clone, Copy, Debug)]
struct FramedStream {
    header: ContainerHeader,
    codec: PulseCodec,
    clock: PulseClock
}

impl Default for PulseFramer {
    fn default() -> Self {
        PulseFramer::new(PulseScale::default())
    }
}

impl PulseFramer {
    /// Creates a framer. The `scale` applies to *TAP* pulses.
    pub fn new(scale: PulseScale) -> Self {
        PulseFramer {
            scale,
            state: FramerState::AwaitingHeader,
            stream: None,
            buffer: Vec::new(),
            cursor: 0,
            offset: 0,
            finished: false
        }
    }

    pub fn scale(&self) -> PulseScale {
        self.scale
    }

    pub fn state(&self) -> &FramerState {
        &self.state
    }
    /// Returns the header once it has been accepted.
    pub fn header(&self) -> Option<&ContainerHeader> {
        self.stream.as_ref().map(|stream| &stream.header)
    }
    /// Returns the parameters of the pulse stream once the header has been accepted.
    pub fn stream_params(&self) -> Option<StreamParams> {
        self.header().map(|header| header.stream_params(self.scale))
    }
    /// Returns the number of bytes consumed from the beginning of the container.
    ///
    /// The offset advances past the header and past complete pulses only.
    pub fn byte_offset(&self) -> u64 {
        self.offset
    }
    /// Returns the number of bytes pushed but not consumed yet.
    pub fn buffered(&self) -> usize {
        self.buffer.len() - self.cursor
    }
    /// Returns the sum of all pulses decoded so far.
    pub fn samples(&self) -> u64 {
        self.stream.as_ref().map_or(0, |stream| stream.clock.samples())
    }
    /// Returns the playback time of all pulses decoded so far.
    pub fn elapsed(&self) -> Duration {
        self.stream.as_ref().map_or(Duration::ZERO, |stream| stream.clock.elapsed())
    }
    /// Returns `true` if [PulseFramer::finish] has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
    /// Returns `true` if there are no more pulses.
    pub fn is_done(&self) -> bool {
        match self.state {
            FramerState::Invalid(..) => true,
            _ => self.finished && self.buffered() == 0
        }
    }
    /// Appends `bytes` to the input.
    ///
    /// Bytes pushed after [PulseFramer::finish] or after the input has been found invalid are ignored.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        if self.finished {
            warn!("{} bytes pushed after the end of input", bytes.len());
            return
        }
        if let FramerState::Invalid(..) = self.state {
            trace!("{} bytes pushed after invalid input ignored", bytes.len());
            return
        }
        if self.cursor != 0 {
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }
        self.buffer.extend_from_slice(bytes);
    }
    /// Marks the end of input.
    pub fn finish(&mut self) {
        self.finished = true;
    }
    /// Forgets everything, expecting a new container.
    pub fn reset(&mut self) {
        *self = PulseFramer::new(self.scale);
    }
    /// Prepares the framer for decoding pulses of the same container from the beginning.
    ///
    /// Buffered bytes are discarded, so the following bytes must come from the offset [HEADER_SIZE].
    /// Returns `false` and does nothing if the header hasn't been accepted.
    pub fn rewind_pulses(&mut self) -> bool {
        match self.stream.as_mut() {
            Some(stream) => {
                stream.clock.reset();
                stream.codec.reset();
            }
            None => return false
        }
        self.buffer.clear();
        self.cursor = 0;
        self.offset = HEADER_SIZE as u64;
        self.finished = false;
        self.state = FramerState::StreamingPulses;
        true
    }
    /// Validates the header once enough bytes have been pushed.
    ///
    /// Returns the header if it has been accepted now or before.
    pub fn poll_header(&mut self) -> Result<&ContainerHeader, TapeError> {
        match self.state {
            FramerState::AwaitingHeader => {}
            FramerState::Invalid(ref err) => return Err(err.clone()),
            FramerState::StreamingPulses => {
                return self.header().ok_or(TapeError::TruncatedInput)
            }
        }
        let header = match ContainerHeader::parse(&self.buffer[self.cursor..]) {
            Ok(header) => header,
            Err(TapeError::TruncatedInput) if !self.finished => {
                return Err(TapeError::TruncatedInput)
            }
            Err(err) => {
                warn!("container header rejected: {}", err);
                return Err(self.invalidate(err))
            }
        };
        debug!("{} accepted: version: {} machine: {} rate: {}",
            header.kind().description(), header.version(), header.machine(),
            header.stream_params(self.scale).rate);
        self.cursor += HEADER_SIZE;
        self.offset += HEADER_SIZE as u64;
        let clock = header.stream_params(self.scale).clock();
        let codec = PulseCodec::for_header(&header, self.scale);
        self.state = FramerState::StreamingPulses;
        let stream = self.stream.insert(FramedStream { header, codec, clock });
        Ok(&stream.header)
    }
    /// Decodes the next pulse.
    ///
    /// Returns `Ok(None)` at the end of input, after [PulseFramer::finish] has been called.
    ///
    /// # Errors
    /// * [TapeError::TruncatedInput] if more bytes are needed. This is fatal only after [PulseFramer::finish].
    /// * Any error of header parsing or field decoding, which is fatal.
    pub fn next_pulse(&mut self) -> Result<Option<NonZeroU32>, TapeError> {
        if self.state == FramerState::AwaitingHeader {
            self.poll_header()?;
        }
        if let FramerState::Invalid(ref err) = self.state {
            return Err(err.clone())
        }
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Err(TapeError::TruncatedInput)
        };
        loop {
            let bytes = &self.buffer[self.cursor..];
            if bytes.is_empty() && self.finished {
                if let ContainerHeader::Tap(tap) = stream.header {
                    let length = self.offset - HEADER_SIZE as u64;
                    if u64::from(tap.data_length) != length {
                        debug!("TAP data length: {} doesn't match the actual length: {}",
                            tap.data_length, length);
                    }
                }
                return Ok(None)
            }
            match stream.codec.decode_pulse(bytes, self.finished) {
                FieldDecode::Pulse { pulse, consumed } => {
                    self.cursor += consumed;
                    self.offset += consumed as u64;
                    stream.clock.add(pulse);
                    return Ok(Some(pulse))
                }
                FieldDecode::Absorbed { consumed } => {
                    trace!("zero pulse skipped at: {}", self.offset);
                    self.cursor += consumed;
                    self.offset += consumed as u64;
                }
                FieldDecode::NeedMore if !self.finished => {
                    return Err(TapeError::TruncatedInput)
                }
                FieldDecode::NeedMore => {
                    warn!("pulse data truncated at: {}", self.offset);
                    self.state = FramerState::Invalid(TapeError::TruncatedInput);
                    return Err(TapeError::TruncatedInput)
                }
                FieldDecode::Invalid(err) => {
                    warn!("invalid pulse data at: {}: {}", self.offset, err);
                    self.state = FramerState::Invalid(err.clone());
                    return Err(err)
                }
            }
        }
    }

    fn invalidate(&mut self, err: TapeError) -> TapeError {
        self.state = FramerState::Invalid(err.clone());
        err
    }
}
