/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of CBMTAPE, a Rust library for Commodore tape pulse codecs.

    For the full copyright notice, see the lib.rs file.
*/
//! Pull mode container decoding.
use core::num::NonZeroU32;
use core::time::Duration;
use std::io::{self, Error, ErrorKind, Read, Result, Seek, SeekFrom};

#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

use cbmtape_core::pulse::StreamParams;

use crate::error::TapeError;
use crate::framing::PulseFramer;
use crate::header::{ContainerHeader, HEADER_SIZE};
use crate::overflow::PulseScale;

const READ_CHUNK_SIZE: usize = 4096;

/// Reads pulses of a *TAP* or *DMP* container from a [Read] implementation.
///
/// The header is read and validated by [PulseReader::try_new]. Pulses are then read on demand
/// with [PulseReader::read_pulse] or by iterating.
///
/// The iterator stops on the first error, which can be inspected with [PulseReader::err].
/// Errors of the container format are converted to [io::Error] and can be recovered with
/// [IoErrorExt][crate::error::IoErrorExt].
#[derive(Debug)]
pub struct PulseReader<R> {
    rd: R,
    header: ContainerHeader,
    framer: PulseFramer,
    chunk: Box<[u8]>,
    err: Option<Error>
}

impl<R: Read> PulseReader<R> {
    /// Reads the container header from `rd` and creates a new reader.
    ///
    /// The `scale` applies to *TAP* pulses.
    pub fn try_new(rd: R, scale: PulseScale) -> Result<Self> {
        let mut framer = PulseFramer::new(scale);
        let mut rd = rd;
        let mut chunk = vec![0u8; READ_CHUNK_SIZE].into_boxed_slice();
        let header = loop {
            match framer.poll_header().map(|header| *header) {
                Ok(header) => break header,
                Err(TapeError::TruncatedInput) if !framer.is_finished() => {
                    fill_framer(&mut rd, &mut framer, &mut chunk[..HEADER_SIZE])?
                }
                Err(err) => return Err(err.into())
            }
        };
        Ok(PulseReader { rd, header, framer, chunk, err: None })
    }
    /// Reads the next pulse.
    ///
    /// Returns `Ok(None)` at the end of the container.
    pub fn read_pulse(&mut self) -> Result<Option<NonZeroU32>> {
        loop {
            match self.framer.next_pulse() {
                Ok(pulse) => return Ok(pulse),
                Err(TapeError::TruncatedInput) if !self.framer.is_finished() => {
                    fill_framer(&mut self.rd, &mut self.framer, &mut self.chunk)?
                }
                Err(err) => return Err(err.into())
            }
        }
    }
}

impl<R> PulseReader<R> {
    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn stream_params(&self) -> StreamParams {
        self.header.stream_params(self.framer.scale())
    }
    /// Returns the playback time of all pulses read so far.
    pub fn elapsed(&self) -> Duration {
        self.framer.elapsed()
    }
    /// Returns the position of the next pulse in the container.
    pub fn byte_offset(&self) -> u64 {
        self.framer.byte_offset()
    }
    /// Returns the error which stopped the iteration if there was one.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }
    /// Returns `true` if the iteration has stopped.
    pub fn is_done(&self) -> bool {
        self.err.is_some() || self.framer.is_done()
    }

    pub fn get_ref(&self) -> &R {
        &self.rd
    }
    /// Reading from the returned reader directly will corrupt the pulse stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.rd
    }

    pub fn into_inner(self) -> R {
        self.rd
    }
}

impl<R: Seek> PulseReader<R> {
    /// Repositions the inner reader to the first pulse.
    pub fn rewind(&mut self) -> Result<()> {
        self.rd.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        if !self.framer.rewind_pulses() {
            return Err(Error::new(ErrorKind::Other, "no header to rewind to"))
        }
        self.err = None;
        Ok(())
    }
}

impl<R: Read> Iterator for PulseReader<R> {
    type Item = NonZeroU32;

    fn next(&mut self) -> Option<NonZeroU32> {
        if self.err.is_some() {
            return None
        }
        match self.read_pulse() {
            Ok(pulse) => pulse,
            Err(err) => {
                error!("pulse reader: {}", err);
                self.err = Some(err);
                None
            }
        }
    }
}

/// Pushes bytes read from `rd` into the `framer` or finishes it at the end of input.
fn fill_framer<R: Read>(rd: &mut R, framer: &mut PulseFramer, chunk: &mut [u8]) -> Result<()> {
    let len = loop {
        match rd.read(chunk) {
            Ok(len) => break len,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e)
        }
    };
    if len == 0 {
        framer.finish();
    }
    else {
        framer.push_bytes(&chunk[..len]);
    }
    Ok(())
}
