/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of CBMTAPE, a Rust library for Commodore tape pulse codecs.

    For the full copyright notice, see the lib.rs file.
*/
//! Errors of the tape container codecs.
use core::fmt;
use std::io;

/// Identifies the header field that failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeaderFault {
    /// Unrecognized signature.
    Signature,
    /// Version not supported by the format.
    Version(u8),
    /// Machine not in the allowed set.
    Machine(u8),
    /// Video standard not in the allowed set.
    VideoStandard(u8),
    /// *DMP* bits per sample not in `1..=32`.
    BitsPerSample(u8),
}

/// The type of errors returned by the tape container codecs.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TapeError {
    /// The header is invalid. The stream can't be decoded.
    InvalidHeader(HeaderFault),
    /// More bytes are needed to decode the header or the current pulse.
    TruncatedInput,
    /// The requested combination of parameters can't be represented by the container.
    UnsupportedConfiguration(&'static str),
    /// A *DMP* pulse field exceeds the overflow sentinel of its width.
    InvalidPulseField(u32),
    /// The sum of an overflow chain doesn't fit in a pulse.
    PulseTooLong,
}

/// A trait with helpers for extracting [TapeError] from [io::Error].
pub trait IoErrorExt: Sized {
    fn is_tape_error(&self) -> bool {
        self.tape_error_ref().is_some()
    }
    fn into_tape_error(self) -> Option<Box<TapeError>>;
    fn tape_error_ref(&self) -> Option<&TapeError>;
}

impl TapeError {
    /// Returns `true` if more input may resolve this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TapeError::TruncatedInput)
    }
}

impl fmt::Display for HeaderFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderFault::Signature => f.write_str("unrecognized signature"),
            HeaderFault::Version(v) => write!(f, "unsupported version: {}", v),
            HeaderFault::Machine(v) => write!(f, "unknown machine: {}", v),
            HeaderFault::VideoStandard(v) => write!(f, "unknown video standard: {}", v),
            HeaderFault::BitsPerSample(v) => write!(f, "bits per sample out of range: {}", v),
        }
    }
}

impl fmt::Display for TapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TapeError::InvalidHeader(fault) => write!(f, "invalid tape header: {}", fault),
            TapeError::TruncatedInput => f.write_str("tape data truncated"),
            TapeError::UnsupportedConfiguration(what) => write!(f, "unsupported configuration: {}", what),
            TapeError::InvalidPulseField(v) => write!(f, "invalid pulse field value: 0x{:x}", v),
            TapeError::PulseTooLong => f.write_str("pulse overflow chain too long"),
        }
    }
}

impl std::error::Error for TapeError {}

impl From<HeaderFault> for TapeError {
    fn from(fault: HeaderFault) -> Self {
        TapeError::InvalidHeader(fault)
    }
}

impl From<TapeError> for io::Error {
    fn from(err: TapeError) -> Self {
        let kind = match err {
            TapeError::TruncatedInput => io::ErrorKind::UnexpectedEof,
            TapeError::UnsupportedConfiguration(..) => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::InvalidData
        };
        io::Error::new(kind, err)
    }
}

impl IoErrorExt for io::Error {
    fn into_tape_error(self) -> Option<Box<TapeError>> {
        if let Some(inner) = self.into_inner() {
            if let Ok(tape_err) = inner.downcast::<TapeError>() {
                return Some(tape_err)
            }
        }
        None
    }
    fn tape_error_ref(&self) -> Option<&TapeError> {
        if let Some(inner) = self.get_ref() {
            if let Some(tape_err) = inner.downcast_ref::<TapeError>() {
                return Some(tape_err)
            }
        }
        None
    }
}
