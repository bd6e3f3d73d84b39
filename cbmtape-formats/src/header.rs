/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of CBMTAPE, a Rust library for Commodore tape pulse codecs.

    For the full copyright notice, see the lib.rs file.
*/
//! *TAP* and *DMP* container headers.
//!
//! Both headers are 20 bytes long:
//!
//! | offset | *TAP*                              | *DMP*                  |
//! |--------|------------------------------------|------------------------|
//! |  0..12 | `C64-TAPE-RAW` or `C16-TAPE-RAW`   | `DC2N-TAP-RAW`         |
//! |     12 | version: 0, 1 or 2                 | version: 0             |
//! |     13 | machine: 0 C64, 1 VIC-20, 2 C16    | machine                |
//! |     14 | video standard: 0 PAL, 1 NTSC      | video standard         |
//! |     15 | reserved: 0                        | bits per sample: 1..=32|
//! | 16..20 | data length, LE `u32`              | sample rate, LE `u32`  |
//!
//! The sample rate of a *TAP* stream is derived from the machine and the video standard,
//! see [TAP_CLOCK_RATES] and [TAP_COARSE_RATES]. *TAP* version 2 streams consist of half-wave pulses.
use core::convert::TryFrom;
use core::fmt;
use core::num::NonZeroU32;
use core::str::FromStr;

#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use nom::bytes::complete::take;
use nom::error::{ErrorKind, ParseError};
use nom::number::complete::{le_u8, le_u32};
use nom::sequence::tuple;
use nom::{IResult, Err};

use cbmtape_core::pulse::StreamParams;

use crate::error::{TapeError, HeaderFault};
use crate::overflow::PulseScale;

/// The size of every supported container header.
pub const HEADER_SIZE: usize = 20;
/// The size of the signature at the beginning of the header.
pub const SIGNATURE_SIZE: usize = 12;
/// The offset of the *TAP* data length field.
pub const TAP_DATA_LENGTH_OFFSET: usize = 16;

pub const TAP_SIGNATURE_C64: &[u8; SIGNATURE_SIZE] = b"C64-TAPE-RAW";
pub const TAP_SIGNATURE_C16: &[u8; SIGNATURE_SIZE] = b"C16-TAPE-RAW";
pub const DMP_SIGNATURE: &[u8; SIGNATURE_SIZE] = b"DC2N-TAP-RAW";

/// The default *DMP* pulse field width.
pub const DEFAULT_DMP_BITS_PER_SAMPLE: u8 = 16;
/// The maximum *DMP* pulse field width.
pub const MAX_DMP_BITS_PER_SAMPLE: u8 = 32;

/// Machine clock frequencies in Hz, indexed by `[machine][video standard]`.
///
/// *TAP* pulses measured with [PulseScale::Cycles] are clock cycles at these rates.
pub const TAP_CLOCK_RATES: [[NonZeroU32; 2]; 3] = unsafe {[
    [NonZeroU32::new_unchecked(985248),  NonZeroU32::new_unchecked(1022727)], // C64
    [NonZeroU32::new_unchecked(1108405), NonZeroU32::new_unchecked(1022727)], // VIC-20
    [NonZeroU32::new_unchecked(886724),  NonZeroU32::new_unchecked(894886)]   // C16
]};

/// Conventional rates in Hz, roughly 1/8 of the machine clock, indexed by `[machine][video standard]`.
///
/// *TAP* pulses measured with [PulseScale::Coarse] are samples at these rates.
pub const TAP_COARSE_RATES: [[NonZeroU32; 2]; 3] = unsafe {[
    [NonZeroU32::new_unchecked(123156), NonZeroU32::new_unchecked(127840)], // C64
    [NonZeroU32::new_unchecked(138550), NonZeroU32::new_unchecked(127840)], // VIC-20
    [NonZeroU32::new_unchecked(110840), NonZeroU32::new_unchecked(111860)]  // C16
]};

/// The Commodore machine the tape was recorded for.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(try_from = "u8", into = "u8"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Machine {
    C64   = 0,
    Vic20 = 1,
    /// C16 and Plus/4.
    C16   = 2,
}

#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(try_from = "u8", into = "u8"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VideoStandard {
    Pal  = 0,
    Ntsc = 1,
}

/// The *TAP* format version.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(try_from = "u8", into = "u8"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TapVersion {
    /// Long pulses are approximated by zero bytes.
    V0 = 0,
    /// Long pulses are stored in 3 byte fields.
    V1 = 1,
    /// As `V1`, but with half-wave pulses.
    V2 = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Tap,
    Dmp
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TryFromU8MachineError(pub u8);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseMachineError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TryFromU8VideoStandardError(pub u8);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseVideoStandardError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TryFromU8TapVersionError(pub u8);

/// The *TAP* header.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TapHeader {
    pub version: TapVersion,
    pub machine: Machine,
    pub video: VideoStandard,
    /// The number of bytes following the header.
    pub data_length: u32
}

/// The *DMP* header.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DmpHeader {
    machine: Machine,
    video: u8,
    bits_per_sample: u8,
    rate: NonZeroU32
}

/// A header of any supported container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerHeader {
    Tap(TapHeader),
    Dmp(DmpHeader)
}

impl ContainerKind {
    /// Returns a human readable name of the container format.
    pub fn description(self) -> &'static str {
        match self {
            ContainerKind::Tap => "TAP Commodore tape image file",
            ContainerKind::Dmp => "DMP Commodore tape dump file"
        }
    }
}

impl TapVersion {
    /// Returns `true` if pulses of this version are half-waves.
    pub fn is_half_waves(self) -> bool {
        self == TapVersion::V2
    }
}

impl Default for Machine {
    fn default() -> Self {
        Machine::C64
    }
}

impl Default for VideoStandard {
    fn default() -> Self {
        VideoStandard::Pal
    }
}

impl TapHeader {
    /// Creates a version 1 header with the data length 0.
    pub fn new(machine: Machine, video: VideoStandard) -> Self {
        TapHeader { version: TapVersion::V1, machine, video, data_length: 0 }
    }
    /// Creates a header suitable for a pulse stream.
    ///
    /// The version is 2 for `half_waves`, otherwise it's 0 if `force_version_0` is `true` or 1 if it isn't.
    pub fn for_stream(
            machine: Machine,
            video: VideoStandard,
            half_waves: bool,
            force_version_0: bool
        ) -> Self
    {
        let version = if half_waves {
            TapVersion::V2
        }
        else if force_version_0 {
            TapVersion::V0
        }
        else {
            TapVersion::V1
        };
        TapHeader { version, machine, video, data_length: 0 }
    }

    pub fn with_version(mut self, version: TapVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_data_length(mut self, data_length: u32) -> Self {
        self.data_length = data_length;
        self
    }
    /// C16 tapes have their own signature.
    pub fn signature(&self) -> &'static [u8; SIGNATURE_SIZE] {
        match self.machine {
            Machine::C16 => TAP_SIGNATURE_C16,
            _ => TAP_SIGNATURE_C64
        }
    }
    /// Returns the rate of pulses measured with the given `scale`.
    pub fn rate(&self, scale: PulseScale) -> NonZeroU32 {
        let table = match scale {
            PulseScale::Cycles => &TAP_CLOCK_RATES,
            PulseScale::Coarse => &TAP_COARSE_RATES
        };
        table[self.machine as usize][self.video as usize]
    }

    pub fn stream_params(&self, scale: PulseScale) -> StreamParams {
        StreamParams { rate: self.rate(scale), half_waves: self.version.is_half_waves() }
    }
    /// Checks if pulses of the stream described by `params` can be stored without conversion.
    pub fn check_stream(&self, params: StreamParams, scale: PulseScale) -> Result<(), TapeError> {
        if params.rate != self.rate(scale) {
            return Err(TapeError::UnsupportedConfiguration(
                "the sample rate doesn't match the machine and the video standard"))
        }
        if params.half_waves != self.version.is_half_waves() {
            return Err(TapeError::UnsupportedConfiguration(
                "half-waves require TAP version 2"))
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..SIGNATURE_SIZE].copy_from_slice(self.signature());
        bytes[12] = self.version.into();
        bytes[13] = self.machine.into();
        bytes[14] = self.video.into();
        bytes[TAP_DATA_LENGTH_OFFSET..].copy_from_slice(&self.data_length.to_le_bytes());
        bytes
    }
}

impl DmpHeader {
    /// Creates a new header.
    ///
    /// # Errors
    /// Returns [TapeError::UnsupportedConfiguration] if `bits_per_sample` is not in `1..=32`.
    pub fn new(
            machine: Machine,
            video: VideoStandard,
            bits_per_sample: u8,
            rate: NonZeroU32
        ) -> Result<Self, TapeError>
    {
        if !(1..=MAX_DMP_BITS_PER_SAMPLE).contains(&bits_per_sample) {
            return Err(TapeError::UnsupportedConfiguration("bits per sample must be in 1..=32"))
        }
        Ok(DmpHeader { machine, video: video.into(), bits_per_sample, rate })
    }
    /// Creates a header suitable for a pulse stream.
    ///
    /// # Errors
    /// *DMP* can't store half-wave streams. The `bits_per_sample` must be in `1..=32`.
    pub fn for_stream(
            machine: Machine,
            video: VideoStandard,
            bits_per_sample: u8,
            params: StreamParams
        ) -> Result<Self, TapeError>
    {
        if params.half_waves {
            return Err(TapeError::UnsupportedConfiguration("DMP doesn't support half-waves"))
        }
        DmpHeader::new(machine, video, bits_per_sample, params.rate)
    }

    pub fn machine(&self) -> Machine {
        self.machine
    }
    /// Returns the video standard if the header contains a known one.
    pub fn video_standard(&self) -> Option<VideoStandard> {
        VideoStandard::try_from(self.video).ok()
    }
    /// The video standard byte as found in the header.
    pub fn raw_video_standard(&self) -> u8 {
        self.video
    }

    pub fn bits_per_sample(&self) -> u8 {
        self.bits_per_sample
    }

    pub fn rate(&self) -> NonZeroU32 {
        self.rate
    }
    /// Returns the largest field value, which is also the overflow sentinel.
    pub fn overflow_value(&self) -> u32 {
        ((1u64 << self.bits_per_sample) - 1) as u32
    }
    /// Returns the number of bytes of each pulse field.
    pub fn field_size(&self) -> usize {
        (usize::from(self.bits_per_sample) + 7) / 8
    }

    pub fn stream_params(&self) -> StreamParams {
        StreamParams { rate: self.rate, half_waves: false }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..SIGNATURE_SIZE].copy_from_slice(DMP_SIGNATURE);
        bytes[12] = 0;
        bytes[13] = self.machine.into();
        bytes[14] = self.video;
        bytes[15] = self.bits_per_sample;
        bytes[16..].copy_from_slice(&self.rate.get().to_le_bytes());
        bytes
    }
}

impl ContainerHeader {
    /// Parses and validates the header found at the beginning of `bytes`.
    ///
    /// Fields are validated in order: the signature, the version, the machine and then the video
    /// standard (*TAP*) or the bits per sample (*DMP*). The first invalid field is reported.
    ///
    /// # Errors
    /// * [TapeError::TruncatedInput] if `bytes` is shorter than [HEADER_SIZE].
    /// * [TapeError::InvalidHeader] if a field is invalid.
    /// * [TapeError::UnsupportedConfiguration] if a *DMP* header declares a sample rate of 0.
    pub fn parse(bytes: &[u8]) -> Result<Self, TapeError> {
        let bytes = bytes.get(..HEADER_SIZE).ok_or(TapeError::TruncatedInput)?;
        match parse_container_header(bytes) {
            Ok((_, header)) => Ok(header),
            Err(Err::Failure(HeaderParseError::Fault(err)))|
            Err(Err::Error(HeaderParseError::Fault(err))) => Err(err),
            Err(..) => Err(TapeError::TruncatedInput)
        }
    }

    pub fn kind(&self) -> ContainerKind {
        match self {
            ContainerHeader::Tap(..) => ContainerKind::Tap,
            ContainerHeader::Dmp(..) => ContainerKind::Dmp
        }
    }

    pub fn version(&self) -> u8 {
        match self {
            ContainerHeader::Tap(tap) => tap.version.into(),
            ContainerHeader::Dmp(..) => 0
        }
    }

    pub fn machine(&self) -> Machine {
        match self {
            ContainerHeader::Tap(tap) => tap.machine,
            ContainerHeader::Dmp(dmp) => dmp.machine
        }
    }
    /// Returns the stream parameters. The `scale` applies only to *TAP*.
    pub fn stream_params(&self, scale: PulseScale) -> StreamParams {
        match self {
            ContainerHeader::Tap(tap) => tap.stream_params(scale),
            ContainerHeader::Dmp(dmp) => dmp.stream_params()
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        match self {
            ContainerHeader::Tap(tap) => tap.to_bytes(),
            ContainerHeader::Dmp(dmp) => dmp.to_bytes()
        }
    }
}

/// Parses the container header from `bytes` and returns it with the parameters of the pulse stream.
pub fn read_header(bytes: &[u8], scale: PulseScale) -> Result<(ContainerHeader, StreamParams), TapeError> {
    let header = ContainerHeader::parse(bytes)?;
    Ok((header, header.stream_params(scale)))
}

/// Creates a *TAP* header for a pulse stream and serializes it.
///
/// Fails if the rate of the stream doesn't match the `machine` and `video` in the given `scale`.
pub fn write_header(
        machine: Machine,
        video: VideoStandard,
        params: StreamParams,
        force_version_0: bool,
        scale: PulseScale
    ) -> Result<[u8; HEADER_SIZE], TapeError>
{
    let header = TapHeader::for_stream(machine, video, params.half_waves, force_version_0);
    header.check_stream(params, scale)?;
    Ok(header.to_bytes())
}

impl From<TapHeader> for ContainerHeader {
    fn from(tap: TapHeader) -> Self {
        ContainerHeader::Tap(tap)
    }
}

impl From<DmpHeader> for ContainerHeader {
    fn from(dmp: DmpHeader) -> Self {
        ContainerHeader::Dmp(dmp)
    }
}

/****************************************************************************/
/*                                  PARSER                                  */
/****************************************************************************/
#[derive(Clone, Debug, PartialEq)]
enum HeaderParseError<'a> {
    Nom(&'a [u8], ErrorKind),
    Fault(TapeError)
}

type HeaderResult<'a, O> = IResult<&'a [u8], O, HeaderParseError<'a>>;

impl<'a> ParseError<&'a [u8]> for HeaderParseError<'a> {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        HeaderParseError::Nom(input, kind)
    }

    fn append(_input: &'a [u8], _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

fn fault<'a, O>(err: impl Into<TapeError>) -> HeaderResult<'a, O> {
    Err(Err::Failure(HeaderParseError::Fault(err.into())))
}

/// Parses a byte and validates it with `check`.
fn checked_u8<'a, O, F>(check: F) -> impl FnMut(&'a [u8]) -> HeaderResult<'a, O>
    where F: Fn(u8) -> Result<O, HeaderFault>
{
    move |input| {
        let (rest, byte) = le_u8(input)?;
        match check(byte) {
            Ok(res) => Ok((rest, res)),
            Err(err) => fault(err)
        }
    }
}

fn parse_signature(input: &[u8]) -> HeaderResult<'_, ContainerKind> {
    let (rest, signature) = take(SIGNATURE_SIZE)(input)?;
    if signature == TAP_SIGNATURE_C64 || signature == TAP_SIGNATURE_C16 {
        Ok((rest, ContainerKind::Tap))
    }
    else if signature == DMP_SIGNATURE {
        Ok((rest, ContainerKind::Dmp))
    }
    else {
        fault(HeaderFault::Signature)
    }
}

fn parse_tap_header(input: &[u8]) -> HeaderResult<'_, TapHeader> {
    let (rest, (version, machine, video, _reserved, data_length)) = tuple((
        checked_u8(|v| TapVersion::try_from(v).map_err(|_| HeaderFault::Version(v))),
        checked_u8(|v| Machine::try_from(v).map_err(|_| HeaderFault::Machine(v))),
        checked_u8(|v| VideoStandard::try_from(v).map_err(|_| HeaderFault::VideoStandard(v))),
        le_u8,
        le_u32
    ))(input)?;
    Ok((rest, TapHeader { version, machine, video, data_length }))
}

fn parse_dmp_header(input: &[u8]) -> HeaderResult<'_, DmpHeader> {
    let (rest, (_version, machine, video, bits_per_sample, rate)) = tuple((
        checked_u8(|v| if v == 0 { Ok(v) } else { Err(HeaderFault::Version(v)) }),
        checked_u8(|v| Machine::try_from(v).map_err(|_| HeaderFault::Machine(v))),
        le_u8,
        checked_u8(|v| {
            if (1..=MAX_DMP_BITS_PER_SAMPLE).contains(&v) { Ok(v) } else { Err(HeaderFault::BitsPerSample(v)) }
        }),
        le_u32
    ))(input)?;
    match NonZeroU32::new(rate) {
        Some(rate) => Ok((rest, DmpHeader { machine, video, bits_per_sample, rate })),
        None => fault(TapeError::UnsupportedConfiguration("DMP sample rate is 0"))
    }
}

fn parse_container_header(input: &[u8]) -> HeaderResult<'_, ContainerHeader> {
    let (rest, kind) = parse_signature(input)?;
    match kind {
        ContainerKind::Tap => {
            let (rest, tap) = parse_tap_header(rest)?;
            Ok((rest, ContainerHeader::Tap(tap)))
        }
        ContainerKind::Dmp => {
            let (rest, dmp) = parse_dmp_header(rest)?;
            Ok((rest, ContainerHeader::Dmp(dmp)))
        }
    }
}

/****************************************************************************/
/*                               CONVERSIONS                                */
/****************************************************************************/
impl From<Machine> for &'static str {
    fn from(machine: Machine) -> &'static str {
        match machine {
            Machine::C64   => "C64",
            Machine::Vic20 => "VIC-20",
            Machine::C16   => "C16",
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(<&str>::from(*self))
    }
}

impl std::error::Error for ParseMachineError {}

impl fmt::Display for ParseMachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unrecognized machine")
    }
}

impl FromStr for Machine {
    type Err = ParseMachineError;
    /// Parses a machine name using case insensitive matching or a single digit from 0 to 2.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        if name.eq_ignore_ascii_case("c64") ||
           name.eq_ignore_ascii_case("c128") {
            Ok(Machine::C64)
        }
        else if name.eq_ignore_ascii_case("vic20") ||
                name.eq_ignore_ascii_case("vic-20") ||
                name.eq_ignore_ascii_case("vic") {
            Ok(Machine::Vic20)
        }
        else if name.eq_ignore_ascii_case("c16") ||
                name.eq_ignore_ascii_case("plus4") ||
                name.eq_ignore_ascii_case("+4") {
            Ok(Machine::C16)
        }
        else {
            u8::from_str(name).map_err(|_| ParseMachineError)
            .and_then(|machine|
                Machine::try_from(machine).map_err(|_| ParseMachineError)
            )
        }
    }
}

impl From<Machine> for u8 {
    fn from(machine: Machine) -> u8 {
        machine as u8
    }
}

impl std::error::Error for TryFromU8MachineError {}

impl fmt::Display for TryFromU8MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "converted integer ({}) out of range for `Machine`", self.0)
    }
}

impl TryFrom<u8> for Machine {
    type Error = TryFromU8MachineError;
    fn try_from(machine: u8) -> Result<Self, Self::Error> {
        Ok(match machine {
            0 => Machine::C64,
            1 => Machine::Vic20,
            2 => Machine::C16,
            _ => return Err(TryFromU8MachineError(machine))
        })
    }
}

impl From<VideoStandard> for &'static str {
    fn from(video: VideoStandard) -> &'static str {
        match video {
            VideoStandard::Pal  => "PAL",
            VideoStandard::Ntsc => "NTSC",
        }
    }
}

impl fmt::Display for VideoStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(<&str>::from(*self))
    }
}

impl std::error::Error for ParseVideoStandardError {}

impl fmt::Display for ParseVideoStandardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unrecognized video standard")
    }
}

impl FromStr for VideoStandard {
    type Err = ParseVideoStandardError;
    /// Parses `PAL` or `NTSC` using case insensitive matching or a single digit 0 or 1.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        if name.eq_ignore_ascii_case("pal") {
            Ok(VideoStandard::Pal)
        }
        else if name.eq_ignore_ascii_case("ntsc") {
            Ok(VideoStandard::Ntsc)
        }
        else {
            u8::from_str(name).map_err(|_| ParseVideoStandardError)
            .and_then(|video|
                VideoStandard::try_from(video).map_err(|_| ParseVideoStandardError)
            )
        }
    }
}

impl From<VideoStandard> for u8 {
    fn from(video: VideoStandard) -> u8 {
        video as u8
    }
}

impl std::error::Error for TryFromU8VideoStandardError {}

impl fmt::Display for TryFromU8VideoStandardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "converted integer ({}) out of range for `VideoStandard`", self.0)
    }
}

impl TryFrom<u8> for VideoStandard {
    type Error = TryFromU8VideoStandardError;
    fn try_from(video: u8) -> Result<Self, Self::Error> {
        Ok(match video {
            0 => VideoStandard::Pal,
            1 => VideoStandard::Ntsc,
            _ => return Err(TryFromU8VideoStandardError(video))
        })
    }
}

impl From<TapVersion> for u8 {
    fn from(version: TapVersion) -> u8 {
        version as u8
    }
}

impl std::error::Error for TryFromU8TapVersionError {}

impl fmt::Display for TryFromU8TapVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "converted integer ({}) out of range for `TapVersion`", self.0)
    }
}

impl TryFrom<u8> for TapVersion {
    type Error = TryFromU8TapVersionError;
    fn try_from(version: u8) -> Result<Self, Self::Error> {
        Ok(match version {
            0 => TapVersion::V0,
            1 => TapVersion::V1,
            2 => TapVersion::V2,
            _ => return Err(TryFromU8TapVersionError(version))
        })
    }
}
