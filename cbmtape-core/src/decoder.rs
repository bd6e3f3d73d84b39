/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of CBMTAPE, a Rust library for Commodore tape pulse codecs.

    For the full copyright notice, see the lib.rs file.
*/
//! Pulse to waveform decoder.
//!
//! [PulseDecoder] renders each pulse as one (half-wave mode) or two (full-wave mode) *halves* of a wave.
//! A full-wave pulse of `p` samples consists of a high half of `p - p/2` samples followed by a low half
//! of `p/2` samples. In the half-wave mode each pulse is a single half and the level alternates
//! between pulses, starting high.
//!
//! Every rendered sample has the sign of its half, so the zero crossings of the rendered waveform
//! fall exactly on the pulse boundaries regardless of the [Waveform].
use core::convert::TryFrom;
use core::fmt;
use core::num::NonZeroU32;
use core::str::FromStr;
use std::f64::consts::PI;

#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

/// The default value of [DecoderConfig::volume].
pub const DEFAULT_VOLUME: u8 = 254;

/// The shape of rendered waves.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(try_from = "u8", into = "u8"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Waveform {
    Square   = 0,
    Triangle = 1,
    Sine     = 2,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TryFromU8WaveformError(pub u8);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseWaveformError;

/// Tunables of the [PulseDecoder].
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecoderConfig {
    /// The peak amplitude: `0..=255`, scaled to the most significant bits of a sample.
    pub volume: u8,
    /// `true` renders the waveform upside down, so the pulse boundaries become falling edges.
    pub inverted: bool,
    pub waveform: Waveform
}

/// An error returned by [PulseDecoder::set_pulse].
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecoderError {
    /// A pulse of 0 samples can't be rendered.
    ZeroPulse,
    /// The previous pulse has not been rendered completely yet.
    Busy {
        /// Samples remaining of the previous pulse.
        remaining: u64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Half {
    high: bool,
    len: u32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ActivePulse {
    halves: [Half; 2],
    count: u8,
    index: u8,
    /// Samples of the current half rendered so far.
    offset: u32
}

/// The pulse to waveform decoder.
///
/// ```
/// use cbmtape_core::decoder::{PulseDecoder, DecoderConfig};
///
/// let mut decoder = PulseDecoder::new(DecoderConfig::default(), false);
/// decoder.set_pulse(6).unwrap();
/// let mut buf = [0i32; 4];
/// assert_eq!(4, decoder.fill(&mut buf));
/// assert!(buf[..3].iter().all(|&s| s > 0));
/// assert!(buf[3] < 0);
/// assert_eq!(2, decoder.fill(&mut buf));
/// assert!(decoder.is_idle());
/// ```
#[derive(Clone, Debug)]
pub struct PulseDecoder {
    config: DecoderConfig,
    half_waves: bool,
    /// The level of the next half-wave pulse.
    next_high: bool,
    active: Option<ActivePulse>
}

/// An iterator of samples decoded from an iterator of pulses.
///
/// Created by [PulseDecoder::decode_iter].
#[derive(Clone, Debug)]
pub struct DecodeSamples<I> {
    decoder: PulseDecoder,
    pulses: I
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            volume: DEFAULT_VOLUME,
            inverted: false,
            waveform: Waveform::Square
        }
    }
}

impl DecoderConfig {
    pub fn with_volume(mut self, volume: u8) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn with_waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }
    /// Returns the peak sample magnitude.
    #[inline]
    pub fn amplitude(&self) -> i32 {
        i32::from(self.volume) << 23
    }
}

impl PulseDecoder {
    /// Creates a new decoder. `half_waves` tells how to interpret pulses.
    pub fn new(config: DecoderConfig, half_waves: bool) -> Self {
        PulseDecoder { config, half_waves, next_high: true, active: None }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn is_half_waves(&self) -> bool {
        self.half_waves
    }
    /// Changes the peak amplitude of the subsequently rendered samples.
    pub fn set_volume(&mut self, volume: u8) {
        self.config.volume = volume;
    }
    /// Changes the polarity of the subsequently rendered samples.
    pub fn set_inverted(&mut self, inverted: bool) {
        self.config.inverted = inverted;
    }
    /// Changes the shape of the subsequently rendered samples.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.config.waveform = waveform;
    }
    /// Changes the interpretation of the subsequently set pulses.
    pub fn set_half_waves(&mut self, half_waves: bool) {
        self.half_waves = half_waves;
    }
    /// Returns `true` if there are no more samples to render until the next pulse is set.
    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }
    /// Returns the number of samples remaining to be rendered of the current pulse.
    pub fn remaining(&self) -> u64 {
        self.active.as_ref().map(ActivePulse::remaining).unwrap_or(0)
    }
    /// Drops the current pulse and restarts the half-wave level alternation.
    pub fn reset(&mut self) {
        self.active = None;
        self.next_high = true;
    }
    /// Sets the next pulse to be rendered.
    ///
    /// # Errors
    /// Returns an error if `pulse` is 0 or if the previous pulse has not been rendered completely.
    pub fn set_pulse(&mut self, pulse: u32) -> Result<(), DecoderError> {
        let pulse = NonZeroU32::new(pulse).ok_or(DecoderError::ZeroPulse)?;
        if let Some(active) = self.active.as_ref() {
            return Err(DecoderError::Busy { remaining: active.remaining() })
        }
        self.start_pulse(pulse);
        Ok(())
    }
    /// Renders samples of the current pulse into `buf`.
    ///
    /// Returns the number of samples written. A value smaller than `buf.len()` means that the current
    /// pulse has been exhausted and the decoder is idle.
    pub fn fill(&mut self, buf: &mut [i32]) -> usize {
        let mut filled = 0;
        for sample in buf.iter_mut() {
            match self.next_sample() {
                Some(value) => *sample = value,
                None => break
            }
            filled += 1;
        }
        filled
    }
    /// Renders samples into `buf`, taking the following pulses from `pulses` as needed.
    ///
    /// Returns the number of samples written. A value smaller than `buf.len()` means that
    /// `pulses` have been exhausted.
    pub fn decode_into<I>(&mut self, pulses: &mut I, buf: &mut [i32]) -> usize
        where I: Iterator<Item=NonZeroU32>
    {
        let mut filled = 0;
        while filled < buf.len() {
            if self.is_idle() {
                match pulses.next() {
                    Some(pulse) => self.start_pulse(pulse),
                    None => break
                }
            }
            filled += self.fill(&mut buf[filled..]);
        }
        filled
    }
    /// Converts this decoder into an iterator of samples rendered from `pulses`.
    pub fn decode_iter<I>(self, pulses: I) -> DecodeSamples<I::IntoIter>
        where I: IntoIterator<Item=NonZeroU32>
    {
        DecodeSamples { decoder: self, pulses: pulses.into_iter() }
    }
    /// Renders a single sample of the current pulse.
    pub fn next_sample(&mut self) -> Option<i32> {
        let active = self.active.as_mut()?;
        let Half { high, len } = active.halves[usize::from(active.index)];
        let offset = active.offset;
        active.offset += 1;
        if active.offset == len {
            active.offset = 0;
            active.index += 1;
            if active.index == active.count {
                self.active = None;
            }
        }
        Some(self.render(high, offset, len))
    }

    fn start_pulse(&mut self, pulse: NonZeroU32) {
        let pulse = pulse.get();
        let active = if self.half_waves {
            let high = self.next_high;
            self.next_high = !high;
            ActivePulse::new(Half { high, len: pulse }, None)
        }
        else {
            let low = pulse / 2;
            ActivePulse::new(Half { high: true, len: pulse - low },
                             Some(low).filter(|&len| len != 0).map(|len| Half { high: false, len }))
        };
        self.active = Some(active);
    }

    fn render(&self, high: bool, offset: u32, len: u32) -> i32 {
        let amplitude = i64::from(self.config.amplitude());
        let magnitude = match self.config.waveform {
            Waveform::Square => amplitude,
            Waveform::Triangle => {
                let rise = i128::from(offset) + 1;
                let fall = i128::from(len - offset);
                (i128::from(amplitude) * 2 * rise.min(fall) / (i128::from(len) + 1)) as i64
            }
            Waveform::Sine => {
                let phase = PI * (f64::from(offset) + 0.5) / f64::from(len);
                (amplitude as f64 * phase.sin()) as i64
            }
        };
        let magnitude = if amplitude == 0 {
            0
        }
        else {
            magnitude.clamp(1, amplitude) as i32
        };
        if high != self.config.inverted { magnitude } else { -magnitude }
    }
}

impl ActivePulse {
    fn new(first: Half, second: Option<Half>) -> Self {
        let (halves, count) = match second {
            Some(second) => ([first, second], 2),
            None => ([first, first], 1)
        };
        ActivePulse { halves, count, index: 0, offset: 0 }
    }

    fn remaining(&self) -> u64 {
        self.halves[usize::from(self.index)..usize::from(self.count)].iter()
            .map(|half| u64::from(half.len)).sum::<u64>() - u64::from(self.offset)
    }
}

impl<I> DecodeSamples<I> {
    pub fn decoder(&self) -> &PulseDecoder {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut PulseDecoder {
        &mut self.decoder
    }
    /// Returns the decoder and the remaining pulses.
    pub fn into_inner(self) -> (PulseDecoder, I) {
        (self.decoder, self.pulses)
    }
}

impl<I> Iterator for DecodeSamples<I>
    where I: Iterator<Item=NonZeroU32>
{
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        if self.decoder.is_idle() {
            let pulse = self.pulses.next()?;
            self.decoder.start_pulse(pulse);
        }
        self.decoder.next_sample()
    }
}

impl fmt::Display for DecoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderError::ZeroPulse => f.write_str("a pulse of zero length"),
            DecoderError::Busy { remaining } => {
                write!(f, "the previous pulse has {} samples remaining", remaining)
            }
        }
    }
}

impl std::error::Error for DecoderError {}

impl From<Waveform> for &'static str {
    fn from(waveform: Waveform) -> &'static str {
        match waveform {
            Waveform::Square   => "square",
            Waveform::Triangle => "triangle",
            Waveform::Sine     => "sine",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(<&str>::from(*self))
    }
}

impl std::error::Error for ParseWaveformError {}

impl fmt::Display for ParseWaveformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unrecognized waveform")
    }
}

impl FromStr for Waveform {
    type Err = ParseWaveformError;
    /// Parses a waveform name using case insensitive matching or a single digit from 0 to 2.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        if name.eq_ignore_ascii_case("square") {
            Ok(Waveform::Square)
        }
        else if name.eq_ignore_ascii_case("triangle") ||
                name.eq_ignore_ascii_case("tri") {
            Ok(Waveform::Triangle)
        }
        else if name.eq_ignore_ascii_case("sine") ||
                name.eq_ignore_ascii_case("sin") {
            Ok(Waveform::Sine)
        }
        else {
            u8::from_str(name).map_err(|_| ParseWaveformError)
            .and_then(|wave|
                Waveform::try_from(wave).map_err(|_| ParseWaveformError)
            )
        }
    }
}

impl From<Waveform> for u8 {
    fn from(waveform: Waveform) -> u8 {
        waveform as u8
    }
}

impl std::error::Error for TryFromU8WaveformError {}

impl fmt::Display for TryFromU8WaveformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "converted integer ({}) out of range for `Waveform`", self.0)
    }
}

impl TryFrom<u8> for Waveform {
    type Error = TryFromU8WaveformError;
    fn try_from(wave: u8) -> Result<Self, Self::Error> {
        Ok(match wave {
            0 => Waveform::Square,
            1 => Waveform::Triangle,
            2 => Waveform::Sine,
            _ => return Err(TryFromU8WaveformError(wave))
        })
    }
}
