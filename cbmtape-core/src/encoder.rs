/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of CBMTAPE, a Rust library for Commodore tape pulse codecs.

    For the full copyright notice, see the lib.rs file.
*/
//! Edge detecting pulse encoder.
//!
//! [PulseEncoder] consumes signed waveform samples and emits intervals between recognized
//! edges as pulses, measured in samples.
//!
//! The detector stays silent until a sample exceeds the [initial threshold][EncoderConfig::initial_threshold].
//! From then on every change of the signal's sign is a candidate edge. A candidate becomes an edge when
//! a sample on the new side reaches the hysteresis level derived from the previous excursion and
//! the [sensitivity][EncoderConfig::sensitivity]. A candidate whose signal returns before that is a glitch
//! and is ignored.
//!
//! In the full-wave mode only rising edges (or falling ones, when [inverted][EncoderFlags::INVERTED])
//! separate pulses. With [EncoderFlags::HALF_WAVES] every edge does.
//!
//! ```
//! use cbmtape_core::encoder::{PulseEncoder, EncoderConfig};
//!
//! let config = EncoderConfig::default().with_sensitivity(100);
//! let mut encoder = PulseEncoder::try_new(config).unwrap();
//! let period = [i32::MAX, i32::MAX, i32::MIN, i32::MIN];
//! let wave: Vec<i32> = period.iter().copied().cycle().take(4 * 10).collect();
//! let mut pulses: Vec<u32> = encoder.encode(&wave).map(|p| p.get()).collect();
//! pulses.extend(encoder.flush().iter().map(|p| p.get()));
//! assert_eq!(vec![4; 10], pulses);
//! ```
use core::convert::TryFrom;
use core::fmt;
use core::num::NonZeroU32;

#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use arrayvec::ArrayVec;
use bitflags::bitflags;

/// The default value of [EncoderConfig::sensitivity].
pub const DEFAULT_SENSITIVITY: u8 = 12;
/// The default value of [EncoderConfig::initial_threshold].
pub const DEFAULT_INITIAL_THRESHOLD: u8 = 20;
/// The maximum value of [EncoderConfig::sensitivity].
pub const MAX_SENSITIVITY: u8 = 100;
/// The maximum value of [EncoderConfig::initial_threshold].
pub const MAX_INITIAL_THRESHOLD: u8 = 127;

bitflags! {
    /// Runtime switchable modes of the [PulseEncoder].
    #[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
    #[cfg_attr(feature = "snapshot", serde(try_from = "u8", into = "u8"))]
    #[derive(Default, Debug, PartialEq, Eq, Hash, Clone, Copy)]
    pub struct EncoderFlags: u8 {
        /// Treat the signal as upside down. Pulses are separated by falling edges.
        const INVERTED   = 0b01;
        /// Both rising and falling edges separate pulses (semiwaves).
        const HALF_WAVES = 0b10;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TryFromU8EncoderFlagsError(pub u8);

/// Tunables of the [PulseEncoder].
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EncoderConfig {
    /// Pulses shorter than this many samples are merged with the following pulse. `0` disables merging.
    pub min_duration: u32,
    /// How much a detector should be sensitive to an excursion much smaller than the previous one: `0..=100`.
    ///
    /// `100` detects every excursion. `0` ignores excursions smaller than half of the previous one.
    pub sensitivity: u8,
    /// The level the signal needs to exceed once to overcome an initial noise: `0..=127`.
    ///
    /// The value is compared with the most significant 8 bits of the sample's magnitude.
    pub initial_threshold: u8,
    /// The initial modes.
    pub flags: EncoderFlags
}

/// An error returned by [EncoderConfig::validate].
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncoderConfigError {
    SensitivityOutOfRange(u8),
    InitialThresholdOutOfRange(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Level {
    Low,
    High
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Candidate {
    /// The sample index of the first sample past the crossing.
    position: u64,
    /// The largest magnitude seen since the crossing.
    peak: u32
}

/// The edge detecting pulse encoder.
///
/// Feed samples with [PulseEncoder::push_sample], [PulseEncoder::encode] or [PulseEncoder::encode_iter],
/// and finish the stream with [PulseEncoder::flush].
#[derive(Clone, Debug)]
pub struct PulseEncoder {
    config: EncoderConfig,
    /// The index of the next sample.
    position: u64,
    /// Side of the signal after the last confirmed edge, or the last non-zero sample before arming.
    level: Option<Level>,
    /// Where the current excursion started.
    run_start: u64,
    armed: bool,
    /// The largest magnitude of the current excursion.
    peak: u32,
    candidate: Option<Candidate>,
    /// The last pulse boundary.
    boundary: Option<u64>
}

/// An iterator of pulses encoded from an iterator of samples.
///
/// Created by [PulseEncoder::encode] and [PulseEncoder::encode_iter].
/// The iterator never calls [PulseEncoder::flush].
#[derive(Debug)]
pub struct EncodePulses<'a, I> {
    encoder: &'a mut PulseEncoder,
    samples: I
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            min_duration: 0,
            sensitivity: DEFAULT_SENSITIVITY,
            initial_threshold: DEFAULT_INITIAL_THRESHOLD,
            flags: EncoderFlags::empty()
        }
    }
}

impl EncoderConfig {
    pub fn with_min_duration(mut self, min_duration: u32) -> Self {
        self.min_duration = min_duration;
        self
    }

    pub fn with_sensitivity(mut self, sensitivity: u8) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn with_initial_threshold(mut self, initial_threshold: u8) -> Self {
        self.initial_threshold = initial_threshold;
        self
    }

    pub fn with_inverted(mut self, inverted: bool) -> Self {
        self.flags.set(EncoderFlags::INVERTED, inverted);
        self
    }

    pub fn with_half_waves(mut self, half_waves: bool) -> Self {
        self.flags.set(EncoderFlags::HALF_WAVES, half_waves);
        self
    }
    /// Checks if all values are in their allowed ranges.
    pub fn validate(&self) -> Result<(), EncoderConfigError> {
        if self.sensitivity > MAX_SENSITIVITY {
            return Err(EncoderConfigError::SensitivityOutOfRange(self.sensitivity))
        }
        if self.initial_threshold > MAX_INITIAL_THRESHOLD {
            return Err(EncoderConfigError::InitialThresholdOutOfRange(self.initial_threshold))
        }
        Ok(())
    }
}

impl PulseEncoder {
    /// Creates a new encoder after validating the `config`.
    pub fn try_new(config: EncoderConfig) -> Result<Self, EncoderConfigError> {
        config.validate()?;
        Ok(PulseEncoder {
            config,
            position: 0,
            level: None,
            run_start: 0,
            armed: false,
            peak: 0,
            candidate: None,
            boundary: None
        })
    }
    /// Returns the current configuration, including the current modes.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn flags(&self) -> EncoderFlags {
        self.config.flags
    }

    pub fn is_inverted(&self) -> bool {
        self.config.flags.contains(EncoderFlags::INVERTED)
    }

    pub fn is_half_waves(&self) -> bool {
        self.config.flags.contains(EncoderFlags::HALF_WAVES)
    }
    /// Returns the number of samples consumed since the creation or the last reset.
    pub fn position(&self) -> u64 {
        self.position
    }
    /// Returns `true` once the initial threshold has been exceeded.
    pub fn is_armed(&self) -> bool {
        self.armed
    }
    /// Changes the polarity for the subsequent samples.
    ///
    /// The excursion in progress keeps its meaning: only the interpretation of the following samples flips.
    pub fn set_inverted(&mut self, inverted: bool) {
        if inverted != self.is_inverted() {
            self.config.flags.toggle(EncoderFlags::INVERTED);
            self.level = self.level.map(Level::opposite);
            if self.candidate.take().is_some() {
                trace!("pending edge dropped on polarity change");
            }
        }
    }
    /// Selects whether falling edges separate pulses as well, starting with the next edge.
    pub fn set_half_waves(&mut self, half_waves: bool) {
        self.config.flags.set(EncoderFlags::HALF_WAVES, half_waves);
    }
    /// Forgets the stream state, keeping the configuration and the current modes.
    pub fn reset(&mut self) {
        self.position = 0;
        self.level = None;
        self.run_start = 0;
        self.armed = false;
        self.peak = 0;
        self.candidate = None;
        self.boundary = None;
    }
    /// Consumes a single sample. Returns a pulse if the sample has confirmed a pulse boundary.
    pub fn push_sample(&mut self, sample: i32) -> Option<NonZeroU32> {
        let sample = if self.is_inverted() { sample.saturating_neg() } else { sample };
        let position = self.position;
        self.position += 1;
        let side = Level::of(sample);
        let magnitude = sample.unsigned_abs();

        if !self.armed {
            if let Some(side) = side {
                if self.level != Some(side) {
                    self.level = Some(side);
                    self.run_start = position;
                }
                if magnitude > u32::from(self.config.initial_threshold) << 24 {
                    self.armed = true;
                    self.peak = magnitude;
                    if self.is_half_waves() || side == Level::High {
                        self.boundary = Some(self.run_start);
                    }
                }
            }
            return None
        }

        match side {
            Some(side) if Some(side) != self.level => {
                let candidate = self.candidate.get_or_insert(Candidate { position, peak: 0 });
                candidate.peak = candidate.peak.max(magnitude);
                if magnitude >= self.hysteresis_level() {
                    return self.confirm_edge(side)
                }
            }
            Some(_) => {
                if let Some(Candidate { position, .. }) = self.candidate.take() {
                    trace!("glitch at {} suppressed", position);
                }
                self.peak = self.peak.max(magnitude);
            }
            None => {}
        }
        None
    }
    /// Returns an iterator of pulses encoded from the given `samples`.
    ///
    /// The samples are being consumed lazily. Samples that have not been consumed when the iterator
    /// is dropped are not encoded.
    pub fn encode<'a, 'b>(
            &'a mut self,
            samples: &'b [i32]
        ) -> EncodePulses<'a, core::iter::Copied<core::slice::Iter<'b, i32>>>
    {
        self.encode_iter(samples.iter().copied())
    }
    /// Returns an iterator of pulses encoded from the given iterator of samples.
    pub fn encode_iter<I>(&mut self, samples: I) -> EncodePulses<'_, I::IntoIter>
        where I: IntoIterator<Item=i32>
    {
        EncodePulses { encoder: self, samples: samples.into_iter() }
    }
    /// Ends the stream, returning the interval accumulated since the last boundary.
    ///
    /// In the half-wave mode an edge that has not been confirmed yet still counts as a boundary,
    /// in this instance two pulses are returned.
    ///
    /// Nothing is returned if the signal has never exceeded the initial threshold.
    /// The stream state is reset afterwards.
    pub fn flush(&mut self) -> ArrayVec<NonZeroU32, 2> {
        let mut pulses = ArrayVec::new();
        if self.boundary.is_some() {
            if let Some(candidate) = self.candidate.take() {
                if self.is_half_waves() {
                    pulses.extend(self.boundary_at(candidate.position));
                }
            }
            if let Some(last) = self.boundary {
                pulses.extend(self.pulse_from_span(self.position - last));
            }
        }
        self.reset();
        pulses
    }

    fn hysteresis_level(&self) -> u32 {
        let tolerance = u64::from(MAX_SENSITIVITY - self.config.sensitivity);
        let level = u64::from(self.peak) * tolerance / 200;
        (level as u32).max(1)
    }

    fn confirm_edge(&mut self, side: Level) -> Option<NonZeroU32> {
        let Candidate { position, peak } = self.candidate.take()?;
        self.level = Some(side);
        self.peak = peak;
        self.run_start = position;
        if side == Level::High || self.is_half_waves() {
            self.boundary_at(position)
        }
        else {
            None
        }
    }

    fn boundary_at(&mut self, position: u64) -> Option<NonZeroU32> {
        match self.boundary {
            None => {
                self.boundary = Some(position);
                None
            }
            Some(last) => {
                let span = position - last;
                if span < u64::from(self.config.min_duration) {
                    trace!("pulse of {} merged with the next one", span);
                    return None
                }
                self.boundary = Some(position);
                self.pulse_from_span(span)
            }
        }
    }

    fn pulse_from_span(&self, span: u64) -> Option<NonZeroU32> {
        let pulse = u32::try_from(span).unwrap_or_else(|_| {
            warn!("pulse of {} samples saturated", span);
            u32::MAX
        });
        NonZeroU32::new(pulse)
    }
}

impl<'a, I> Iterator for EncodePulses<'a, I>
    where I: Iterator<Item=i32>
{
    type Item = NonZeroU32;

    fn next(&mut self) -> Option<NonZeroU32> {
        for sample in self.samples.by_ref() {
            if let Some(pulse) = self.encoder.push_sample(sample) {
                return Some(pulse)
            }
        }
        None
    }
}

impl<'a, I> EncodePulses<'a, I> {
    /// Returns the remaining samples.
    pub fn into_inner(self) -> I {
        self.samples
    }
}

impl Level {
    #[inline]
    fn of(sample: i32) -> Option<Level> {
        match sample {
            0 => None,
            s if s > 0 => Some(Level::High),
            _ => Some(Level::Low)
        }
    }

    fn opposite(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low
        }
    }
}

impl fmt::Display for EncoderConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncoderConfigError::SensitivityOutOfRange(v) => {
                write!(f, "sensitivity {} out of range 0..={}", v, MAX_SENSITIVITY)
            }
            EncoderConfigError::InitialThresholdOutOfRange(v) => {
                write!(f, "initial threshold {} out of range 0..={}", v, MAX_INITIAL_THRESHOLD)
            }
        }
    }
}

impl std::error::Error for EncoderConfigError {}

impl From<EncoderFlags> for u8 {
    fn from(flags: EncoderFlags) -> u8 {
        flags.bits()
    }
}

impl std::error::Error for TryFromU8EncoderFlagsError {}

impl fmt::Display for TryFromU8EncoderFlagsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "converted integer (0x{:x}) contains extraneous bits for `EncoderFlags`", self.0)
    }
}

impl TryFrom<u8> for EncoderFlags {
    type Error = TryFromU8EncoderFlagsError;
    fn try_from(flags: u8) -> Result<Self, Self::Error> {
        EncoderFlags::from_bits(flags).ok_or(TryFromU8EncoderFlagsError(flags))
    }
}
