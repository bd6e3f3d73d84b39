/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of CBMTAPE, a Rust library for Commodore tape pulse codecs.

    For the full copyright notice, see the lib.rs file.
*/
//! Pulse stream parameters and the elapsed time accounting.
use core::num::NonZeroU32;
use core::time::Duration;

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Describes how to interpret pulse intervals of a pulse stream.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreamParams {
    /// The sample clock frequency in Hz.
    pub rate: NonZeroU32,
    /// `true` if every edge is a pulse boundary, `false` if only edges of one direction are.
    pub half_waves: bool
}

/// Accumulates pulse intervals and converts their sum to the playback time.
///
/// The sum is kept in samples so the elapsed time never drifts, regardless of how many
/// pulses have been added.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseClock {
    rate: NonZeroU32,
    total: u64
}

impl StreamParams {
    /// Creates full-wave stream parameters at the given `rate`.
    pub fn new(rate: NonZeroU32) -> Self {
        StreamParams { rate, half_waves: false }
    }
    /// Creates stream parameters from a raw `rate`. Returns `None` if `rate` is 0.
    pub fn from_rate(rate: u32, half_waves: bool) -> Option<Self> {
        NonZeroU32::new(rate).map(|rate| StreamParams { rate, half_waves })
    }
    /// Replaces the half-waves flag.
    pub fn with_half_waves(mut self, half_waves: bool) -> Self {
        self.half_waves = half_waves;
        self
    }
    /// Returns the duration of a single `pulse` interval.
    pub fn pulse_duration(&self, pulse: NonZeroU32) -> Duration {
        samples_to_duration(pulse.get().into(), self.rate)
    }
    /// Returns a fresh [PulseClock] running at this stream's rate.
    pub fn clock(&self) -> PulseClock {
        PulseClock::new(self.rate)
    }
}

impl PulseClock {
    pub fn new(rate: NonZeroU32) -> Self {
        PulseClock { rate, total: 0 }
    }
    /// Adds a pulse interval to the accumulated sum.
    #[inline]
    pub fn add(&mut self, pulse: NonZeroU32) {
        self.total = self.total.saturating_add(pulse.get().into());
    }
    /// Returns the sum of all added pulses, in samples.
    pub fn samples(&self) -> u64 {
        self.total
    }
    /// Returns the sample rate of this clock.
    pub fn rate(&self) -> NonZeroU32 {
        self.rate
    }
    /// Returns the playback time of all pulses added so far.
    pub fn elapsed(&self) -> Duration {
        samples_to_duration(self.total, self.rate)
    }
    /// Resets the sum to 0.
    pub fn reset(&mut self) {
        self.total = 0;
    }
}

/// Converts a number of `samples` at the given `rate` to [Duration], rounding down to whole nanoseconds.
pub fn samples_to_duration(samples: u64, rate: NonZeroU32) -> Duration {
    let rate = u64::from(rate.get());
    let secs = samples / rate;
    let nanos = (samples % rate) * NANOS_PER_SEC / rate;
    Duration::new(secs, nanos as u32)
}

/// Scales a `pulse` measured at `from_rate` to `to_rate`, truncating the result.
///
/// The result may exceed `u32::MAX` or be 0. Use it as an input to your own saturation policy.
#[inline]
pub fn rescale_pulse(pulse: u64, from_rate: NonZeroU32, to_rate: NonZeroU32) -> u64 {
    let res = u128::from(pulse) * u128::from(to_rate.get()) / u128::from(from_rate.get());
    if res > u128::from(u64::MAX) { u64::MAX } else { res as u64 }
}
