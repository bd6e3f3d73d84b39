/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of CBMTAPE, a Rust library for Commodore tape pulse codecs.

    For the full copyright notice, see the lib.rs file.
*/
//! Pulse stream rate and wave shape conversion.
use core::convert::TryFrom;
use core::num::NonZeroU32;

#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

use arrayvec::ArrayVec;

use crate::pulse::{StreamParams, rescale_pulse};

/// Pulses produced from a single input pulse by [PulseConverter::push].
pub type ConvertedPulses = ArrayVec<NonZeroU32, 2>;

/// Converts pulses of one [StreamParams] into another.
///
/// * A rate change scales each pulse by `out_rate / in_rate`, truncating the result.
/// * Half-waves to full-waves sums each pair of consecutive pulses, so an odd pulse is held
///   until its successor arrives.
/// * Full-waves to half-waves splits each pulse into `pulse/2` and the remainder.
///
/// A result that truncates to 0 is emitted as a single sample.
///
/// ```
/// use core::num::NonZeroU32;
/// use cbmtape_core::{convert::PulseConverter, pulse::StreamParams};
///
/// let from = StreamParams::from_rate(985248, true).unwrap();
/// let to = StreamParams::from_rate(44100, false).unwrap();
/// let mut converter = PulseConverter::new(from, to);
/// let pulses = [400, 400, 800, 800].iter().map(|&p| NonZeroU32::new(p).unwrap());
/// let converted: Vec<u32> = converter.convert_iter(pulses).map(|p| p.get()).collect();
/// assert_eq!(vec![35, 71], converted);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseConverter {
    from: StreamParams,
    to: StreamParams,
    /// The first pulse of an unfinished half-wave pair.
    pending: Option<NonZeroU32>
}

/// An iterator of converted pulses.
///
/// Created by [PulseConverter::convert_iter]. A trailing unpaired half-wave pulse is
/// emitted once the source is exhausted.
#[derive(Clone, Debug)]
pub struct ConvertPulses<I> {
    converter: PulseConverter,
    pulses: I,
    ready: ConvertedPulses,
    index: usize
}

impl PulseConverter {
    pub fn new(from: StreamParams, to: StreamParams) -> Self {
        PulseConverter { from, to, pending: None }
    }

    pub fn source_params(&self) -> StreamParams {
        self.from
    }

    pub fn target_params(&self) -> StreamParams {
        self.to
    }
    /// Returns `true` if the conversion maps each pulse to exactly one pulse.
    ///
    /// In this instance [PulseConverter::convert_in_place] may be used.
    pub fn is_in_place(&self) -> bool {
        self.from.half_waves == self.to.half_waves
    }
    /// Returns `true` if there is an unpaired half-wave pulse waiting for its successor.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
    /// Converts a single pulse interval to the target rate.
    pub fn rescale(&self, pulse: u64) -> NonZeroU32 {
        clamp_pulse(rescale_pulse(pulse, self.from.rate, self.to.rate))
    }
    /// Rescales `pulses` without changing their count.
    ///
    /// # Panics
    /// Panics if the conversion changes the wave shape. See [PulseConverter::is_in_place].
    pub fn convert_in_place(&self, pulses: &mut [NonZeroU32]) {
        assert!(self.is_in_place(), "a wave shape conversion can't be done in place");
        if self.from.rate == self.to.rate {
            return
        }
        for pulse in pulses.iter_mut() {
            *pulse = self.rescale(pulse.get().into());
        }
    }
    /// Converts a single `pulse`.
    ///
    /// Returns 0, 1 or 2 target pulses. No pulses are returned when the pulse is the first one
    /// of a half-wave pair.
    pub fn push(&mut self, pulse: NonZeroU32) -> ConvertedPulses {
        let mut res = ConvertedPulses::new();
        match (self.from.half_waves, self.to.half_waves) {
            (true, false) => {
                if let Some(first) = self.pending.take() {
                    let sum = u64::from(first.get()) + u64::from(pulse.get());
                    res.push(self.rescale(sum));
                }
                else {
                    self.pending = Some(pulse);
                }
            }
            (false, true) => {
                let whole = rescale_pulse(pulse.get().into(), self.from.rate, self.to.rate);
                let first = whole / 2;
                res.push(clamp_pulse(first));
                res.push(clamp_pulse(whole - first));
            }
            _ => res.push(self.rescale(pulse.get().into()))
        }
        res
    }
    /// Ends the conversion, returning an unpaired half-wave pulse if there is one.
    ///
    /// The unpaired pulse is converted as a complete full-wave pulse.
    pub fn finish(&mut self) -> Option<NonZeroU32> {
        self.pending.take().map(|pulse| {
            debug!("unpaired half-wave pulse: {}", pulse);
            self.rescale(pulse.get().into())
        })
    }
    /// Converts this converter into an iterator of pulses converted from `pulses`.
    pub fn convert_iter<I>(self, pulses: I) -> ConvertPulses<I::IntoIter>
        where I: IntoIterator<Item=NonZeroU32>
    {
        ConvertPulses {
            converter: self,
            pulses: pulses.into_iter(),
            ready: ConvertedPulses::new(),
            index: 0
        }
    }
}

impl<I> ConvertPulses<I> {
    /// Returns the converter and the remaining source pulses.
    ///
    /// Converted pulses not yet yielded are lost.
    pub fn into_inner(self) -> (PulseConverter, I) {
        (self.converter, self.pulses)
    }
}

impl<I> Iterator for ConvertPulses<I>
    where I: Iterator<Item=NonZeroU32>
{
    type Item = NonZeroU32;

    fn next(&mut self) -> Option<NonZeroU32> {
        loop {
            if let Some(&pulse) = self.ready.get(self.index) {
                self.index += 1;
                return Some(pulse)
            }
            self.index = 0;
            match self.pulses.next() {
                Some(pulse) => self.ready = self.converter.push(pulse),
                None => return self.converter.finish()
            }
        }
    }
}

fn clamp_pulse(pulse: u64) -> NonZeroU32 {
    let pulse = u32::try_from(pulse).unwrap_or_else(|_| {
        warn!("converted pulse of {} samples saturated", pulse);
        u32::MAX
    });
    NonZeroU32::new(pulse).unwrap_or_else(|| {
        trace!("converted pulse too short, clamped to 1");
        NonZeroU32::MIN
    })
}
