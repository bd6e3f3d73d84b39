/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of CBMTAPE, a Rust library for Commodore tape pulse codecs.

    For the full copyright notice, see the lib.rs file.
*/
//! Hands sample buffers over from a pushing thread to a pulling one.
//!
//! [create_carousel] returns a connected pair: a [SampleProducer] that fills and sends buffers and a
//! [SampleConsumer] that receives them. Buffers circulate between the two ends, so at any time a buffer
//! is owned by exactly one of them and can't be overwritten while it's being read.
//!
//! * [SampleProducer::send_buffer] blocks until the buffer sent previously has been fully consumed.
//! * [SampleProducer::end_stream] signals the end of stream only after the last buffer has been consumed.
//! * Dropping either end wakes up the other one with [HandoffError].
//!
//! [PulseDrain] wraps a [SampleConsumer] with a [PulseEncoder] to pull pulses on demand.
use core::fmt;
use core::mem::replace;
use core::num::NonZeroU32;
use std::error;
use std::sync::mpsc::{sync_channel, SyncSender, Receiver, SendError, RecvError};

#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

use arrayvec::ArrayVec;

use crate::encoder::PulseEncoder;

pub type HandoffResult<T> = Result<T, HandoffError>;

/// The remote end of the carousel has been dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffError;

/// A message passed from the producer to the consumer.
#[derive(Debug)]
pub enum Handoff<T> {
    Buffer(Vec<T>),
    EndOfStream
}

/// The sending end of the carousel.
#[derive(Debug)]
pub struct SampleProducer<T> {
    /// The buffer being filled.
    pub buffer: Vec<T>,
    rx: Receiver<Vec<T>>,
    consumer_tx: SyncSender<Handoff<T>>,
}

/// The receiving end of the carousel.
#[derive(Debug)]
pub struct SampleConsumer<T> {
    buffer: Vec<T>,
    cursor: usize,
    finished: bool,
    producer_tx: SyncSender<Vec<T>>,
    rx: Receiver<Handoff<T>>,
}

/// An iterator of pulses encoded from samples received by a [SampleConsumer].
///
/// The iteration blocks while waiting for the next buffer. After the end of stream the encoder
/// is flushed. If the producer disconnects without ending the stream the iteration stops and
/// [PulseDrain::err] returns the error.
#[derive(Debug)]
pub struct PulseDrain {
    consumer: SampleConsumer<i32>,
    encoder: PulseEncoder,
    flushed: ArrayVec<NonZeroU32, 2>,
    state: DrainState
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DrainState {
    Streaming,
    Flushed,
    Done,
    Error
}

/// Creates a connected producer and consumer pair.
///
/// The producer's buffer is created with the given `capacity`.
pub fn create_carousel<T: Send>(capacity: usize) -> (SampleProducer<T>, SampleConsumer<T>) {
    let (producer_tx, producer_rx) = sync_channel::<Vec<T>>(1);
    let (consumer_tx, consumer_rx) = sync_channel::<Handoff<T>>(1);
    let producer = SampleProducer {
        buffer: Vec::with_capacity(capacity),
        rx: producer_rx,
        consumer_tx
    };
    let consumer = SampleConsumer {
        buffer: Vec::with_capacity(capacity),
        cursor: 0,
        finished: false,
        producer_tx,
        rx: consumer_rx
    };
    (producer, consumer)
}

impl<T> SampleProducer<T> {
    /// Lets `render` fill the current buffer.
    pub fn render_buffer<F: FnOnce(&mut Vec<T>)>(&mut self, render: F) {
        render(&mut self.buffer);
    }
}

impl<T: Send> SampleProducer<T> {
    /// Sends the current buffer to the consumer.
    ///
    /// Before sending, waits until the consumer returns the previously sent buffer, which
    /// then becomes the current (cleared) buffer.
    ///
    /// Returns `Err(HandoffError)` if the consumer has been dropped.
    pub fn send_buffer(&mut self) -> HandoffResult<()> {
        let mut recycled = self.rx.recv()?;
        recycled.clear();
        let buffer = replace(&mut self.buffer, recycled);
        self.consumer_tx.send(Handoff::Buffer(buffer))?;
        Ok(())
    }
    /// Signals the end of stream once the last sent buffer has been fully consumed.
    pub fn end_stream(self) -> HandoffResult<()> {
        self.rx.recv()?;
        self.consumer_tx.send(Handoff::EndOfStream)?;
        Ok(())
    }
}

impl<T> SampleConsumer<T> {
    /// Returns `true` once the end of stream has been received.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
    /// Returns the unread part of the current buffer.
    pub fn unread(&self) -> &[T] {
        &self.buffer[self.cursor..]
    }
    /// Marks `count` samples of the current buffer as read.
    ///
    /// # Panics
    /// Panics if `count` is larger than the unread part.
    pub fn consume(&mut self, count: usize) {
        assert!(count <= self.buffer.len() - self.cursor);
        self.cursor += count;
    }
}

impl<T: Send> SampleConsumer<T> {
    /// Returns the current buffer to the producer and waits for the next one.
    ///
    /// On success returns `Ok(true)` if a new buffer has been received and `Ok(false)`
    /// at the end of stream.
    /// Returns `Err(HandoffError)` if the producer has been dropped before ending the stream.
    pub fn next_buffer(&mut self) -> HandoffResult<bool> {
        if self.finished {
            return Ok(false)
        }
        let consumed = replace(&mut self.buffer, Vec::new());
        self.cursor = 0;
        self.producer_tx.send(consumed)?;
        match self.rx.recv()? {
            Handoff::Buffer(buffer) => {
                self.buffer = buffer;
                Ok(true)
            }
            Handoff::EndOfStream => {
                debug!("end of sample stream");
                self.finished = true;
                Ok(false)
            }
        }
    }
    /// Passes each remaining sample to `sink` until it returns `Some` or the stream ends.
    ///
    /// Returns what `sink` has returned or `Ok(None)` at the end of stream.
    pub fn drain_until<R, F>(&mut self, mut sink: F) -> HandoffResult<Option<R>>
        where T: Copy, F: FnMut(T) -> Option<R>
    {
        loop {
            while let Some(&sample) = self.buffer.get(self.cursor) {
                self.cursor += 1;
                if let Some(res) = sink(sample) {
                    return Ok(Some(res))
                }
            }
            if !self.next_buffer()? {
                return Ok(None)
            }
        }
    }
}

impl PulseDrain {
    pub fn new(consumer: SampleConsumer<i32>, encoder: PulseEncoder) -> Self {
        PulseDrain { consumer, encoder, flushed: ArrayVec::new(), state: DrainState::Streaming }
    }

    pub fn encoder(&self) -> &PulseEncoder {
        &self.encoder
    }
    /// Allows changing the encoder modes between pulses.
    pub fn encoder_mut(&mut self) -> &mut PulseEncoder {
        &mut self.encoder
    }
    /// Returns an error if the producer has disconnected without ending the stream.
    pub fn err(&self) -> Option<HandoffError> {
        match self.state {
            DrainState::Error => Some(HandoffError),
            _ => None
        }
    }
    /// Returns `true` if there are no more pulses.
    pub fn is_done(&self) -> bool {
        matches!(self.state, DrainState::Done|DrainState::Error)
    }

    pub fn into_inner(self) -> (SampleConsumer<i32>, PulseEncoder) {
        (self.consumer, self.encoder)
    }
}

impl Iterator for PulseDrain {
    type Item = NonZeroU32;

    fn next(&mut self) -> Option<NonZeroU32> {
        loop {
            match self.state {
                DrainState::Streaming => {
                    let encoder = &mut self.encoder;
                    match self.consumer.drain_until(|sample| encoder.push_sample(sample)) {
                        Ok(Some(pulse)) => return Some(pulse),
                        Ok(None) => {
                            self.flushed = self.encoder.flush();
                            self.flushed.reverse();
                            self.state = DrainState::Flushed;
                        }
                        Err(HandoffError) => {
                            warn!("sample producer disconnected");
                            self.state = DrainState::Error;
                        }
                    }
                }
                DrainState::Flushed => {
                    if let Some(pulse) = self.flushed.pop() {
                        return Some(pulse)
                    }
                    self.state = DrainState::Done;
                }
                DrainState::Done|DrainState::Error => return None
            }
        }
    }
}

impl fmt::Display for HandoffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "the remote end has been disconnected")
    }
}

impl error::Error for HandoffError {}

impl<T> From<SendError<T>> for HandoffError {
    fn from(_error: SendError<T>) -> Self {
        HandoffError
    }
}

impl From<RecvError> for HandoffError {
    fn from(_error: RecvError) -> Self {
        HandoffError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use crate::encoder::EncoderConfig;

    #[test]
    fn carousel_works() -> Result<(), Box<dyn error::Error>> {
        let (mut producer, mut consumer) = create_carousel::<u16>(16);
        let join = thread::spawn(move || {
            let mut received = Vec::new();
            while consumer.next_buffer().unwrap() {
                received.extend_from_slice(consumer.unread());
                let count = consumer.unread().len();
                consumer.consume(count);
            }
            assert!(consumer.is_finished());
            assert_eq!(Ok(false), consumer.next_buffer());
            received
        });
        for chunk in (0..1000u16).collect::<Vec<_>>().chunks(16) {
            producer.render_buffer(|buf| buf.extend_from_slice(chunk));
            producer.send_buffer()?;
        }
        producer.end_stream()?;
        let received = join.join().unwrap();
        assert_eq!((0..1000u16).collect::<Vec<_>>(), received);
        Ok(())
    }

    #[test]
    fn carousel_disconnects() {
        let (mut producer, consumer) = create_carousel::<i32>(4);
        drop(consumer);
        producer.render_buffer(|buf| buf.push(1));
        assert_eq!(Err(HandoffError), producer.send_buffer());

        let (producer, mut consumer) = create_carousel::<i32>(4);
        let join = thread::spawn(move || consumer.next_buffer());
        drop(producer);
        assert_eq!(Err(HandoffError), join.join().unwrap());
    }

    #[test]
    fn pulse_drain_works() {
        let (mut producer, consumer) = create_carousel::<i32>(64);
        let config = EncoderConfig::default().with_sensitivity(100);
        let encoder = PulseEncoder::try_new(config).unwrap();
        let join = thread::spawn(move || {
            let mut drain = PulseDrain::new(consumer, encoder);
            let pulses: Vec<u32> = drain.by_ref().map(NonZeroU32::get).collect();
            assert!(drain.is_done());
            assert_eq!(None, drain.err());
            pulses
        });
        let wave: Vec<i32> = [i32::MAX; 7].iter().chain([i32::MIN; 5].iter())
                             .copied().cycle().take(12 * 20).collect();
        // buffer boundaries don't line up with the wave periods
        for chunk in wave.chunks(50) {
            producer.render_buffer(|buf| buf.extend_from_slice(chunk));
            producer.send_buffer().unwrap();
        }
        producer.end_stream().unwrap();
        assert_eq!(vec![12; 20], join.join().unwrap());
    }

    #[test]
    fn pulse_drain_reports_disconnect() {
        let (mut producer, consumer) = create_carousel::<i32>(4);
        let encoder = PulseEncoder::try_new(EncoderConfig::default()).unwrap();
        let join = thread::spawn(move || {
            let mut drain = PulseDrain::new(consumer, encoder);
            let count = drain.by_ref().count();
            (count, drain.err())
        });
        producer.render_buffer(|buf| buf.extend_from_slice(&[i32::MAX, i32::MIN]));
        producer.send_buffer().unwrap();
        drop(producer);
        assert_eq!((0, Some(HandoffError)), join.join().unwrap());
    }
}
