/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of CBMTAPE, a Rust library for Commodore tape pulse codecs.

    For the full copyright notice, see the lib.rs file.
*/
//! Container encoding.
use core::convert::TryFrom;
use core::num::NonZeroU32;
use std::io::{Error, ErrorKind, Result, Seek, SeekFrom, Write};

#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

use cbmtape_core::pulse::StreamParams;

use crate::header::{
    ContainerHeader, DmpHeader, Machine, TapHeader, VideoStandard,
    HEADER_SIZE, TAP_DATA_LENGTH_OFFSET
};
use crate::overflow::{PulseCodec, PulseScale};

/// Writes pulses to a *TAP* or *DMP* container.
///
/// The header is written on creation. The *TAP* data length is written as 0 and must be updated
/// when all pulses have been written, either with [PulseWriter::finish] if the writer can seek,
/// or by rewriting the header returned from [PulseWriter::finish_unseekable].
///
/// The writer should be positioned at the start of the container.
#[derive(Debug)]
pub struct PulseWriter<W> {
    wr: W,
    header: ContainerHeader,
    codec: PulseCodec,
    data_length: u64
}

impl<W: Write> PulseWriter<W> {
    /// Writes the *TAP* `header` with a placeholder data length and returns a new writer.
    ///
    /// The `scale` determines the unit of the written pulses.
    pub fn new_tap(mut wr: W, header: TapHeader, scale: PulseScale) -> Result<Self> {
        let header = ContainerHeader::Tap(header.with_data_length(0));
        wr.write_all(&header.to_bytes())?;
        let codec = PulseCodec::for_header(&header, scale);
        Ok(PulseWriter { wr, header, codec, data_length: 0 })
    }
    /// Writes the *TAP* header for a pulse stream with the given `params` and returns a new writer.
    ///
    /// The version 2 is selected for half-waves. Otherwise the version 0 is selected if `force_version_0`
    /// is `true` or the version 1 if it isn't.
    ///
    /// # Errors
    /// Fails with [ErrorKind::InvalidInput] if the rate in `params` doesn't match the rate of the
    /// given `machine` and `video` in the given `scale`.
    pub fn for_tap_stream(
            wr: W,
            machine: Machine,
            video: VideoStandard,
            params: StreamParams,
            force_version_0: bool,
            scale: PulseScale
        ) -> Result<Self>
    {
        let header = TapHeader::for_stream(machine, video, params.half_waves, force_version_0);
        header.check_stream(params, scale)?;
        PulseWriter::new_tap(wr, header, scale)
    }
    /// Writes the *DMP* `header` and returns a new writer.
    pub fn new_dmp(mut wr: W, header: DmpHeader) -> Result<Self> {
        let header = ContainerHeader::Dmp(header);
        wr.write_all(&header.to_bytes())?;
        let codec = PulseCodec::for_header(&header, PulseScale::default());
        Ok(PulseWriter { wr, header, codec, data_length: 0 })
    }
    /// Writes the *DMP* header for a pulse stream with the given `params` and returns a new writer.
    ///
    /// # Errors
    /// Fails with [ErrorKind::InvalidInput] for half-wave streams or if `bits_per_sample` is not in `1..=32`.
    pub fn for_dmp_stream(
            wr: W,
            machine: Machine,
            video: VideoStandard,
            bits_per_sample: u8,
            params: StreamParams
        ) -> Result<Self>
    {
        let header = DmpHeader::for_stream(machine, video, bits_per_sample, params)?;
        PulseWriter::new_dmp(wr, header)
    }
    /// Writes a single `pulse` and returns the number of bytes written.
    pub fn write_pulse(&mut self, pulse: NonZeroU32) -> Result<usize> {
        let len = self.codec.encode_pulse(pulse, &mut self.wr)?;
        self.data_length += len as u64;
        Ok(len)
    }
    /// Writes all pulses from `iter` and returns the number of bytes written.
    pub fn write_pulses<I>(&mut self, iter: I) -> Result<usize>
        where I: IntoIterator<Item=NonZeroU32>
    {
        iter.into_iter().try_fold(0, |total, pulse| {
            self.write_pulse(pulse).map(|len| total + len)
        })
    }
    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.wr.flush()
    }
    /// Returns the header with the current data length.
    pub fn header(&self) -> ContainerHeader {
        match self.header {
            ContainerHeader::Tap(tap) => ContainerHeader::Tap(
                tap.with_data_length(u32::try_from(self.data_length).unwrap_or(u32::MAX))
            ),
            dmp => dmp
        }
    }
    /// Returns the number of pulse data bytes written so far.
    pub fn data_length(&self) -> u64 {
        self.data_length
    }
    /// Flushes the writer and returns it with the final header.
    ///
    /// The returned header should replace the one at the beginning of the container.
    ///
    /// # Errors
    /// Fails with [ErrorKind::WriteZero] if the *TAP* data length exceeds `u32::MAX`.
    pub fn finish_unseekable(mut self) -> Result<(W, [u8; HEADER_SIZE])> {
        self.wr.flush()?;
        let header = self.final_header()?;
        Ok((self.wr, header.to_bytes()))
    }

    pub fn get_ref(&self) -> &W {
        &self.wr
    }
    /// Writing to the returned writer directly will corrupt the pulse stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.wr
    }
    /// Returns the underlying writer without updating the header.
    pub fn into_inner(self) -> W {
        self.wr
    }

    fn final_header(&self) -> Result<ContainerHeader> {
        match self.header {
            ContainerHeader::Tap(tap) => {
                let data_length = u32::try_from(self.data_length).map_err(|_|
                    Error::new(ErrorKind::WriteZero, "TAP data too large"))?;
                Ok(ContainerHeader::Tap(tap.with_data_length(data_length)))
            }
            dmp => Ok(dmp)
        }
    }
}

impl<W: Write + Seek> PulseWriter<W> {
    /// Updates the *TAP* data length in place, flushes the writer and returns it.
    ///
    /// The writer is positioned at the end of the container on success.
    ///
    /// # Errors
    /// Fails with [ErrorKind::WriteZero] if the *TAP* data length exceeds `u32::MAX`.
    pub fn finish(mut self) -> Result<W> {
        if let ContainerHeader::Tap(tap) = self.final_header()? {
            let back = self.data_length as i64 + (HEADER_SIZE - TAP_DATA_LENGTH_OFFSET) as i64;
            self.wr.seek(SeekFrom::Current(-back))?;
            self.wr.write_all(&tap.data_length.to_le_bytes())?;
            self.wr.seek(SeekFrom::Current(self.data_length as i64))?;
            debug!("TAP data length: {}", tap.data_length);
        }
        self.wr.flush()?;
        Ok(self.wr)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use crate::error::{IoErrorExt, TapeError};
    use crate::header::TapVersion;
    use crate::read::PulseReader;
    use super::*;

    fn nz(pulse: u32) -> NonZeroU32 {
        NonZeroU32::new(pulse).unwrap()
    }

    #[test]
    fn tap_writer_works() -> Result<()> {
        let header = TapHeader::new(Machine::C64, VideoStandard::Pal);
        let mut writer = PulseWriter::new_tap(Cursor::new(Vec::new()), header, PulseScale::Cycles)?;
        assert_eq!(HEADER_SIZE, writer.get_ref().get_ref().len());
        assert_eq!(1, writer.write_pulse(nz(800))?);
        assert_eq!(8, writer.write_pulses([0xFFFF + 5, 7].iter().map(|&p| nz(p)))?);
        assert_eq!(9, writer.data_length());
        let cursor = writer.finish()?;
        assert_eq!(29, cursor.position());
        let data = cursor.into_inner();
        assert_eq!(b"C64-TAPE-RAW\x01\x00\x00\x00\x09\x00\x00\x00", &data[..HEADER_SIZE]);
        assert_eq!(&[0x64, 0x00, 0x04, 0x00, 0x01, 0x00, 0x07, 0x00, 0x00], &data[HEADER_SIZE..]);
        Ok(())
    }

    #[test]
    fn tap_writer_finishes_unseekable() -> Result<()> {
        let params = StreamParams::from_rate(886724, true).unwrap();
        let mut writer = PulseWriter::for_tap_stream(Vec::new(), Machine::C16, VideoStandard::Pal,
                                                     params, true, PulseScale::Cycles)?;
        writer.write_pulse(nz(400))?;
        match writer.header() {
            ContainerHeader::Tap(tap) => {
                assert_eq!(TapVersion::V2, tap.version);
                assert_eq!(1, tap.data_length);
            }
            _ => unreachable!()
        }
        let (data, header) = writer.finish_unseekable()?;
        assert_eq!(b"C16-TAPE-RAW\x02\x02\x00\x00\x00\x00\x00\x00", &data[..HEADER_SIZE]);
        assert_eq!(b"C16-TAPE-RAW\x02\x02\x00\x00\x01\x00\x00\x00", &header);
        assert_eq!(&[0x32], &data[HEADER_SIZE..]);
        Ok(())
    }

    #[test]
    fn tap_writer_rejects_rate_mismatch() {
        let params = StreamParams::from_rate(985248, false).unwrap();
        let err = PulseWriter::for_tap_stream(Vec::new(), Machine::C64, VideoStandard::Ntsc,
                                              params, false, PulseScale::Cycles).unwrap_err();
        assert_eq!(ErrorKind::InvalidInput, err.kind());
        assert!(matches!(err.into_tape_error().as_deref(), Some(TapeError::UnsupportedConfiguration(..))));
        let params = StreamParams::from_rate(123156, false).unwrap();
        assert!(PulseWriter::for_tap_stream(Vec::new(), Machine::C64, VideoStandard::Pal,
                                            params, false, PulseScale::Coarse).is_ok());
    }

    #[test]
    fn dmp_writer_works() -> Result<()> {
        let params = StreamParams::from_rate(44100, false).unwrap();
        let mut writer = PulseWriter::for_dmp_stream(Cursor::new(Vec::new()), Machine::Vic20,
                                                     VideoStandard::Pal, 16, params)?;
        writer.write_pulses([0xFFFF + 5, 0x1234].iter().map(|&p| nz(p)))?;
        let data = writer.finish()?.into_inner();
        assert_eq!(b"DC2N-TAP-RAW\x00\x01\x00\x10\x44\xac\x00\x00", &data[..HEADER_SIZE]);
        assert_eq!(&[0xFF, 0xFF, 0x05, 0x00, 0x34, 0x12], &data[HEADER_SIZE..]);
        let err = PulseWriter::for_dmp_stream(Vec::new(), Machine::Vic20, VideoStandard::Pal, 16,
                                              params.with_half_waves(true)).unwrap_err();
        assert_eq!(ErrorKind::InvalidInput, err.kind());
        Ok(())
    }

    #[test]
    fn writer_output_reads_back() -> Result<()> {
        let source: Vec<NonZeroU32> = [1, 8, 100, 0x7FF, 0x800, 3 * 0xFFFFFF + 500, 0xFFFFFF, 2]
                                      .iter().map(|&p| nz(p)).collect();
        let header = TapHeader::new(Machine::C64, VideoStandard::Ntsc);
        let mut writer = PulseWriter::new_tap(Cursor::new(Vec::new()), header, PulseScale::Cycles)?;
        writer.write_pulses(source.iter().copied())?;
        let mut cursor = writer.finish()?;
        cursor.set_position(0);
        let reader = PulseReader::try_new(cursor, PulseScale::Cycles)?;
        let pulses: Vec<u32> = reader.map(NonZeroU32::get).collect();
        assert_eq!(vec![1, 8, 96, 0x7F8, 0x800, 3 * 0xFFFFFF + 500, 0xFFFFFF, 2], pulses);
        Ok(())
    }
}
