/*
    test_containers: tests for the CBMTAPE library.
    Copyright (C) 2020-2022  Rafal Michalski

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.

    Author contact information: see Cargo.toml file, section [package.authors].
*/
//! Tests decoding and encoding TAP and DMP containers.
use core::num::NonZeroU32;
use std::io::{Cursor, ErrorKind};
use cbmtape::formats::{*, framing::PulseFramer, header::*};
use cbmtape::pulse::StreamParams;

fn read_all(data: &[u8], scale: PulseScale) -> (StreamParams, Vec<u32>) {
    let mut reader = PulseReader::try_new(Cursor::new(data), scale).unwrap();
    let pulses: Vec<u32> = reader.by_ref().map(NonZeroU32::get).collect();
    assert!(reader.err().is_none(), "{:?}", reader.err());
    (reader.stream_params(), pulses)
}

fn nz(pulses: &[u32]) -> Vec<NonZeroU32> {
    pulses.iter().map(|&p| NonZeroU32::new(p).unwrap()).collect()
}

#[test]
fn test_tap_v0_single_byte() {
    let mut data = b"C64-TAPE-RAW".to_vec();
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0, 0, 0, 0, 0x64]);
    let (params, pulses) = read_all(&data, PulseScale::Cycles);
    assert_eq!(985248, params.rate.get());
    assert!(!params.half_waves);
    assert_eq!(vec![800], pulses);
    let (params, pulses) = read_all(&data, PulseScale::Coarse);
    assert_eq!(123156, params.rate.get());
    assert_eq!(vec![100], pulses);
}

#[test]
fn test_tap_v1_overflow_chain() {
    let mut data = TapHeader::new(Machine::C64, VideoStandard::Pal).to_bytes().to_vec();
    data.extend_from_slice(&[0x00, 0xFF, 0xFF, 0xFF, 0x00, 0x10, 0x00, 0x00]);
    let (_, pulses) = read_all(&data, PulseScale::Cycles);
    assert_eq!(vec![0xFFFFFF + 0x10], pulses);
}

#[test]
fn test_dmp_overflow_chain() {
    let rate = NonZeroU32::new(96000).unwrap();
    let header = DmpHeader::new(Machine::C64, VideoStandard::Pal, 16, rate).unwrap();
    let mut data = header.to_bytes().to_vec();
    data.extend_from_slice(&[0xFF, 0xFF, 0x05, 0x00]);
    let (params, pulses) = read_all(&data, PulseScale::Cycles);
    assert_eq!(rate, params.rate);
    assert_eq!(vec![0xFFFF + 5], pulses);
}

#[test]
fn test_tap_headers_report_rates() {
    let clock = [[985248, 1022727], [1108405, 1022727], [886724, 894886]];
    let coarse = [[123156, 127840], [138550, 127840], [110840, 111860]];
    for &machine in [Machine::C64, Machine::Vic20, Machine::C16].iter() {
        for &video in [VideoStandard::Pal, VideoStandard::Ntsc].iter() {
            for &half_waves in [false, true].iter() {
                let header = TapHeader::for_stream(machine, video, half_waves, false);
                let bytes = header.to_bytes();
                let (parsed, params) = read_header(&bytes, PulseScale::Cycles).unwrap();
                assert_eq!(ContainerHeader::Tap(header), parsed);
                assert_eq!(ContainerKind::Tap, parsed.kind());
                assert_eq!(clock[machine as usize][video as usize], params.rate.get());
                assert_eq!(half_waves, params.half_waves);
                let (_, params) = read_header(&bytes, PulseScale::Coarse).unwrap();
                assert_eq!(coarse[machine as usize][video as usize], params.rate.get());
            }
        }
    }
}

#[test]
fn test_headers_reject_invalid_fields() {
    let valid = TapHeader::new(Machine::C64, VideoStandard::Pal).to_bytes();
    let mut bytes = valid;
    bytes[0] = b'X';
    assert_eq!(Err(TapeError::InvalidHeader(HeaderFault::Signature)), ContainerHeader::parse(&bytes));
    for &(offset, value, fault) in [(12, 3, HeaderFault::Version(3)),
                                   (13, 3, HeaderFault::Machine(3)),
                                   (14, 2, HeaderFault::VideoStandard(2)),
                                   (14, 0xFF, HeaderFault::VideoStandard(0xFF))].iter() {
        let mut bytes = valid;
        bytes[offset] = value;
        assert_eq!(Err(TapeError::InvalidHeader(fault)), ContainerHeader::parse(&bytes));
        let mut framer = PulseFramer::default();
        framer.push_bytes(&bytes);
        assert_eq!(Err(TapeError::InvalidHeader(fault)), framer.next_pulse());
        framer.push_bytes(&[1, 2, 3]);
        assert_eq!(Err(TapeError::InvalidHeader(fault)), framer.next_pulse());
    }
}

#[test]
fn test_tap_writer_round_trip() {
    let source = nz(&[8, 16, 800, 0x7F8, 0x800, 0xFFFF + 5, 3 * 0xFFFFFF + 500, 1]);
    let params = StreamParams::from_rate(1108405, false).unwrap();
    let mut writer = PulseWriter::for_tap_stream(Cursor::new(Vec::new()),
                        Machine::Vic20, VideoStandard::Pal, params, false, PulseScale::Cycles).unwrap();
    writer.write_pulses(source.iter().copied()).unwrap();
    let data = writer.finish().unwrap().into_inner();
    let length = u32::from_le_bytes([data[16], data[17], data[18], data[19]]);
    assert_eq!((data.len() - HEADER_SIZE) as u32, length);
    let (read_params, pulses) = read_all(&data, PulseScale::Cycles);
    assert_eq!(params, read_params);
    assert_eq!(source, nz(&pulses));
}

#[test]
fn test_tap_v0_writer_approximates() {
    let params = StreamParams::from_rate(985248, false).unwrap();
    let mut writer = PulseWriter::for_tap_stream(Cursor::new(Vec::new()),
                        Machine::C64, VideoStandard::Pal, params, true, PulseScale::Cycles).unwrap();
    writer.write_pulses(nz(&[800, 50000, 60000, 3000, 26000])).unwrap();
    let data = writer.finish().unwrap().into_inner();
    assert_eq!(0, data[12]);
    assert_eq!(&[0x64, 0, 0, 0xFF, 0xFF, 0], &data[HEADER_SIZE..]);
    let (_, pulses) = read_all(&data, PulseScale::Cycles);
    assert_eq!(vec![800, 50000, 0x7F8, 0x7F8, 25000], pulses);
}

#[test]
fn test_dmp_writer_round_trip() {
    for &bits in [1u8, 8, 12, 16, 32].iter() {
        let source = nz(&[1, 2, 100, 0xFFFF, 0x10000, 1000]);
        let params = StreamParams::from_rate(44100, false).unwrap();
        let mut writer = PulseWriter::for_dmp_stream(Cursor::new(Vec::new()),
                            Machine::C16, VideoStandard::Ntsc, bits, params).unwrap();
        writer.write_pulses(source.iter().copied()).unwrap();
        let data = writer.finish().unwrap().into_inner();
        assert_eq!(bits, data[15]);
        let (read_params, pulses) = read_all(&data, PulseScale::Cycles);
        assert_eq!(params, read_params);
        assert_eq!(source, nz(&pulses));
    }
}

#[test]
fn test_unseekable_writer() {
    let params = StreamParams::from_rate(127840, true).unwrap();
    let mut writer = PulseWriter::for_tap_stream(Vec::new(),
                        Machine::C64, VideoStandard::Ntsc, params, false, PulseScale::Coarse).unwrap();
    writer.write_pulses(nz(&[0x10, 0x100, 0x1FFFFF + 3])).unwrap();
    let (mut data, header) = writer.finish_unseekable().unwrap();
    assert_eq!(0, u32::from_le_bytes([data[16], data[17], data[18], data[19]]));
    data[..HEADER_SIZE].copy_from_slice(&header);
    assert_eq!(2, data[12]);
    assert_eq!((data.len() - HEADER_SIZE) as u32, u32::from_le_bytes([data[16], data[17], data[18], data[19]]));
    let (read_params, pulses) = read_all(&data, PulseScale::Coarse);
    assert_eq!(params, read_params);
    assert_eq!(vec![0x10, 0x100, 0x1FFFFF + 3], pulses);
}

#[test]
fn test_writer_rejects_unsupported_streams() {
    let params = StreamParams::from_rate(44100, false).unwrap();
    let err = PulseWriter::for_tap_stream(Vec::new(), Machine::C64, VideoStandard::Pal,
                                          params, false, PulseScale::Cycles).unwrap_err();
    assert_eq!(ErrorKind::InvalidInput, err.kind());
    assert!(err.is_tape_error());
    let err = PulseWriter::for_dmp_stream(Vec::new(), Machine::C64, VideoStandard::Pal,
                                          33, params).unwrap_err();
    assert_eq!(ErrorKind::InvalidInput, err.kind());
    assert!(write_header(Machine::C64, VideoStandard::Pal, params, false, PulseScale::Cycles).is_err());
}

#[test]
fn test_framer_follows_chunked_input() {
    let rate = NonZeroU32::new(22050).unwrap();
    let header = DmpHeader::new(Machine::C64, VideoStandard::Pal, 24, rate).unwrap();
    let mut data = header.to_bytes().to_vec();
    let source: Vec<u32> = (1..200u32).map(|n| n * 12345).collect();
    for &pulse in source.iter() {
        data.extend_from_slice(&pulse.to_le_bytes()[..3]);
    }
    for chunk_size in [1usize, 2, 7, 20, 21, 1000].iter().copied() {
        let mut framer = PulseFramer::new(PulseScale::Cycles);
        let mut pulses = Vec::new();
        for chunk in data.chunks(chunk_size) {
            framer.push_bytes(chunk);
            loop {
                match framer.next_pulse() {
                    Ok(Some(pulse)) => pulses.push(pulse.get()),
                    Ok(None) => unreachable!(),
                    Err(err) => {
                        assert!(err.is_recoverable());
                        break
                    }
                }
            }
            let consumed = framer.byte_offset() as usize;
            assert!(consumed <= HEADER_SIZE + 3 * pulses.len());
        }
        framer.finish();
        assert_eq!(Ok(None), framer.next_pulse());
        assert_eq!(source, pulses);
        assert_eq!(data.len() as u64, framer.byte_offset());
        assert_eq!(source.iter().map(|&p| u64::from(p)).sum::<u64>(), framer.samples());
    }
}
