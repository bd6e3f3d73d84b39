/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of CBMTAPE, a Rust library for Commodore tape pulse codecs.

    CBMTAPE is free software: you can redistribute it and/or modify it under
    the terms of the GNU Lesser General Public License (LGPL) as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    CBMTAPE is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Lesser General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.

    Author contact information: see Cargo.toml file, section [package.authors].
*/
//! Commodore tape container formats: *TAP* and *DMP*.
//!
//! Both formats begin with a 20 byte [header] followed by pulse intervals packed by the
//! [overflow] byte codec.
//!
//! * [framing::PulseFramer] decodes pulses from bytes pushed in arbitrary chunks.
//! * [read::PulseReader] pulls pulses from any [Read][std::io::Read] implementation.
//! * [write::PulseWriter] writes a header and pulses, patching the *TAP* data length when finished.
// https://ist.uwaterloo.ca/~schepers/formats/TAP.TXT
pub mod error;
pub mod framing;
pub mod header;
pub mod overflow;
pub mod read;
pub mod write;

pub use error::{TapeError, HeaderFault, IoErrorExt};
pub use header::{ContainerHeader, ContainerKind, TapHeader, DmpHeader, Machine, VideoStandard, HEADER_SIZE};
pub use overflow::PulseScale;
pub use read::PulseReader;
pub use write::PulseWriter;
