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
//! The core components of the CBMTAPE library.
//!
//! * [encoder] turns signed waveform samples into pulse intervals.
//! * [decoder] renders pulse intervals back into waveform samples.
//! * [convert] rescales pulse streams between sample rates and wave shapes.
//! * [carousel] hands sample buffers between a pushing and a pulling thread.
//!
//! A *pulse* is always represented by [NonZeroU32][core::num::NonZeroU32]: the number of samples
//! between two recognized waveform edges at the [rate][pulse::StreamParams::rate] of the stream.
pub mod carousel;
pub mod convert;
pub mod decoder;
pub mod encoder;
pub mod pulse;
