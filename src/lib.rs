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
//! CBMTAPE is a library for converting Commodore cassette tape recordings between waveform samples
//! and pulse streams.
//!
//! ```text
//! samples -> [encoder] -> pulses -> [formats::write] -> TAP / DMP bytes
//! TAP / DMP bytes -> [formats::read] or [formats::framing] -> pulses -> [decoder] -> samples
//! ```
//!
//! The [convert] module can be inserted on the pulse leg in either direction to change the sample
//! rate or the wave shape of a pulse stream. The [carousel] module hands sample buffers between threads
//! when samples are pushed from one side and pulses are pulled on demand from the other.
//!
//! Components are available through the following modules:
//!
//! * [pulse] - stream parameters and the elapsed time clock.
//! * [encoder] - the edge detecting waveform to pulse encoder.
//! * [decoder] - the pulse to waveform renderer.
//! * [convert] - the rate and wave shape converter.
//! * [carousel] - the sample buffer handoff.
//! * [formats] - *TAP* and *DMP* containers, requires the "formats" feature.
//!
//! Crate features:
//!
//! * "formats" (default) - includes the [formats] module.
//! * "snapshot" (default) - enables [serde] serialization of configuration types.
//!
//! [serde]: https://crates.io/crates/serde
pub use cbmtape_core::{carousel, convert, decoder, encoder, pulse};

#[cfg(feature = "formats")]
pub use cbmtape_formats as formats;
