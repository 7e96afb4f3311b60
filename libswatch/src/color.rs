// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/*! A parser for hex color codes like `#FF0000`.
*/

use std::fmt;

use thiserror::Error;

/// A point in the 8 bit RGB cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }
}

impl fmt::Display for Rgb {
    /// The canonical `rgb(R, G, B)` rendering, decimal channels.
    /// This exact pattern is part of the output wire contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// The error produced for malformed hex code input. The caller
/// must supply corrected input, there is nothing to retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid hex code '{0}'")]
    InvalidHexCode(String),
}

/// Parses a hex color code into an [`Rgb`] triple.
///
/// The code may carry a single leading `#`, and must consist of
/// exactly six hex digits after the prefix is stripped, two per
/// channel in red, green, blue order. Case does not matter.
/// Anything else is rejected whole, there are no partial results.
pub fn parse_hex(code: &str) -> Result<Rgb, ParseError> {
    let digits = code.strip_prefix('#').unwrap_or(code);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseError::InvalidHexCode(String::from(code)));
    }

    // The length and digit checks above make these infallible.
    let channel = |pair: &str| {
        u8::from_str_radix(pair, 16).map_err(|_| ParseError::InvalidHexCode(String::from(code)))
    };
    Ok(Rgb { r: channel(&digits[0..2])?, g: channel(&digits[2..4])?, b: channel(&digits[4..6])? })
}
