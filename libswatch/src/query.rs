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

use anyhow::Context;
use swatch_protocol::ColorInfo;

use crate::{color, palette, palette::Palette};

/// The one-shot `swatch match` command: parse the hex code, find
/// the nearest palette entry, print the result object on stdout.
/// Nothing else may be written to stdout, callers pipe it into
/// JSON consumers.
pub fn run(palette: &Palette, hex: &str) -> anyhow::Result<()> {
    let rgb = match color::parse_hex(hex) {
        Ok(rgb) => rgb,
        Err(err) => {
            eprintln!("{err}");
            return Err(err.into());
        }
    };
    let name = palette::nearest_color(rgb, palette).context("matching against palette")?;

    let info =
        ColorInfo { hex: String::from(hex), name: String::from(name), rgb: rgb.to_string() };
    let rendered = serde_json::to_string(&info).context("encoding result")?;
    println!("{rendered}");

    Ok(())
}
