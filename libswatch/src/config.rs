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

use std::{env, fs, path::PathBuf};

use anyhow::Context;
use serde_derive::Deserialize;
use tracing::{info, instrument};

use crate::{
    color,
    palette::{NamedColor, Palette},
};

#[instrument(skip_all)]
pub fn read_config(config_file: &Option<String>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    if let Some(config_path) = config_file {
        info!("parsing explicitly passed in config ({})", config_path);
        let config_str = fs::read_to_string(config_path).context("reading config toml (1)")?;
        config = toml::from_str(&config_str).context("parsing config file (1)")?;
    } else if let Ok(home_dir) = env::var("HOME") {
        let mut config_path = PathBuf::from(home_dir);
        config_path.push(".config");
        config_path.push("swatch");
        config_path.push("config.toml");
        if config_path.exists() {
            let config_str = fs::read_to_string(config_path).context("reading config toml (2)")?;
            config = toml::from_str(&config_str).context("parsing config file (2)")?;
        }
    }

    Ok(config)
}

#[derive(Deserialize, Default, Debug, Clone)]
pub struct Config {
    /// The port the serve-http and serve-sse subcommands listen
    /// on when no --port flag is given. 8080 when unset.
    pub port: Option<u16>,

    /// Replaces the builtin CSS color table with a custom one.
    /// Entry order matters: when a query sits equally far from
    /// two entries, the earlier one wins. The table is loaded
    /// and validated once at startup, a bad entry or an empty
    /// table is a fatal error rather than a per-query one.
    pub palette: Option<Vec<PaletteEntry>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PaletteEntry {
    /// The human readable color name reported to callers.
    pub name: String,
    /// The entry's color as a hex code, e.g. "#FF0000".
    pub hex: String,
}

impl Config {
    /// Builds the reference palette this process will serve:
    /// the custom table from the config file when one is given,
    /// the builtin CSS table otherwise.
    pub fn load_palette(&self) -> anyhow::Result<Palette> {
        let entries = match &self.palette {
            Some(entries) => entries,
            None => return Ok(Palette::builtin().clone()),
        };

        let mut colors = Vec::with_capacity(entries.len());
        for entry in entries.iter() {
            let rgb = color::parse_hex(&entry.hex)
                .with_context(|| format!("palette entry '{}'", entry.name))?;
            colors.push(NamedColor::new(entry.name.clone(), rgb));
        }
        let palette = Palette::new(colors).context("validating palette from config")?;
        info!("loaded {} palette entries from config", palette.len());
        Ok(palette)
    }
}
