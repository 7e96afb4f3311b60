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
/// Swatch resolves a hex color code to the nearest named color
/// from a fixed reference palette, either as a one-shot CLI that
/// prints JSON or as a tool server speaking JSON-RPC over stdio,
/// http, or sse.
use clap::Parser;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> anyhow::Result<()> {
    let args = libswatch::Args::parse();

    if args.version() {
        println!("swatch {}", VERSION);
        return Ok(());
    }

    libswatch::run(args)
}
