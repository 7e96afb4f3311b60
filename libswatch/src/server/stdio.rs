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

/*! The stdio transport: newline delimited JSON-RPC frames on
stdin/stdout. Logs must never touch stdout, it is reserved for
protocol frames.
*/

use std::{
    io,
    io::{BufRead, Write},
    sync::Arc,
};

use anyhow::Context;
use tracing::{info, instrument};

use super::Server;

#[instrument(skip_all)]
pub fn run(server: Arc<Server>) -> anyhow::Result<()> {
    info!("serving on stdio");

    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    for line in stdin.lines() {
        let line = line.context("reading request frame")?;
        if line.trim().is_empty() {
            continue;
        }

        if let Some(resp) = server.handle_frame(&line) {
            writeln!(stdout, "{resp}").context("writing response frame")?;
            stdout.flush().context("flushing response frame")?;
        }
    }

    info!("stdin closed, shutting down");
    Ok(())
}
