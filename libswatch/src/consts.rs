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

use std::time;

/// The implementation name advertised in the initialize handshake.
pub const SERVER_NAME: &str = "swatch";

/// The port serve-http and serve-sse fall back to when neither the
/// --port flag nor the config file names one.
pub const DEFAULT_PORT: u16 = 8080;

/// Read timeout on inbound tcp connections so a stalled client
/// can't pin a handler thread forever.
pub const TCP_STREAM_TIMEOUT: time::Duration = time::Duration::from_secs(10);

/// Upper bound on http request bodies. Tool-call requests are a
/// few hundred bytes, anything close to this is garbage input.
pub const MAX_BODY_BYTES: usize = 1024 * 64;

/// How long an idle sse stream waits for a queued message before
/// emitting a keepalive comment.
pub const SSE_KEEPALIVE: time::Duration = time::Duration::from_secs(15);
