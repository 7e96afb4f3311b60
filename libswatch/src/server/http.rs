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

/*! The http transport: one JSON-RPC frame per POST request.

There is no http stack in the dependency tree; requests are framed
by hand over the tcp stream, the same way the daemon protocol is
framed over its socket. The subset understood here (request line,
headers, Content-Length body) is all a tool-call client sends.
*/

use std::{
    collections::HashMap,
    io::{BufRead, BufReader, Read, Write},
    net::{TcpListener, TcpStream},
    sync::Arc,
    thread,
};

use anyhow::{anyhow, Context};
use tracing::{error, info, instrument};

use super::Server;
use crate::consts;

#[instrument(skip_all)]
pub fn run(server: Arc<Server>, port: u16) -> anyhow::Result<()> {
    let listener =
        TcpListener::bind(("0.0.0.0", port)).context("binding http listener")?;
    let addr = listener.local_addr().context("resolving bound address")?;
    info!("listening on {}", addr);

    serve(server, listener)
}

/// The accept loop: one handler thread per connection.
fn serve(server: Arc<Server>, listener: TcpListener) -> anyhow::Result<()> {
    let mut conn_counter = 0;
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                conn_counter += 1;
                let conn_id = conn_counter;
                let server = Arc::clone(&server);
                thread::spawn(move || {
                    if let Err(err) = handle_conn(&server, stream, conn_id) {
                        error!("handling connection: {:?}", err);
                    }
                });
            }
            Err(err) => {
                error!("accepting stream: {:?}", err);
            }
        }
    }

    Ok(())
}

#[instrument(skip_all, fields(cid = conn_id))]
fn handle_conn(server: &Server, mut stream: TcpStream, conn_id: usize) -> anyhow::Result<()> {
    stream
        .set_read_timeout(Some(consts::TCP_STREAM_TIMEOUT))
        .context("setting read timeout on inbound connection")?;

    let request = match read_request(&mut stream) {
        Ok(request) => request,
        Err(err) => {
            write_response(&mut stream, 400, "Bad Request", "text/plain", b"bad request")?;
            return Err(err);
        }
    };

    if request.method != "POST" {
        return write_response(
            &mut stream,
            405,
            "Method Not Allowed",
            "text/plain",
            b"method not allowed",
        );
    }
    if request.path() != "/" && request.path() != "/mcp" {
        return write_response(&mut stream, 404, "Not Found", "text/plain", b"not found");
    }

    let body = String::from_utf8(request.body).context("decoding request body")?;
    match server.handle_frame(&body) {
        Some(resp) => {
            write_response(&mut stream, 200, "OK", "application/json", resp.as_bytes())
        }
        // A notification: nothing to say back.
        None => write_response(&mut stream, 202, "Accepted", "text/plain", b""),
    }
}

/// A parsed inbound http request. Headers only matter for body
/// framing, so they are consumed during the read rather than
/// carried here.
pub(crate) struct HttpRequest {
    pub method: String,
    pub target: String,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// The request target without its query string.
    pub fn path(&self) -> &str {
        match self.target.split_once('?') {
            Some((path, _)) => path,
            None => self.target.as_str(),
        }
    }

    /// Looks up the given key in the query string.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        let (_, query) = self.target.split_once('?')?;
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

/// Reads one request off the stream: request line, headers, and
/// a Content-Length delimited body.
pub(crate) fn read_request(stream: &mut TcpStream) -> anyhow::Result<HttpRequest> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).context("reading request line")?;
    let mut parts = request_line.split_whitespace();
    let method =
        parts.next().ok_or(anyhow!("request line missing method"))?.to_string();
    let target =
        parts.next().ok_or(anyhow!("request line missing target"))?.to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).context("reading header line")?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let content_length = match headers.get("content-length") {
        Some(len) => len.parse::<usize>().context("parsing Content-Length")?,
        None => 0,
    };
    if content_length > consts::MAX_BODY_BYTES {
        return Err(anyhow!(
            "body of size {} exceeds size limit of {} bytes",
            content_length,
            consts::MAX_BODY_BYTES
        ));
    }

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).context("reading request body")?;

    Ok(HttpRequest { method, target, body })
}

/// Writes a complete response and flushes it. Every response
/// closes the connection, clients open a fresh one per call.
pub(crate) fn write_response(
    stream: &mut TcpStream,
    status: u16,
    reason: &str,
    content_type: &str,
    body: &[u8],
) -> anyhow::Result<()> {
    let head = format!(
        "HTTP/1.1 {} {}\r\nDate: {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        httpdate(),
        content_type,
        body.len(),
    );
    stream.write_all(head.as_bytes()).context("writing response head")?;
    stream.write_all(body).context("writing response body")?;
    stream.flush().context("flushing response")?;
    Ok(())
}

/// The IMF-fixdate rendering of now, for Date headers.
fn httpdate() -> String {
    chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
