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

/*! The sse transport.

A client opens a long-lived `GET /sse` stream and is told, via an
`endpoint` event, where to POST its requests. Each POST gets a
bare 202 back; the actual JSON-RPC response is queued on the
session's channel and delivered over the stream as a `message`
event. The session table maps session ids to their queue senders.
*/

use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    hash::{Hash, Hasher},
    io::Write,
    net::{TcpListener, TcpStream},
    sync::{Arc, Mutex},
    thread,
};

use anyhow::Context;
use crossbeam_channel::{RecvTimeoutError, Sender};
use tracing::{error, info, instrument, warn};

use super::{
    http::{read_request, write_response},
    Server,
};
use crate::consts;

/// Live sessions. Same shape as any connection table: shared
/// across handler threads, locked only for the brief map access.
type SessionTable = Arc<Mutex<HashMap<String, Sender<String>>>>;

#[instrument(skip_all)]
pub fn run(server: Arc<Server>, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).context("binding sse listener")?;
    let addr = listener.local_addr().context("resolving bound address")?;
    info!("listening on {}", addr);

    let sessions: SessionTable = Arc::new(Mutex::new(HashMap::new()));
    let mut conn_counter = 0;
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                conn_counter += 1;
                let conn_id = conn_counter;
                let server = Arc::clone(&server);
                let sessions = Arc::clone(&sessions);
                let port = addr.port();
                thread::spawn(move || {
                    if let Err(err) = handle_conn(&server, sessions, stream, conn_id, port) {
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
fn handle_conn(
    server: &Server,
    sessions: SessionTable,
    mut stream: TcpStream,
    conn_id: usize,
    port: u16,
) -> anyhow::Result<()> {
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

    match (request.method.as_str(), request.path()) {
        ("GET", "/sse") => serve_stream(sessions, stream, conn_id, port),
        ("POST", "/message") => {
            let session_id = match request.query_param("sessionId") {
                Some(id) => String::from(id),
                None => {
                    return write_response(
                        &mut stream,
                        400,
                        "Bad Request",
                        "text/plain",
                        b"missing sessionId",
                    );
                }
            };
            let sender = sessions.lock().expect("poisoned").get(&session_id).cloned();
            let sender = match sender {
                Some(sender) => sender,
                None => {
                    return write_response(
                        &mut stream,
                        404,
                        "Not Found",
                        "text/plain",
                        b"session not found",
                    );
                }
            };

            let body = String::from_utf8(request.body).context("decoding request body")?;
            if let Some(resp) = server.handle_frame(&body) {
                if sender.send(resp).is_err() {
                    warn!("session {} hung up before its reply was queued", session_id);
                }
            }
            write_response(&mut stream, 202, "Accepted", "text/plain", b"Accepted")
        }
        _ => write_response(&mut stream, 404, "Not Found", "text/plain", b"not found"),
    }
}

/// Runs one event stream to completion: registers the session,
/// announces the message endpoint, then pumps queued responses
/// out until the client hangs up. The registration is removed on
/// the way out no matter how the pump ends.
fn serve_stream(
    sessions: SessionTable,
    mut stream: TcpStream,
    conn_id: usize,
    port: u16,
) -> anyhow::Result<()> {
    let session_id = session_id(conn_id);
    let (tx, rx) = crossbeam_channel::unbounded();
    sessions.lock().expect("poisoned").insert(session_id.clone(), tx);
    info!("session {} connected", session_id);

    // An event stream has no Content-Length, so the prelude is
    // written by hand rather than through write_response.
    let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: keep-alive\r\n\r\n";
    let result = stream
        .write_all(head.as_bytes())
        .and_then(|_| {
            let endpoint = format!("http://localhost:{port}/message?sessionId={session_id}");
            stream.write_all(format!("event: endpoint\ndata: {endpoint}\n\n").as_bytes())
        })
        .and_then(|_| stream.flush())
        .context("writing stream prelude")
        .and_then(|_| pump(&rx, &mut stream));

    sessions.lock().expect("poisoned").remove(&session_id);
    info!("session {} disconnected", session_id);
    result
}

/// Forwards queued responses to the stream as `message` events,
/// with comment keepalives on idle. A failed write means the
/// client went away, which ends the session normally.
fn pump(rx: &crossbeam_channel::Receiver<String>, stream: &mut TcpStream) -> anyhow::Result<()> {
    loop {
        let frame = match rx.recv_timeout(consts::SSE_KEEPALIVE) {
            Ok(msg) => format!("event: message\ndata: {msg}\n\n"),
            Err(RecvTimeoutError::Timeout) => String::from(": keepalive\n\n"),
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        };
        if stream.write_all(frame.as_bytes()).and_then(|_| stream.flush()).is_err() {
            return Ok(());
        }
    }
}

/// A fresh session id: a short hash of the connection counter
/// and the wall clock.
fn session_id(conn_id: usize) -> String {
    let mut hasher = DefaultHasher::new();
    conn_id.hash(&mut hasher);
    chrono::Utc::now().timestamp_micros().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
