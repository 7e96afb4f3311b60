use std::{
    fs,
    io::{BufRead, BufReader, Read, Write},
    net::TcpStream,
    path::PathBuf,
    process,
    process::{Command, Stdio},
    time,
};

use anyhow::{anyhow, Context};
use regex::Regex;
use tempfile::TempDir;

use super::{swatch_bin, wait_until};

/// Proc is a helper handle for a swatch server subprocess
/// listening on tcp. It kills the subprocess when it goes out
/// of scope.
pub struct Proc {
    pub proc: process::Child,
    pub log_file: PathBuf,
    pub port: u16,
    _tmp_dir: TempDir,
}

impl Proc {
    /// Spawns `swatch <subcommand> --port 0` and scrapes the
    /// kernel-assigned port out of the listening log line.
    pub fn new(subcommand: &str) -> anyhow::Result<Proc> {
        let tmp_dir = tempfile::Builder::new()
            .prefix("swatch-test")
            .rand_bytes(20)
            .tempdir()
            .context("creating tmp dir")?;
        let log_file = tmp_dir.path().join("server.log");
        eprintln!("spawning server proc with log {:?}", &log_file);

        let proc = Command::new(swatch_bin())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .arg("-vv")
            .arg("--log-file")
            .arg(&log_file)
            .arg(subcommand)
            .arg("--port")
            .arg("0")
            .spawn()
            .context("spawning server process")?;

        let mut server = Proc { proc, log_file, port: 0, _tmp_dir: tmp_dir };
        server.port = server.scrape_port()?;
        Ok(server)
    }

    fn scrape_port(&self) -> anyhow::Result<u16> {
        let listening_re =
            Regex::new(r"listening on [0-9.]+:([0-9]+)").context("compiling port regex")?;
        let mut port = None;
        wait_until(|| {
            let log = match fs::read_to_string(&self.log_file) {
                Ok(log) => log,
                Err(_) => return Ok(false),
            };
            if let Some(caps) = listening_re.captures(&log) {
                port = Some(caps[1].parse::<u16>().context("parsing port")?);
                Ok(true)
            } else {
                Ok(false)
            }
        })
        .context("waiting for listening log line")?;

        port.ok_or(anyhow!("no listening line in log"))
    }

    pub fn connect(&self) -> anyhow::Result<TcpStream> {
        let stream =
            TcpStream::connect(("127.0.0.1", self.port)).context("dialing server")?;
        stream
            .set_read_timeout(Some(time::Duration::from_secs(10)))
            .context("setting read timeout")?;
        Ok(stream)
    }
}

impl std::ops::Drop for Proc {
    fn drop(&mut self) {
        if let Err(e) = self.proc.kill() {
            eprintln!("err killing server proc: {:?}", e);
        }
    }
}

/// A parsed http response.
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Writes a raw request to the server and reads the response to
/// end of stream (the server closes the connection per request).
pub fn send_raw(server: &Proc, raw: &str) -> anyhow::Result<HttpResponse> {
    let mut stream = server.connect()?;
    stream.write_all(raw.as_bytes()).context("writing request")?;

    let mut resp = String::new();
    stream.read_to_string(&mut resp).context("reading response")?;
    let (head, body) = resp.split_once("\r\n\r\n").ok_or(anyhow!("malformed response"))?;
    let status_line = head.lines().next().ok_or(anyhow!("empty response head"))?;
    let status = status_line
        .split_whitespace()
        .nth(1)
        .ok_or(anyhow!("malformed status line"))?
        .parse::<u16>()
        .context("parsing status code")?;

    Ok(HttpResponse { status, body: String::from(body) })
}

pub fn post(server: &Proc, path: &str, body: &str) -> anyhow::Result<HttpResponse> {
    let raw = format!(
        "POST {} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        path,
        body.len(),
        body,
    );
    send_raw(server, &raw)
}

/// Proc wrapper for a `swatch serve` subprocess speaking
/// newline delimited JSON-RPC on its stdio. Kills the subprocess
/// when it goes out of scope.
pub struct StdioProc {
    pub proc: process::Child,
    stdin: process::ChildStdin,
    stdout: BufReader<process::ChildStdout>,
}

impl StdioProc {
    pub fn new() -> anyhow::Result<StdioProc> {
        let mut proc = Command::new(swatch_bin())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .arg("serve")
            .spawn()
            .context("spawning stdio server process")?;

        let stdin = proc.stdin.take().ok_or(anyhow!("no stdin handle"))?;
        let stdout = BufReader::new(proc.stdout.take().ok_or(anyhow!("no stdout handle"))?);
        Ok(StdioProc { proc, stdin, stdout })
    }

    pub fn send(&mut self, frame: &str) -> anyhow::Result<()> {
        writeln!(self.stdin, "{frame}").context("writing frame")?;
        self.stdin.flush().context("flushing frame")?;
        Ok(())
    }

    pub fn recv(&mut self) -> anyhow::Result<serde_json::Value> {
        let mut line = String::new();
        self.stdout.read_line(&mut line).context("reading frame")?;
        serde_json::from_str(&line).context("parsing response frame")
    }

    /// Writes a request frame and reads the matching response.
    pub fn request(&mut self, frame: &str) -> anyhow::Result<serde_json::Value> {
        self.send(frame)?;
        self.recv()
    }
}

impl std::ops::Drop for StdioProc {
    fn drop(&mut self) {
        if let Err(e) = self.proc.kill() {
            eprintln!("err killing stdio server proc: {:?}", e);
        }
    }
}
