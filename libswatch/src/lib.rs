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

use std::{
    fs, io,
    sync::{Mutex, MutexGuard},
};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::prelude::*;

pub mod color;
mod config;
mod consts;
pub mod palette;
mod query;
mod server;

/// The command line arguments that swatch expects.
/// These can be directly parsed with clap or manually
/// constructed in order to present some other user
/// interface.
///
/// NOTE: You must check `version()` and handle it yourself
/// if it is set. Clap won't do a good job with its
/// automatic version support for a library.
#[derive(Parser, Debug, Default)]
#[clap(author, about)]
pub struct Args {
    #[clap(
        short,
        long,
        action,
        long_help = "The file to write logs to

In most modes logs are discarded by default, but if swatch is
running in a server mode, the logs will go to stderr by default."
    )]
    pub log_file: Option<String>,

    #[clap(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Show more in logs, may be provided multiple times",
    )]
    pub verbose: u8,

    #[clap(short, long, action, help = "a toml file containing configuration")]
    pub config_file: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,

    // A hidden field rather than using the #[non_exhaustive] attribute
    // allows users to build this struct using the default value plus
    // modifications, while the #[non_exhaustive] attribute would not.
    // See https://rust-lang.github.io/rfcs/2008-non-exhaustive.html#functional-record-updates
    // (the attribute behaves as if there is implicitly a field like this
    // that is private).
    #[doc(hidden)]
    pub __non_exhaustive: (),
}

/// The subcommands that swatch supports.
#[derive(Subcommand, Debug, Default)]
#[non_exhaustive]
pub enum Commands {
    #[clap(about = "Print version")]
    #[default]
    Version,

    #[clap(about = "Look up the nearest named color for a hex code

Prints a single JSON object of the form
{\"hex\": \"#FF0000\", \"name\": \"red\", \"rgb\": \"rgb(255, 0, 0)\"}
on stdout and exits non-zero if the hex code does not parse.")]
    #[non_exhaustive]
    Match {
        #[clap(help = "The hex color code to look up, e.g. '#FF0000'")]
        hex: String,
    },

    #[clap(about = "Serve the color lookup tool over stdio

Speaks newline delimited JSON-RPC on stdin/stdout, the framing
tool-calling clients use when they spawn the server themselves.")]
    Serve,

    #[clap(about = "Serve the color lookup tool over http")]
    #[non_exhaustive]
    ServeHttp {
        #[clap(short, long, help = "The port to listen on, 8080 by default")]
        port: Option<u16>,
    },

    #[clap(about = "Serve the color lookup tool over sse")]
    #[non_exhaustive]
    ServeSse {
        #[clap(short, long, help = "The port to listen on, 8080 by default")]
        port: Option<u16>,
    },
}

impl Args {
    /// Version indicates if the wrapping binary must display the
    /// version then exit.
    pub fn version(&self) -> bool {
        matches!(self.command, Commands::Version)
    }
}

// Copied from the tracing-subscriber crate. This is public in
// a future version of the crate, but for now we don't have
// access to it. If tracing-subscriber is 0.3.19 or better,
// it is worth checking to see if we can rip this out.
#[derive(Debug)]
pub struct MutexGuardWriter<'a, W>(MutexGuard<'a, W>);
impl<W> io::Write for MutexGuardWriter<'_, W>
where
    W: io::Write,
{
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }

    #[inline]
    fn write_vectored(&mut self, bufs: &[io::IoSlice<'_>]) -> io::Result<usize> {
        self.0.write_vectored(bufs)
    }

    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.0.write_all(buf)
    }

    #[inline]
    fn write_fmt(&mut self, fmt: std::fmt::Arguments<'_>) -> io::Result<()> {
        self.0.write_fmt(fmt)
    }
}

struct LogWriterBuilder {
    log_file: Option<Mutex<fs::File>>,
    is_server: bool,
}

impl<'writer> tracing_subscriber::fmt::MakeWriter<'writer> for LogWriterBuilder {
    type Writer = Box<dyn io::Write + 'writer>;

    fn make_writer(&'writer self) -> Self::Writer {
        if let Some(log_file) = &self.log_file {
            Box::new(MutexGuardWriter(log_file.lock().expect("poisoned")))
        } else if self.is_server {
            Box::new(io::stderr())
        } else {
            Box::new(io::empty())
        }
    }
}

/// Run the swatch tool with the given arguments.
pub fn run(args: Args) -> anyhow::Result<()> {
    let log_level_filter = if args.verbose == 0 {
        tracing_subscriber::filter::LevelFilter::INFO
    } else if args.verbose == 1 {
        tracing_subscriber::filter::LevelFilter::DEBUG
    } else {
        tracing_subscriber::filter::LevelFilter::TRACE
    };

    let log_writer_builder = LogWriterBuilder {
        log_file: if let Some(lf) = &args.log_file {
            Some(Mutex::new(fs::File::create(lf).context("unable to create log file")?))
        } else {
            None
        },
        // Stdout carries protocol frames or the result JSON in every
        // mode, so logs only ever go to stderr or the log file.
        is_server: matches!(
            args.command,
            Commands::Serve | Commands::ServeHttp { .. } | Commands::ServeSse { .. }
        ),
    };
    tracing_subscriber::registry::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_thread_ids(true)
                .with_target(false)
                .with_writer(log_writer_builder)
                .with_filter(log_level_filter),
        )
        .init();

    let config = config::read_config(&args.config_file)?;
    // The palette is fully constructed and validated here, before
    // any transport starts accepting, and is immutable afterwards.
    let palette = config.load_palette()?;

    let res: anyhow::Result<()> = match args.command {
        Commands::Version => return Err(anyhow!("wrapper binary must handle version")),
        Commands::Match { hex } => query::run(&palette, &hex),
        Commands::Serve => server::stdio::run(server::Server::new(palette)),
        Commands::ServeHttp { port } => {
            let port = port.or(config.port).unwrap_or(consts::DEFAULT_PORT);
            server::http::run(server::Server::new(palette), port)
        }
        Commands::ServeSse { port } => {
            let port = port.or(config.port).unwrap_or(consts::DEFAULT_PORT);
            server::sse::run(server::Server::new(palette), port)
        }
    };

    if let Err(err) = res {
        error!("{:?}", err);
        std::process::exit(1);
    }

    Ok(())
}
