#![forbid(unsafe_code)]

//! `major-tom-ctl`: controller-side companion for `major-tom`.
//!
//! Connects to an instrument server over TCP, prints the greeting, sends one
//! command or sentinel, and prints the reply. Useful for driving a single
//! step by hand or checking that a host is reachable.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

use major_tom::protocol::frame::{STOP_SENTINEL, TERMINATE_SENTINEL};
use major_tom::protocol::{decode, encode, CommandResult, Direction, Frame};

#[derive(Debug, Parser)]
#[command(
    name = "major-tom-ctl",
    about = "Controller CLI for major-tom instrument servers",
    version,
    long_about = None
)]
struct Cli {
    /// Server address (`host:port`).
    #[arg(long, default_value = "127.0.0.1:7001")]
    address: String,

    /// Role of the instrument server being addressed.
    #[arg(long, default_value = "RUSKA")]
    role: String,

    /// Seconds to wait for each reply line.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a registered command, then close the connection with STOP.
    Send {
        /// Command name.
        name: String,
        /// Positional arguments.
        args: Vec<String>,
    },

    /// Connect, print the greeting, and close with STOP.
    Stop,

    /// Ask the server process to shut down.
    Terminate,
}

type CtlResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// A connected controller.
struct Connection {
    role: String,
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Connection {
    fn open(address: &str, role: &str, timeout: Duration) -> CtlResult<Self> {
        let stream = TcpStream::connect(address)?;
        stream.set_read_timeout(Some(timeout))?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            role: role.to_owned(),
            stream,
            reader,
        })
    }

    fn send(&mut self, payload: &str) -> CtlResult<()> {
        let line = encode(&self.role, Direction::ToInstrument, payload)?;
        self.stream.write_all(&line)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Read one frame; `None` once the server has closed the connection.
    fn receive(&mut self) -> CtlResult<Option<Frame>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim_end_matches(['\n', '\r']);
        Ok(Some(decode(line.as_bytes())?))
    }

    fn expect_frame(&mut self) -> CtlResult<Frame> {
        self.receive()?
            .ok_or_else(|| "server closed the connection".into())
    }

    /// Send a sentinel and wait for the server to close.
    fn close_with(&mut self, sentinel: &str) -> CtlResult<()> {
        self.send(sentinel)?;
        while self.receive()?.is_some() {}
        Ok(())
    }
}

fn run(args: &Cli) -> CtlResult<bool> {
    let timeout = Duration::from_secs(args.timeout.max(1));
    let mut conn = Connection::open(&args.address, &args.role, timeout)?;

    let greeting = conn.expect_frame()?;
    eprintln!("{}", greeting.payload);

    match &args.command {
        Command::Stop => {
            conn.close_with(STOP_SENTINEL)?;
            Ok(true)
        }
        Command::Terminate => {
            conn.close_with(TERMINATE_SENTINEL)?;
            println!("terminate sent to {}", args.role);
            Ok(true)
        }
        Command::Send { name, args: params } => {
            let payload = std::iter::once(name.as_str())
                .chain(params.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(",");
            conn.send(&payload)?;
            let reply = conn.expect_frame()?;
            conn.close_with(STOP_SENTINEL)?;

            match CommandResult::parse_reply(&reply.payload, &payload) {
                Some(result) if result.is_ok() => {
                    println!("{}", result.message);
                    Ok(true)
                }
                Some(result) => {
                    eprintln!("Error: {}", result.message);
                    Ok(false)
                }
                None => {
                    println!("{}", reply.payload);
                    Ok(true)
                }
            }
        }
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Failed to talk to server at {}: {err}", args.address);
            eprintln!("Is major-tom running with role '{}'?", args.role);
            ExitCode::FAILURE
        }
    }
}
