//! cmdlog CLI Client
//!
//! Command-line interface for sending commands to a cmdlog server.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::process;

use clap::{Parser, Subcommand};

/// cmdlog CLI
#[derive(Parser, Debug)]
#[command(name = "cmdlog-cli")]
#[command(about = "CLI for the cmdlog command log server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append commands and print the log the server returns
    Send {
        /// Commands to send; a newline is appended when missing
        #[arg(required = true)]
        commands: Vec<String>,
    },
}

fn main() {
    let args = Args::parse();

    let result = match args.command {
        Commands::Send { commands } => send(&args.server, &commands),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

/// Send every command, half-close, then print everything the server replied
fn send(server: &str, commands: &[String]) -> io::Result<()> {
    let mut stream = TcpStream::connect(server)?;

    for command in commands {
        let mut line = command.clone().into_bytes();
        if line.last() != Some(&b'\n') {
            line.push(b'\n');
        }
        stream.write_all(&line)?;
    }
    stream.flush()?;
    stream.shutdown(Shutdown::Write)?;

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply)?;

    io::stdout().write_all(&reply)?;
    Ok(())
}
