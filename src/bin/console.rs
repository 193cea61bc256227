//! Interactive console for a running table.
//!
//! Sends each stdin line to the console server and prints its reply.

use clap::Parser;
use std::io;
use std::net::SocketAddr;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Send poke/stop messages to a running tabletop
#[derive(Parser, Debug)]
#[command(name = "tabletop-console")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Console server address
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    addr: SocketAddr,

    /// Send these messages and exit instead of reading stdin
    #[arg(short, long)]
    send: Vec<String>,
}

/// Send one line and print the reply. `false` once the server hangs up.
async fn exchange(
    line: &str,
    writer: &mut OwnedWriteHalf,
    replies: &mut Lines<BufReader<OwnedReadHalf>>,
) -> io::Result<bool> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(true);
    }
    writer.write_all(format!("{line}\n").as_bytes()).await?;
    match replies.next_line().await? {
        Some(reply) => {
            println!("{reply}");
            Ok(true)
        }
        None => {
            eprintln!("connection closed");
            Ok(false)
        }
    }
}

async fn run(cli: &Cli) -> io::Result<()> {
    let stream = TcpStream::connect(cli.addr).await?;
    let (reader, mut writer) = stream.into_split();
    let mut replies = BufReader::new(reader).lines();

    if !cli.send.is_empty() {
        for line in &cli.send {
            if !exchange(line, &mut writer, &mut replies).await? {
                break;
            }
        }
        return Ok(());
    }

    println!("connected to {} (poke, stop, or JSON; Ctrl+D to quit)", cli.addr);
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = input.next_line().await? {
        if !exchange(&line, &mut writer, &mut replies).await? {
            break;
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("tabletop-console: {e}");
            ExitCode::FAILURE
        }
    }
}
