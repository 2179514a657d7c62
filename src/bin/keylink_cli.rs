use std::{error::Error, io};

use clap::Parser;
use keylink::{
    Connection, ConnectionParameters, RespCodec, RespCommand, SchemeFactory,
    cli::{Input, prompt, render},
};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server URI, e.g. tcp://127.0.0.1:6379 or unix:///tmp/kv.sock
    #[arg(default_value = "tcp://127.0.0.1:6379")]
    uri: String,
    /// Command to run on every new connection before any other, e.g. "CLIENT SETNAME cli"
    #[arg(long = "init")]
    init: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize env_logger; For logging to STDOUT/STDERR
    env_logger::init();

    let cli = Cli::parse();
    let params: ConnectionParameters = cli.uri.parse()?;

    let handshake = RespCommand::handshake(&params);
    let mut conn = Connection::new(params, SchemeFactory, RespCodec::default());
    for command in handshake {
        conn.push_init_command(command);
    }
    for line in &cli.init {
        conn.push_init_command(line.split_whitespace().collect());
    }

    let stdin = io::stdin();
    let stdout = io::stdout();

    loop {
        let cmd = match prompt(stdin.lock(), stdout.lock()) {
            Ok(Input::Exit) => break,
            Ok(Input::Empty) => continue,
            Ok(Input::Command(cmd)) => cmd,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };

        match conn.execute_command(&cmd) {
            Ok(reply) => println!("{}", render(&reply)),
            Err(e) => eprintln!("error: {e}"),
        }
    }

    Ok(())
}
