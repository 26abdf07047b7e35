use std::{error::Error, io, path::PathBuf, process};

use clap::Parser;
use log::{info, warn};

use minidb::{Command, Database, cli::HELP, prompt};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the data directory; created when missing
    #[arg(default_value = "data")]
    path: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize env_logger; For logging to STDOUT/STDERR
    env_logger::init();

    let cli = Cli::parse();

    ctrlc::set_handler(|| {
        println!("\nGoodbye!");
        process::exit(0);
    })?;

    let mut db = Database::open(&cli.path)?;
    info!("serving {:?}", cli.path);

    println!("\nWelcome to minidb\nType 'help' for commands");

    let stdin = io::stdin();
    let stdout = io::stdout();

    loop {
        let cmd = match prompt(stdin.lock(), stdout.lock()) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        match cmd {
            Command::Exit => {
                println!("\nGoodbye!");
                break;
            }
            Command::Help => println!("{HELP}"),
            Command::Statement(s) if s.is_empty() => {}
            Command::Statement(s) => match db.execute(&s) {
                Ok(out) => println!("\n{out}"),
                Err(e) => {
                    warn!("statement failed ({:?}): {s}", e.kind());
                    eprintln!("\nerror: {e}");
                }
            },
        }
    }

    Ok(())
}
