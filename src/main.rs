use core::convert::TryFrom;

use anyhow::Result;
use log::{info, LevelFilter};

use hotp_key_pc::{
    authenticator::Authenticator,
    board,
    cli::{self, Command, Config},
    oracle::Oracle,
};

fn main() -> Result<()> {

    let args = init_app();
    let config = Config::try_from(&args)?;

    init_logger(config.verbosity)?;
    info!("Welcome to the HOTP key.");

    let platform = board::init_board(&config)?;
    let oracle = board::init_oracle(&config.key_file)?;
    let mut authenticator = Authenticator::new(platform, oracle);

    info!("Let's go!");
    let command = Command::try_from(&args)?;

    match command {
        Command::Run => {
            authenticator.run()?;
        }
        Command::Code { slot } => {
            if let Err(err) = authenticator.emit_code(slot) {
                authenticator.report(&err);
                return Err(err.into());
            }
        }
        Command::Program { slot, secret } => {
            if let Err(err) = authenticator.program_secret(slot, &secret) {
                authenticator.report(&err);
                return Err(err.into());
            }
        }
        Command::Status => {
            print_status(&mut authenticator);
        }
    }

    Ok(())
}

fn print_status<O: Oracle>(authenticator: &mut Authenticator<O>) {
    let lines: Vec<String> = authenticator
        .credentials()
        .iter()
        .enumerate()
        .map(|(slot, credential)| match credential.is_configured() {
            true => format!(
                "slot {}: {} digits, counter {}",
                slot,
                credential.digits(),
                credential.counter()
            ),
            false => format!("slot {}: not configured", slot),
        })
        .collect();
    for line in lines {
        authenticator.platform_mut().console.println(line);
    }
}

pub fn init_app() -> clap::ArgMatches<'static> {
    let app = cli::app();
    let matches = app.get_matches();
    matches
}

pub fn init_logger(verbosity: u64) -> Result<()> {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    simple_logger::SimpleLogger::new().with_level(level).init()?;
    Ok(())
}
