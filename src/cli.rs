use core::convert::TryFrom;

use anyhow::{anyhow, Error, Result};
use clap::{
    App,
    Arg,
    crate_authors, crate_version,
    SubCommand,
};

use crate::credential::NUM_SLOTS;

const ABOUT: &str = "
An HOTP security key, running on PC.

Each button owns a credential slot. Pressing a button types the next HOTP code
of its slot, holding it asks for a new base32 secret on the console.
";

/// Options shared by every subcommand.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub state_file: String,
    pub key_file: String,
    pub buttons: usize,
    pub usb_keyboard: bool,
    pub verbosity: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// The device loop, driven by gestures on stdin.
    Run,
    /// A single short press.
    Code { slot: usize },
    /// Programming a slot without going through the console prompt.
    Program { slot: usize, secret: String },
    /// List the slots.
    Status,
}

pub fn app() -> clap::App<'static, 'static> {

    let app = App::new("hotp-key-pc")
        .author(crate_authors!())
        .version(crate_version!())
        .about(ABOUT)
        .setting(clap::AppSettings::SubcommandRequiredElseHelp)

        .arg(Arg::with_name("STATE-FILE")
             .short("s")
             .long("state-file")
             .default_value("hotp-state.bin")
             .help("file containing the persistent key-value store")
             .required(false)
             .global(true)
        )

        .arg(Arg::with_name("KEY-FILE")
             .short("k")
             .long("key-file")
             .default_value("hotp-oracle.key")
             .help("file containing the 32-byte encryption key, created if missing")
             .required(false)
             .global(true)
        )

        .arg(Arg::with_name("BUTTONS")
             .short("b")
             .long("buttons")
             .default_value("4")
             .help("number of buttons on the board")
             .value_name("COUNT")
             .required(false)
             .global(true)
        )

        .arg(Arg::with_name("USB-KEYBOARD")
             .long("usb-keyboard")
             .help("type codes on an emulated USB HID keyboard instead of printing them")
             .global(true)
        )

        .arg(Arg::with_name("VERBOSE")
             .short("v")
             .long("verbose")
             .multiple(true)
             .help("more logging, may be repeated")
             .global(true)
        )

        .subcommand(SubCommand::with_name("run")
            .about("run the device; reads `press N` / `hold N` and secrets from stdin")
        )

        .subcommand(SubCommand::with_name("code")
            .about("emit the next code of a slot, as a short press would")
            .arg(Arg::with_name("slot")
                 .help("slot to use, 0 to 3")
                 .value_name("SLOT")
                 .required(true)
             )
        )

        .subcommand(SubCommand::with_name("program")
            .about("program a base32 secret into a slot, resetting its counter")
            .arg(Arg::with_name("slot")
                 .help("slot to program, 0 to 3")
                 .value_name("SLOT")
                 .required(true)
             )
            .arg(Arg::with_name("secret")
                 .help("the HOTP secret in base32, e.g. JBSWY3DPEHPK3PXP")
                 .value_name("SECRET")
                 .required(true)
             )
        )

        .subcommand(SubCommand::with_name("status")
            .about("show configuration and counter of every slot")
        )
    ;

    app

}

fn slot(args: &clap::ArgMatches<'_>) -> Result<usize> {
    let value = args.value_of("slot").ok_or_else(|| anyhow!("missing SLOT"))?;
    let slot: usize = value.parse()?;
    if slot >= NUM_SLOTS {
        return Err(anyhow!("slot {} out of range, there are {} slots", slot, NUM_SLOTS));
    }
    Ok(slot)
}

impl TryFrom<&'_ clap::ArgMatches<'static>> for Config {
    type Error = Error;
    fn try_from(args: &clap::ArgMatches<'static>) -> Result<Self> {
        // globals are propagated, but only once a subcommand has matched
        let args = match args.subcommand() {
            (_, Some(sub)) => sub,
            _ => args,
        };
        Ok(Config {
            state_file: args.value_of("STATE-FILE").unwrap_or("hotp-state.bin").into(),
            key_file: args.value_of("KEY-FILE").unwrap_or("hotp-oracle.key").into(),
            buttons: args.value_of("BUTTONS").unwrap_or("4").parse()?,
            usb_keyboard: args.is_present("USB-KEYBOARD"),
            verbosity: args.occurrences_of("VERBOSE"),
        })
    }
}

impl TryFrom<&'_ clap::ArgMatches<'static>> for Command {
    type Error = Error;
    fn try_from(args: &clap::ArgMatches<'static>) -> Result<Self> {
        match args.subcommand() {
            ("run", Some(_)) => Ok(Command::Run),
            ("code", Some(command)) => Ok(Command::Code { slot: slot(command)? }),
            ("program", Some(command)) => Ok(Command::Program {
                slot: slot(command)?,
                secret: command.value_of("secret").ok_or_else(|| anyhow!("missing SECRET"))?.into(),
            }),
            ("status", Some(_)) => Ok(Command::Status),
            _ => Err(anyhow!("Unexpected case")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(argv: &[&str]) -> clap::ArgMatches<'static> {
        app().get_matches_from_safe(argv.iter().copied()).unwrap()
    }

    #[test]
    fn defaults() {
        let args = matches(&["hotp-key-pc", "run"]);
        assert_eq!(Command::try_from(&args).unwrap(), Command::Run);
        assert_eq!(
            Config::try_from(&args).unwrap(),
            Config {
                state_file: "hotp-state.bin".into(),
                key_file: "hotp-oracle.key".into(),
                buttons: 4,
                usb_keyboard: false,
                verbosity: 0,
            }
        );
    }

    #[test]
    fn globals_after_the_subcommand() {
        let args = matches(&["hotp-key-pc", "code", "2", "-s", "other.bin", "--usb-keyboard", "-vv"]);
        assert_eq!(Command::try_from(&args).unwrap(), Command::Code { slot: 2 });
        let config = Config::try_from(&args).unwrap();
        assert_eq!(config.state_file, "other.bin");
        assert!(config.usb_keyboard);
        assert_eq!(config.verbosity, 2);
    }

    #[test]
    fn program() {
        let args = matches(&["hotp-key-pc", "program", "1", "JBSWY3DPEHPK3PXP"]);
        assert_eq!(
            Command::try_from(&args).unwrap(),
            Command::Program { slot: 1, secret: "JBSWY3DPEHPK3PXP".into() }
        );
    }

    #[test]
    fn slot_out_of_range() {
        let args = matches(&["hotp-key-pc", "code", "4"]);
        assert!(Command::try_from(&args).is_err());
        let args = matches(&["hotp-key-pc", "code", "one"]);
        assert!(Command::try_from(&args).is_err());
    }
}
