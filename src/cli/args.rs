// CLASSIFICATION: COMMUNITY
// Filename: args.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-16

use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::diag::{DiagSink, LogSink};

/// Builds the argument parser for the `kexboot` binary.
pub fn build_cli() -> Command {
    Command::new("kexboot")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Find the root partition by GPT identity, mount it and kexec its kernel")
        .arg(
            Arg::new("id")
                .long("id")
                .action(ArgAction::SetTrue)
                .help("Print the target disk and partition identity, then exit"),
        )
        .arg(
            Arg::new("quiet")
                .short('d')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Skip the startup banner"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .help("YAML configuration file (default: $KEXBOOT_CONFIG or /etc/kexboot.yaml)"),
        )
        .arg(
            Arg::new("kver")
                .long("kver")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .conflicts_with("id")
                .help("Print the version embedded in a bzImage, then exit"),
        )
        // The kernel hands unrecognised command-line words (`single`,
        // `emergency`, ...) to init as argv.
        .arg(
            Arg::new("init_args")
                .num_args(1..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .hide(true),
        )
}

/// Parsed command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub id: bool,
    pub quiet: bool,
    pub config: Option<PathBuf>,
    pub kver: Option<PathBuf>,
    /// Words passed through from the kernel command line; ignored.
    pub init_args: Vec<String>,
}

impl Options {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            id: m.get_flag("id"),
            quiet: m.get_flag("quiet"),
            config: m.get_one::<PathBuf>("config").cloned(),
            kver: m.get_one::<PathBuf>("kver").cloned(),
            init_args: m
                .get_many::<String>("init_args")
                .map(|vals| vals.cloned().collect())
                .unwrap_or_default(),
        }
    }

    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&build_cli().try_get_matches_from(args)?))
    }

    /// Parse `args`, never giving up: a bad command line is logged and the
    /// defaults (a normal boot) are used instead.
    pub fn parse_or_default<I, T>(args: I, sink: &dyn DiagSink) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match build_cli().try_get_matches_from(args) {
            Ok(m) => Self::from_matches(&m),
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                let _ = e.print();
                Self::informational()
            }
            Err(e) => {
                let msg = e.to_string();
                sink.warn(&format!(
                    "ignoring command line: {}",
                    msg.lines().next().unwrap_or_default()
                ));
                Self::default()
            }
        }
    }

    pub fn parse() -> Self {
        Self::parse_or_default(std::env::args_os(), &LogSink)
    }

    // `--help`/`--version` already printed; only exit when nobody depends on us.
    fn informational() -> Self {
        if std::process::id() != 1 {
            std::process::exit(0);
        }
        Self::default()
    }
}
