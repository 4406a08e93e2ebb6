// SPDX-License-Identifier: Apache-2.0

mod args;
mod error;
mod handler;

use std::path::PathBuf;

use bfnetadm::{AdmConfig, LogLevel, NetworkAdmin, SystemRunner, LOG_TARGETS};

pub(crate) use self::error::CliError;
use self::{
    args::{gen_args, get_operation},
    error::permission_deny,
    handler::{handle_get_devices, handle_set, handle_show},
};

fn main() {
    let cli_cmd = gen_args(
        clap::Command::new("bfnetadm")
            .about("Network and RoCE QoS configuration of SmartNIC host")
            .version(env!("CARGO_PKG_VERSION"))
            .arg_required_else_help(true)
            .arg(
                clap::Arg::new("quiet")
                    .short('q')
                    .action(clap::ArgAction::SetTrue)
                    .help("Disable logging"),
            )
            .arg(
                clap::Arg::new("verbose")
                    .short('v')
                    .action(clap::ArgAction::Count)
                    .help("Increase verbose level"),
            ),
    );
    let matches = cli_cmd.get_matches();

    match run(&matches) {
        Ok(status) => std::process::exit(status),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.status());
        }
    }
}

fn run(matches: &clap::ArgMatches) -> Result<i32, CliError> {
    let config_path = matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(AdmConfig::DEFAULT_PATH));
    let config = AdmConfig::load(&config_path)?;

    init_logger(
        config.log_level,
        matches.get_count("verbose"),
        matches.get_flag("quiet"),
    );
    log::info!("bfnetadm version: {}", env!("CARGO_PKG_VERSION"));

    if !nix::unistd::geteuid().is_root() {
        return Err(permission_deny("bfnetadm must be run as root"));
    }

    if matches.get_flag("get_devices") {
        return handle_get_devices(&config, matches);
    }

    let Some(op) = get_operation(matches)? else {
        return Err(CliError::from("Missing --op"));
    };
    let admin = NetworkAdmin::new(config.clone(), SystemRunner::new(&config));
    match matches.get_one::<String>("action").map(String::as_str) {
        Some("set") => handle_set(&admin, op, matches),
        _ => handle_show(&admin, op, matches),
    }
}

fn init_logger(base: LogLevel, verbose: u8, quiet: bool) {
    if quiet {
        return;
    }
    let log_level: log::LevelFilter = base.raise(verbose).into();
    let mut log_builder = env_logger::Builder::new();
    for log_target in LOG_TARGETS {
        log_builder.filter(Some(log_target), log_level);
    }
    log_builder.init();
}
