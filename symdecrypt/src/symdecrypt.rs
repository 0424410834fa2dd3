/// Decrypts a password-encrypted OpenPGP message.

use std::io;

use clap::FromArgMatches;

use sequoia_openpgp as openpgp;
use openpgp::crypto::Password;

use sequoia_symdecrypt::commands::{self, decrypt::{Fatal, Phase}};
use sequoia_symdecrypt::monitor;
use sequoia_symdecrypt::profile::CpuProfile;

mod symdecrypt_cli;
use symdecrypt_cli::SymdecryptCommand;

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let version = Box::leak(
        format!("{} (sequoia-openpgp {}, using {})",
                env!("CARGO_PKG_VERSION"),
                openpgp::VERSION,
                openpgp::crypto::backend())
            .into_boxed_str()) as &str;
    let matches = symdecrypt_cli::build().version(version).get_matches();
    let command = match SymdecryptCommand::from_arg_matches(&matches) {
        Ok(command) => command,
        Err(e) => e.exit(),
    };

    let status = match run(command) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    };
    std::process::exit(status);
}

fn run(mut command: SymdecryptCommand) -> Result<(), Fatal> {
    let setup = |e| Fatal::new(Phase::Setup, e);

    let profile = match command.profile_path() {
        Some(path) => CpuProfile::start(path).map_err(setup)?,
        None => CpuProfile::disabled(),
    };
    monitor::spawn(profile.clone()).map_err(setup)?;

    let password = Password::from(std::mem::take(&mut command.passphrase));
    let stdout = io::stdout();
    let mut output = stdout.lock();
    let result = commands::decrypt(command.input(), &mut output, password);

    if let Err(e) = profile.release() {
        log::warn!("{:#}", e);
    }
    result
}
