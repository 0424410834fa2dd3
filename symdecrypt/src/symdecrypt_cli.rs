/// Command-line parser for symdecrypt.
use clap::{Command, CommandFactory, Parser};

pub fn build() -> Command<'static> {
    SymdecryptCommand::command()
}

/// Defines the CLI.
#[derive(Parser, Debug)]
#[clap(
    name = "symdecrypt",
    about = "Decrypts a password-encrypted OpenPGP message",
    long_about =
"Decrypts a password-encrypted OpenPGP message

Reads a symmetrically encrypted OpenPGP message from FILE, or from
stdin if no file is given, and writes the plaintext to stdout.  Only
password-based (SKESK) decryption is supported; messages encrypted to
public keys are rejected.

The plaintext is streamed as it is decrypted.  The integrity check
covering the payload can only be evaluated once the whole message has
been read, so if the check fails, the plaintext has already been
written.  In that case the program terminates with an exit status
indicating failure, and consumers must discard the output.

On SIGINT, SIGTERM, SIGHUP or SIGPIPE, the state of every thread is
printed to stderr before the program exits, to help diagnose hangs.
",
    after_help =
"EXAMPLES:

# Decrypt a file
$ symdecrypt --filename ciphertext.pgp --passphrase swordfish

# Decrypt stdin, taking the password from the environment
$ SYMDECRYPT_PASSPHRASE=swordfish symdecrypt < ciphertext.pgp

# Decrypt a file while recording a CPU profile
$ symdecrypt --filename ciphertext.pgp --cpuprofile decrypt.pb
",
    disable_colored_help = true,
    setting(clap::AppSettings::DeriveDisplayOrder),
)]
pub struct SymdecryptCommand {
    #[clap(
        long = "filename",
        value_name = "FILE",
        help = "Reads the message from FILE or stdin if omitted",
    )]
    pub filename: Option<String>,
    #[clap(
        long = "passphrase",
        value_name = "PASSPHRASE",
        env = "SYMDECRYPT_PASSPHRASE",
        hide_env_values = true,
        default_value = "",
        hide_default_value = true,
        help = "Decrypts the message using PASSPHRASE",
    )]
    pub passphrase: String,
    #[clap(
        long = "cpuprofile",
        value_name = "FILE",
        help = "Records a CPU profile in FILE",
        long_help = "Records a CPU profile in FILE.  The profile is \
                     written in pprof's protobuf format when decryption \
                     finishes, fails, or is interrupted by a signal.",
    )]
    pub cpuprofile: Option<String>,
}

impl SymdecryptCommand {
    /// Returns the input file, treating an empty name as stdin.
    pub fn input(&self) -> Option<&str> {
        self.filename.as_deref().filter(|f| ! f.is_empty())
    }

    /// Returns the profile destination, treating an empty name as
    /// disabled.
    pub fn profile_path(&self) -> Option<&str> {
        self.cpuprofile.as_deref().filter(|f| ! f.is_empty())
    }
}
