use std::env;
use std::fs;
use clap_complete::Shell;

#[allow(dead_code)]
pub mod symdecrypt_cli {
    include!("src/symdecrypt_cli.rs");
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/symdecrypt_cli.rs");

    let mut cmd = symdecrypt_cli::build();

    // Generate shell completions
    let outdir = match env::var_os("CARGO_TARGET_DIR") {
        None => return,
        Some(outdir) => outdir,
    };

    fs::create_dir_all(&outdir).unwrap();

    for shell in &[Shell::Bash, Shell::Fish, Shell::Zsh, Shell::PowerShell,
                   Shell::Elvish] {
        let path = clap_complete::generate_to(
            *shell, &mut cmd, "symdecrypt", &outdir).unwrap();
        println!("cargo:warning=completion file is generated: {:?}", path);
    };
}
