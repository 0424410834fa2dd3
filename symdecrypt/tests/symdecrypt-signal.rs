#![cfg(unix)]

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use sequoia_openpgp as openpgp;
use openpgp::Result;

/// How long to give the child to install its signal handlers.
const STARTUP: Duration = Duration::from_secs(2);

mod integration {
    use super::*;

    /// Starts symdecrypt reading from a stdin that never delivers
    /// any data, delivers `signal`, and returns the exit code, stdout,
    /// and stderr.
    fn interrupt_hung_decryption(signal: libc::c_int, extra_args: &[&str])
                                 -> Result<(Option<i32>, String, String)> {
        let mut child = Command::new(env!("CARGO_BIN_EXE_symdecrypt"))
            .args(["--passphrase", "swordfish"])
            .args(extra_args)
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Keep stdin open, so that the child blocks reading it.
        let stdin = child.stdin.take();

        thread::sleep(STARTUP);
        let rc = unsafe { libc::kill(child.id() as libc::pid_t, signal) };
        assert_eq!(rc, 0);

        let status = child.wait()?;
        drop(stdin);

        let mut stdout = String::new();
        child.stdout.take().unwrap().read_to_string(&mut stdout)?;
        let mut stderr = String::new();
        child.stderr.take().unwrap().read_to_string(&mut stderr)?;

        Ok((status.code(), stdout, stderr))
    }

    #[test]
    fn sigint_dumps_threads() -> Result<()> {
        let (code, stdout, stderr) =
            interrupt_hung_decryption(libc::SIGINT, &[])?;

        assert_eq!(code, Some(1));
        assert!(stdout.is_empty());
        assert!(stderr.contains("Received SIGINT, dumping threads"),
                "stderr: {}", stderr);
        assert!(stderr.contains("Backtrace of thread \"signal-monitor\""),
                "stderr: {}", stderr);
        #[cfg(target_os = "linux")]
        assert!(stderr.contains("\"signal-monitor\": state"),
                "stderr: {}", stderr);
        Ok(())
    }

    #[test]
    fn termination_signals_are_handled_alike() -> Result<()> {
        for (signal, name) in [(libc::SIGTERM, "SIGTERM"),
                               (libc::SIGHUP, "SIGHUP"),
                               (libc::SIGPIPE, "SIGPIPE")] {
            let (code, stdout, stderr) =
                interrupt_hung_decryption(signal, &[])?;

            assert_eq!(code, Some(1), "{}", name);
            assert!(stdout.is_empty(), "{}", name);
            assert!(stderr.contains(&format!("Received {}", name)),
                    "stderr: {}", stderr);
        }
        Ok(())
    }

    #[test]
    fn sigint_writes_profile() -> Result<()> {
        let dir = TempDir::new()?;
        let profile = dir.path().join("cpu.pb");

        let (code, stdout, stderr) = interrupt_hung_decryption(
            libc::SIGINT,
            &["--cpuprofile", &profile.to_string_lossy()])?;

        assert_eq!(code, Some(1));
        assert!(stdout.is_empty());
        assert!(stderr.contains("CPU profile written"), "stderr: {}", stderr);
        assert!(profile.exists());
        Ok(())
    }
}
