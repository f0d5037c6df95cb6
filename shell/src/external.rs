use crate::command::{EXEC_FAILURE, ExitCode, Invocation, Spawner};
use crate::error::{Result, ShellError};
use nix::errno::Errno;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Command, ExitStatus};
use tracing::{debug, warn};

/// Runs invocations as real child processes with an empty environment.
///
/// Each child inherits the terminal. While it runs the shell ignores the
/// keyboard signals so Ctrl-C reaches the child only.
#[derive(Debug, Default)]
pub struct ProcessSpawner;

impl Spawner for ProcessSpawner {
    fn spawn_and_wait(&mut self, invocation: &Invocation) -> Result<ExitCode> {
        let program = invocation.program().to_string();
        let mut cmd = Command::new(invocation.path());
        cmd.arg0(&program).args(&invocation.args[1..]).env_clear();
        // SAFETY: the hook only calls sigaction, which is async-signal-safe.
        unsafe {
            cmd.pre_exec(default_keyboard_signals);
        }

        let _shield = KeyboardSignalShield::raise();
        let mut child = cmd.spawn().map_err(|reason| classify(&program, reason))?;
        debug!(pid = child.id(), path = %invocation.path().display(), "child started");

        let exit_status = child.wait().map_err(|reason| ShellError::Wait {
            program: program.clone(),
            reason,
        })?;
        let code = match exit_status.code() {
            Some(x) => x,
            None => terminated_by_signal(exit_status),
        };
        debug!(code, program, "child finished");
        Ok(code)
    }
}

/// No process could be created (`fork` level) versus the program could not be
/// started in the new process (`exec` level).
fn classify(program: &str, reason: io::Error) -> ShellError {
    let fork_level = [Errno::EAGAIN as i32, Errno::ENOMEM as i32];
    match reason.raw_os_error() {
        Some(errno) if fork_level.contains(&errno) => ShellError::Spawn(reason),
        _ => ShellError::Exec {
            program: program.to_string(),
            reason,
        },
    }
}

/// Maps an exec failure to the status a child would have exited with.
pub fn exit_code_for(err: &ShellError) -> Option<ExitCode> {
    match err {
        ShellError::Exec { .. } => Some(EXEC_FAILURE),
        _ => None,
    }
}

fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

const SHIELDED: [Signal; 2] = [Signal::SIGINT, Signal::SIGQUIT];

/// Runs in the child between fork and exec: ignored dispositions survive
/// exec, so the shielded signals go back to their defaults.
fn default_keyboard_signals() -> io::Result<()> {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for signal in SHIELDED {
        // SAFETY: installing SIG_DFL runs no user code in signal context.
        unsafe { sigaction(signal, &default) }.map_err(io::Error::from)?;
    }
    Ok(())
}

/// Ignores SIGINT and SIGQUIT in the shell until dropped.
///
/// Raised before the child is spawned so no keyboard signal can reach the
/// shell between fork and wait.
struct KeyboardSignalShield {
    previous: Vec<(Signal, SigAction)>,
}

impl KeyboardSignalShield {
    fn raise() -> Self {
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        let mut previous = Vec::with_capacity(SHIELDED.len());
        for signal in SHIELDED {
            // SAFETY: installing SIG_IGN runs no user code in signal context.
            match unsafe { sigaction(signal, &ignore) } {
                Ok(old) => previous.push((signal, old)),
                Err(e) => warn!(%signal, error = %e, "cannot ignore signal while child runs"),
            }
        }
        Self { previous }
    }
}

impl Drop for KeyboardSignalShield {
    fn drop(&mut self) {
        for (signal, old) in self.previous.drain(..) {
            // SAFETY: restores the disposition that was in place before `raise`.
            if let Err(e) = unsafe { sigaction(signal, &old) } {
                warn!(%signal, error = %e, "cannot restore signal disposition");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn invocation(path: &str, args: &[&str]) -> Invocation {
        Invocation {
            path: PathBuf::from(path),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn true_exits_with_zero() {
        let code = ProcessSpawner
            .spawn_and_wait(&invocation("/bin/sh", &["sh", "-c", "exit 0"]))
            .unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn exit_status_is_forwarded() {
        let code = ProcessSpawner
            .spawn_and_wait(&invocation("/bin/sh", &["sh", "-c", "exit 3"]))
            .unwrap();
        assert_eq!(code, 3);
    }

    #[test]
    fn environment_is_empty() {
        let code = ProcessSpawner
            .spawn_and_wait(&invocation(
                "/bin/sh",
                &["sh", "-c", "test -z \"$HOME\" && test -z \"$PATH_PROBE\""],
            ))
            .unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn signal_death_maps_to_128_plus_signal() {
        let code = ProcessSpawner
            .spawn_and_wait(&invocation("/bin/sh", &["sh", "-c", "kill -TERM $$"]))
            .unwrap();
        assert_eq!(code, 128 + 15);
    }

    #[test]
    fn missing_program_is_an_exec_failure() {
        let err = ProcessSpawner
            .spawn_and_wait(&invocation("/usr/bin/definitely-not-here-ccn", &["x"]))
            .unwrap_err();
        assert!(matches!(err, ShellError::Exec { ref program, .. } if program == "x"));
        assert_eq!(exit_code_for(&err), Some(EXEC_FAILURE));
    }

    #[test]
    fn file_without_interpreter_is_an_exec_failure() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage");
        std::fs::write(&path, b"\x00\x01\x02garbage").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = ProcessSpawner
            .spawn_and_wait(&invocation(path.to_str().unwrap(), &["garbage"]))
            .unwrap_err();
        assert!(matches!(err, ShellError::Exec { .. }), "{err}");
        assert!(err.to_string().starts_with("|| Failed to execute 'garbage': "));
        assert_eq!(exit_code_for(&err), Some(EXEC_FAILURE));
    }

    #[test]
    fn out_of_processes_is_a_spawn_failure() {
        let err = classify("ls", io::Error::from_raw_os_error(Errno::EAGAIN as i32));
        assert!(matches!(err, ShellError::Spawn(_)));
        assert_eq!(exit_code_for(&err), None);

        let err = classify("ls", io::Error::from_raw_os_error(Errno::ENOTDIR as i32));
        assert!(matches!(err, ShellError::Exec { .. }));
    }

    #[test]
    fn child_gets_default_keyboard_signals() {
        let code = ProcessSpawner
            .spawn_and_wait(&invocation("/bin/sh", &["sh", "-c", "kill -INT $$"]))
            .unwrap();
        assert_eq!(code, 128 + 2);
    }
}
