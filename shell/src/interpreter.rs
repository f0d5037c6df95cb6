use crate::builtin::Directive;
use crate::command::{ExitCode, Invocation, Spawner};
use crate::config::ShellConfig;
use crate::editor::EditorSettings;
use crate::error::Result;
use crate::external::{ProcessSpawner, exit_code_for};
use crate::history::History;
use crate::input::{Acquired, EditContext, LineSource};
use std::io::Write;
use tracing::{debug, error, info, warn};

/// What the dispatcher did with a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// Empty or blank line; nothing happened.
    Ignored,
    /// A `/` directive was applied by the shell itself.
    Directive(Directive),
    /// An external program ran (or failed to start) with this status.
    External(ExitCode),
    /// The command was reported as unusable and not run.
    Rejected,
}

/// Why the read loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Input ended; the caller continues to its normal exit path.
    EndOfInput,
    /// An asynchronous edit was cancelled; the process must stop now.
    Terminated,
}

/// Reads lines from a [`LineSource`] and dispatches them: `/` directives are
/// handled in-process, everything else runs through the [`Spawner`].
///
/// Example
/// ```
/// use ccnshell::Interpreter;
/// use ccnshell::config::ShellConfig;
/// let mut sh = Interpreter::new(ShellConfig::default());
/// let mut out = Vec::new();
/// sh.dispatch_to("/mask", &mut out, &mut std::io::sink()).unwrap();
/// assert!(sh.settings().mask);
/// ```
pub struct Interpreter<S: Spawner = ProcessSpawner> {
    config: ShellConfig,
    history: History,
    settings: EditorSettings,
    spawner: S,
}

impl Interpreter<ProcessSpawner> {
    /// Create an interpreter that runs real child processes.
    pub fn new(config: ShellConfig) -> Self {
        Self::with_spawner(config, ProcessSpawner)
    }
}

impl<S: Spawner> Interpreter<S> {
    /// Create an interpreter with a custom way of running external commands.
    pub fn with_spawner(config: ShellConfig, spawner: S) -> Self {
        Self {
            history: History::new(config.history_len),
            settings: EditorSettings {
                mask: false,
                multiline: config.multiline,
            },
            config,
            spawner,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn settings(&self) -> EditorSettings {
        self.settings
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Load the history file named in the configuration.
    pub fn load_history(&mut self) -> Result<()> {
        self.history.load(&self.config.history_path)
    }

    /// Dispatch one line, printing to the process's stdout and stderr.
    pub fn dispatch(&mut self, line: &str) -> Result<Dispatched> {
        self.dispatch_to(line, &mut std::io::stdout(), &mut std::io::stderr())
    }

    /// Dispatch one line with notices written to `out` and failures to `err`.
    pub fn dispatch_to(
        &mut self,
        line: &str,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<Dispatched> {
        if line.is_empty() {
            return Ok(Dispatched::Ignored);
        }
        if let Some(directive) = Directive::parse(line) {
            self.apply(&directive, out)?;
            return Ok(Dispatched::Directive(directive));
        }

        self.history.add(line);
        if let Err(e) = self.history.save(&self.config.history_path) {
            warn!(error = %e, "history not saved");
        }

        let invocation = match Invocation::from_line(
            line,
            &self.config.program_dir,
            self.config.max_args,
            self.config.max_program_path,
        ) {
            Ok(Some(invocation)) => invocation,
            Ok(None) => return Ok(Dispatched::Ignored),
            Err(e) => {
                writeln!(err, "{e}")?;
                return Ok(Dispatched::Rejected);
            }
        };

        debug!(path = %invocation.path().display(), args = ?invocation.args, "running");
        match self.spawner.spawn_and_wait(&invocation) {
            Ok(code) => Ok(Dispatched::External(code)),
            Err(e) => {
                writeln!(err, "{e}")?;
                Ok(exit_code_for(&e).map_or(Dispatched::Rejected, Dispatched::External))
            }
        }
    }

    fn apply(&mut self, directive: &Directive, out: &mut dyn Write) -> Result<()> {
        debug!(directive = directive.name(), "applying directive");
        match directive {
            Directive::HistoryLen(len) => {
                let len = usize::try_from(*len).unwrap_or(0);
                self.history.set_max_len(len);
            }
            Directive::Mask => self.settings.mask = true,
            Directive::Unmask => self.settings.mask = false,
            Directive::Unknown(line) => writeln!(out, "Unreconized command: {line}")?,
        }
        Ok(())
    }

    /// Read-dispatch loop. Returns when the source runs dry or is cancelled.
    ///
    /// Failures of single commands are reported and the loop goes on; only
    /// fatal errors are returned.
    pub fn repl(&mut self, source: &mut dyn LineSource) -> Result<LoopExit> {
        loop {
            let ctx = EditContext {
                history: &self.history,
                settings: self.settings,
            };
            let line = match source.read_line(&ctx)? {
                Acquired::Line(line) => line,
                Acquired::EndOfInput => {
                    info!("end of input");
                    return Ok(LoopExit::EndOfInput);
                }
                Acquired::Terminate => {
                    info!("edit cancelled, terminating");
                    return Ok(LoopExit::Terminated);
                }
            };
            if let Err(e) = self.dispatch(&line) {
                if e.is_fatal() {
                    return Err(e);
                }
                error!(error = %e, "command failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShellError;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    /// Records invocations instead of running them.
    #[derive(Default)]
    struct FakeSpawner {
        calls: Vec<Invocation>,
        results: VecDeque<Result<ExitCode>>,
    }

    impl Spawner for FakeSpawner {
        fn spawn_and_wait(&mut self, invocation: &Invocation) -> Result<ExitCode> {
            self.calls.push(invocation.clone());
            self.results.pop_front().unwrap_or(Ok(0))
        }
    }

    /// Hands out scripted lines and remembers the mask flag it saw each time.
    struct Script {
        lines: VecDeque<Acquired>,
        masks: Vec<bool>,
    }

    impl Script {
        fn new(lines: &[&str], end: Acquired) -> Self {
            let mut lines: VecDeque<_> = lines
                .iter()
                .map(|l| Acquired::Line(l.to_string()))
                .collect();
            lines.push_back(end);
            Self {
                lines,
                masks: Vec::new(),
            }
        }
    }

    impl LineSource for Script {
        fn read_line(&mut self, ctx: &EditContext<'_>) -> Result<Acquired> {
            self.masks.push(ctx.settings.mask);
            Ok(self.lines.pop_front().unwrap_or(Acquired::EndOfInput))
        }
    }

    fn shell(dir: &tempfile::TempDir) -> Interpreter<FakeSpawner> {
        let config = ShellConfig {
            history_path: dir.path().join("history.txt"),
            ..ShellConfig::default()
        };
        Interpreter::with_spawner(config, FakeSpawner::default())
    }

    fn run(sh: &mut Interpreter<FakeSpawner>, line: &str) -> (Dispatched, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let d = sh.dispatch_to(line, &mut out, &mut err).unwrap();
        (
            d,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn echo_hi_runs_usr_bin_echo() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(&dir);
        let (d, _, _) = run(&mut sh, "echo hi");
        assert_eq!(d, Dispatched::External(0));
        assert_eq!(
            sh.spawner().calls,
            [Invocation {
                path: PathBuf::from("/usr/bin/echo"),
                args: vec!["echo".into(), "hi".into()],
            }]
        );
    }

    #[test]
    fn external_command_is_saved_to_history_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(&dir);
        run(&mut sh, "uname -a");
        assert_eq!(sh.history().iter().collect::<Vec<_>>(), ["uname -a"]);
        let saved = std::fs::read_to_string(dir.path().join("history.txt")).unwrap();
        assert_eq!(saved, "uname -a\n");
    }

    #[test]
    fn damaged_history_file_is_extended_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.txt");
        std::fs::write(&path, b"make all\ngit log\ncaf\xe9\nls -l\n").unwrap();
        let mut sh = shell(&dir);
        sh.load_history().unwrap();
        assert_eq!(sh.history().len(), 4);

        run(&mut sh, "echo hi");
        let saved = std::fs::read(&path).unwrap();
        assert!(saved.starts_with(b"make all\ngit log\ncaf"));
        assert!(saved.ends_with(b"ls -l\necho hi\n"));
    }

    #[test]
    fn empty_and_slash_lines_never_spawn_or_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(&dir);
        for line in ["", "/", "/mask", "/unmask", "/historylen3", "/whatever"] {
            run(&mut sh, line);
        }
        assert!(sh.spawner().calls.is_empty());
        assert!(sh.history().is_empty());
        assert!(!dir.path().join("history.txt").exists());
    }

    #[test]
    fn history_len_five_keeps_five_newest() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(&dir);
        run(&mut sh, "/historylen5");
        for i in 0..10 {
            run(&mut sh, &format!("true {i}"));
        }
        let kept: Vec<_> = sh.history().iter().collect();
        assert_eq!(kept, ["true 5", "true 6", "true 7", "true 8", "true 9"]);
    }

    #[test]
    fn non_numeric_history_len_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(&dir);
        let (d, _, _) = run(&mut sh, "/historylenabc");
        assert_eq!(d, Dispatched::Directive(Directive::HistoryLen(0)));
        assert_eq!(sh.history().max_len(), 100);
        run(&mut sh, "/historylen-4");
        assert_eq!(sh.history().max_len(), 100);
    }

    #[test]
    fn mask_and_unmask_toggle_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(&dir);
        run(&mut sh, "/mask");
        assert!(sh.settings().mask);
        run(&mut sh, "/unmask");
        assert!(!sh.settings().mask);
    }

    #[test]
    fn unknown_directive_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(&dir);
        let (d, out, _) = run(&mut sh, "/frobnicate 3");
        assert_eq!(d, Dispatched::Directive(Directive::Unknown("/frobnicate 3".into())));
        assert_eq!(out, "Unreconized command: /frobnicate 3\n");
    }

    #[test]
    fn blank_line_is_recorded_but_not_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(&dir);
        let (d, _, _) = run(&mut sh, "   ");
        assert_eq!(d, Dispatched::Ignored);
        assert!(sh.spawner().calls.is_empty());
        assert_eq!(sh.history().len(), 1);
    }

    #[test]
    fn too_many_arguments_is_rejected_with_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(&dir);
        let line = format!("echo {}", vec!["x"; 32].join(" "));
        let (d, _, err) = run(&mut sh, &line);
        assert_eq!(d, Dispatched::Rejected);
        assert!(err.contains("too many arguments: 33 given, at most 32 allowed"));
        assert!(sh.spawner().calls.is_empty());
    }

    #[test]
    fn exec_failure_reports_and_yields_127() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(&dir);
        sh.spawner.results.push_back(Err(ShellError::Exec {
            program: "nosuch".into(),
            reason: std::io::Error::from(std::io::ErrorKind::NotFound),
        }));
        let (d, _, err) = run(&mut sh, "nosuch");
        assert_eq!(d, Dispatched::External(127));
        assert!(err.starts_with("|| Failed to execute 'nosuch': "));
    }

    #[test]
    fn spawn_failure_does_not_stop_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(&dir);
        sh.spawner.results.push_back(Err(ShellError::Spawn(
            std::io::Error::from(std::io::ErrorKind::OutOfMemory),
        )));
        let mut script = Script::new(&["ls", "pwd"], Acquired::EndOfInput);
        assert_eq!(sh.repl(&mut script).unwrap(), LoopExit::EndOfInput);
        let programs: Vec<_> = sh.spawner().calls.iter().map(|c| c.program()).collect();
        assert_eq!(programs, ["ls", "pwd"]);
    }

    #[test]
    fn end_of_input_only_ends_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(&dir);
        let mut script = Script::new(&["date"], Acquired::EndOfInput);
        assert_eq!(sh.repl(&mut script).unwrap(), LoopExit::EndOfInput);
    }

    #[test]
    fn cancelled_async_edit_terminates() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(&dir);
        let mut script = Script::new(&["date", "id"], Acquired::Terminate);
        assert_eq!(sh.repl(&mut script).unwrap(), LoopExit::Terminated);
        assert_eq!(sh.spawner().calls.len(), 2);
    }

    #[test]
    fn editor_sees_mask_changes() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(&dir);
        let mut script = Script::new(&["/mask", "secret", "/unmask"], Acquired::EndOfInput);
        sh.repl(&mut script).unwrap();
        assert_eq!(script.masks, [false, true, true, false]);
    }
}
