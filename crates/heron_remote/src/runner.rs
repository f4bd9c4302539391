use crate::path::{self, sh_quote};

use heron_core::prelude::*;
use tracing::{debug, info, instrument};

/// Lists `$HOME/.py*/bin/python3` by version and prints the newest, then falls back to `PATH`.
const DISCOVER_INTERPRETER: &str = r#"best=$(for p in "$HOME"/.py*/bin/python3; do [ -x "$p" ] || continue; v=$("$p" -V 2>&1 | awk '{print $2}'); [ -n "$v" ] && echo "$v $p"; done | sort -t. -k1,1n -k2,2n -k3,3n | tail -n 1 | awk '{print $2}')
if [ -n "$best" ]; then echo "$best"; exit 0; fi
command -v python3 2>/dev/null || command -v python 2>/dev/null || true"#;

/// How a remote script is launched.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Raw interpreter command. Skips discovery and is not quoted.
    pub interpreter: Option<String>,
    /// Preferred version, e.g. `311` for `~/.py311/bin/python3`.
    pub python_version: Option<String>,
    /// Directory the script runs in.
    pub working_dir: Option<String>,
    /// Value exported as `PYTHONPATH`.
    pub python_path: Option<String>,
}

/// A shell-ready interpreter invocation, e.g. `'/home/u/.py311/bin/python3' -u`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter(pub String);

pub struct ScriptRunner {
    options: RunOptions,
}

impl ScriptRunner {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    /// Runs an arbitrary command and captures its output.
    pub async fn execute_command<S: RemoteSession>(
        &self,
        session: &S,
        cmd: &str,
    ) -> Result<CommandOutput, SessionError> {
        session.execute_command(cmd).await
    }

    /// Runs `script_path` with the remote python interpreter.
    ///
    /// With `log_path`, stdout and stderr are also appended to that remote file as
    /// they are produced. The exit code is the script's own, not the `tee`'s.
    #[instrument(skip(self, session))]
    pub async fn execute_python_script<S: RemoteSession>(
        &self,
        session: &S,
        script_path: &str,
        log_path: Option<&str>,
    ) -> Result<CommandOutput, SessionError> {
        let home = session.home_dir().await?;
        let script = path::expand_home(&path::normalize(script_path), &home);

        let check = session
            .execute_command(&format!("test -f {}", sh_quote(&script)))
            .await?;
        if !check.success() {
            return Err(SessionError::ScriptNotFound(script));
        }

        let interpreter = self.discover_interpreter(session, &home).await?;
        let log = log_path.map(|p| path::expand_home(&path::normalize(p), &home));
        let working_dir = self
            .options
            .working_dir
            .as_deref()
            .map(|p| path::expand_home(&path::normalize(p), &home));

        let cmd = build_command(
            &interpreter,
            &script,
            log.as_deref(),
            working_dir.as_deref(),
            self.options.python_path.as_deref(),
        );
        debug!(%cmd, "launching script");

        let out = session.execute_command(&cmd).await?;
        info!(exit_code = out.exit_code, "script finished");
        Ok(out)
    }

    /// Picks the interpreter: explicit override, requested version, newest `~/.py*`, then `PATH`.
    pub async fn discover_interpreter<S: RemoteSession>(
        &self,
        session: &S,
        home: &str,
    ) -> Result<Interpreter, SessionError> {
        if let Some(raw) = &self.options.interpreter {
            return Ok(Interpreter(raw.clone()));
        }

        if let Some(version) = &self.options.python_version {
            let candidate = path::join(home, &format!(".py{version}/bin/python3"));
            let probe = session
                .execute_command(&format!("test -x {}", sh_quote(&candidate)))
                .await?;
            if probe.success() {
                return Ok(python(&candidate));
            }
            debug!(%candidate, "requested python version not installed");
        }

        let out = session.execute_command(DISCOVER_INTERPRETER).await?;
        out.stdout
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .map(python)
            .ok_or(SessionError::InterpreterNotFound)
    }
}

fn python(program: &str) -> Interpreter {
    Interpreter(format!("{} -u", sh_quote(program)))
}

/// Builds the remote shell command for one script run.
///
/// The log is truncated first. Output passes through `tee -a` on both streams while
/// the script's exit code is carried out through a status file next to the log.
pub fn build_command(
    interpreter: &Interpreter,
    script: &str,
    log_path: Option<&str>,
    working_dir: Option<&str>,
    python_path: Option<&str>,
) -> String {
    let mut run = String::new();
    if let Some(pp) = python_path {
        run.push_str(&format!("PYTHONPATH={} ", sh_quote(pp)));
    }
    run.push_str(&format!("{} {}", interpreter.0, sh_quote(script)));

    let mut cmd = String::new();
    if let Some(dir) = working_dir {
        cmd.push_str(&format!("cd {} || exit 1\n", sh_quote(dir)));
    }

    match log_path {
        None => cmd.push_str(&run),
        Some(log) => {
            let log_q = sh_quote(log);
            let status_q = sh_quote(&format!("{log}.status"));
            cmd.push_str(&format!(": > {log_q}\n"));
            cmd.push_str(&format!(
                "( ( {run}; echo $? > {status_q} ) 2>&1 1>&3 3>&- | tee -a {log_q} 1>&2 3>&- ) 3>&1 | tee -a {log_q}\n"
            ));
            cmd.push_str(&format!(
                "status=$(cat {status_q} 2>/dev/null || echo 1)\nrm -f {status_q}\nexit \"$status\""
            ));
        }
    }
    cmd
}
