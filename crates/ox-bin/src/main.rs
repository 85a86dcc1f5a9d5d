//! ox-remap entrypoint: run ex commands, feed key notation, print outcomes.
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use core_actions::{
    Action, Engine, EngineObserver, EngineOptions, ExOutcome, FeedResult, Outcome, RemapError,
    VimBindings,
};
use core_config::{Config, load_from};
use core_keymap::Mode;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Once;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

const LOG_FILE_NAME: &str = "ox-remap.log";

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "ox-remap", version, about = "Modal key remapping engine")]
struct Args {
    /// Configuration file path (overrides discovery of `ox-remap.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Rc file of ex commands (overrides `[startup] rc` and `.vrapperrc` discovery).
    #[arg(long = "rc")]
    pub rc: Option<PathBuf>,
    /// Ex command run after the rc file and `[startup] commands`; repeatable.
    #[arg(short = 'e', long = "ex", value_name = "EX")]
    pub ex: Vec<String>,
    /// Mode the engine starts in.
    #[arg(long = "mode", value_enum, default_value_t = ModeArg::Normal)]
    pub mode: ModeArg,
    /// Key sequences in angle-bracket notation, fed in order.
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Normal,
    Visual,
    Insert,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Normal => Mode::Normal,
            ModeArg::Visual => Mode::Visual,
            ModeArg::Insert => Mode::Insert,
        }
    }
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join(LOG_FILE_NAME);
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_err) => {
                // Global tracing subscriber already installed; drop guard so writer shuts down.
            }
        }

        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

/// Logs committed mode transitions.
struct ModeLogger;

impl EngineObserver<Action> for ModeLogger {
    fn on_mode_change(&self, from: Mode, to: Mode) {
        info!(target: "runtime.mode", %from, %to, "mode_change");
    }
}

/// One engine run over the ex commands and key arguments of a session.
struct Session<O, E> {
    engine: Engine<VimBindings>,
    out: O,
    err: E,
    failed: bool,
}

impl<O: Write, E: Write> Session<O, E> {
    fn new(config: &Config, mode: Mode, out: O, err: E) -> Self {
        let mut engine = Engine::with_options(VimBindings::new(), EngineOptions::from_config(config));
        engine.set_mode(mode);
        engine.add_observer(ModeLogger);
        Self {
            engine,
            out,
            err,
            failed: false,
        }
    }

    fn ex(&mut self, line: &str) -> Result<()> {
        match self.engine.execute_ex(line) {
            Ok(ExOutcome::Listing(lines)) => {
                for l in lines {
                    writeln!(self.out, "{l}")?;
                }
            }
            Ok(_) => {}
            Err(e) => {
                self.failed = true;
                writeln!(self.err, "error: {line}: {e}")?;
            }
        }
        Ok(())
    }

    fn keys(&mut self, notation: &str) -> Result<()> {
        match self.engine.feed_notation(notation) {
            Ok(result) => self.print(result),
            Err(e) => self.report(notation, e),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self.engine.flush() {
            Ok(result) => self.print(result),
            Err(e) => self.report("<flush>", RemapError::Loop(e)),
        }
    }

    fn report(&mut self, context: &str, e: RemapError) -> Result<()> {
        self.failed = true;
        warn!(target: "runtime", input = context, error = %e, "feed_failed");
        writeln!(self.err, "error: {context}: {e}")?;
        Ok(())
    }

    fn print(&mut self, result: FeedResult<Action>) -> Result<()> {
        for outcome in &result.outcomes {
            writeln!(self.out, "{}", format_outcome(outcome))?;
        }
        Ok(())
    }
}

fn format_outcome(outcome: &Outcome<Action>) -> String {
    match outcome {
        Outcome::Resolved(r) => {
            let mut line = format!("{}: {:?}", r.keys, r.command);
            if let Some(count) = r.count {
                line.push_str(&format!(" count={count}"));
            }
            if let Some(register) = r.register {
                line.push_str(&format!(" register={register}"));
            }
            line.push_str(&format!(" [{}]", r.mode));
            line
        }
        Outcome::NoMatch(keys) => format!("{keys}: no match"),
    }
}

/// Returns whether every ex command and key sequence succeeded.
fn run<O: Write, E: Write>(args: &Args, config: &Config, out: O, err: E) -> Result<bool> {
    let mut session = Session::new(config, args.mode.into(), out, err);
    let startup = config
        .startup_commands(args.rc.as_deref())
        .context("loading startup commands")?;
    for line in startup.iter().chain(args.ex.iter()) {
        session.ex(line)?;
    }
    for keys in &args.keys {
        session.keys(keys)?;
    }
    session.flush()?;
    info!(
        target: "runtime",
        ex = startup.len() + args.ex.len(),
        keys = args.keys.len(),
        failed = session.failed,
        "session_complete"
    );
    Ok(!session.failed)
}

fn main() -> Result<ExitCode> {
    let mut startup = AppStartup::new();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let config = load_from(args.config.clone())?;
    info!(
        target: "runtime.startup",
        config_override = args.config.is_some(),
        config_path = config.source.as_ref().map(|p| p.display().to_string()).as_deref(),
        "bootstrap_complete"
    );

    let ok = run(&args, &config, std::io::stdout().lock(), std::io::stderr().lock())?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(cli: &[&str]) -> Args {
        Args::parse_from(std::iter::once("ox-remap").chain(cli.iter().copied()))
    }

    fn run_cli(cli: &[&str]) -> (bool, String, String) {
        let a = args(cli);
        let config = load_from(Some(PathBuf::from("__nonexistent_ox_remap__.toml"))).unwrap();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let ok = run(&a, &config, &mut out, &mut err).unwrap();
        (
            ok,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    fn rc_file(content: &str) -> tempfile::NamedTempFile {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), content).unwrap();
        tmp
    }

    #[test]
    fn parses_repeated_ex_and_keys() {
        let a = args(&["-e", ":nmap L dd", "--ex", "nnoremap D \"_d$", "--mode", "insert", "3L", "D"]);
        assert_eq!(a.ex, vec![":nmap L dd".to_string(), "nnoremap D \"_d$".to_string()]);
        assert_eq!(a.mode, ModeArg::Insert);
        assert_eq!(a.keys, vec!["3L".to_string(), "D".to_string()]);
        assert!(a.config.is_none());
    }

    #[test]
    fn prints_one_line_per_outcome() {
        let rc = rc_file("\" rc\nnmap L dd\n");
        let rc_path = rc.path().to_str().unwrap();
        let (ok, out, err) = run_cli(&["--rc", rc_path, "3L", "dQ"]);
        assert!(ok, "{err}");
        assert_eq!(
            out,
            "3dd: Linewise { operator: Operator(Delete) } count=3 [normal]\ndQ: no match\n"
        );
    }

    #[test]
    fn pending_prefix_resolved_by_final_flush() {
        let rc = rc_file("");
        let rc_path = rc.path().to_str().unwrap();
        let (ok, out, _) = run_cli(&["--rc", rc_path, "-e", "inoremap jj <Esc>", "--mode", "insert", "j"]);
        assert!(ok);
        assert_eq!(out, "j: Single(Edit(InsertGrapheme('j'))) [insert]\n");
    }

    #[test]
    fn listing_and_errors_are_reported() {
        let rc = rc_file("");
        let rc_path = rc.path().to_str().unwrap();
        let (ok, out, err) = run_cli(&[
            "--rc",
            rc_path,
            "-e",
            "nnoremap D \"_d$",
            "-e",
            "nmap",
            "-e",
            "nmap A B",
            "-e",
            "nmap B A",
            "-e",
            "nmap Q",
            "A",
        ]);
        assert!(!ok);
        assert!(out.starts_with("n  D"), "{out}");
        assert!(out.contains("*\"_d$"), "{out}");
        assert_eq!(err.lines().count(), 2, "{err}");
        assert!(err.contains("error: nmap Q:"), "{err}");
        assert!(err.contains("error: A: recursive mapping loop"), "{err}");
    }

    #[test]
    fn missing_rc_file_is_fatal() {
        let a = args(&["--rc", "__nonexistent_rc__"]);
        let config = Config::default();
        let result = run(&a, &config, Vec::new(), Vec::new());
        assert!(result.is_err());
    }
}
