//! Purpose: `certlogic-fiddle` CLI entry point.
//! Role: Binary crate root; parses args, runs commands, emits results on stdout.
//! Invariants: Results are human text on a TTY and JSON otherwise (or with `--json`).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from the evaluation outcome or `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::ffi::OsString;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{
    Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint,
    error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;
use url::Url;

mod command_dispatch;
mod outcome_json;
mod render;
mod serve;

use certlogic_fiddle::api::{
    Buffer, CertLogic, Error, ErrorKind, EvaluationOutcome, SPECIFICATION_VERSION, ShareState,
    decode, decode_url, to_exit_code,
};
use render::{Style, colorize_json};

const DEFAULT_BIND: &str = "127.0.0.1:9710";
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9710/";

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint(clap_error_hint(&err)),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    let default_directive = match cli.command {
        Command::Serve { .. } => "info",
        _ => "warn",
    };
    init_tracing(default_directive);

    command_dispatch::dispatch_command(cli.command, color_mode)
        .map_err(add_malformed_hint)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("---help") => OsString::from("--help"),
            Some("---version") => OsString::from("--version"),
            _ => arg,
        })
        .collect()
}

fn init_tracing(default_directive: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "certlogic-fiddle",
    version,
    about = "Edit, validate, evaluate, and share CertLogic expressions",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Two JSON buffers drive everything: an expression and the data it runs against.

Mental model:
  - `eval` validates the expression and evaluates it against the data
  - `share` packs both buffers into a link (only when both parse)
  - `decode` unpacks a link back into buffers
"#,
    after_help = r#"EXAMPLES
  $ certlogic-fiddle eval --expr '{"var":"a"}' --data '{"a":1}'
  $ certlogic-fiddle share --expr-file rule.json --data-file payload.json
  $ certlogic-fiddle decode 'http://127.0.0.1:9710/?expr=%7B%22var%22%3A%22a%22%7D&data=%7B%7D'
  $ certlogic-fiddle serve

LEARN MORE
  $ certlogic-fiddle <command> --help"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        global = true,
        help = "Colorize stderr diagnostics and pretty output: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Args, Clone, Debug, Default)]
struct BufferArgs {
    #[arg(long, help = "Expression text (JSON)", conflicts_with = "expr_file")]
    expr: Option<String>,
    #[arg(
        long = "expr-file",
        help = "Read the expression text from a file (use - for stdin)",
        value_hint = ValueHint::FilePath
    )]
    expr_file: Option<PathBuf>,
    #[arg(long, help = "Data text (JSON)", conflicts_with = "data_file")]
    data: Option<String>,
    #[arg(
        long = "data-file",
        help = "Read the data text from a file (use - for stdin)",
        value_hint = ValueHint::FilePath
    )]
    data_file: Option<PathBuf>,
    #[arg(
        long,
        help = "Start from the buffers in a shared link or query string",
        value_hint = ValueHint::Url
    )]
    url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Validate and evaluate an expression against data",
        long_about = r#"Validate the expression and evaluate it against the data.

Buffers default to `{"var": ""}` and `{}`. A --url link is decoded first;
--expr/--data (or their file forms) then override individual buffers."#,
        after_help = r#"EXAMPLES
  $ certlogic-fiddle eval --expr '{"var":"a"}' --data '{"a":1}'
  $ certlogic-fiddle eval --expr-file rule.json --data-file - < payload.json
  $ certlogic-fiddle eval --url "$LINK" --json
  $ certlogic-fiddle eval --expr-file rule.json --base-url https://fiddle.example.org/

NOTES
  - Exit codes: 0 success, 3 data malformed, 4 expression invalid, 5 runtime fault
  - Malformed data is reported even when the expression is also invalid
  - With --base-url, a share link is included when both buffers parse"#
    )]
    Eval {
        #[command(flatten)]
        buffers: BufferArgs,
        #[arg(
            long = "base-url",
            help = "Also print a share link with this prefix",
            value_hint = ValueHint::Url
        )]
        base_url: Option<String>,
        #[arg(long, help = "Emit the JSON envelope even on a TTY")]
        json: bool,
    },
    #[command(
        about = "Build a shareable link for the buffers",
        long_about = r#"Minify both buffers and write them into the query of a link.

Refuses (exit 3) when either buffer is not valid JSON."#,
        after_help = r#"EXAMPLES
  $ certlogic-fiddle share --expr '{"var": "a"}' --data '{"a": 1}'
  $ certlogic-fiddle share --expr-file rule.json --base-url https://fiddle.example.org/"#
    )]
    Share {
        #[command(flatten)]
        buffers: BufferArgs,
        #[arg(
            long = "base-url",
            default_value = DEFAULT_BASE_URL,
            help = "Link prefix; its query is replaced",
            value_hint = ValueHint::Url
        )]
        base_url: String,
        #[arg(long, help = "Emit the JSON envelope even on a TTY")]
        json: bool,
    },
    #[command(
        arg_required_else_help = true,
        about = "Print the buffers held by a link or query string",
        after_help = r#"EXAMPLES
  $ certlogic-fiddle decode 'expr=%7B%22var%22%3A%22a%22%7D&data=%7B%22a%22%3A1%7D'
  $ certlogic-fiddle decode "$LINK" --json

NOTES
  - Absent or empty parameters decode to the default buffers
  - Values are not validated; use `eval --url` for that"#
    )]
    Decode {
        #[arg(help = "Full URL, or a query string with or without the leading ?")]
        input: String,
        #[arg(long, help = "Emit the JSON envelope even on a TTY")]
        json: bool,
    },
    #[command(
        about = "Serve the playground over HTTP",
        long_about = r#"Run an HTTP server that derives outcomes per request.

Endpoints:
  GET  /healthz
  GET  /v0/fiddle?expr=..&data=..
  POST /v0/fiddle   {"expr": "...", "data": "..."}
  POST /v0/share    {"expr": "...", "data": "..."}"#,
        after_help = r#"EXAMPLES
  $ certlogic-fiddle serve
  $ certlogic-fiddle serve --bind 0.0.0.0:9710 --allow-non-loopback
  $ curl 'http://127.0.0.1:9710/v0/fiddle?expr=%7B%22var%22%3A%22a%22%7D&data=%7B%22a%22%3A1%7D'

NOTES
  - Loopback-only unless --allow-non-loopback is set
  - Set RUST_LOG to adjust logging (default: info)"#
    )]
    Serve {
        #[arg(long, default_value = DEFAULT_BIND, help = "Bind address (host:port)")]
        bind: String,
        #[arg(long = "allow-non-loopback", help = "Allow binding to non-loopback addresses")]
        allow_non_loopback: bool,
        #[arg(
            long = "max-body-bytes",
            default_value_t = 1024 * 1024,
            help = "Maximum request body size in bytes"
        )]
        max_body_bytes: u64,
        #[arg(
            long = "base-url",
            help = "Prefix for share links (default: http://<bind>/)",
            value_hint = ValueHint::Url
        )]
        base_url: Option<String>,
    },
    #[command(about = "Print version info")]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        after_help = r#"EXAMPLES
  $ certlogic-fiddle completion bash > ~/.local/share/bash-completion/completions/certlogic-fiddle
  $ certlogic-fiddle completion zsh > ~/.zfunc/_certlogic-fiddle"#
    )]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Decodes `--url` first, then applies per-buffer overrides.
fn resolve_buffers(args: BufferArgs) -> Result<ShareState, Error> {
    if args.expr_file.as_deref().is_some_and(is_stdin_path)
        && args.data_file.as_deref().is_some_and(is_stdin_path)
    {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--expr-file and --data-file cannot both read stdin")
            .with_hint("Pass one of the buffers inline or from a file."));
    }

    let mut state = match args.url.as_deref() {
        Some(input) => decode_input(input),
        None => ShareState::default(),
    };
    if let Some(text) = args.expr {
        state.expression_text = text;
    } else if let Some(path) = args.expr_file {
        state.expression_text = read_buffer_file(&path, Buffer::Expression)?;
    }
    if let Some(text) = args.data {
        state.data_text = text;
    } else if let Some(path) = args.data_file {
        state.data_text = read_buffer_file(&path, Buffer::Data)?;
    }
    Ok(state)
}

/// Full URLs go through `decode_url`; anything else is treated as a query.
fn decode_input(input: &str) -> ShareState {
    match Url::parse(input) {
        Ok(url) => decode_url(&url),
        Err(_) => decode(input),
    }
}

fn is_stdin_path(path: &std::path::Path) -> bool {
    path.as_os_str() == "-"
}

fn read_buffer_file(path: &std::path::Path, buffer: Buffer) -> Result<String, Error> {
    if is_stdin_path(path) {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read {} text from stdin", buffer.label()))
                .with_buffer(buffer)
                .with_source(err)
        })?;
        return Ok(text);
    }
    std::fs::read_to_string(path).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!(
                "failed to read {} file {}",
                buffer.label(),
                path.display()
            ))
            .with_buffer(buffer)
            .with_source(err)
    })
}

fn parse_url_arg(input: &str, flag: &str) -> Result<Url, Error> {
    Url::parse(input).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid {flag}: {input}"))
            .with_hint("Use an absolute URL like https://fiddle.example.org/.")
            .with_source(err)
    })
}

fn eval_exit_code(outcome: &EvaluationOutcome) -> i32 {
    match outcome {
        EvaluationOutcome::Success(_) => 0,
        EvaluationOutcome::DataMalformed(_) => 3,
        EvaluationOutcome::ExpressionInvalid => 4,
        EvaluationOutcome::RuntimeFault(_) => 5,
    }
}

fn add_io_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Io || err.hint().is_some() {
        return err;
    }
    err.with_hint("I/O error. Check the path and permissions.")
}

fn add_malformed_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Malformed || err.hint().is_some() {
        return err;
    }
    err.with_hint("Fix the JSON text; `certlogic-fiddle eval` shows the parse error.")
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(concat!(
        "Unexpected internal failure. ",
        "Retry with RUST_BACKTRACE=1 and share command/context if it persists."
    ))
}

fn wants_json(json: bool) -> bool {
    json || !io::stdout().is_terminal()
}

fn emit_version_output(color_mode: ColorMode) {
    if io::stdout().is_terminal() {
        println!(
            "certlogic-fiddle {} (CertLogic {SPECIFICATION_VERSION})",
            env!("CARGO_PKG_VERSION")
        );
    } else {
        emit_json(
            json!({
                "name": "certlogic-fiddle",
                "version": env!("CARGO_PKG_VERSION"),
                "certlogic_specification": SPECIFICATION_VERSION,
            }),
            color_mode,
        );
    }
}

fn emit_json(value: Value, color_mode: ColorMode) {
    let is_tty = io::stdout().is_terminal();
    let use_color = color_mode.use_color(is_tty);
    let json = if use_color {
        colorize_json(&value, true)
    } else if is_tty {
        serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    } else {
        serde_json::to_string(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    };
    println!("{json}");
}

fn emit_buffers_human(state: &ShareState, color_mode: ColorMode) {
    let use_color = color_mode.use_color(io::stdout().is_terminal());
    println!("{}", Style::Heading.paint("Expression", use_color));
    println!("{}", state.expression_text);
    println!("{}", Style::Heading.paint("Data", use_color));
    println!("{}", state.data_text);
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Malformed => "malformed JSON text".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(buffer) = err.buffer() {
        inner.insert("buffer".to_string(), json!(buffer.param()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }
    json!({ "error": inner })
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    )];
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(buffer) = err.buffer() {
        lines.push(format!(
            "{} {}",
            colorize_label("buffer:", use_color, AnsiColor::Yellow),
            buffer.label()
        ));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn clap_error_summary(err: &clap::Error) -> String {
    err.to_string()
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix("error:").unwrap_or(line).trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let subcommand = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .and_then(|usage| {
            let mut tokens = usage.split_whitespace();
            tokens.find(|token| *token == "certlogic-fiddle")?;
            tokens
                .next()
                .filter(|token| !token.starts_with(['-', '<', '[']))
        });
    match subcommand {
        Some(name) => format!("Try `certlogic-fiddle {name} --help`."),
        None => "Try `certlogic-fiddle --help`.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BufferArgs, Cli, Command, ColorMode, clap_error_hint, clap_error_summary, decode_input,
        error_json, error_text, eval_exit_code, normalize_args, resolve_buffers,
    };
    use certlogic_fiddle::api::{Buffer, Error, ErrorKind, EvaluationOutcome};
    use clap::Parser;
    use serde_json::json;
    use std::ffi::OsString;
    use std::io::Write;

    #[test]
    fn normalize_args_maps_triple_dash_help() {
        let args = normalize_args(["certlogic-fiddle", "---help"].map(OsString::from));
        assert_eq!(args[1], OsString::from("--help"));
    }

    #[test]
    fn eval_exit_codes_follow_outcome() {
        assert_eq!(eval_exit_code(&EvaluationOutcome::Success(json!(1))), 0);
        assert_eq!(
            eval_exit_code(&EvaluationOutcome::DataMalformed("m".into())),
            3
        );
        assert_eq!(eval_exit_code(&EvaluationOutcome::ExpressionInvalid), 4);
        assert_eq!(
            eval_exit_code(&EvaluationOutcome::RuntimeFault("m".into())),
            5
        );
    }

    #[test]
    fn resolve_buffers_defaults_without_inputs() {
        let state = resolve_buffers(BufferArgs::default()).expect("resolve");
        assert_eq!(state.expression_text, "{\n  \"var\": \"\"\n}");
        assert_eq!(state.data_text, "{}");
    }

    #[test]
    fn resolve_buffers_overrides_url_per_buffer() {
        let args = BufferArgs {
            url: Some("https://fiddle.example.org/?expr=true&data=%5B1%5D".to_string()),
            data: Some("{\"a\":1}".to_string()),
            ..BufferArgs::default()
        };
        let state = resolve_buffers(args).expect("resolve");
        assert_eq!(state.expression_text, "true");
        assert_eq!(state.data_text, "{\"a\":1}");
    }

    #[test]
    fn resolve_buffers_reads_files() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "{{\"var\":\"x\"}}").expect("write");
        let args = BufferArgs {
            expr_file: Some(file.path().to_path_buf()),
            ..BufferArgs::default()
        };
        let state = resolve_buffers(args).expect("resolve");
        assert_eq!(state.expression_text, "{\"var\":\"x\"}");
    }

    #[test]
    fn resolve_buffers_rejects_double_stdin() {
        let args = BufferArgs {
            expr_file: Some("-".into()),
            data_file: Some("-".into()),
            ..BufferArgs::default()
        };
        let err = resolve_buffers(args).expect_err("double stdin");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn resolve_buffers_reports_missing_file_as_io() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = BufferArgs {
            data_file: Some(dir.path().join("missing.json")),
            ..BufferArgs::default()
        };
        let err = resolve_buffers(args).expect_err("missing file");
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.buffer(), Some(Buffer::Data));
    }

    #[test]
    fn decode_input_accepts_urls_and_queries() {
        assert_eq!(decode_input("?expr=1").expression_text, "1");
        assert_eq!(decode_input("expr=1").expression_text, "1");
        assert_eq!(
            decode_input("http://localhost/?data=%5B%5D").data_text,
            "[]"
        );
    }

    #[test]
    fn error_json_carries_buffer_and_hint() {
        let err = Error::new(ErrorKind::Malformed)
            .with_message("data text is not valid JSON")
            .with_hint("fix it")
            .with_buffer(Buffer::Data);
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "Malformed");
        assert_eq!(value["error"]["buffer"], "data");
        assert_eq!(value["error"]["hint"], "fix it");
    }

    #[test]
    fn error_text_without_color_is_plain() {
        let err = Error::new(ErrorKind::Usage).with_hint("Try again.");
        let text = error_text(&err, false);
        assert_eq!(text, "error: usage error\nhint: Try again.");
    }

    #[test]
    fn clap_errors_point_at_subcommand_help() {
        let err = Cli::try_parse_from(["certlogic-fiddle", "eval", "--bogus"])
            .err()
            .expect("parse error");
        assert!(clap_error_summary(&err).contains("--bogus"));
        assert_eq!(clap_error_hint(&err), "Try `certlogic-fiddle eval --help`.");
    }

    #[test]
    fn color_flag_is_global() {
        let cli = Cli::try_parse_from(["certlogic-fiddle", "eval", "--color", "never"])
            .expect("parse");
        assert!(matches!(cli.color, ColorMode::Never));
        assert!(matches!(cli.command, Command::Eval { .. }));
    }
}
