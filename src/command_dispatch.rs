//! Purpose: Hold top-level CLI command dispatch for `certlogic-fiddle`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: `eval` always completes; its exit code encodes the outcome variant.
//! Invariants: `share` fails closed with a `Malformed` error when a buffer does not parse.

use super::*;
use certlogic_fiddle::api::Pipeline;

pub(super) fn dispatch_command(
    command: Command,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "certlogic-fiddle", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output(color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Eval {
            buffers,
            base_url,
            json,
        } => {
            let base = base_url
                .map(|raw| parse_url_arg(&raw, "--base-url"))
                .transpose()?;
            let pipeline = Pipeline::from_share_state(CertLogic, resolve_buffers(buffers)?);
            let derivation = pipeline.derive();
            let share = match &base {
                Some(base) if derivation.is_shareable() => Some(pipeline.share_url(base)?),
                _ => None,
            };
            if wants_json(json) {
                emit_json(
                    outcome_json::derivation_json(&derivation, share.as_ref()),
                    color_mode,
                );
            } else {
                let use_color = color_mode.use_color(io::stdout().is_terminal());
                println!(
                    "{}",
                    render::derivation_text(&derivation, share.as_ref(), use_color)
                );
            }
            Ok(RunOutcome::with_code(eval_exit_code(&derivation.outcome)))
        }
        Command::Share {
            buffers,
            base_url,
            json,
        } => {
            let base = parse_url_arg(&base_url, "--base-url")?;
            let pipeline = Pipeline::from_share_state(CertLogic, resolve_buffers(buffers)?);
            let url = pipeline.share_url(&base)?;
            if wants_json(json) {
                emit_json(json!({ "share": outcome_json::share_json(&url) }), color_mode);
            } else {
                println!("{url}");
            }
            Ok(RunOutcome::ok())
        }
        Command::Decode { input, json } => {
            let state = decode_input(&input);
            if wants_json(json) {
                emit_json(outcome_json::buffers_json(&state), color_mode);
            } else {
                emit_buffers_human(&state, color_mode);
            }
            Ok(RunOutcome::ok())
        }
        Command::Serve {
            bind,
            allow_non_loopback,
            max_body_bytes,
            base_url,
        } => {
            let config = serve_config(bind, allow_non_loopback, max_body_bytes, base_url)?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
    }
}

fn serve_config(
    bind: String,
    allow_non_loopback: bool,
    max_body_bytes: u64,
    base_url: Option<String>,
) -> Result<serve::ServeConfig, Error> {
    let bind: std::net::SocketAddr = bind.parse().map_err(|_| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid bind address: {bind}"))
            .with_hint("Use a host:port value like 127.0.0.1:9710.")
    })?;
    let base_url = match base_url {
        Some(input) => parse_url_arg(&input, "--base-url")?,
        None => parse_url_arg(&format!("http://{bind}/"), "bind address")?,
    };
    Ok(serve::ServeConfig {
        bind,
        allow_non_loopback,
        max_body_bytes,
        base_url,
    })
}

#[cfg(test)]
mod tests {
    use super::serve_config;
    use certlogic_fiddle::api::ErrorKind;

    #[test]
    fn serve_config_derives_base_url_from_bind() {
        let config = serve_config("127.0.0.1:9999".into(), false, 1024, None).expect("config");
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:9999/");
    }

    #[test]
    fn serve_config_rejects_bad_bind() {
        let err = serve_config("nope".into(), false, 1024, None).expect_err("bad bind");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn serve_config_rejects_relative_base_url() {
        let err = serve_config("127.0.0.1:9999".into(), false, 1024, Some("/fiddle".into()))
            .expect_err("relative base");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
