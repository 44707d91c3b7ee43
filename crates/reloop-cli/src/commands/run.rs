//! `reloop run`: hot-reload session in the dev profile, foreground otherwise.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use reloop::{pick_backend_port, shutdown_signal, Rebuild, Session, StopOutcome, Supervisor};
use reloop_config::{validate_fs, ReloopConfig};
use tracing::debug;

use crate::cli::RunArgs;
use crate::commands::utils::project_root;
use crate::config::{self, load_config, Overrides};
use crate::error::{CliError, Result};
use crate::rebuild::CommandRebuilder;
use crate::ui;

/// Execute the run command.
///
/// # Process Flow
///
/// 1. Resolve the project root and load `reloop.toml` with all overrides
/// 2. Validate it, including that referenced paths exist
/// 3. Hot reload active: run a [`Session`] until Ctrl+C or SIGTERM
/// 4. Otherwise: build once, run the binary on the advertised port and stop
///    it gracefully on Ctrl+C or SIGTERM
pub async fn execute(args: RunArgs) -> Result<()> {
    let root = project_root(args.cwd.as_deref())?;
    let config = load_config(&root, &Overrides::from(&args))?;
    validate_fs(&config, &root)?;

    let rebuilder = CommandRebuilder::from_config(&config, &root);
    if config.hot_reload_active() {
        hot_reload(&config, &root, rebuilder).await
    } else {
        foreground(&config, &root, rebuilder).await
    }
}

async fn hot_reload(config: &ReloopConfig, root: &Path, rebuilder: CommandRebuilder) -> Result<()> {
    let backend_port = pick_backend_port()?;
    let session_config = config::session_config(config, root, backend_port)?;
    debug!(?session_config, "starting session");

    ui::info(&format!(
        "Hot reload on {}://{} ({} profile)",
        config.server.scheme(),
        config.server.display_addr(),
        config.app.profile
    ));
    ui::info(&format!("Watching {}", root.display()));
    ui::info("Press Ctrl+C to stop");

    Session::new(session_config, Arc::new(rebuilder))
        .run_until_signal()
        .await?;

    ui::success("Stopped");
    Ok(())
}

async fn foreground(config: &ReloopConfig, root: &Path, rebuilder: CommandRebuilder) -> Result<()> {
    ui::info(&format!(
        "Hot reload disabled ({} profile)",
        config.app.profile
    ));

    let spinner = ui::Spinner::new("Building...");
    let started = Instant::now();
    let binary = match rebuilder.rebuild(&config::entry_dir(config, root)).await {
        Ok(binary) => {
            spinner.finish(&format!(
                "Built {} in {}",
                config.build.binary.display(),
                ui::format_elapsed(started.elapsed())
            ));
            binary
        }
        Err(err) => {
            spinner.fail("Build failed");
            return Err(err.into());
        }
    };

    let spec = config::process_spec(config, root, &config.server.address, config.server.port)
        .with_program(&binary);
    let program = binary.display().to_string();

    let mut supervisor = Supervisor::new();
    supervisor.start(spec).await?;
    ui::success(&format!(
        "Running on {}://{}",
        config.server.scheme(),
        config.server.display_addr()
    ));

    let exited = tokio::select! {
        _ = shutdown_signal() => None,
        status = supervisor.wait_exit() => Some(status),
    };

    if let Some(status) = exited {
        let status = status.map_or_else(|| "unknown status".to_string(), |s| s.to_string());
        return Err(CliError::ChildExited { program, status });
    }

    ui::info("Shutting down...");
    match supervisor.stop().await {
        StopOutcome::Forced => ui::warning("Application did not stop in time and was killed"),
        outcome => debug!(?outcome, "application stopped"),
    }
    ui::success("Stopped");
    Ok(())
}
