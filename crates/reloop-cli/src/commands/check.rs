//! `reloop check`: validate configuration without building.

use reloop_config::validate_fs;

use crate::cli::CheckArgs;
use crate::commands::utils::project_root;
use crate::config::{self, load_config, Overrides, CONFIG_FILE};
use crate::error::Result;
use crate::ui;

/// Execute the check command.
///
/// Loads `reloop.toml` with the selected profile and environment overrides,
/// validates it (including that the entry directory and TLS files exist)
/// and prints a summary of what `reloop run` would do.
pub async fn execute(args: CheckArgs) -> Result<()> {
    let root = project_root(args.cwd.as_deref())?;
    ui::info(&format!("Checking {}", root.join(CONFIG_FILE).display()));

    let config = load_config(&root, &Overrides::from(&args))?;
    validate_fs(&config, &root)?;
    let addr = config::listen_addr(&config)?;

    ui::success("Configuration is valid");
    ui::info(&format!("Profile: {}", config.app.profile));
    ui::info(&format!("Listen: {}://{}", config.server.scheme(), addr));
    ui::info(&format!("Build: {}", config.build.command.join(" ")));
    ui::info(&format!(
        "Binary: {}",
        config::binary_path(&config, &root).display()
    ));

    if config.hot_reload_active() {
        ui::success("Hot reload: active");
        let excludes = config::watch_excludes(&config);
        if !excludes.is_empty() {
            ui::info(&format!("Excluded directories: {}", excludes.join(", ")));
        }
    } else if config.hot_reload.enable {
        ui::warning(&format!(
            "Hot reload: inactive (only runs in the '{}' profile)",
            config::DEV_PROFILE
        ));
    } else {
        ui::warning("Hot reload: disabled");
    }

    Ok(())
}
