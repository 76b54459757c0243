use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use fbt_options::{
    FbtOptions, LoadedOptions, OptionsLoader,
    check::{check_options, has_errors},
    export, manifest,
};
use log::info;

/// Firmware build options with local overrides.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Directory option files are resolved against [default: current directory].
    #[arg(short = 'C', long, global = true)]
    workdir: Option<PathBuf>,
    /// Base options file applied over the built-in defaults.
    #[arg(long, global = true)]
    base: Option<PathBuf>,
    /// Local override file [default: fbt_options_local.toml].
    #[arg(long, global = true)]
    local: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resolved options.
    Show {
        #[arg(long, value_enum, default_value_t = Format::Toml)]
        format: Format,
        /// Print which file set each option instead.
        #[arg(long)]
        origins: bool,
    },
    /// Print the application groups of a set, in build order.
    Apps {
        /// Application set [default: FIRMWARE_APP_SET].
        profile: Option<String>,
    },
    /// Print the NAME=value assignments passed to the build tool.
    Args,
    /// Check the options for mistakes.
    Check {
        /// Directory with application manifests; repeatable.
        #[arg(long = "apps-dir")]
        apps_dirs: Vec<PathBuf>,
    },
    /// Print the JSON Schema of the options.
    Schema,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Toml,
    Json,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let Cli {
        workdir,
        base,
        local,
        command,
    } = cli;

    let workdir = match workdir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine working directory")?,
    };

    let load = || -> anyhow::Result<LoadedOptions> {
        let mut loader = OptionsLoader::new(&workdir);
        if let Some(base) = &base {
            loader = loader.with_base(base);
        }
        if let Some(local) = &local {
            loader = loader.with_local(local);
        }
        let loaded = loader
            .load()
            .context("failed to load firmware build options")?;
        for source in loaded.sources() {
            info!("options layer: {source}");
        }
        Ok(loaded)
    };

    match command {
        Command::Show { format, origins } => {
            let loaded = load()?;
            if origins {
                for (key, source) in loaded.origins() {
                    println!("{} {}", key.bold(), format!("<- {source}").cyan());
                }
            } else {
                let text = match format {
                    Format::Toml => export::to_toml(&loaded.options)?,
                    Format::Json => export::to_json(&loaded.options)?,
                };
                println!("{}", text.trim_end());
            }
        }
        Command::Apps { profile } => {
            let loaded = load()?;
            let groups = match &profile {
                Some(name) => loaded.options.profile(name)?,
                None => loaded.options.active_profile()?,
            };
            for group in groups {
                println!("{group}");
            }
        }
        Command::Args => {
            let loaded = load()?;
            for arg in export::build_args(&loaded.options)? {
                println!("{arg}");
            }
        }
        Command::Check { apps_dirs } => {
            let loaded = load()?;
            return check(&loaded, &workdir, &apps_dirs);
        }
        Command::Schema => {
            let schema = schemars::schema_for!(FbtOptions);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn check(loaded: &LoadedOptions, workdir: &Path, apps_dirs: &[PathBuf]) -> anyhow::Result<ExitCode> {
    let manifests = if apps_dirs.is_empty() {
        None
    } else {
        let dirs: Vec<PathBuf> = apps_dirs.iter().map(|d| workdir.join(d)).collect();
        let apps = manifest::scan_manifests(&dirs).context("failed to scan application manifests")?;
        info!("found {} application manifest(s)", apps.len());
        Some(apps)
    };

    let diags = check_options(&loaded.options, manifests.as_deref());
    for diag in &diags {
        println!("{diag}");
    }

    if has_errors(&diags) {
        let errors = diags.iter().filter(|d| d.is_error()).count();
        println!("{}", format!("{errors} error(s) found").red().bold());
        return Ok(ExitCode::FAILURE);
    }

    let origin = if loaded.overridden() {
        "with local overrides"
    } else {
        "base options only"
    };
    println!("{} ({origin})", "options OK".green().bold());
    Ok(ExitCode::SUCCESS)
}
