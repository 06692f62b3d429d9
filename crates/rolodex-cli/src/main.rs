// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use rolodex_app::{ListView, NavigationParams, UiStatus};
use rolodex_db::Store;
use runtime::DbRuntime;
use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Mutex;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `rolodex --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let log_file = options.log_file.clone().or_else(|| config.log_file());
    if let Some(path) = &log_file {
        setup_tracing(path, &config.log_level())?;
    }

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or ROLODEX_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    if options.demo {
        store.seed_demo_data()?;
    }
    let tui_options = config.tui_options()?;
    if options.check_only {
        return Ok(());
    }

    info!(
        db = %db_path.display(),
        offline = options.offline,
        company = ?options.navigation.company,
        status = ?options.navigation.status,
        "starting contact list"
    );

    let store = Rc::new(store);
    let mut view = ListView::new(
        store.clone(),
        UiStatus::new(options.offline),
        config.view_config(),
    );
    view.enter(&options.navigation);

    let mut runtime = DbRuntime::new(&store);
    rolodex_tui::run_app(&mut view, &mut runtime, tui_options)
}

/// Routes tracing output to `path`; the terminal belongs to the UI.
/// `RUST_LOG` wins over the configured level.
fn setup_tracing(path: &Path, level: &str) -> Result<()> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .map_err(|error| anyhow!("initialize logging: {error}"))?;

    info!(path = %path.display(), "logging initialized");
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    offline: bool,
    navigation: NavigationParams,
    log_file: Option<PathBuf>,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        offline: false,
        navigation: NavigationParams::default(),
        log_file: None,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--log-file" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--log-file requires a file path"))?;
                options.log_file = Some(PathBuf::from(value.as_ref()));
            }
            "--company" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--company requires a company name"))?;
                options.navigation.company = Some(value.as_ref().to_owned());
            }
            "--status" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--status requires a status name"))?;
                options.navigation.status = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--offline" => {
                options.offline = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("rolodex");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Launch with seeded demo contacts (in-memory)");
    println!("  --offline                Start with filtering and adding disabled");
    println!("  --company <name>         Open the list scoped to one company");
    println!("  --status <name>          Open the list scoped to one status");
    println!("  --log-file <path>        Write logs to a file (RUST_LOG sets the filter)");
    println!("  --check                  Validate config + DB and exit");
    println!("  --help                   Show this help");
}
