//! `ci-dashboard`: render test matrices from Prow artifacts

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use dash_core::{benchmarks, config, report, resolver, MatricesSpec};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "matrices.yml";
const DEFAULT_OUTPUT: &str = "output/matrix.gen.html";

fn cli() -> Command {
    Command::new("ci-dashboard")
        .version(dash_core::VERSION)
        .about("Test matrix dashboard for Prow CI artifacts")
        .subcommand_required(true)
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .env("CI_DASHBOARD_DEBUG")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .subcommand(
            Command::new("daily-matrix")
                .about("Render the last builds of every test")
                .arg(config_arg("CI_DASHBOARD_DAILYMATRIX_CONFIG_FILE"))
                .arg(output_arg("CI_DASHBOARD_DAILYMATRIX_OUTPUT_FILE"))
                .arg(
                    Arg::new("template")
                        .short('t')
                        .long("template")
                        .env("CI_DASHBOARD_DAILYMATRIX_TEMPLATE")
                        .value_parser(value_parser!(PathBuf))
                        .help("HTML template with {{ matrix }}, {{ date }} and {{ description }} placeholders"),
                )
                .arg(test_history_arg("CI_DASHBOARD_DAILYMATRIX_TEST_HISTORY")),
        )
        .subcommand(
            Command::new("gen-matrix")
                .about("Render the latest build of every test")
                .arg(config_arg("CI_DASHBOARD_GENMATRIX_CONFIG_FILE"))
                .arg(output_arg("CI_DASHBOARD_GENMATRIX_OUTPUT_FILE")),
        )
        .subcommand(
            Command::new("matrix-benchmarks")
                .about("Export GPU burn logs for MatrixBenchmarking")
                .arg(config_arg("CI_DASHBOARD_MATRIX_BENCH_CONFIG_FILE"))
                .arg(
                    Arg::new("output-dir")
                        .short('o')
                        .long("output-dir")
                        .env("CI_DASHBOARD_MATRIX_BENCH_OUTPUT_DIR")
                        .default_value(benchmarks::DEFAULT_OUTPUT_DIR)
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory receiving {prow_name}/{build}/gpu-burn/pod.log"),
                )
                .arg(test_history_arg("CI_DASHBOARD_MATRIX_BENCH_TEST_HISTORY")),
        )
}

fn config_arg(env: &'static str) -> Arg {
    Arg::new("config-file")
        .short('c')
        .long("config-file")
        .env(env)
        .default_value(DEFAULT_CONFIG)
        .value_parser(value_parser!(PathBuf))
        .help("Matrix configuration file, '-' reads stdin")
}

fn output_arg(env: &'static str) -> Arg {
    Arg::new("output-file")
        .short('o')
        .long("output-file")
        .env(env)
        .default_value(DEFAULT_OUTPUT)
        .value_parser(value_parser!(PathBuf))
        .help("Where to write the HTML report")
}

fn test_history_arg(env: &'static str) -> Arg {
    Arg::new("test-history")
        .long("test-history")
        .env(env)
        .default_value("-1")
        .allow_negative_numbers(true)
        .value_parser(value_parser!(i64))
        .help("Number of builds per test (-1 uses the configuration value)")
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// `--test-history` value, `None` when the configuration decides
fn history_override(args: &ArgMatches) -> Result<Option<usize>> {
    match args.get_one::<i64>("test-history").copied() {
        None | Some(-1) => Ok(None),
        Some(depth) if depth > 0 => Ok(Some(usize::try_from(depth)?)),
        Some(depth) => anyhow::bail!("--test-history must be positive or -1, got {depth}"),
    }
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing --{name}"))
}

fn load_config(args: &ArgMatches) -> Result<MatricesSpec> {
    let path = path_arg(args, "config-file")?;
    tracing::info!(path = %path.display(), "loading configuration");
    config::load(path).with_context(|| format!("cannot load configuration from {}", path.display()))
}

fn write_report(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("cannot create {}", parent.display()))?;
    }
    fs::write(path, html).with_context(|| format!("cannot write {}", path.display()))?;
    tracing::info!(path = %path.display(), "report written");
    Ok(())
}

fn generated_at() -> String {
    chrono::Utc::now().format(resolver::FINISH_DATE_FORMAT).to_string()
}

fn daily_matrix(args: &ArgMatches) -> Result<()> {
    let mut spec = load_config(args)?;
    let depth = history_override(args)?;
    resolver::resolve_matrices(&mut spec, depth).context("cannot resolve test history")?;

    let date = generated_at();
    let html = match args.get_one::<PathBuf>("template") {
        Some(template) => {
            let template = fs::read_to_string(template)
                .with_context(|| format!("cannot read template {}", template.display()))?;
            report::render_with_template(&template, &spec, &date)
        }
        None => report::render_report(&spec, &date),
    };
    write_report(path_arg(args, "output-file")?, &html)
}

fn gen_matrix(args: &ArgMatches) -> Result<()> {
    let mut spec = load_config(args)?;
    resolver::resolve_latest_matrices(&mut spec).context("cannot resolve latest builds")?;
    let html = report::render_report(&spec, &generated_at());
    write_report(path_arg(args, "output-file")?, &html)
}

fn matrix_benchmarks(args: &ArgMatches) -> Result<()> {
    let mut spec = load_config(args)?;
    let depth = history_override(args)?;
    resolver::resolve_matrices(&mut spec, depth).context("cannot resolve test history")?;

    let output_dir = path_arg(args, "output-dir")?;
    let summary = benchmarks::export_gpu_burn_logs(&spec, output_dir)
        .with_context(|| format!("cannot export GPU burn logs to {}", output_dir.display()))?;
    tracing::info!(
        exported = summary.exported,
        missing = summary.missing,
        failed = summary.failed,
        "GPU burn logs exported"
    );
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("debug"));

    match matches.subcommand() {
        Some(("daily-matrix", args)) => daily_matrix(args),
        Some(("gen-matrix", args)) => gen_matrix(args),
        Some(("matrix-benchmarks", args)) => matrix_benchmarks(args),
        _ => unreachable!("subcommand_required"),
    }
}
