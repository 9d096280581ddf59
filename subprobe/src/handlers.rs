use anyhow::Context;
use clap::ArgMatches;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use subprobe_core::{
    RunError, RunOptions, execute_run, export_results, generate_results_report,
    render_endpoint_line,
};
use subprobe_scanner::ProgressCallback;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Exit status for configuration errors caught before the scan starts.
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_FAILURE: i32 = 1;

const VERBOSE_DIRECTIVES: &str = "warn,subprobe=debug,subprobe_core=debug,subprobe_scanner=debug";

/// Installs the stderr log subscriber. `RUST_LOG` takes precedence over
/// `--verbose`.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { VERBOSE_DIRECTIVES } else { "warn" })
    });

    // A subscriber may already be installed (tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Expands a leading `~` in the output path.
pub fn expand_output_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Maps a failed run to the process exit status.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<RunError>() {
        Some(run_error) if run_error.is_config() => EXIT_CONFIG,
        _ => EXIT_FAILURE,
    }
}

pub fn run_options_from_matches(args: &ArgMatches) -> RunOptions {
    let url = args
        .get_one::<Url>("URL")
        .map(|url| url.to_string())
        .unwrap_or_default();

    let mut options = RunOptions::new(url);
    options.depth = args.get_one::<usize>("depth").copied().unwrap_or(0);
    options.filter_status = args.get_one::<String>("filter-status").cloned();
    options.probe = args.get_flag("probe");
    options.wayback = args.get_flag("wayback");
    options.show_progress = !args.get_flag("silent");
    options
}

pub async fn handle_scan(args: &ArgMatches) -> anyhow::Result<()> {
    let quiet = args.get_flag("silent");
    let options = run_options_from_matches(args);
    let out = args.get_one::<String>("out").map(|raw| expand_output_path(raw));

    if !quiet {
        println!(
            "{} Starting SubProbe on {} (depth: {})",
            "→".green().bold(),
            options.url,
            options.depth
        );
    }

    let progress_callback: Option<ProgressCallback> = if quiet {
        None
    } else {
        Some(Arc::new(|msg: String| {
            tracing::debug!("{}", msg);
        }))
    };

    let report = execute_run(options, progress_callback).await?;

    if quiet {
        for record in &report.records {
            println!("{}", render_endpoint_line(record, report.probed));
        }
    } else {
        println!(
            "\n{} Analysis complete: {} endpoints\n",
            "✓".green().bold(),
            report.records.len()
        );
        print!(
            "{}",
            generate_results_report(&report.records, &report.summary, report.probed)
        );
    }

    if let Some(path) = out {
        let format = export_results(&path, &report.records)
            .map_err(RunError::Export)
            .with_context(|| format!("could not write {}", path.display()))?;
        if !quiet {
            println!(
                "\n{} {:?} saved to {}",
                "✓".green().bold(),
                format,
                path.display()
            );
        }
    }

    Ok(())
}
