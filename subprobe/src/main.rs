use colored::Colorize;
use subprobe::{command_argument_builder, exit_code, handle_scan, init_tracing};
use subprobe_core::print_banner;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let matches = cmd.get_matches();

    if matches.get_flag("no-color") {
        colored::control::set_override(false);
    }
    init_tracing(matches.get_flag("verbose"));

    // Show banner unless --silent flag is set
    if !matches.get_flag("silent") {
        print_banner();
    }

    if let Err(e) = handle_scan(&matches).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(exit_code(&e));
    }
}
