use crate::CLAP_STYLING;
use clap::arg;
use url::Url;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("subprobe")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("subprobe")
        .about(
            "Extract hidden endpoints and internal subdomains from JavaScript files and \
            external sources",
        )
        .styles(CLAP_STYLING)
        .arg(
            arg!(<URL>)
                .help("Target URL to analyze")
                .value_parser(clap::value_parser!(Url)),
        )
        .arg(
            arg!(--"depth" <DEPTH>)
                .required(false)
                .help("Recursive scan depth for internal links")
                .value_parser(clap::value_parser!(usize))
                .default_value("0"),
        )
        .arg(
            arg!(--"filter-status" <CODES>)
                .required(false)
                .help(
                    "Filter by status codes. Supports exact (200), ranges (400-410) and \
                    groups (4xx). Requires --probe",
                ),
        )
        .arg(
            arg!(-o --"out" <FILE>)
                .required(false)
                .help("Export results to a .json, .csv or .txt file (JSON when unrecognized)"),
        )
        .arg(
            arg!(--"probe")
                .required(false)
                .help("Check whether endpoints respond and record their HTTP status")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"wayback")
                .required(false)
                .help("Include web archive results")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-q --"silent")
                .required(false)
                .alias("quiet")
                .help("Only show discovered endpoints, without banner or progress")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-v --"verbose")
                .required(false)
                .help("Enable debug logging for the scanner (RUST_LOG overrides)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"no-color")
                .required(false)
                .help("Disable colored output")
                .action(clap::ArgAction::SetTrue),
        )
}
