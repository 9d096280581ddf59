pub mod export;
pub mod filter;
pub mod report;
pub mod run;

pub use export::{ExportFormat, export_results};
pub use filter::{FilterError, StatusFilter};
pub use report::{generate_results_report, render_endpoint_line};
pub use run::{EndpointRecord, RunError, RunOptions, RunReport, execute_run};

use colored::Colorize;

const BANNER: &str = r#"
   _____       __    ____             __
  / ___/__  __/ /_  / __ \_________  / /_  ___
  \__ \/ / / / __ \/ /_/ / ___/ __ \/ __ \/ _ \
 ___/ / /_/ / /_/ / ____/ /  / /_/ / /_/ /  __/
/____/\__,_/_.___/_/   /_/   \____/_.___/\___/
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_green());
    println!(
        "  {} {}\n",
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_white().bold(),
        "hidden endpoint & subdomain discovery".bright_black()
    );
}
