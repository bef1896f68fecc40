use colored::Colorize;
use commands::command_argument_builder;
use folio::handlers::{handle_check, handle_scrape, handle_score, init_tracing};
use tokio_util::sync::CancellationToken;
use tracing::warn;

mod commands;

#[tokio::main]
async fn main() {
    let matches = command_argument_builder().get_matches();
    let quiet = matches.get_flag("quiet");
    let verbose = matches.get_flag("verbose");
    init_tracing(quiet, verbose);

    // Ctrl-C stops the crawl at the next page boundary
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping");
            signal_token.cancel();
        }
    });

    let result = match matches.subcommand() {
        Some(("scrape", sub_matches)) => handle_scrape(sub_matches, quiet, cancel).await,
        Some(("check", sub_matches)) => handle_check(sub_matches).await,
        Some(("score", sub_matches)) => handle_score(sub_matches),
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
