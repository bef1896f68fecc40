use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("folio")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("folio")
        .about("Find and rank portfolio images on a vendor's website")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Only print the report and errors")
                .required(false)
                .global(true)
                .conflicts_with("verbose"),
        )
        .arg(
            arg!(-v --"verbose" "Log every page, link and robots decision")
                .required(false)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("scrape")
                .about(
                    "Crawl a vendor site politely, score every image found and report the \
                most relevant ones.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The site to crawl; https:// is assumed when no scheme is given"),
                )
                .arg(
                    arg!(-c --"category" <NAME>)
                        .required(true)
                        .action(clap::ArgAction::Append)
                        .help("Business category the images should match (repeatable)"),
                )
                .arg(
                    arg!(--"config" <PATH>)
                        .required(false)
                        .help("Configuration file (default: ~/.config/folio/config.toml if present)"),
                )
                .arg(
                    arg!(--"max-depth" <N>)
                        .required(false)
                        .help("Link depth to follow from the start page")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"max-pages" <N>)
                        .required(false)
                        .help("Stop after visiting this many pages")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"max-images" <N>)
                        .required(false)
                        .help("Stop after collecting this many images")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"delay-ms" <MILLIS>)
                        .required(false)
                        .help("Pause before each page after the first")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"ignore-crawl-delay")
                        .required(false)
                        .help("Do not stretch the delay to the site's Crawl-delay")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"browser")
                        .required(false)
                        .help("Render pages in headless Chromium (needs the `chromium` feature)")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
        .subcommand(
            command!("check")
                .about("Check whether a site's robots.txt allows crawling")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The site to check")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(--"config" <PATH>)
                        .required(false)
                        .help("Configuration file for the user agent and timeouts"),
                ),
        )
        .subcommand(
            command!("score")
                .about("Score the images of a saved HTML page without crawling")
                .arg(
                    arg!(-f --"file" <PATH>)
                        .required(true)
                        .help("The HTML file to read")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-p --"page-url" <URL>)
                        .required(true)
                        .help("URL the page was saved from, for resolving relative sources")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-c --"category" <NAME>)
                        .required(true)
                        .action(clap::ArgAction::Append)
                        .help("Business category the images should match (repeatable)"),
                )
                .arg(
                    arg!(--"config" <PATH>)
                        .required(false)
                        .help("Configuration file for taxonomy overrides and the threshold"),
                )
                .arg(
                    arg!(--"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
}
