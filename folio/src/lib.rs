// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{
    ScrapeOverrides, default_log_filter, emit_report, load_html_file, select_engine,
    with_default_scheme,
};
