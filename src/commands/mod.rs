//! Entry points behind each CLI subcommand.

mod build;
mod cache;
pub mod config;
mod find;
mod install;
mod list;
mod paths;
mod purge;
mod remove;

pub use build::build;
pub use cache::{cache_add, cache_list, cache_purge};
pub use config::Config;
pub use find::find;
pub use install::install;
pub use list::list;
pub use paths::default_root;
pub use purge::purge;
pub use remove::remove;
