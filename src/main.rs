use anyhow::Result;
use clap::Parser;

mod chart;
mod classify;
mod cli;
mod discourse;
mod github;
mod model;
mod report;
mod runner;
mod stats;
mod util;
mod window;

use crate::cli::{normalize, Cli};

fn main() -> Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let cli = Cli::parse();

  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  let cfg = normalize(cli)?;
  runner::run(&cfg)
}
