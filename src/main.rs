use clap::Parser;

mod config;
mod pipeline;
mod qpmap;
mod region;

use crate::config::Config;
use crate::pipeline::Pipeline;

fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let config = Config::parse();
    ffmpeg_pipe::init()?;

    match ffmpeg_pipe::metadata::probe(&config.input) {
        Ok(info) => log::info!("input: {}", info),
        Err(e) => log::debug!("probe failed for {}: {:#}", config.input, e),
    }

    let frames = Pipeline::new(config).run()?;
    log::info!("transcoded {} frames", frames);
    Ok(())
}
