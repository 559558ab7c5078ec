mod app;
mod config;

use anyhow::Context;
use clap::Parser;
use lantern_engine::logging::{init_logging, LoggingConfig};
use lantern_engine::model::Model;
use lantern_engine::shader::ShaderProgram;
use lantern_engine::text::FontSystem;
use lantern_engine::window::Runtime;

use app::Viewer;
use config::Args;

fn main() {
    init_logging(LoggingConfig::default());

    if let Err(err) = run(Args::parse()) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let program = ShaderProgram::load(&args.shader).context("failed to load shader program")?;
    log::info!("{}", program.info());

    let model = Model::load(&args.model).context("failed to import model")?;
    log::info!("{}", model.info());

    let mut fonts = FontSystem::new();
    let font = match fonts.load_font_file(&args.font) {
        Ok(id) => Some(id),
        Err(err) => {
            log::warn!("{:#}; text overlay disabled", anyhow::Error::new(err));
            None
        }
    };

    let viewer = Viewer::new(program, model, fonts, font, args.font_size);
    Runtime::run(args.runtime_config(), args.gpu_init(), viewer)
}
