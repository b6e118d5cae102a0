//! pbrtjson CLI. Converts pbrt scene descriptions into JSON block documents.
//!
//! Handles single files (with their `Include` tree) and whole scene
//! collections, copying meshes and textures alongside the output.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
