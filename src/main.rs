use clap::{Parser, Subcommand};
use generate::NdpGenerator;
use sweep::Sweep;

mod formulation;
mod generate;
mod instance;
mod mps;
mod sweep;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct NdpTools {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate one instance and export it as a gzipped MPS file
    Generate(NdpGenerator),
    /// Generate the full benchmark set over every parameter combination
    Sweep(Sweep),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = NdpTools::parse();
    let outcome = match cli.command {
        Command::Generate(generate) => generate.run().map(|_| ()),
        Command::Sweep(sweep) => sweep.run(),
    };
    if let Err(e) = outcome {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
