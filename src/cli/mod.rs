// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses command line arguments with clap and prints results.
// All work is delegated to Layer 2 (application).
//
//   summary — build a model and print its layers
//   init    — build a model and save a rotated checkpoint
//   probe   — reload a checkpoint and run random images
//   phoc    — print the PHOC vector of a word

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{ArchArgs, Commands, InitArgs, PhocArgs, ProbeArgs};

use crate::application::{
    architecture::ArchitectureConfig,
    init_use_case::InitUseCase,
    probe_use_case::ProbeUseCase,
    CliBackend,
};
use crate::domain::phoc::PhocBuilder;

#[derive(Parser, Debug)]
#[command(
    name = "word-image-htr",
    version = "0.1.0",
    about = "Build, checkpoint and probe word-image recognition models (PHOCNet, CTC BLSTM)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Summary(args) => run_summary(args),
            Commands::Init(args)    => run_init(args),
            Commands::Probe(args)   => run_probe(args),
            Commands::Phoc(args)    => run_phoc(args),
        }
    }
}

fn run_summary(args: ArchArgs) -> Result<()> {
    let config: ArchitectureConfig = args.into();
    config.validate()?;

    let device  = burn::backend::wgpu::WgpuDevice::default();
    let summary = config.summarize::<CliBackend>(&device);

    println!("{}", summary.layers);
    println!("\nArchitecture: {}", summary.name);
    println!("Parameters:   {}", summary.num_params);
    Ok(())
}

fn run_init(args: InitArgs) -> Result<()> {
    tracing::info!("Initialising checkpoint in: {}", args.checkpoint_dir);
    let summary = InitUseCase::new(args.into()).execute()?;
    println!(
        "Saved {} model ({} parameters).",
        summary.name, summary.num_params
    );
    Ok(())
}

fn run_probe(args: ProbeArgs) -> Result<()> {
    let report = ProbeUseCase::new(args.into()).execute()?;

    println!("Architecture: {}", report.architecture);
    println!("Output shape: {:?}", report.output_shape);
    for sample in &report.samples {
        let [h, w] = sample.size;
        match sample.frames {
            Some(frames) => println!("{h:>5}x{w:<5} frames={frames:<4} '{}'", sample.prediction),
            None         => println!("{h:>5}x{w:<5} {}", sample.prediction),
        }
    }
    Ok(())
}

fn run_phoc(args: PhocArgs) -> Result<()> {
    let builder = PhocBuilder::new(&args.alphabet, &args.levels)?;
    let phoc    = builder.encode(&args.word)?;
    let bits: String = phoc.iter().map(|&v| if v > 0.0 { '1' } else { '0' }).collect();
    println!("{bits}");
    tracing::debug!("PHOC of '{}' has {} bits set", args.word, bits.matches('1').count());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::init_use_case::InitConfig;
    use crate::application::probe_use_case::ProbeConfig;

    #[test]
    fn parses_vgg_init() {
        let cli = Cli::try_parse_from([
            "word-image-htr", "init",
            "--arch", "vgg-ctc",
            "--cnn-num-filters", "8,16,32",
            "--cnn-maxpool-size", "2,0",
            "--num-outputs", "12",
            "--keep-last", "3",
        ])
        .unwrap();

        let Commands::Init(args) = cli.command else { panic!("expected init") };
        let config: InitConfig = args.into();
        assert_eq!(config.keep_last, 3);
        match config.architecture {
            ArchitectureConfig::VggCtc(c) => {
                assert_eq!(c.num_filters, vec![8, 16, 32]);
                assert_eq!(c.maxpool_sizes, vec![2, 0]);
                assert_eq!(c.num_outputs, 12);
                assert_eq!(c.adaptive_pool_height, 16);
            }
            other => panic!("unexpected architecture {other:?}"),
        }
    }

    #[test]
    fn summary_defaults_to_dortmund_ctc() {
        let cli = Cli::try_parse_from(["word-image-htr", "summary"]).unwrap();
        let Commands::Summary(args) = cli.command else { panic!("expected summary") };
        let config: ArchitectureConfig = args.into();
        assert_eq!(config.name(), "dortmund-ctc");
    }

    #[test]
    fn parses_probe_sizes() {
        let cli = Cli::try_parse_from([
            "word-image-htr", "probe", "--sizes", "64x128,32x40", "--blank", "2",
        ])
        .unwrap();
        let Commands::Probe(args) = cli.command else { panic!("expected probe") };
        let config: ProbeConfig = args.into();
        assert_eq!(config.sizes, vec![[64, 128], [32, 40]]);
        assert_eq!(config.blank, 2);
        assert!(config.symbols.is_none());
    }

    #[test]
    fn rejects_bad_probe_size() {
        assert!(Cli::try_parse_from(["word-image-htr", "probe", "--sizes", "64by128"]).is_err());
    }
}
