// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands `summary`, `init`, `probe` and `phoc`
// and all their configurable flags.

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{
    architecture::ArchitectureConfig,
    init_use_case::InitConfig,
    probe_use_case::ProbeConfig,
};
use crate::infra::checkpoint::DEFAULT_KEEP_LAST;
use crate::ml::{
    ctc_model::{DortmundCtcConfig, VggCtcConfig},
    phocnet::PhocNetConfig,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a model's layers and parameter count
    Summary(ArchArgs),

    /// Build a freshly initialised model and save a checkpoint
    Init(InitArgs),

    /// Load a checkpoint and run random images of the given sizes
    Probe(ProbeArgs),

    /// Print the PHOC vector of a word
    Phoc(PhocArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arch {
    /// PHOCNet: Dortmund conv + temporal pyramid pooling + FC layers
    DortmundPhoc,
    /// Dortmund conv + BLSTM, CTC output
    DortmundCtc,
    /// Configurable VGG conv + BLSTM, CTC output
    VggCtc,
}

/// Architecture selection and hyperparameters.
/// Flags not used by the chosen architecture are ignored.
#[derive(Args, Debug)]
pub struct ArchArgs {
    #[arg(long, value_enum, default_value_t = Arch::DortmundCtc)]
    pub arch: Arch,

    /// Number of CTC output symbols, blank included
    #[arg(long, default_value_t = 80)]
    pub num_outputs: usize,

    /// Length of the PHOC vector (dortmund-phoc)
    #[arg(long, default_value_t = 540)]
    pub phoc_size: usize,

    /// Temporal pyramid levels (dortmund-phoc)
    #[arg(long, default_value_t = 5)]
    pub tpp_levels: usize,

    /// Width of the fully connected layers (dortmund-phoc)
    #[arg(long, default_value_t = 4096)]
    pub fc_size: usize,

    /// Rows kept by the adaptive pooling before the BLSTM
    #[arg(long, default_value_t = 16)]
    pub adaptive_pool_height: usize,

    #[arg(long, default_value_t = 128)]
    pub lstm_hidden_size: usize,

    #[arg(long, default_value_t = 1)]
    pub lstm_num_layers: usize,

    /// Conv filters per layer (vgg-ctc)
    #[arg(long, value_delimiter = ',', default_value = "16,16,32,32")]
    pub cnn_num_filters: Vec<usize>,

    /// Max pooling size after each conv layer, 0 for none (vgg-ctc)
    #[arg(long, value_delimiter = ',', default_value = "2,2")]
    pub cnn_maxpool_size: Vec<usize>,

    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,
}

impl From<ArchArgs> for ArchitectureConfig {
    fn from(a: ArchArgs) -> Self {
        match a.arch {
            Arch::DortmundPhoc => ArchitectureConfig::DortmundPhoc(
                PhocNetConfig::new(a.phoc_size)
                    .with_levels(a.tpp_levels)
                    .with_fc_size(a.fc_size)
                    .with_dropout(a.dropout),
            ),
            Arch::DortmundCtc => ArchitectureConfig::DortmundCtc(
                DortmundCtcConfig::new(a.num_outputs)
                    .with_adaptive_pool_height(a.adaptive_pool_height)
                    .with_lstm_hidden_size(a.lstm_hidden_size)
                    .with_lstm_num_layers(a.lstm_num_layers)
                    .with_dropout(a.dropout),
            ),
            Arch::VggCtc => ArchitectureConfig::VggCtc(
                VggCtcConfig::new(
                    a.cnn_num_filters,
                    a.cnn_maxpool_size,
                    a.adaptive_pool_height,
                    a.lstm_hidden_size,
                    a.lstm_num_layers,
                    a.num_outputs,
                )
                .with_dropout(a.dropout),
            ),
        }
    }
}

#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub arch: ArchArgs,

    /// Directory for model.json and the rotated model.bin files
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Number of weight versions to keep (model.bin, model.bin-1, ...)
    #[arg(long, default_value_t = DEFAULT_KEEP_LAST)]
    pub keep_last: usize,
}

impl From<InitArgs> for InitConfig {
    fn from(a: InitArgs) -> Self {
        InitConfig {
            checkpoint_dir: a.checkpoint_dir,
            keep_last:      a.keep_last,
            architecture:   a.arch.into(),
        }
    }
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Image sizes as HEIGHTxWIDTH, comma separated
    #[arg(long, value_delimiter = ',', value_parser = parse_image_size, default_value = "64x256")]
    pub sizes: Vec<[usize; 2]>,

    /// Symbols table used to print CTC predictions as text
    #[arg(long)]
    pub symbols: Option<std::path::PathBuf>,

    /// Index of the CTC blank symbol
    #[arg(long, default_value_t = 0)]
    pub blank: usize,
}

impl From<ProbeArgs> for ProbeConfig {
    fn from(a: ProbeArgs) -> Self {
        ProbeConfig {
            checkpoint_dir: a.checkpoint_dir,
            sizes:          a.sizes,
            symbols:        a.symbols,
            blank:          a.blank,
        }
    }
}

#[derive(Args, Debug)]
pub struct PhocArgs {
    /// The word to encode
    #[arg(long)]
    pub word: String,

    #[arg(long, default_value = "abcdefghijklmnopqrstuvwxyz0123456789")]
    pub alphabet: String,

    /// Pyramid levels, comma separated
    #[arg(long, value_delimiter = ',', default_value = "2,3,4,5")]
    pub levels: Vec<usize>,
}

/// Parse "64x256" into [64, 256].
pub fn parse_image_size(s: &str) -> Result<[usize; 2], String> {
    let (h, w) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected HEIGHTxWIDTH, got '{s}'"))?;
    let h: usize = h.trim().parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    let w: usize = w.trim().parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    if h == 0 || w == 0 {
        return Err(format!("image size must be non-zero, got '{s}'"));
    }
    Ok([h, w])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_image_sizes() {
        assert_eq!(parse_image_size("64x256"), Ok([64, 256]));
        assert_eq!(parse_image_size("8X9"), Ok([8, 9]));
        assert!(parse_image_size("64").is_err());
        assert!(parse_image_size("0x5").is_err());
        assert!(parse_image_size("ax5").is_err());
    }
}
