//! # fit 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/fit.rs`，由 [`FitArgs::to_config`] 解析为 `FitConfig`

use crate::batch::DEFAULT_SPECTRUM_PATTERN;
use crate::cli::{parse_hkl, parse_tof_range};
use crate::error::{Result, TofPeaksError};
use crate::fitting::service::DEFAULT_MAX_ITERATIONS;
use crate::peaks::config::DEFAULT_CYCLES;
use crate::peaks::{CatalogCutoff, FitConfig, FitMode, ReferencePeak, SeedMode};

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 拟合模式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ModeArg {
    /// Walk outwards from a reference peak, seeding each peak from its neighbour
    Robust,
    /// Trust the starting profiles and fit overlapping peaks jointly
    Confident,
}

/// 初始峰形来源
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SeedArg {
    /// Compute from the instrument parameters
    Calculated,
    /// Take TOF_h/Alpha/Beta/Sigma2 from the reflection table
    Table,
}

impl From<SeedArg> for SeedMode {
    fn from(seed: SeedArg) -> Self {
        match seed {
            SeedArg::Calculated => SeedMode::Calculated,
            SeedArg::Table => SeedMode::Table,
        }
    }
}

/// 图像输出格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PlotFormat {
    Png,
    Svg,
}

impl PlotFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            PlotFormat::Png => "png",
            PlotFormat::Svg => "svg",
        }
    }
}

#[derive(Args, Debug)]
pub struct FitArgs {
    /// Input: spectrum file (.csv/.xy/.dat) or directory of spectra
    pub input: PathBuf,

    /// Reflection table (CSV with H,K,L and optional starting values)
    #[arg(long)]
    pub reflections: PathBuf,

    /// Instrument parameter table (CSV with Name,Value)
    #[arg(long)]
    pub instrument: PathBuf,

    /// Fit mode
    #[arg(long, value_enum, default_value = "robust")]
    pub mode: ModeArg,

    /// Source of the starting peak profiles
    #[arg(long, value_enum, default_value = "calculated")]
    pub seed: SeedArg,

    /// Reference reflection for robust mode (e.g., "2,2,0" or "220")
    #[arg(long)]
    pub reference_hkl: Option<String>,

    /// TOF window of the reference peak (e.g., "10000-10500")
    #[arg(long)]
    pub reference_range: Option<String>,

    /// Lowest-d reflection that is always fitted (e.g., "3,3,1")
    #[arg(long)]
    pub min_hkl: Option<String>,

    /// Number of reflections to fit beyond --min-hkl
    #[arg(long, default_value_t = 0)]
    pub below_limit: usize,

    /// Refinement cycles per peak
    #[arg(long, default_value_t = DEFAULT_CYCLES)]
    pub cycles: usize,

    /// Maximum optimizer iterations per fit
    #[arg(long, env = "TOFPEAKS_MAX_ITERATIONS", default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,

    /// Output directory (one sub-directory per spectrum)
    #[arg(short, long, default_value = "tofpeaks_results")]
    pub output: PathBuf,

    /// Write a plot of raw, fitted and residual patterns
    #[arg(long, default_value_t = false)]
    pub plot: bool,

    #[arg(long, value_enum, default_value = "png")]
    pub plot_format: PlotFormat,

    /// Figure width in pixels (for PNG) or points (for SVG)
    #[arg(long, default_value_t = 1400)]
    pub width: u32,

    /// Figure height in pixels (for PNG) or points (for SVG)
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    // ─────────────────────────────────────────────────────────────
    // 批量处理参数
    // ─────────────────────────────────────────────────────────────
    /// Glob pattern for spectrum files (batch mode)
    #[arg(long, default_value = DEFAULT_SPECTRUM_PATTERN)]
    pub pattern: String,

    /// Number of parallel jobs (0 = auto, batch mode only)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Recurse into subdirectories (batch mode)
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Overwrite existing results
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    /// Only print warnings and the summary
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Print per-stage refinement details
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl FitArgs {
    pub fn to_config(&self) -> Result<FitConfig> {
        let mode = match self.mode {
            ModeArg::Confident => FitMode::Confident,
            ModeArg::Robust => {
                let hkl = self.reference_hkl.as_deref().ok_or_else(|| {
                    TofPeaksError::Configuration(
                        "robust mode requires --reference-hkl".to_string(),
                    )
                })?;
                let range = self.reference_range.as_deref().ok_or_else(|| {
                    TofPeaksError::Configuration(
                        "robust mode requires --reference-range".to_string(),
                    )
                })?;
                let (left, right) = parse_tof_range(range)?;
                FitMode::Robust(ReferencePeak::new(parse_hkl(hkl)?, left, right)?)
            }
        };

        let cutoff = match &self.min_hkl {
            Some(hkl) => Some(CatalogCutoff {
                minimum_hkl: parse_hkl(hkl)?,
                below_limit: self.below_limit,
            }),
            None => None,
        };

        let config = FitConfig {
            mode,
            seed_mode: self.seed.into(),
            cutoff,
            cycles: self.cycles,
            max_iterations: self.max_iterations,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::models::MillerIndex;
    use clap::Parser;

    fn parse(args: &[&str]) -> FitArgs {
        let mut argv = vec![
            "tofpeaks",
            "fit",
            "run.csv",
            "--reflections",
            "hkl.csv",
            "--instrument",
            "inst.csv",
        ];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Commands::Fit(args) => args,
            _ => panic!("expected fit"),
        }
    }

    #[test]
    fn test_robust_config() {
        let args = parse(&[
            "--reference-hkl",
            "2,2,0",
            "--reference-range",
            "13750-14300",
            "--min-hkl",
            "331",
            "--below-limit",
            "2",
        ]);
        let config = args.to_config().unwrap();
        match config.mode {
            FitMode::Robust(reference) => {
                assert_eq!(reference.hkl, MillerIndex::new(2, 2, 0));
                assert_eq!(reference.left, 13750.0);
                assert_eq!(reference.right, 14300.0);
            }
            FitMode::Confident => panic!("expected robust"),
        }
        let cutoff = config.cutoff.unwrap();
        assert_eq!(cutoff.minimum_hkl, MillerIndex::new(3, 3, 1));
        assert_eq!(cutoff.below_limit, 2);
        assert_eq!(config.cycles, DEFAULT_CYCLES);
    }

    #[test]
    fn test_robust_without_reference_is_configuration_error() {
        let args = parse(&["--reference-range", "13750-14300"]);
        assert!(matches!(args.to_config(), Err(TofPeaksError::Configuration(_))));
    }

    #[test]
    fn test_confident_config() {
        let args = parse(&["--mode", "confident", "--seed", "table", "--cycles", "3"]);
        let config = args.to_config().unwrap();
        assert_eq!(config.mode, FitMode::Confident);
        assert_eq!(config.seed_mode, SeedMode::Table);
        assert_eq!(config.cycles, 3);
        assert!(config.cutoff.is_none());
    }

    #[test]
    fn test_default_pattern_matches_collector() {
        assert_eq!(parse(&[]).pattern, DEFAULT_SPECTRUM_PATTERN);
    }
}
