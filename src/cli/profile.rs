//! # profile 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/profile.rs`

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// Instrument parameter table (CSV with Name,Value)
    #[arg(long)]
    pub instrument: PathBuf,

    /// Reflections to evaluate (e.g., "2,2,0" "(3 1 1)" 400)
    #[arg(required = true)]
    pub hkl: Vec<String>,

    /// Peak height used for the curve
    #[arg(long, default_value_t = 1.0)]
    pub height: f64,

    /// TOF range for the curve output (e.g., "10000-10500")
    #[arg(short, long)]
    pub range: Option<String>,

    /// TOF step for the curve output (μs)
    #[arg(long, default_value_t = 1.0)]
    pub step: f64,

    /// Write the curve to this CSV file (requires --range)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
