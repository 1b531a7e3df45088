//! # 衍射峰拟合模块
//!
//! 在 TOF 粉末衍射谱中定位并表征 Bragg 峰。
//!
//! ## 流程
//! 1. `catalog`: 由反射表与仪器参数构建候选峰
//! 2. `orchestrator`: 按 ROBUST / CONFIDENT 模式遍历并拟合
//!    - `window`, `background`, `estimate`: 窗口、背景与观测估计
//!    - `staged`: 分阶段细化
//! 3. `assembler`: 汇总接受峰表、Z-score 与重建谱图
//! 4. `export`, `plot`: 写出 CSV 与图表
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 使用 `fitting/`、`profile/`、`models/`

pub mod assembler;
pub mod background;
pub mod catalog;
pub mod confident;
pub mod config;
pub mod estimate;
pub mod export;
pub mod orchestrator;
pub mod plot;
pub mod robust;
pub mod staged;
pub mod window;

#[cfg(test)]
pub(crate) mod synthetic;

pub use assembler::{FitResults, ResultAssembler};
pub use catalog::{PeakCatalog, ReflectionRow};
pub use config::{CatalogCutoff, FitConfig, FitMode, ReferencePeak, SeedMode};
pub use orchestrator::PeakFitOrchestrator;
