//! # 拟合编排器
//!
//! 按运行模式遍历候选峰，驱动窗口构建、初始化与分阶段细化。
//! 一次运行单线程、按顺序处理峰；峰列表与局部模型归本次运行独占。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 调用 `peaks/robust.rs`、`peaks/confident.rs`
//! - 结果交给 `peaks/assembler.rs`

use crate::error::Result;
use crate::fitting::FitService;
use crate::models::{MillerIndex, Peak, Spectrum};
use crate::peaks::catalog::PeakCatalog;
use crate::peaks::config::{FitConfig, FitMode};
use crate::peaks::staged::Refiner;
use crate::peaks::{confident, robust};
use crate::profile::{FitFunction, LinearBackground};
use crate::utils::diagnostics::DiagnosticsSink;

use std::ops::Range;

/// 一个窗口上的拟合模型，用于重建谱图
#[derive(Debug, Clone, PartialEq)]
pub struct LocalModel {
    /// 在源曲线中的下标区间
    pub range: Range<usize>,
    pub function: FitFunction,
    pub values: Vec<f64>,
    /// 拟合前扣除的背景，需要加回
    pub background: Option<LinearBackground>,
    pub peaks: Vec<MillerIndex>,
}

impl LocalModel {
    /// 在 x 上求值（含扣除的背景）
    pub fn evaluate(&self, x: &[f64]) -> Vec<f64> {
        let mut y = self.function.evaluate_vec(&self.values, x);
        if let Some(line) = self.background {
            for (v, &xi) in y.iter_mut().zip(x.iter()) {
                *v += line.value_at(xi);
            }
        }
        y
    }
}

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct FitRun {
    /// 按 d 升序
    pub peaks: Vec<Peak>,
    pub models: Vec<LocalModel>,
}

impl FitRun {
    pub fn accepted(&self) -> impl Iterator<Item = &Peak> {
        self.peaks.iter().filter(|p| p.is_accepted())
    }
}

pub struct PeakFitOrchestrator<'a> {
    config: &'a FitConfig,
    service: &'a dyn FitService,
    sink: &'a dyn DiagnosticsSink,
}

impl<'a> PeakFitOrchestrator<'a> {
    pub fn new(
        config: &'a FitConfig,
        service: &'a dyn FitService,
        sink: &'a dyn DiagnosticsSink,
    ) -> Self {
        Self {
            config,
            service,
            sink,
        }
    }

    pub fn run(&self, spectrum: &Spectrum, catalog: PeakCatalog) -> Result<FitRun> {
        self.config.validate()?;
        let mut peaks = catalog.into_peaks();
        let refiner = Refiner {
            service: self.service,
            sink: self.sink,
            cycles: self.config.cycles,
            max_iterations: self.config.max_iterations,
        };

        let models = match &self.config.mode {
            FitMode::Robust(reference) => {
                self.sink.info(&format!(
                    "ROBUST fit of {} peaks from reference {}",
                    peaks.len(),
                    reference.hkl
                ));
                robust::fit_robust(&refiner, spectrum, &mut peaks, reference)?
            }
            FitMode::Confident => {
                self.sink
                    .info(&format!("CONFIDENT fit of {} peaks", peaks.len()));
                confident::fit_confident(&refiner, spectrum, &mut peaks)?
            }
        };

        let accepted = peaks.iter().filter(|p| p.is_accepted()).count();
        self.sink.info(&format!(
            "{} of {} peaks accepted",
            accepted,
            peaks.len()
        ));
        Ok(FitRun { peaks, models })
    }
}
