//! # 候选峰目录
//!
//! 由反射表构建按 d 升序排列的候选峰序列：
//! 1. 解析 (h, k, l)，缺项的行跳过并计数
//! 2. 重复的 (h, k, l) 跳过并警告
//! 3. 计算 d，非物理值跳过并警告
//! 4. 按 [`SeedMode`] 生成初始峰形
//! 5. 按 d 升序排序
//! 6. 去掉峰位不在曲线定义域内的峰
//! 7. 可选的低 d 端截断
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 使用 `profile/thermal.rs` 计算初始峰形
//! - 使用 `parsers/reflections.rs` 输出的 `ReflectionRow`

use crate::error::{Result, TofPeaksError};
use crate::models::{InstrumentParameterSet, MillerIndex, Peak, Spectrum};
use crate::peaks::config::{CatalogCutoff, SeedMode};
use crate::profile::{BackToBackExponential, ThermalNeutronProfile};
use crate::utils::diagnostics::DiagnosticsSink;

use std::collections::HashSet;

/// 计算模式下缺少 Height 列时的默认强度
pub const DEFAULT_SEED_INTENSITY: f64 = 1.0;

/// 反射表的一行；除 hkl 外均为可选列
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReflectionRow {
    /// 文件中的行号（从 1 开始），用于日志
    pub line: usize,
    pub h: Option<i32>,
    pub k: Option<i32>,
    pub l: Option<i32>,
    pub height: Option<f64>,
    pub tof: Option<f64>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub sigma2: Option<f64>,
    pub gamma: Option<f64>,
}

impl ReflectionRow {
    pub fn hkl(&self) -> Option<MillerIndex> {
        Some(MillerIndex::new(self.h?, self.k?, self.l?))
    }
}

#[derive(Debug, Clone)]
pub struct PeakCatalog {
    /// 按 d 升序
    peaks: Vec<Peak>,
    rejected_rows: usize,
}

impl PeakCatalog {
    /// 直接由已排序的峰创建
    pub fn from_peaks(mut peaks: Vec<Peak>) -> Self {
        peaks.sort_by(|a, b| a.d_spacing.total_cmp(&b.d_spacing));
        Self {
            peaks,
            rejected_rows: 0,
        }
    }

    pub fn build(
        rows: &[ReflectionRow],
        instrument: &InstrumentParameterSet,
        spectrum: &Spectrum,
        seed_mode: SeedMode,
        cutoff: Option<CatalogCutoff>,
        sink: &dyn DiagnosticsSink,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut peaks = Vec::with_capacity(rows.len());
        let mut rejected_rows = 0;

        for row in rows {
            let Some(hkl) = row.hkl() else {
                sink.warn(&format!("reflection row {}: incomplete (h, k, l), skipped", row.line));
                rejected_rows += 1;
                continue;
            };
            if !seen.insert(hkl) {
                sink.warn(&format!("reflection {} appears more than once, duplicate skipped", hkl));
                continue;
            }

            match seed_peak(hkl, row, instrument, seed_mode) {
                Ok(Some(peak)) => peaks.push(peak),
                Ok(None) => {
                    sink.warn(&format!(
                        "reflection {} (row {}) lacks starting values, skipped",
                        hkl, row.line
                    ));
                    rejected_rows += 1;
                }
                Err(TofPeaksError::Domain(reason)) => {
                    sink.warn(&format!("reflection {} skipped: {}", hkl, reason));
                }
                Err(e) => return Err(e),
            }
        }

        peaks.sort_by(|a, b| a.d_spacing.total_cmp(&b.d_spacing));

        let before = peaks.len();
        peaks.retain(|p| {
            let inside = spectrum.contains(p.seed.centre);
            if !inside {
                sink.info(&format!(
                    "reflection {} at TOF {:.2} lies outside the curve domain",
                    p.hkl, p.seed.centre
                ));
            }
            inside
        });
        if peaks.len() < before {
            sink.info(&format!(
                "{} of {} reflections outside the curve domain removed",
                before - peaks.len(),
                before
            ));
        }

        let mut catalog = Self {
            peaks,
            rejected_rows,
        };
        if let Some(cutoff) = cutoff {
            catalog.apply_cutoff(cutoff, sink);
        }
        Ok(catalog)
    }

    /// 保留截断峰及以上（d 更大）的峰，并保留其下方 `below_limit` 个
    pub fn apply_cutoff(&mut self, cutoff: CatalogCutoff, sink: &dyn DiagnosticsSink) {
        match self.index_of(cutoff.minimum_hkl) {
            Some(idx) => {
                let start = idx.saturating_sub(cutoff.below_limit);
                if start > 0 {
                    sink.info(&format!(
                        "{} reflections below {} dropped",
                        start, cutoff.minimum_hkl
                    ));
                }
                self.peaks.drain(..start);
            }
            None => sink.warn(&format!(
                "minimum reflection {} is not in the catalog, cutoff ignored",
                cutoff.minimum_hkl
            )),
        }
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    pub fn into_peaks(self) -> Vec<Peak> {
        self.peaks
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn index_of(&self, hkl: MillerIndex) -> Option<usize> {
        self.peaks.iter().position(|p| p.hkl == hkl)
    }

    /// 缺少 hkl 或起始值而被跳过的行数
    pub fn rejected_rows(&self) -> usize {
        self.rejected_rows
    }
}

/// 生成单个峰；缺少起始值时返回 `Ok(None)`
fn seed_peak(
    hkl: MillerIndex,
    row: &ReflectionRow,
    instrument: &InstrumentParameterSet,
    seed_mode: SeedMode,
) -> Result<Option<Peak>> {
    match seed_mode {
        SeedMode::Calculated => {
            let intensity = row.height.unwrap_or(DEFAULT_SEED_INTENSITY);
            let profile = ThermalNeutronProfile::new(hkl, instrument, intensity)?;
            let shape = profile.shape();
            let seed = BackToBackExponential::new(
                intensity,
                shape.alpha,
                shape.beta,
                shape.tof,
                shape.sigma2.sqrt(),
            );
            Ok(Some(Peak::new(hkl, shape.d_spacing, seed)))
        }
        SeedMode::Table => {
            let d = hkl.cubic_d_spacing(instrument.require("LatticeConstant")?)?;
            let (Some(tof), Some(height), Some(alpha), Some(beta), Some(sigma2)) =
                (row.tof, row.height, row.alpha, row.beta, row.sigma2)
            else {
                return Ok(None);
            };
            if !(sigma2.is_finite() && sigma2 > 0.0) {
                return Err(TofPeaksError::Domain(format!(
                    "non-positive Sigma2 {} in the reflection table",
                    sigma2
                )));
            }
            if !(alpha.is_finite() && alpha > 0.0 && beta.is_finite() && beta > 0.0) {
                return Err(TofPeaksError::Domain(format!(
                    "non-positive Alpha {} or Beta {} in the reflection table",
                    alpha, beta
                )));
            }
            let seed = BackToBackExponential::new(height, alpha, beta, tof, sigma2.sqrt());
            Ok(Some(Peak::new(hkl, d, seed)))
        }
    }
}
