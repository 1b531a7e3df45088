//! # 结果汇总
//!
//! - 接受峰表（按 d 升序）
//! - 各列 Z-score：(v − mean) / 总体标准差，标准差为 0 时记 0
//! - 重建谱图：每个含接受峰的局部模型在其下标区间上求值并写入等长缓冲区，
//!   未覆盖的位置保持 0；残差 = 原始 − 拟合
//! - 拒绝列表
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 输出交给 `peaks/export.rs` 与 `peaks/plot.rs`

use crate::error::FailureKind;
use crate::models::{MillerIndex, PeakStatus, Spectrum};
use crate::peaks::orchestrator::FitRun;

/// 接受峰表的一行
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedPeak {
    pub hkl: MillerIndex,
    pub d_spacing: f64,
    pub centre: f64,
    pub intensity: f64,
    pub alpha: f64,
    pub beta: f64,
    pub sigma: f64,
    pub chi2: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeakZScores {
    pub hkl: MillerIndex,
    pub d_spacing: f64,
    pub centre: f64,
    pub alpha: f64,
    pub beta: f64,
    pub sigma: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedPeak {
    pub hkl: MillerIndex,
    pub kind: FailureKind,
    pub reason: String,
}

/// 与源曲线等长的重建谱图
#[derive(Debug, Clone, PartialEq)]
pub struct PatternBuffer {
    pub x: Vec<f64>,
    pub raw: Vec<f64>,
    pub fitted: Vec<f64>,
}

impl PatternBuffer {
    pub fn new(spectrum: &Spectrum) -> Self {
        Self {
            x: spectrum.x.clone(),
            raw: spectrum.y.clone(),
            fitted: vec![0.0; spectrum.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn residual(&self) -> Vec<f64> {
        self.raw
            .iter()
            .zip(self.fitted.iter())
            .map(|(r, f)| r - f)
            .collect()
    }

    /// 写入一段模型值
    pub fn write_slice(&mut self, start: usize, values: &[f64]) {
        let end = (start + values.len()).min(self.fitted.len());
        if start < end {
            self.fitted[start..end].copy_from_slice(&values[..end - start]);
        }
    }
}

#[derive(Debug, Clone)]
pub struct FitResults {
    pub accepted: Vec<AcceptedPeak>,
    pub zscores: Vec<PeakZScores>,
    pub pattern: PatternBuffer,
    pub rejected: Vec<RejectedPeak>,
    pub unfitted: usize,
}

/// (v − mean) / 总体标准差
pub fn z_scores(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std == 0.0 || !std.is_finite() {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / std).collect()
}

pub struct ResultAssembler;

impl ResultAssembler {
    pub fn assemble(spectrum: &Spectrum, run: &FitRun) -> FitResults {
        let mut accepted: Vec<AcceptedPeak> = run
            .accepted()
            .map(|p| AcceptedPeak {
                hkl: p.hkl,
                d_spacing: p.d_spacing,
                centre: p.shape.centre,
                intensity: p.shape.intensity,
                alpha: p.shape.alpha,
                beta: p.shape.beta,
                sigma: p.shape.sigma,
                chi2: p.chi2.unwrap_or(f64::NAN),
            })
            .collect();
        accepted.sort_by(|a, b| a.d_spacing.total_cmp(&b.d_spacing));

        let column = |f: fn(&AcceptedPeak) -> f64| -> Vec<f64> {
            z_scores(&accepted.iter().map(f).collect::<Vec<_>>())
        };
        let (zc, za, zb, zs) = (
            column(|p| p.centre),
            column(|p| p.alpha),
            column(|p| p.beta),
            column(|p| p.sigma),
        );
        let zscores = accepted
            .iter()
            .enumerate()
            .map(|(i, p)| PeakZScores {
                hkl: p.hkl,
                d_spacing: p.d_spacing,
                centre: zc[i],
                alpha: za[i],
                beta: zb[i],
                sigma: zs[i],
            })
            .collect();

        let accepted_hkls: Vec<MillerIndex> = accepted.iter().map(|p| p.hkl).collect();
        let mut pattern = PatternBuffer::new(spectrum);
        for model in &run.models {
            if !model.peaks.iter().any(|h| accepted_hkls.contains(h)) {
                continue;
            }
            let range = model.range.start..model.range.end.min(spectrum.len());
            let values = model.evaluate(&spectrum.x[range.clone()]);
            pattern.write_slice(range.start, &values);
        }

        let mut rejected = Vec::new();
        let mut unfitted = 0;
        for peak in &run.peaks {
            match &peak.status {
                PeakStatus::Rejected { kind, reason } => rejected.push(RejectedPeak {
                    hkl: peak.hkl,
                    kind: *kind,
                    reason: reason.clone(),
                }),
                PeakStatus::Unfitted => unfitted += 1,
                PeakStatus::Accepted => {}
            }
        }

        FitResults {
            accepted,
            zscores,
            pattern,
            rejected,
            unfitted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Peak;
    use crate::peaks::orchestrator::LocalModel;
    use crate::peaks::synthetic;
    use crate::profile::{BackToBackExponential, FitFunction, LinearBackground};

    #[test]
    fn test_z_scores() {
        let z = z_scores(&[1.0, 2.0, 3.0]);
        let expected = (1.5f64).sqrt();
        assert!((z[0] + expected).abs() < 1e-12);
        assert_eq!(z[1], 0.0);
        assert!((z[2] - expected).abs() < 1e-12);
        assert_eq!(z_scores(&[4.0, 4.0]), vec![0.0, 0.0]);
        assert!(z_scores(&[]).is_empty());
    }

    fn run_with_model() -> (crate::models::Spectrum, FitRun) {
        let truths = synthetic::two_peak_truths();
        let spectrum = synthetic::spectrum(&truths, &[]);
        let mut peaks = synthetic::two_peak_catalog();
        peaks[1].accept(truths[0], 1.2);
        peaks[0].reject(FailureKind::Domain, "window");
        let range = spectrum.index_range(13800.0, 14200.0);
        let model = LocalModel {
            range,
            function: FitFunction::BackToBack,
            values: truths[0].values().to_vec(),
            background: Some(LinearBackground::new(synthetic::BACKGROUND, 0.0)),
            peaks: vec![peaks[1].hkl],
        };
        // 被拒绝峰的模型不应写入
        let stale = LocalModel {
            range: spectrum.index_range(9700.0, 10100.0),
            function: FitFunction::BackToBack,
            values: truths[1].values().to_vec(),
            background: None,
            peaks: vec![peaks[0].hkl],
        };
        (
            spectrum,
            FitRun {
                peaks,
                models: vec![model, stale],
            },
        )
    }

    #[test]
    fn test_pattern_length_and_residual() {
        let (spectrum, run) = run_with_model();
        let results = ResultAssembler::assemble(&spectrum, &run);
        let pattern = &results.pattern;
        assert_eq!(pattern.len(), spectrum.len());

        let residual = pattern.residual();
        for i in 0..pattern.len() {
            assert_eq!(residual[i], pattern.raw[i] - pattern.fitted[i]);
        }

        let inside = spectrum.index_range(13800.0, 14200.0);
        for i in inside.clone() {
            assert!(residual[i].abs() < 1e-9);
        }
        // 未覆盖的位置为 0
        assert_eq!(pattern.fitted[0], 0.0);
        assert_eq!(pattern.fitted[inside.start - 1], 0.0);
        let b = spectrum.index_range(9900.0, 9900.0).start;
        assert_eq!(pattern.fitted[b], 0.0);
    }

    #[test]
    fn test_tables() {
        let (spectrum, run) = run_with_model();
        let results = ResultAssembler::assemble(&spectrum, &run);
        assert_eq!(results.accepted.len(), 1);
        assert_eq!(results.accepted[0].chi2, 1.2);
        assert_eq!(results.zscores[0].centre, 0.0);
        assert_eq!(results.rejected.len(), 1);
        assert_eq!(results.rejected[0].kind, FailureKind::Domain);
        assert_eq!(results.unfitted, 0);
    }

    #[test]
    fn test_accepted_sorted_by_d() {
        let spectrum = synthetic::spectrum(&[], &[]);
        let mut peaks: Vec<Peak> = [(2, 0, 0), (3, 1, 1), (2, 2, 0)]
            .iter()
            .map(|&hkl| {
                let seed = BackToBackExponential::new(1.0, 0.1, 0.05, 9000.0, 5.0);
                let mut p = synthetic::peak(hkl, seed);
                p.accept(p.seed, 1.0);
                p
            })
            .collect();
        peaks.push(synthetic::peak(
            (4, 0, 0),
            BackToBackExponential::new(1.0, 0.1, 0.05, 8500.0, 5.0),
        ));
        let run = FitRun {
            peaks,
            models: Vec::new(),
        };
        let results = ResultAssembler::assemble(&spectrum, &run);
        assert!(results
            .accepted
            .windows(2)
            .all(|w| w[0].d_spacing < w[1].d_spacing));
        assert_eq!(results.unfitted, 1);
        assert!(results.pattern.fitted.iter().all(|v| *v == 0.0));
    }
}
