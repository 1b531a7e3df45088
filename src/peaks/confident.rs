//! # CONFIDENT 模式
//!
//! 信任初始峰形。沿 d 递减方向把峰分组：相邻两峰的 ±4·FWHM 区间不相交时开始新组。
//!
//! 每组拟合一个复合函数 Σ B2Bᵢ + 共享线性背景，窗口为各峰区间的并集，
//! 各峰位限制在初始值 ± FWHM 内。整组拟合失败时组内所有峰被拒绝；
//! 单个成员参数非物理时只拒绝该成员。
//!
//! ## 依赖关系
//! - 被 `peaks/orchestrator.rs` 调用
//! - 使用 `peaks/window.rs`、`peaks/background.rs`、`peaks/staged.rs`

use crate::error::{FailureKind, Result, TofPeaksError};
use crate::models::{Peak, Spectrum};
use crate::peaks::background::BackgroundEstimator;
use crate::peaks::orchestrator::LocalModel;
use crate::peaks::robust::WINDOW_FWHM_FACTOR;
use crate::peaks::staged::{FitData, Refiner};
use crate::peaks::window::FitWindow;
use crate::profile::{BackToBackExponential, FitFunction, PeakProfile};

/// 将峰下标（按 d 升序）分组，组按 d 递减排列，组内同样按 d 递减
pub fn group_peaks(peaks: &[Peak]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();

    for idx in (0..peaks.len()).rev() {
        if let Some(&prev) = current.last() {
            let right = &peaks[prev].seed;
            let left = &peaks[idx].seed;
            let gap = (right.centre - WINDOW_FWHM_FACTOR * right.fwhm())
                - (left.centre + WINDOW_FWHM_FACTOR * left.fwhm());
            // 非有限的间距（如 FWHM 为 NaN）同样断开分组
            if !(gap <= 0.0) {
                groups.push(std::mem::take(&mut current));
            }
        }
        current.push(idx);
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

pub fn fit_confident(
    refiner: &Refiner<'_>,
    spectrum: &Spectrum,
    peaks: &mut [Peak],
) -> Result<Vec<LocalModel>> {
    let sink = refiner.sink;
    let mut models = Vec::new();

    for group in group_peaks(peaks) {
        let names: Vec<String> = group.iter().map(|&i| peaks[i].hkl.to_string()).collect();
        match fit_group(refiner, spectrum, peaks, &group) {
            Ok(outcome) => {
                let mut model = outcome.model;
                let mut any_accepted = false;
                for (member, &idx) in group.iter().enumerate() {
                    let shape = outcome.shapes[member];
                    if shape.is_physical() {
                        peaks[idx].accept(shape, outcome.chi2);
                        any_accepted = true;
                    } else {
                        let reason = format!("unphysical parameters {:?}", shape.values());
                        sink.warn(&format!(
                            "peak {} rejected ({}): {}",
                            peaks[idx].hkl,
                            FailureKind::Fit,
                            reason
                        ));
                        peaks[idx].reject(FailureKind::Fit, reason);
                        // 重建谱图时去掉该成员
                        model.values[member * 5] = 0.0;
                    }
                }
                sink.info(&format!(
                    "group [{}]: chi2 {:.4}",
                    names.join(", "),
                    outcome.chi2
                ));
                if any_accepted {
                    models.push(model);
                }
            }
            Err(e) => match e.failure_kind() {
                Some(kind) => {
                    sink.warn(&format!(
                        "group [{}] rejected ({}): {}",
                        names.join(", "),
                        kind,
                        e
                    ));
                    for &idx in &group {
                        peaks[idx].reject(kind, e.to_string());
                    }
                }
                None => return Err(e),
            },
        }
    }

    Ok(models)
}

struct GroupFit {
    /// 与组内顺序一致
    shapes: Vec<BackToBackExponential>,
    chi2: f64,
    model: LocalModel,
}

fn fit_group(
    refiner: &Refiner<'_>,
    spectrum: &Spectrum,
    peaks: &[Peak],
    group: &[usize],
) -> Result<GroupFit> {
    let (lo, hi) = spectrum.domain();
    let seeds: Vec<BackToBackExponential> = group.iter().map(|&i| peaks[i].seed).collect();
    if let Some(bad) = seeds.iter().find(|s| !(s.fwhm().is_finite() && s.fwhm() > 0.0)) {
        return Err(TofPeaksError::Domain(format!(
            "seed at {:.3} has no finite width",
            bad.centre
        )));
    }

    let left = seeds
        .iter()
        .map(|s| s.centre - WINDOW_FWHM_FACTOR * s.fwhm())
        .fold(f64::INFINITY, f64::min)
        .max(lo);
    let right = seeds
        .iter()
        .map(|s| s.centre + WINDOW_FWHM_FACTOR * s.fwhm())
        .fold(f64::NEG_INFINITY, f64::max)
        .min(hi);
    let mut window = FitWindow::from_bounds(spectrum, left, right)?;
    let background = BackgroundEstimator::remove(&mut window);

    let mut members = vec![FitFunction::BackToBack; seeds.len()];
    members.push(FitFunction::LinearBackground);
    let function = FitFunction::Composite(members);

    let mut values = Vec::with_capacity(function.parameter_count());
    for seed in &seeds {
        let observed = window.peak_value_near(seed.centre).max(f64::EPSILON);
        values.extend_from_slice(&seed.scaled_to_height(observed).values());
    }
    values.extend_from_slice(&background.values());

    let mut parameters = function.parameters(&values)?;
    for (member, seed) in seeds.iter().enumerate() {
        let fwhm = seed.fwhm();
        if !window.contains(seed.centre) {
            return Err(TofPeaksError::Domain(format!(
                "seed centre {:.3} lies outside the group window",
                seed.centre
            )));
        }
        parameters.set_bounds(
            &format!("f{}.X0", member),
            seed.centre - fwhm,
            seed.centre + fwhm,
        )?;
    }

    let data = FitData {
        x: &window.x,
        y: &window.raw,
        e: &window.raw_error,
    };
    let refined = refiner.refine(&function, parameters, data)?;
    let fitted = refined.parameters.values();
    let shapes = function
        .members()
        .into_iter()
        .filter(|(m, _)| **m == FitFunction::BackToBack)
        .map(|(_, range)| BackToBackExponential::from_values(&fitted[range]))
        .collect();

    Ok(GroupFit {
        shapes,
        chi2: refined.chi2,
        model: LocalModel {
            range: window.range.clone(),
            function,
            values: fitted,
            background: None,
            peaks: group.iter().map(|&i| peaks[i].hkl).collect(),
        },
    })
}
