//! # ROBUST 模式
//!
//! 先拟合调用方指定的参考峰，再沿 d 递减方向逐个拟合，
//! 每个峰的搜索窗口与初始峰形取自最近一个可信的相邻峰。
//!
//! 参考峰失败直接中止；其余峰的 `Domain` / `FitFailure` 只使该峰被拒绝。
//! d 大于参考峰的峰保持未拟合。
//!
//! ## 依赖关系
//! - 被 `peaks/orchestrator.rs` 调用
//! - 使用 `peaks/window.rs`、`peaks/background.rs`、`peaks/estimate.rs`、`peaks/staged.rs`

use crate::error::{Result, TofPeaksError};
use crate::models::{Peak, Spectrum};
use crate::peaks::background::BackgroundEstimator;
use crate::peaks::config::ReferencePeak;
use crate::peaks::estimate::estimate_peak;
use crate::peaks::orchestrator::LocalModel;
use crate::peaks::staged::{FitData, Refiner};
use crate::peaks::window::FitWindow;
use crate::profile::{
    BackToBackExponential, FitFunction, Gaussian, LinearBackground, PeakProfile, FWHM_PER_SIGMA,
};

/// 窗口半宽 = 该系数 × 相邻峰 FWHM
pub const WINDOW_FWHM_FACTOR: f64 = 4.0;
/// 搜索窗口右边界不超过 相邻峰峰位 − 该系数 × FWHM
pub const OVERLAP_GUARD_FACTOR: f64 = 3.0;
/// 成为新相邻峰所需的最小峰高（相对参考峰）
pub const NEIGHBOR_MIN_HEIGHT_FRACTION: f64 = 0.1;
/// 成为新相邻峰允许的最大 FWHM 增长倍数
pub const NEIGHBOR_MAX_FWHM_GROWTH: f64 = 2.0;

/// 单峰拟合结果
struct SingleFit {
    shape: BackToBackExponential,
    chi2: f64,
    model: LocalModel,
}

pub fn fit_robust(
    refiner: &Refiner<'_>,
    spectrum: &Spectrum,
    peaks: &mut [Peak],
    reference: &ReferencePeak,
) -> Result<Vec<LocalModel>> {
    let sink = refiner.sink;
    let ref_idx = peaks
        .iter()
        .position(|p| p.hkl == reference.hkl)
        .ok_or_else(|| {
            TofPeaksError::Configuration(format!(
                "reference reflection {} is not in the peak catalog",
                reference.hkl
            ))
        })?;

    let mut models = Vec::new();
    let fit = fit_reference(refiner, spectrum, &peaks[ref_idx], reference).map_err(|e| {
        sink.warn(&format!("reference peak {} failed: {}", reference.hkl, e));
        e
    })?;
    sink.info(&format!(
        "reference peak {}: centre {:.3}, FWHM {:.3}, chi2 {:.4}",
        reference.hkl,
        fit.shape.centre,
        fit.shape.fwhm(),
        fit.chi2
    ));
    peaks[ref_idx].accept(fit.shape, fit.chi2);
    models.push(fit.model);

    for peak in &peaks[ref_idx + 1..] {
        sink.info(&format!(
            "peak {} (d = {:.5}) lies above the reference and is left unfitted",
            peak.hkl, peak.d_spacing
        ));
    }

    let reference_height = peaks[ref_idx].shape.height();
    let mut neighbor = ref_idx;

    for idx in (0..ref_idx).rev() {
        match fit_from_neighbor(refiner, spectrum, &peaks[idx], &peaks[neighbor]) {
            Ok(fit) => {
                let height = fit.shape.height();
                let fwhm = fit.shape.fwhm();
                let neighbor_fwhm = peaks[neighbor].shape.fwhm();
                sink.info(&format!(
                    "peak {}: centre {:.3}, FWHM {:.3}, chi2 {:.4}",
                    peaks[idx].hkl, fit.shape.centre, fwhm, fit.chi2
                ));
                peaks[idx].accept(fit.shape, fit.chi2);
                models.push(fit.model);

                if height >= reference_height * NEIGHBOR_MIN_HEIGHT_FRACTION
                    && fwhm <= NEIGHBOR_MAX_FWHM_GROWTH * neighbor_fwhm
                {
                    neighbor = idx;
                } else {
                    sink.debug(&format!(
                        "peak {} is too weak or too broad to seed the next peak",
                        peaks[idx].hkl
                    ));
                }
            }
            Err(e) => match e.failure_kind() {
                Some(kind) => {
                    sink.warn(&format!("peak {} rejected ({}): {}", peaks[idx].hkl, kind, e));
                    peaks[idx].reject(kind, e.to_string());
                }
                None => return Err(e),
            },
        }
    }

    Ok(models)
}

fn fit_reference(
    refiner: &Refiner<'_>,
    spectrum: &Spectrum,
    peak: &Peak,
    reference: &ReferencePeak,
) -> Result<SingleFit> {
    let mut window = FitWindow::from_bounds(spectrum, reference.left, reference.right)?;
    let background = BackgroundEstimator::remove(&mut window);
    let estimate = estimate_peak(&window.x, &window.peak)?;

    let data = FitData {
        x: &window.x,
        y: &window.peak,
        e: &window.error,
    };
    let initial = Gaussian::new(
        estimate.height,
        estimate.centre,
        estimate.fwhm / FWHM_PER_SIGMA,
    );
    let gaussian = refiner.gaussian_prefit(initial, data)?;
    if !window.contains(gaussian.centre) {
        return Err(TofPeaksError::FitFailure(format!(
            "Gaussian pre-fit centre {:.3} left the window [{:.3}, {:.3}]",
            gaussian.centre,
            window.left(),
            window.right()
        )));
    }

    let seed = BackToBackExponential::new(
        gaussian.area(),
        peak.seed.alpha,
        peak.seed.beta,
        gaussian.centre,
        gaussian.sigma,
    );
    fit_single(refiner, peak, &window, background, seed)
}

fn fit_from_neighbor(
    refiner: &Refiner<'_>,
    spectrum: &Spectrum,
    peak: &Peak,
    neighbor: &Peak,
) -> Result<SingleFit> {
    let (lo, hi) = spectrum.domain();
    let half_width = WINDOW_FWHM_FACTOR * neighbor.shape.fwhm();
    let (left, right) = search_bounds((lo, hi), peak, neighbor)?;
    let search = spectrum.index_range(left, right);
    let argmax = spectrum.argmax_in(search).ok_or_else(|| {
        TofPeaksError::Domain(format!(
            "no samples in search window [{:.3}, {:.3}] for peak {}",
            left, right, peak.hkl
        ))
    })?;

    let observed = spectrum.x[argmax];
    let mut window = FitWindow::from_bounds(
        spectrum,
        (observed - half_width).max(lo),
        (observed + half_width).min(hi),
    )?;
    let background = BackgroundEstimator::remove(&mut window);
    let estimate = estimate_peak(&window.x, &window.peak)?;

    let seed = BackToBackExponential::new(
        1.0,
        neighbor.shape.alpha,
        neighbor.shape.beta,
        estimate.centre,
        neighbor.shape.sigma,
    )
    .scaled_to_height(estimate.height);
    fit_single(refiner, peak, &window, background, seed)
}

/// 搜索窗口：初始峰位加上相邻峰的峰位偏移，右边界不越过相邻峰的重叠保护线
fn search_bounds(domain: (f64, f64), peak: &Peak, neighbor: &Peak) -> Result<(f64, f64)> {
    let (lo, hi) = domain;
    let fwhm = neighbor.shape.fwhm();
    let shift = neighbor.shape.centre - neighbor.seed.centre;
    let centre = peak.seed.centre + shift;
    let half_width = WINDOW_FWHM_FACTOR * fwhm;

    let left = (centre - half_width).max(lo);
    let right = (centre + half_width)
        .min(neighbor.shape.centre - OVERLAP_GUARD_FACTOR * fwhm)
        .min(hi);
    if !(left < right) {
        return Err(TofPeaksError::Domain(format!(
            "empty search window [{:.3}, {:.3}] for peak {}",
            left, right, peak.hkl
        )));
    }
    Ok((left, right))
}

/// 在扣背景后的窗口上细化单个背靠背指数峰
fn fit_single(
    refiner: &Refiner<'_>,
    peak: &Peak,
    window: &FitWindow,
    background: LinearBackground,
    seed: BackToBackExponential,
) -> Result<SingleFit> {
    let function = FitFunction::BackToBack;
    let mut parameters = function.parameters(&seed.values())?;
    parameters.set_bounds("X0", window.left(), window.right())?;

    let data = FitData {
        x: &window.x,
        y: &window.peak,
        e: &window.error,
    };
    let refined = refiner.refine(&function, parameters, data)?;
    let values = refined.parameters.values();
    let shape = BackToBackExponential::from_values(&values);
    if !shape.is_physical() {
        return Err(TofPeaksError::FitFailure(format!(
            "unphysical parameters for peak {}: {:?}",
            peak.hkl,
            shape.values()
        )));
    }

    Ok(SingleFit {
        shape,
        chi2: refined.chi2,
        model: LocalModel {
            range: window.range.clone(),
            function,
            values,
            background: Some(background),
            peaks: vec![peak.hkl],
        },
    })
}
