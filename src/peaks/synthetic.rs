//! 测试用合成谱：平坦背景上叠加已知的背靠背指数峰

use crate::models::{MillerIndex, Peak, Spectrum};
use crate::profile::BackToBackExponential;

pub const BACKGROUND: f64 = 10.0;
pub const BIN: f64 = 2.0;
pub const START: f64 = 8000.0;
pub const POINTS: usize = 4000;
const LATTICE: f64 = 4.0;

pub fn spectrum(truths: &[BackToBackExponential], spikes: &[(usize, f64)]) -> Spectrum {
    let x: Vec<f64> = (0..POINTS).map(|i| START + BIN * i as f64).collect();
    let mut y: Vec<f64> = x
        .iter()
        .map(|&xi| BACKGROUND + truths.iter().map(|t| t.value_at(xi)).sum::<f64>())
        .collect();
    for &(idx, extra) in spikes {
        y[idx] += extra;
    }
    Spectrum::with_poisson_errors("synthetic", x, y).unwrap()
}

pub fn peak(hkl: (i32, i32, i32), seed: BackToBackExponential) -> Peak {
    let hkl = MillerIndex::new(hkl.0, hkl.1, hkl.2);
    let d = hkl.cubic_d_spacing(LATTICE).unwrap();
    Peak::new(hkl, d, seed)
}

fn shape(intensity: f64, centre: f64) -> BackToBackExponential {
    BackToBackExponential::new(intensity, 0.1, 0.05, centre, 15.0)
}

/// 略微偏离真值的初始峰形
fn seed(centre: f64) -> BackToBackExponential {
    BackToBackExponential::new(1.0, 0.1, 0.05, centre + 12.0, 17.0)
}

/// [A (2 0 0) @ 14000, B (2 2 0) @ 9900]
pub fn two_peak_truths() -> Vec<BackToBackExponential> {
    vec![shape(20000.0, 14000.0), shape(15000.0, 9900.0)]
}

/// 按 d 升序: [B (2 2 0), A (2 0 0)]
pub fn two_peak_catalog() -> Vec<Peak> {
    vec![peak((2, 2, 0), seed(9900.0)), peak((2, 0, 0), seed(14000.0))]
}

/// 初始峰位靠近谱起点的 (2 2 2)
pub fn edge_peak() -> Peak {
    peak((2, 2, 2), seed(8038.0))
}

/// 一对重叠峰 [(3 1 0) @ 12000, (3 0 0) @ 12060] 与一个孤立峰 (2 2 0) @ 14000
pub fn overlap_truths() -> Vec<BackToBackExponential> {
    vec![
        shape(18000.0, 12000.0),
        shape(12000.0, 12060.0),
        shape(15000.0, 14000.0),
    ]
}

/// 按 d 升序: [(3 1 0), (3 0 0), (2 2 0)]
pub fn overlap_catalog() -> Vec<Peak> {
    let seeded = |hkl, centre: f64, intensity: f64| {
        peak(
            hkl,
            BackToBackExponential::new(intensity, 0.1, 0.05, centre + 8.0, 16.0),
        )
    };
    vec![
        seeded((3, 1, 0), 12000.0, 1.0),
        seeded((3, 0, 0), 12060.0, 1.0),
        seeded((2, 2, 0), 14000.0, 1.0),
    ]
}
