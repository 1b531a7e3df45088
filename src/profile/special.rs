//! # 特殊函数
//!
//! - `exp_erfc`: e^a · erfc(x)，大参数时用渐近展开避免 0·∞
//! - `exp_e1`: 复指数积分的标度形式 e^z · E₁(z)
//! - `back_to_back_gauss`: 背靠背指数与高斯卷积的两支之和
//!
//! ## 依赖关系
//! - 被 `profile/` 下的峰形使用
//! - 使用 `statrs` 的 erfc 与 `num-complex`

use num_complex::Complex64;
use statrs::function::erf::erfc;

use std::f64::consts::PI;

/// Euler–Mascheroni 常数
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

const SERIES_RADIUS: f64 = 2.0;
const ASYMPTOTIC_RADIUS: f64 = 30.0;
const MAX_TERMS: usize = 5000;
const EPS: f64 = 1e-16;
const FPMIN: f64 = 1e-300;

/// e^a · erfc(x)
pub fn exp_erfc(a: f64, x: f64) -> f64 {
    if x > 25.0 {
        // erfc(x) ≈ e^{-x²} / (x√π) · (1 - 1/(2x²) + 3/(4x⁴))
        let inv2 = 1.0 / (x * x);
        let series = 1.0 - 0.5 * inv2 + 0.75 * inv2 * inv2;
        return (a - x * x).exp() / (x * PI.sqrt()) * series;
    }
    let c = erfc(x);
    if c <= f64::MIN_POSITIVE {
        return 0.0;
    }
    (a + c.ln()).exp()
}

/// 背靠背指数 ⊗ 高斯：e^u·erfc(y) + e^v·erfc(z)
///
/// `t` 为相对峰心的偏移，`sigma2` 为高斯方差。
pub fn back_to_back_gauss(t: f64, alpha: f64, beta: f64, sigma2: f64) -> f64 {
    let inv_sqrt2sigma = 1.0 / (2.0 * sigma2).sqrt();
    let u = 0.5 * alpha * (alpha * sigma2 + 2.0 * t);
    let y = (alpha * sigma2 + t) * inv_sqrt2sigma;
    let v = 0.5 * beta * (beta * sigma2 - 2.0 * t);
    let z = (beta * sigma2 - t) * inv_sqrt2sigma;
    exp_erfc(u, y) + exp_erfc(v, z)
}

/// e^z · E₁(z)，主值分支
///
/// - |z| ≤ 2 或靠近负实轴：级数
/// - |z| ≥ 30：渐近展开
/// - 其余：连分式（修正 Lentz 法）
pub fn exp_e1(z: Complex64) -> Complex64 {
    let r = z.norm();
    if r == 0.0 {
        return Complex64::new(f64::INFINITY, 0.0);
    }
    if r >= ASYMPTOTIC_RADIUS {
        exp_e1_asymptotic(z)
    } else if r <= SERIES_RADIUS || (z.re < 0.0 && z.im.abs() < -z.re) {
        z.exp() * e1_series(z)
    } else {
        exp_e1_continued_fraction(z)
    }
}

/// E₁(z) = -γ - ln z - Σ (-z)^k / (k·k!)
fn e1_series(z: Complex64) -> Complex64 {
    let mut term = Complex64::new(1.0, 0.0);
    let mut sum = Complex64::new(0.0, 0.0);
    for k in 1..=MAX_TERMS {
        let kf = k as f64;
        term *= -z / kf;
        let contribution = term / kf;
        sum += contribution;
        if contribution.norm() < EPS * sum.norm().max(EPS) {
            break;
        }
    }
    -EULER_GAMMA - z.ln() - sum
}

fn exp_e1_continued_fraction(z: Complex64) -> Complex64 {
    let one = Complex64::new(1.0, 0.0);
    let mut b = z + one;
    let mut c = Complex64::new(1.0 / FPMIN, 0.0);
    let mut d = one / b;
    let mut h = d;
    for i in 1..=MAX_TERMS {
        let an = -((i * i) as f64);
        b += 2.0;
        let mut denom = d * an + b;
        if denom.norm() < FPMIN {
            denom = Complex64::new(FPMIN, 0.0);
        }
        d = one / denom;
        c = b + c.inv() * an;
        if c.norm() < FPMIN {
            c = Complex64::new(FPMIN, 0.0);
        }
        let delta = c * d;
        h *= delta;
        if (delta - one).norm() < EPS {
            break;
        }
    }
    h
}

/// e^z E₁(z) ~ Σ (-1)^k k! / z^{k+1}
fn exp_e1_asymptotic(z: Complex64) -> Complex64 {
    let inv = z.inv();
    let mut term = inv;
    let mut sum = term;
    let mut last = term.norm();
    for k in 1..MAX_TERMS {
        let next = term * inv * (-(k as f64));
        let size = next.norm();
        if size > last {
            break;
        }
        sum += next;
        if size < EPS * sum.norm() {
            break;
        }
        term = next;
        last = size;
    }
    sum
}
