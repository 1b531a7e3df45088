//! # 热中子背靠背指数 ⊗ 赝 Voigt 剖面
//!
//! 由仪器参数与 Miller 指数计算峰形：
//! 1. d = a / sqrt(h² + k² + l²)
//! 2. 热/超热混合比 n = ½·erfc(Width·(Tcross − 1/d))
//! 3. α、β 由 Alph*/Beta* 参数按 n 混合
//! 4. 峰位 TOF = n·(Zero + Dtt1·d) + (1−n)·(Zerot + Dtt1t·d − Dtt2t/d)
//! 5. σ² = Sig0 + Sig1·d² + Sig2·d⁴，γ = Gam0 + Gam1·d + Gam2·d²
//! 6. Thompson–Cox–Hastings 近似给出赝 Voigt 宽度 H 与混合比 η
//! 7. 强度 = Height · Ω(x − TOF)
//!
//! centre 与 fwhm 是只读派生量：任何直接设置都返回 `UnsupportedOperation`。
//!
//! ## 依赖关系
//! - 被 `peaks/catalog.rs` 用于计算初始峰形
//! - 被 `commands/profile.rs` 调用
//! - 使用 `models/instrument.rs`、`profile/special.rs`

use crate::error::{Result, TofPeaksError};
use crate::models::{InstrumentParameterSet, MillerIndex};
use crate::profile::special::{back_to_back_gauss, exp_e1};
use crate::profile::PeakProfile;

use num_complex::Complex64;
use statrs::function::erf::erfc;
use std::f64::consts::{FRAC_2_PI, LN_2};

/// η 小于该值时省略指数积分项
const ETA_EPSILON: f64 = 1e-8;

/// 剖面计算所需的仪器参数
#[derive(Debug, Clone, Copy, PartialEq)]
struct ThermalParameters {
    dtt1: f64,
    dtt1t: f64,
    dtt2t: f64,
    zero: f64,
    zerot: f64,
    alph0: f64,
    alph1: f64,
    alph0t: f64,
    alph1t: f64,
    beta0: f64,
    beta1: f64,
    beta0t: f64,
    beta1t: f64,
    sig0: f64,
    sig1: f64,
    sig2: f64,
    gam0: f64,
    gam1: f64,
    gam2: f64,
    width: f64,
    tcross: f64,
    lattice_constant: f64,
}

impl ThermalParameters {
    fn from_set(set: &InstrumentParameterSet) -> Result<Self> {
        Ok(Self {
            dtt1: set.require("Dtt1")?,
            dtt1t: set.require("Dtt1t")?,
            dtt2t: set.require("Dtt2t")?,
            zero: set.require("Zero")?,
            zerot: set.require("Zerot")?,
            alph0: set.require("Alph0")?,
            alph1: set.require("Alph1")?,
            alph0t: set.require("Alph0t")?,
            alph1t: set.require("Alph1t")?,
            beta0: set.require("Beta0")?,
            beta1: set.require("Beta1")?,
            beta0t: set.require("Beta0t")?,
            beta1t: set.require("Beta1t")?,
            sig0: set.require("Sig0")?,
            sig1: set.require("Sig1")?,
            sig2: set.require("Sig2")?,
            gam0: set.require("Gam0")?,
            gam1: set.require("Gam1")?,
            gam2: set.require("Gam2")?,
            width: set.require("Width")?,
            tcross: set.require("Tcross")?,
            lattice_constant: set.require("LatticeConstant")?,
        })
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut f64> {
        let field = match name {
            "Dtt1" => &mut self.dtt1,
            "Dtt1t" => &mut self.dtt1t,
            "Dtt2t" => &mut self.dtt2t,
            "Zero" => &mut self.zero,
            "Zerot" => &mut self.zerot,
            "Alph0" => &mut self.alph0,
            "Alph1" => &mut self.alph1,
            "Alph0t" => &mut self.alph0t,
            "Alph1t" => &mut self.alph1t,
            "Beta0" => &mut self.beta0,
            "Beta1" => &mut self.beta1,
            "Beta0t" => &mut self.beta0t,
            "Beta1t" => &mut self.beta1t,
            "Sig0" => &mut self.sig0,
            "Sig1" => &mut self.sig1,
            "Sig2" => &mut self.sig2,
            "Gam0" => &mut self.gam0,
            "Gam1" => &mut self.gam1,
            "Gam2" => &mut self.gam2,
            "Width" => &mut self.width,
            "Tcross" => &mut self.tcross,
            "LatticeConstant" => &mut self.lattice_constant,
            _ => return None,
        };
        Some(field)
    }
}

/// 由 hkl 与仪器参数导出的峰形量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalShape {
    pub d_spacing: f64,
    /// 热/超热混合比 n
    pub blend: f64,
    pub alpha: f64,
    pub beta: f64,
    /// 峰位 TOF_h
    pub tof: f64,
    pub sigma2: f64,
    pub gamma: f64,
    /// 赝 Voigt 宽度 H
    pub fwhm: f64,
    pub eta: f64,
}

/// 热中子背靠背指数 ⊗ 赝 Voigt
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalNeutronProfile {
    hkl: MillerIndex,
    params: ThermalParameters,
    height: f64,
    shape: ThermalShape,
}

impl ThermalNeutronProfile {
    /// 缺少仪器参数 → `Configuration`；非物理峰形 → `Domain`
    pub fn new(hkl: MillerIndex, instrument: &InstrumentParameterSet, height: f64) -> Result<Self> {
        let params = ThermalParameters::from_set(instrument)?;
        let shape = compute_shape(&hkl, &params)?;
        Ok(Self {
            hkl,
            params,
            height,
            shape,
        })
    }

    pub fn hkl(&self) -> MillerIndex {
        self.hkl
    }

    pub fn shape(&self) -> &ThermalShape {
        &self.shape
    }

    /// 按名称设置参数。`Height` 与仪器参数可写；派生量只读。
    ///
    /// 新值导致非物理峰形时保持原状态并返回错误。
    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        match name {
            "Height" => {
                self.height = value;
                return Ok(());
            }
            "Centre" | "TOF_h" | "FWHM" | "Alpha" | "Beta" | "Sigma2" | "Gamma" | "Eta" => {
                return Err(TofPeaksError::UnsupportedOperation(format!(
                    "'{}' is derived from instrument parameters and cannot be set",
                    name
                )));
            }
            _ => {}
        }

        let mut params = self.params;
        let field = params.field_mut(name).ok_or_else(|| {
            TofPeaksError::InvalidArgument(format!("unknown profile parameter '{}'", name))
        })?;
        *field = value;

        let shape = compute_shape(&self.hkl, &params)?;
        self.params = params;
        self.shape = shape;
        Ok(())
    }

    /// Ω(t)，t = x − TOF
    fn omega(&self, t: f64) -> f64 {
        let s = &self.shape;
        let n = s.alpha * s.beta * 0.5 / (s.alpha + s.beta);
        let mut omega = (1.0 - s.eta) * n * back_to_back_gauss(t, s.alpha, s.beta, s.sigma2);

        if s.eta > ETA_EPSILON {
            let half_h = 0.5 * s.fwhm;
            let p = Complex64::new(s.alpha * t, s.alpha * half_h);
            let q = Complex64::new(-s.beta * t, s.beta * half_h);
            let lorentz = exp_e1(p).im + exp_e1(q).im;
            omega -= FRAC_2_PI * s.eta * n * lorentz;
        }

        omega
    }
}

impl PeakProfile for ThermalNeutronProfile {
    fn function(&self, x: &[f64], out: &mut [f64]) {
        let tof = self.shape.tof;
        for (o, &xi) in out.iter_mut().zip(x.iter()) {
            *o = self.height * self.omega(xi - tof);
        }
    }

    fn centre(&self) -> f64 {
        self.shape.tof
    }

    fn fwhm(&self) -> f64 {
        self.shape.fwhm
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn set_centre(&mut self, _centre: f64) -> Result<()> {
        Err(TofPeaksError::UnsupportedOperation(
            "centre of the thermal neutron profile is derived and cannot be set".to_string(),
        ))
    }

    fn set_fwhm(&mut self, _fwhm: f64) -> Result<()> {
        Err(TofPeaksError::UnsupportedOperation(
            "FWHM of the thermal neutron profile is derived and cannot be set".to_string(),
        ))
    }
}

fn compute_shape(hkl: &MillerIndex, p: &ThermalParameters) -> Result<ThermalShape> {
    let d = hkl.cubic_d_spacing(p.lattice_constant)?;

    let blend = 0.5 * erfc(p.width * (p.tcross - 1.0 / d));

    let alpha_inv = blend * (p.alph0 + p.alph1 * d) + (1.0 - blend) * (p.alph0t - p.alph1t / d);
    let beta_inv = blend * (p.beta0 + p.beta1 * d) + (1.0 - blend) * (p.beta0t - p.beta1t / d);
    let alpha = 1.0 / alpha_inv;
    let beta = 1.0 / beta_inv;
    if !(alpha.is_finite() && alpha > 0.0 && beta.is_finite() && beta > 0.0) {
        return Err(TofPeaksError::Domain(format!(
            "non-positive decay constants for {} (alpha = {}, beta = {})",
            hkl, alpha, beta
        )));
    }

    let tof_e = p.zero + p.dtt1 * d;
    let tof_t = p.zerot + p.dtt1t * d - p.dtt2t / d;
    let tof = blend * tof_e + (1.0 - blend) * tof_t;

    let d2 = d * d;
    let sigma2 = p.sig0 + p.sig1 * d2 + p.sig2 * d2 * d2;
    let gamma = p.gam0 + p.gam1 * d + p.gam2 * d2;
    if !(sigma2.is_finite() && sigma2 > 0.0) {
        return Err(TofPeaksError::Domain(format!(
            "non-positive Gaussian variance {} for {}",
            sigma2, hkl
        )));
    }

    let (fwhm, eta) = pseudo_voigt_width(sigma2, gamma)?;

    Ok(ThermalShape {
        d_spacing: d,
        blend,
        alpha,
        beta,
        tof,
        sigma2,
        gamma,
        fwhm,
        eta,
    })
}

/// Thompson–Cox–Hastings：由 σ² 与 γ 求赝 Voigt 的 H 与 η
pub fn pseudo_voigt_width(sigma2: f64, gamma: f64) -> Result<(f64, f64)> {
    let hg = (8.0 * LN_2 * sigma2).sqrt();
    let hl = gamma;

    let h5 = hg.powi(5)
        + 2.69269 * hg.powi(4) * hl
        + 2.42843 * hg.powi(3) * hl.powi(2)
        + 4.47163 * hg.powi(2) * hl.powi(3)
        + 0.07842 * hg * hl.powi(4)
        + hl.powi(5);
    let h = h5.powf(0.2);
    if !(h.is_finite() && h > 0.0) {
        return Err(TofPeaksError::Domain(format!(
            "pseudo-Voigt width is not positive (sigma2 = {}, gamma = {})",
            sigma2, gamma
        )));
    }

    let r = hl / h;
    let eta = 1.36603 * r - 0.47719 * r * r + 0.11116 * r * r * r;
    if !(0.0..=1.0).contains(&eta) {
        return Err(TofPeaksError::Domain(format!(
            "pseudo-Voigt mixing eta = {} outside [0, 1] (sigma2 = {}, gamma = {})",
            eta, sigma2, gamma
        )));
    }

    Ok((h, eta))
}
