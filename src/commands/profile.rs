//! # profile 子命令实现
//!
//! 由仪器参数计算各 hkl 的热中子峰形量，打印汇总表，
//! 可选地把峰形曲线写成 CSV（每个 hkl 一列）。
//!
//! ## 依赖关系
//! - 使用 `cli/profile.rs` 定义的 ProfileArgs
//! - 使用 `profile/thermal.rs` 计算峰形
//! - 使用 `parsers/instrument.rs` 读取仪器参数

use crate::cli::profile::ProfileArgs;
use crate::cli::{parse_hkl, parse_tof_range};
use crate::error::{Result, TofPeaksError};
use crate::parsers::instrument;
use crate::profile::{PeakProfile, ThermalNeutronProfile};
use crate::utils::output;

use std::path::Path;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ShapeRow {
    #[tabled(rename = "(hkl)")]
    hkl: String,
    #[tabled(rename = "d (Å)")]
    d_spacing: String,
    #[tabled(rename = "TOF_h (μs)")]
    tof: String,
    #[tabled(rename = "α")]
    alpha: String,
    #[tabled(rename = "β")]
    beta: String,
    #[tabled(rename = "σ²")]
    sigma2: String,
    #[tabled(rename = "γ")]
    gamma: String,
    #[tabled(rename = "H")]
    fwhm: String,
    #[tabled(rename = "η")]
    eta: String,
}

pub fn execute(args: ProfileArgs) -> Result<()> {
    output::print_header("Thermal Neutron Peak Profile");

    let instrument = instrument::parse_instrument_file(&args.instrument)?;
    let profiles = args
        .hkl
        .iter()
        .map(|s| ThermalNeutronProfile::new(parse_hkl(s)?, &instrument, args.height))
        .collect::<Result<Vec<_>>>()?;

    let rows: Vec<ShapeRow> = profiles
        .iter()
        .map(|p| {
            let s = p.shape();
            ShapeRow {
                hkl: p.hkl().to_string(),
                d_spacing: format!("{:.5}", s.d_spacing),
                tof: format!("{:.2}", s.tof),
                alpha: format!("{:.5}", s.alpha),
                beta: format!("{:.5}", s.beta),
                sigma2: format!("{:.3}", s.sigma2),
                gamma: format!("{:.3}", s.gamma),
                fwhm: format!("{:.3}", s.fwhm),
                eta: format!("{:.4}", s.eta),
            }
        })
        .collect();
    println!("{}", Table::new(&rows));

    if let Some(path) = &args.output {
        let range = args.range.as_deref().ok_or_else(|| {
            TofPeaksError::InvalidArgument("--output requires --range".to_string())
        })?;
        let (start, end) = parse_tof_range(range)?;
        let x = tof_grid(start, end, args.step)?;
        write_curves(&profiles, &x, path)?;
        output::print_success(&format!(
            "Profile curves ({} points) saved to '{}'",
            x.len(),
            path.display()
        ));
    }

    Ok(())
}

fn tof_grid(start: f64, end: f64, step: f64) -> Result<Vec<f64>> {
    if !(step.is_finite() && step > 0.0) {
        return Err(TofPeaksError::InvalidArgument(format!(
            "step must be positive, got {}",
            step
        )));
    }
    let n = ((end - start) / step).floor() as usize + 1;
    Ok((0..n).map(|i| start + i as f64 * step).collect())
}

fn write_curves(profiles: &[ThermalNeutronProfile], x: &[f64], path: &Path) -> Result<()> {
    let curves: Vec<Vec<f64>> = profiles.iter().map(|p| p.evaluate(x)).collect();

    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec!["tof".to_string()];
    header.extend(profiles.iter().map(|p| {
        let hkl = p.hkl();
        format!("{}{}{}", hkl.h, hkl.k, hkl.l)
    }));
    wtr.write_record(&header)?;

    for (i, xi) in x.iter().enumerate() {
        let mut record = vec![format!("{:.4}", xi)];
        record.extend(curves.iter().map(|c| format!("{:.6e}", c[i])));
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(|e| TofPeaksError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}
