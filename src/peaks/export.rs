//! # 拟合结果导出
//!
//! 把 [`FitResults`] 写成四个 CSV：
//! - `peaks.csv`: H, K, L, d, TOF_h, I, Alpha, Beta, Sigma, Chi2
//! - `zscores.csv`: H, K, L, d, Z_TOF_h, Z_Alpha, Z_Beta, Z_Sigma
//! - `pattern.csv`: x, raw, fitted, residual
//! - `rejected.csv`: H, K, L, kind, reason
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 使用 `peaks/assembler.rs` 的结果结构
//! - 使用 `csv` 库写入 CSV 文件

use crate::error::{Result, TofPeaksError};
use crate::peaks::assembler::{AcceptedPeak, FitResults, PatternBuffer, PeakZScores, RejectedPeak};

use std::path::{Path, PathBuf};

pub const PEAKS_FILE: &str = "peaks.csv";
pub const ZSCORES_FILE: &str = "zscores.csv";
pub const PATTERN_FILE: &str = "pattern.csv";
pub const REJECTED_FILE: &str = "rejected.csv";

fn writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    csv::Writer::from_path(path).map_err(TofPeaksError::CsvError)
}

fn finish(mut wtr: csv::Writer<std::fs::File>, path: &Path) -> Result<()> {
    wtr.flush().map_err(|e| TofPeaksError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn peaks_to_csv(peaks: &[AcceptedPeak], output_path: &Path) -> Result<()> {
    let mut wtr = writer(output_path)?;
    wtr.write_record([
        "H", "K", "L", "d", "TOF_h", "I", "Alpha", "Beta", "Sigma", "Chi2",
    ])?;
    for p in peaks {
        wtr.write_record(&[
            p.hkl.h.to_string(),
            p.hkl.k.to_string(),
            p.hkl.l.to_string(),
            format!("{:.6}", p.d_spacing),
            format!("{:.4}", p.centre),
            format!("{:.4}", p.intensity),
            format!("{:.6}", p.alpha),
            format!("{:.6}", p.beta),
            format!("{:.5}", p.sigma),
            format!("{:.5}", p.chi2),
        ])?;
    }
    finish(wtr, output_path)
}

pub fn zscores_to_csv(rows: &[PeakZScores], output_path: &Path) -> Result<()> {
    let mut wtr = writer(output_path)?;
    wtr.write_record([
        "H", "K", "L", "d", "Z_TOF_h", "Z_Alpha", "Z_Beta", "Z_Sigma",
    ])?;
    for z in rows {
        wtr.write_record(&[
            z.hkl.h.to_string(),
            z.hkl.k.to_string(),
            z.hkl.l.to_string(),
            format!("{:.6}", z.d_spacing),
            format!("{:.4}", z.centre),
            format!("{:.4}", z.alpha),
            format!("{:.4}", z.beta),
            format!("{:.4}", z.sigma),
        ])?;
    }
    finish(wtr, output_path)
}

pub fn pattern_to_csv(pattern: &PatternBuffer, output_path: &Path) -> Result<()> {
    let mut wtr = writer(output_path)?;
    wtr.write_record(["x", "raw", "fitted", "residual"])?;
    let residual = pattern.residual();
    for i in 0..pattern.len() {
        wtr.write_record(&[
            format!("{:.4}", pattern.x[i]),
            format!("{:.5}", pattern.raw[i]),
            format!("{:.5}", pattern.fitted[i]),
            format!("{:.5}", residual[i]),
        ])?;
    }
    finish(wtr, output_path)
}

pub fn rejected_to_csv(rows: &[RejectedPeak], output_path: &Path) -> Result<()> {
    let mut wtr = writer(output_path)?;
    wtr.write_record(["H", "K", "L", "kind", "reason"])?;
    for r in rows {
        wtr.write_record(&[
            r.hkl.h.to_string(),
            r.hkl.k.to_string(),
            r.hkl.l.to_string(),
            r.kind.to_string(),
            r.reason.clone(),
        ])?;
    }
    finish(wtr, output_path)
}

/// 写出全部结果，返回生成的文件路径
pub fn write_all(results: &FitResults, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir).map_err(|e| TofPeaksError::FileWriteError {
        path: output_dir.display().to_string(),
        source: e,
    })?;

    let peaks = output_dir.join(PEAKS_FILE);
    let zscores = output_dir.join(ZSCORES_FILE);
    let pattern = output_dir.join(PATTERN_FILE);
    let rejected = output_dir.join(REJECTED_FILE);

    peaks_to_csv(&results.accepted, &peaks)?;
    zscores_to_csv(&results.zscores, &zscores)?;
    pattern_to_csv(&results.pattern, &pattern)?;
    rejected_to_csv(&results.rejected, &rejected)?;

    Ok(vec![peaks, zscores, pattern, rejected])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::models::MillerIndex;

    #[test]
    fn test_write_all() {
        let dir = std::env::temp_dir().join(format!("tofpeaks-export-{}", std::process::id()));
        let results = FitResults {
            accepted: vec![AcceptedPeak {
                hkl: MillerIndex::new(2, 2, 0),
                d_spacing: 1.414214,
                centre: 9900.0,
                intensity: 15000.0,
                alpha: 0.1,
                beta: 0.05,
                sigma: 15.0,
                chi2: 1.1,
            }],
            zscores: vec![PeakZScores {
                hkl: MillerIndex::new(2, 2, 0),
                d_spacing: 1.414214,
                centre: 0.0,
                alpha: 0.0,
                beta: 0.0,
                sigma: 0.0,
            }],
            pattern: PatternBuffer {
                x: vec![1.0, 2.0],
                raw: vec![5.0, 6.0],
                fitted: vec![4.0, 0.0],
            },
            rejected: vec![RejectedPeak {
                hkl: MillerIndex::new(3, 1, 1),
                kind: FailureKind::Domain,
                reason: "window, edge".to_string(),
            }],
            unfitted: 0,
        };

        let files = write_all(&results, &dir).unwrap();
        assert_eq!(files.len(), 4);

        let peaks = std::fs::read_to_string(dir.join(PEAKS_FILE)).unwrap();
        assert!(peaks.starts_with("H,K,L,d,TOF_h,I,Alpha,Beta,Sigma,Chi2"));
        assert!(peaks.contains("2,2,0,1.414214,9900.0000"));

        let pattern = std::fs::read_to_string(dir.join(PATTERN_FILE)).unwrap();
        assert_eq!(pattern.lines().count(), 3);
        assert!(pattern.contains("1.0000,5.00000,4.00000,1.00000"));

        let rejected = std::fs::read_to_string(dir.join(REJECTED_FILE)).unwrap();
        assert!(rejected.contains("3,1,1,DomainError,\"window, edge\""));

        std::fs::remove_dir_all(&dir).ok();
    }
}
