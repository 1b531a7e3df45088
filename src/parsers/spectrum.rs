//! # 衍射谱解析器
//!
//! 支持两种输入：
//! - CSV：表头 `tof,intensity[,error]`
//! - XY/DAT：空白分隔的两列或三列，`#` 开头为注释
//!
//! 缺少误差列时使用泊松误差 sqrt(max(y, 1))。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 构造 `models/spectrum.rs` 的 Spectrum

use crate::error::{Result, TofPeaksError};
use crate::models::Spectrum;
use crate::parsers::{parse_cell, read_text};

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumFormat {
    Csv,
    Xy,
}

impl SpectrumFormat {
    /// 按扩展名判断格式，未知扩展名按 XY 处理
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("csv") => SpectrumFormat::Csv,
            _ => SpectrumFormat::Xy,
        }
    }
}

pub fn parse_spectrum_file(path: &Path) -> Result<Spectrum> {
    let content = read_text(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("spectrum");
    parse_spectrum_content(&content, name, SpectrumFormat::from_path(path))
        .map_err(|e| attribute(e, path))
}

pub fn parse_spectrum_content(
    content: &str,
    name: &str,
    format: SpectrumFormat,
) -> Result<Spectrum> {
    let rows = match format {
        SpectrumFormat::Csv => csv_rows(content, name)?,
        SpectrumFormat::Xy => xy_rows(content, name)?,
    };
    build_spectrum(name, rows)
}

/// (行号, 数值列)
type Row = (usize, Vec<f64>);

fn csv_rows(content: &str, name: &str) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(TofPeaksError::Configuration(format!(
            "spectrum '{}' needs at least tof,intensity columns",
            name
        )));
    }
    let columns = headers.len().min(3);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let mut values = Vec::with_capacity(columns);
        for i in 0..columns {
            let cell = record.get(i).unwrap_or("");
            match parse_cell(cell).map_err(|r| row_error(name, line, &r))? {
                Some(v) => values.push(v),
                None if i == 2 => {}
                None => return Err(row_error(name, line, "missing value")),
            }
        }
        rows.push((line, values));
    }
    Ok(rows)
}

fn xy_rows(content: &str, name: &str) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        let parsed: std::result::Result<Vec<f64>, _> =
            tokens.iter().take(3).map(|t| t.parse::<f64>()).collect();
        match parsed {
            Ok(values) if values.len() >= 2 => rows.push((line_no, values)),
            Ok(_) => return Err(row_error(name, line_no, "expected at least 2 columns")),
            // 首行的非数值文本视为表头
            Err(_) if rows.is_empty() => continue,
            Err(_) => return Err(row_error(name, line_no, "non-numeric value")),
        }
    }
    Ok(rows)
}

fn build_spectrum(name: &str, rows: Vec<Row>) -> Result<Spectrum> {
    let with_errors = rows.iter().all(|(_, v)| v.len() >= 3);
    let mut x = Vec::with_capacity(rows.len());
    let mut y = Vec::with_capacity(rows.len());
    let mut e = Vec::with_capacity(rows.len());
    for (_, values) in &rows {
        x.push(values[0]);
        y.push(values[1]);
        if with_errors {
            e.push(values[2]);
        }
    }

    if with_errors && !rows.is_empty() {
        Spectrum::new(name, x, y, e)
    } else {
        Spectrum::with_poisson_errors(name, x, y)
    }
}

fn row_error(name: &str, line: usize, reason: &str) -> TofPeaksError {
    TofPeaksError::ParseError {
        format: "spectrum".to_string(),
        path: name.to_string(),
        reason: format!("line {}: {}", line, reason),
    }
}

/// 把解析错误的来源改写为完整路径
fn attribute(err: TofPeaksError, path: &Path) -> TofPeaksError {
    match err {
        TofPeaksError::ParseError { format, reason, .. } => TofPeaksError::ParseError {
            format,
            path: path.display().to_string(),
            reason,
        },
        TofPeaksError::InvalidArgument(reason) => TofPeaksError::ParseError {
            format: "spectrum".to_string(),
            path: path.display().to_string(),
            reason,
        },
        other => other,
    }
}
