//! # 反射表解析器
//!
//! CSV 格式，前三列必须为 H,K,L；以下可选列按名称识别（不区分大小写）：
//! Height, TOF_h, Alpha, Beta, Sigma2, Gamma。
//!
//! 空的或无法解析的 H/K/L 单元格记为缺失，该行在建目录时被跳过；
//! 表结构错误（列顺序、未知列）是致命的配置错误。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 输出 `peaks/catalog.rs` 的 ReflectionRow

use crate::error::{Result, TofPeaksError};
use crate::parsers::{parse_cell, read_text};
use crate::peaks::catalog::ReflectionRow;

use std::path::Path;

const INDEX_COLUMNS: [&str; 3] = ["H", "K", "L"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Height,
    Tof,
    Alpha,
    Beta,
    Sigma2,
    Gamma,
}

impl Column {
    fn from_header(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "height" => Some(Column::Height),
            "tof_h" => Some(Column::Tof),
            "alpha" => Some(Column::Alpha),
            "beta" => Some(Column::Beta),
            "sigma2" => Some(Column::Sigma2),
            "gamma" => Some(Column::Gamma),
            _ => None,
        }
    }
}

pub fn parse_reflections_file(path: &Path) -> Result<Vec<ReflectionRow>> {
    let content = read_text(path)?;
    parse_reflections_content(&content, &path.display().to_string())
}

pub fn parse_reflections_content(content: &str, source: &str) -> Result<Vec<ReflectionRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let index_ok = headers.len() >= 3
        && INDEX_COLUMNS
            .iter()
            .zip(headers.iter())
            .all(|(want, got)| want.eq_ignore_ascii_case(got));
    if !index_ok {
        return Err(TofPeaksError::Configuration(format!(
            "reflection table {}: first three columns must be H,K,L (found {:?})",
            source,
            headers.iter().take(3).collect::<Vec<_>>()
        )));
    }

    let mut columns = Vec::new();
    for name in headers.iter().skip(3) {
        let column = Column::from_header(name).ok_or_else(|| {
            TofPeaksError::Configuration(format!(
                "reflection table {}: unknown column '{}'",
                source, name
            ))
        })?;
        columns.push(column);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let mut row = ReflectionRow {
            line,
            h: record.get(0).and_then(parse_index),
            k: record.get(1).and_then(parse_index),
            l: record.get(2).and_then(parse_index),
            ..ReflectionRow::default()
        };

        for (i, column) in columns.iter().enumerate() {
            let value = parse_cell(record.get(i + 3).unwrap_or("")).map_err(|reason| {
                TofPeaksError::ParseError {
                    format: "reflection".to_string(),
                    path: source.to_string(),
                    reason: format!("line {}: {}", line, reason),
                }
            })?;
            let slot = match column {
                Column::Height => &mut row.height,
                Column::Tof => &mut row.tof,
                Column::Alpha => &mut row.alpha,
                Column::Beta => &mut row.beta,
                Column::Sigma2 => &mut row.sigma2,
                Column::Gamma => &mut row.gamma,
            };
            *slot = value;
        }
        rows.push(row);
    }

    Ok(rows)
}

/// 接受 "3" 或 "3.0"，其余记为缺失
fn parse_index(cell: &str) -> Option<i32> {
    let cell = cell.trim();
    if let Ok(v) = cell.parse::<i32>() {
        return Some(v);
    }
    let v = cell.parse::<f64>().ok()?;
    if v.is_finite() && v.fract() == 0.0 && v.abs() <= i32::MAX as f64 {
        Some(v as i32)
    } else {
        None
    }
}
