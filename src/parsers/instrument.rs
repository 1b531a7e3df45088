//! # 仪器参数表解析器
//!
//! CSV 格式，表头必须为 `Name,Value`：
//! ```text
//! Name,Value
//! Dtt1,22777.1
//! Zero,-3.2
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs`、`commands/profile.rs` 调用
//! - 构造 `models/instrument.rs` 的 InstrumentParameterSet

use crate::error::{Result, TofPeaksError};
use crate::models::InstrumentParameterSet;
use crate::parsers::{parse_cell, read_text};

use std::path::Path;

pub fn parse_instrument_file(path: &Path) -> Result<InstrumentParameterSet> {
    let content = read_text(path)?;
    parse_instrument_content(&content, &path.display().to_string())
}

pub fn parse_instrument_content(content: &str, source: &str) -> Result<InstrumentParameterSet> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let matches = headers.len() >= 2
        && headers[0].eq_ignore_ascii_case("name")
        && headers[1].eq_ignore_ascii_case("value");
    if !matches {
        return Err(TofPeaksError::Configuration(format!(
            "instrument table {} must start with columns Name,Value (found {:?})",
            source,
            headers.iter().collect::<Vec<_>>()
        )));
    }

    let mut set = InstrumentParameterSet::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let name = record.get(0).unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }
        let value = parse_cell(record.get(1).unwrap_or(""))
            .map_err(|reason| parse_error(source, line, &reason))?
            .ok_or_else(|| parse_error(source, line, &format!("missing value for '{}'", name)))?;
        set.insert(name, value);
    }

    Ok(set)
}

fn parse_error(source: &str, line: u64, reason: &str) -> TofPeaksError {
    TofPeaksError::ParseError {
        format: "instrument".to_string(),
        path: source.to_string(),
        reason: format!("line {}: {}", line, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instrument_table() {
        let content = "Name,Value\n# comment\nDtt1, 22777.1\nZero,-3.2\nLatticeConstant,4.156\n";
        let set = parse_instrument_content(content, "inst.csv").unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get("Dtt1"), Some(22777.1));
        assert_eq!(set.get("Zero"), Some(-3.2));
    }

    #[test]
    fn test_wrong_header_is_configuration_error() {
        let content = "Parameter,Value\nDtt1,1.0\n";
        assert!(matches!(
            parse_instrument_content(content, "inst.csv"),
            Err(TofPeaksError::Configuration(_))
        ));
    }

    #[test]
    fn test_bad_value_names_line() {
        let content = "Name,Value\nDtt1,abc\n";
        match parse_instrument_content(content, "inst.csv") {
            Err(TofPeaksError::ParseError { reason, path, .. }) => {
                assert!(reason.contains("line 2"));
                assert_eq!(path, "inst.csv");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
