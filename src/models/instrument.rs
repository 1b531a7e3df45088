//! # 仪器参数集
//!
//! 保存 `Name -> Value` 形式的仪器/晶体参数（Dtt1, Zero, Alph0, Sig1, ...）。
//! 一次运行内只加载一次，拟合期间只读，通过值显式传递给各组件。
//!
//! ## 依赖关系
//! - 被 `parsers/instrument.rs` 构造
//! - 被 `profile/thermal.rs` 与 `peaks/catalog.rs` 读取

use crate::error::{Result, TofPeaksError};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 热中子背靠背指数剖面用到的全部参数名
pub const THERMAL_PARAMETER_NAMES: [&str; 22] = [
    "Dtt1",
    "Dtt1t",
    "Dtt2t",
    "Zero",
    "Zerot",
    "Alph0",
    "Alph1",
    "Alph0t",
    "Alph1t",
    "Beta0",
    "Beta1",
    "Beta0t",
    "Beta1t",
    "Sig0",
    "Sig1",
    "Sig2",
    "Gam0",
    "Gam1",
    "Gam2",
    "Width",
    "Tcross",
    "LatticeConstant",
];

/// 命名的标量仪器参数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentParameterSet {
    values: BTreeMap<String, f64>,
}

impl InstrumentParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 (名称, 数值) 序列创建；重复名称以后出现者为准
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let values = pairs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self { values }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// 读取必需参数，缺失或非有限值视为配置错误
    pub fn require(&self, name: &str) -> Result<f64> {
        match self.values.get(name) {
            Some(v) if v.is_finite() => Ok(*v),
            Some(v) => Err(TofPeaksError::Configuration(format!(
                "instrument parameter '{}' is not finite ({})",
                name, v
            ))),
            None => Err(TofPeaksError::Configuration(format!(
                "missing instrument parameter '{}'",
                name
            ))),
        }
    }

    /// 返回缺失的热中子剖面参数名
    pub fn missing_thermal_parameters(&self) -> Vec<&'static str> {
        THERMAL_PARAMETER_NAMES
            .iter()
            .copied()
            .filter(|name| !self.values.contains_key(*name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_missing_is_configuration_error() {
        let set = InstrumentParameterSet::from_pairs([("Dtt1", 22777.0)]);
        assert_eq!(set.require("Dtt1").unwrap(), 22777.0);
        assert!(matches!(
            set.require("Zero"),
            Err(TofPeaksError::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_thermal_parameters() {
        let mut set = InstrumentParameterSet::new();
        for name in THERMAL_PARAMETER_NAMES.iter().skip(1) {
            set.insert(*name, 1.0);
        }
        assert_eq!(set.missing_thermal_parameters(), vec!["Dtt1"]);
        set.insert("Dtt1", f64::NAN);
        assert!(set.missing_thermal_parameters().is_empty());
        assert!(set.require("Dtt1").is_err());
    }
}
