//! # 命名参数容器
//!
//! 有序参数表，支持名称↔下标查找、固定（tie）与边界约束。
//! 复合函数的成员参数以 `f{i}.` 为前缀，例如 `f0.X0`。
//!
//! ## 依赖关系
//! - 被 `profile/function.rs` 与 `fitting/` 使用

use crate::error::{Result, TofPeaksError};

/// 单个拟合参数
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
    /// 固定为当前值，不参与优化
    pub fixed: bool,
    /// 闭区间 [min, max]
    pub bounds: Option<(f64, f64)>,
    /// 拟合不确定度
    pub error: f64,
}

/// 有序参数表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

/// 参数名是否属于某个基础名（忽略 `f{i}.` 前缀）
pub fn matches_base(name: &str, base: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, tail)) => tail == base,
        None => name == base,
    }
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由名称与数值列表创建
    pub fn from_values(names: &[String], values: &[f64]) -> Result<Self> {
        if names.len() != values.len() {
            return Err(TofPeaksError::InvalidArgument(format!(
                "{} parameter names but {} values",
                names.len(),
                values.len()
            )));
        }
        let mut set = Self::new();
        for (name, value) in names.iter().zip(values.iter()) {
            set.push(name.clone(), *value);
        }
        Ok(set)
    }

    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        self.params.push(Parameter {
            name: name.into(),
            value,
            fixed: false,
            bounds: None,
            error: 0.0,
        });
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|i| self.params[i].value)
    }

    pub fn parameter(&self, index: usize) -> &Parameter {
        &self.params[index]
    }

    fn lookup_mut(&mut self, name: &str) -> Result<&mut Parameter> {
        self.params
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| TofPeaksError::InvalidArgument(format!("unknown parameter '{}'", name)))
    }

    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        self.lookup_mut(name)?.value = value;
        Ok(())
    }

    pub fn set_bounds(&mut self, name: &str, min: f64, max: f64) -> Result<()> {
        if !(min <= max) {
            return Err(TofPeaksError::InvalidArgument(format!(
                "invalid bounds [{}, {}] for '{}'",
                min, max, name
            )));
        }
        let param = self.lookup_mut(name)?;
        param.bounds = Some((min, max));
        param.value = param.value.clamp(min, max);
        Ok(())
    }

    /// 对所有同基础名的参数设置下界（上界为 +∞）
    pub fn set_lower_bound_all(&mut self, base: &str, min: f64) {
        for param in self.params.iter_mut().filter(|p| matches_base(&p.name, base)) {
            let max = param.bounds.map(|(_, hi)| hi).unwrap_or(f64::INFINITY);
            param.bounds = Some((min, max));
            param.value = param.value.max(min);
        }
    }

    /// 除 `active` 中列出的基础名外，其余参数全部固定在当前值
    pub fn tie_all_except(&mut self, active: &[&str]) {
        for param in &mut self.params {
            param.fixed = !active.iter().any(|base| matches_base(&param.name, base));
        }
    }

    pub fn untie_all(&mut self) {
        for param in &mut self.params {
            param.fixed = false;
        }
    }

    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value).collect()
    }

    /// 未固定参数的下标
    pub fn free_indices(&self) -> Vec<usize> {
        (0..self.params.len())
            .filter(|&i| !self.params[i].fixed)
            .collect()
    }

    /// 将数值限制在参数边界内
    pub fn clamp(&self, index: usize, value: f64) -> f64 {
        match self.params[index].bounds {
            Some((lo, hi)) => value.clamp(lo, hi),
            None => value,
        }
    }

    /// 写回拟合结果
    pub fn update(&mut self, values: &[f64], errors: &[f64]) {
        for (i, param) in self.params.iter_mut().enumerate() {
            if let Some(v) = values.get(i) {
                param.value = *v;
            }
            param.error = errors.get(i).copied().unwrap_or(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composite_set() -> ParameterSet {
        let names: Vec<String> = ["f0.I", "f0.X0", "f0.S", "f1.A0", "f1.A1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        ParameterSet::from_values(&names, &[10.0, 5000.0, 3.0, 1.0, 0.0]).unwrap()
    }

    #[test]
    fn test_matches_base() {
        assert!(matches_base("X0", "X0"));
        assert!(matches_base("f3.X0", "X0"));
        assert!(!matches_base("f3.X0", "X"));
        assert!(!matches_base("A0", "A"));
    }

    #[test]
    fn test_tie_all_except() {
        let mut set = composite_set();
        set.tie_all_except(&["X0", "A0"]);
        let free: Vec<&str> = set
            .free_indices()
            .into_iter()
            .map(|i| set.parameter(i).name.as_str())
            .collect();
        assert_eq!(free, vec!["f0.X0", "f1.A0"]);
        set.untie_all();
        assert_eq!(set.free_indices().len(), 5);
    }

    #[test]
    fn test_bounds_clamp_value() {
        let mut set = composite_set();
        set.set_bounds("f0.X0", 4990.0, 4995.0).unwrap();
        assert_eq!(set.get("f0.X0"), Some(4995.0));
        let idx = set.index_of("f0.X0").unwrap();
        assert_eq!(set.clamp(idx, 4000.0), 4990.0);
        assert!(set.set_bounds("f0.X0", 2.0, 1.0).is_err());
        assert!(set.set("missing", 1.0).is_err());
    }

    #[test]
    fn test_lower_bound_all() {
        let mut set = composite_set();
        set.set("f0.S", -1.0).unwrap();
        set.set_lower_bound_all("S", 1e-6);
        assert_eq!(set.get("f0.S"), Some(1e-6));
    }
}
