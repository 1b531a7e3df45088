//! # 谱文件收集器
//!
//! 根据输入路径和 glob 模式收集待拟合的谱文件，结果按路径排序。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配文件名

use crate::error::{Result, TofPeaksError};

use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DEFAULT_SPECTRUM_PATTERN: &str = "*.csv,*.xy,*.dat";

pub struct FileCollector {
    input: PathBuf,
    patterns: Vec<Pattern>,
    recursive: bool,
    /// 跳过的目录（通常是输出目录）
    exclude: Option<PathBuf>,
}

impl FileCollector {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            patterns: Vec::new(),
            recursive: false,
            exclude: None,
        }
    }

    /// 设置匹配模式（逗号分隔的多模式）
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.patterns = pattern
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                Pattern::new(s).map_err(|e| {
                    TofPeaksError::InvalidArgument(format!("Invalid glob pattern '{}': {}", s, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn exclude(mut self, dir: &Path) -> Self {
        self.exclude = Some(fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()));
        self
    }

    pub fn collect(&self) -> Vec<PathBuf> {
        if self.input.is_file() {
            return vec![self.input.clone()];
        }
        if !self.input.is_dir() {
            return vec![];
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files: Vec<PathBuf> = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|e| !(e.file_type().is_dir() && self.is_excluded(e.path())))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| self.matches(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    }

    fn is_excluded(&self, path: &Path) -> bool {
        match &self.exclude {
            Some(dir) => fs::canonicalize(path).map(|p| &p == dir).unwrap_or(false),
            None => false,
        }
    }

    fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if self.patterns.is_empty() {
            return true;
        }
        self.patterns.iter().any(|p| p.matches(name))
    }
}
