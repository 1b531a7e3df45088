//! # 批量执行器
//!
//! 在 rayon 线程池中对每个谱独立运行拟合，并汇总成功/跳过/失败数量。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条

use crate::error::{Result, TofPeaksError};
use crate::utils::progress;

use rayon::prelude::*;
use std::path::PathBuf;

/// 单个谱的处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult {
    /// (谱路径, 接受峰数)
    Success(String, usize),
    Skipped(String),
    Failed(String, String), // (文件路径, 错误信息)
}

#[derive(Debug, Default)]
pub struct BatchResult {
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
    /// 所有成功谱的接受峰总数
    pub accepted_peaks: usize,
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success(_, accepted) => {
                self.success += 1;
                self.accepted_peaks += accepted;
            }
            ProcessResult::Skipped(_) => self.skipped += 1,
            ProcessResult::Failed(path, err) => {
                self.failed += 1;
                self.failures.push((path, err));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }
}

pub struct BatchRunner {
    jobs: usize,
}

impl BatchRunner {
    /// `jobs == 0` 时使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn run<F>(&self, files: &[PathBuf], processor: F) -> Result<BatchResult>
    where
        F: Fn(&PathBuf) -> ProcessResult + Sync + Send,
    {
        let pb = progress::create_progress_bar(files.len() as u64, "Fitting");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| TofPeaksError::Other(format!("Failed to build thread pool: {}", e)))?;

        let results: Vec<ProcessResult> = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    let result = processor(file);
                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();

        let mut batch_result = BatchResult::default();
        for result in results {
            batch_result.merge(result);
        }
        Ok(batch_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_merges_results() {
        let files: Vec<PathBuf> = ["a.csv", "b.csv", "c.csv"].iter().map(PathBuf::from).collect();
        let runner = BatchRunner::new(2);
        assert_eq!(runner.jobs(), 2);

        let result = runner
            .run(&files, |path| {
                let name = path.display().to_string();
                match name.as_str() {
                    "a.csv" => ProcessResult::Success(name, 4),
                    "b.csv" => ProcessResult::Skipped(name),
                    _ => ProcessResult::Failed(name, "bad".to_string()),
                }
            })
            .unwrap();
        assert_eq!(result.total(), 3);
        assert_eq!(result.success, 1);
        assert_eq!(result.accepted_peaks, 4);
        assert_eq!(result.failures, vec![("c.csv".to_string(), "bad".to_string())]);
    }
}
