use serde::{Deserialize, Serialize};

use crate::error::{DbgError, Result};

/// 2-bit 压缩 k-mer 字所能容纳的最大 k
pub const MAX_KMER_SIZE: usize = 32;

/// gap closing 参数，默认值与 k 相关（`max_search_size = k + 20`）
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GapSettings {
    /// 在两个 tip 末端各自截取的最大窗口长度
    pub max_search_size: usize,
    /// 候选 tip 对所需的最少 read pair 支持数
    pub min_numb_of_pairs: u32,
    /// 接受连接所需的最小重叠长度（严格大于）
    pub min_overlap_size: usize,
    /// 接受连接所需的最小相似度百分比（严格大于）
    pub min_sim: i32,
    /// 最长公共子串的最小长度
    pub min_exact_match_size: usize,
    /// 图扩展时枚举路径数上限
    pub max_bfs_paths: usize,
}

impl GapSettings {
    pub fn for_kmer(k: usize) -> Self {
        Self {
            max_search_size: k + 20,
            min_numb_of_pairs: 10,
            min_overlap_size: 15,
            min_sim: 50,
            min_exact_match_size: 7,
            max_bfs_paths: 1024,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub kmer_size: usize,
    /// 平均 k-mer 覆盖度阈值，低于等于该值的 tip / bubble 分支可被删除
    pub cov_cutoff: f64,
    /// tip 与 bubble 搜索的最大 marginal length
    pub max_marg_length: usize,
    /// bubble 搜索中每个源节点最多访问的节点数
    pub max_nodes_visited: usize,
    /// 纠错 pass 迭代上限
    pub max_rounds: usize,
    pub gap: GapSettings,
}

impl Settings {
    pub fn new(kmer_size: usize) -> Self {
        Self {
            kmer_size,
            cov_cutoff: 2.0,
            max_marg_length: 2 * kmer_size,
            max_nodes_visited: 100,
            max_rounds: 10,
            gap: GapSettings::for_kmer(kmer_size),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.kmer_size < 3 || self.kmer_size > MAX_KMER_SIZE {
            return Err(DbgError::InvalidSettings(format!(
                "k-mer size {} outside supported range 3..={}",
                self.kmer_size, MAX_KMER_SIZE
            )));
        }
        if !(self.cov_cutoff >= 0.0) {
            return Err(DbgError::InvalidSettings(format!(
                "coverage cutoff must be non-negative, got {}",
                self.cov_cutoff
            )));
        }
        if self.max_nodes_visited == 0 || self.max_rounds == 0 {
            return Err(DbgError::InvalidSettings(
                "max_nodes_visited and max_rounds must be positive".to_string(),
            ));
        }
        if self.gap.max_search_size == 0 || self.gap.min_exact_match_size == 0 {
            return Err(DbgError::InvalidSettings(
                "max_search_size and min_exact_match_size must be positive".to_string(),
            ));
        }
        if self.gap.max_search_size < self.gap.min_exact_match_size {
            return Err(DbgError::InvalidSettings(format!(
                "max_search_size {} is smaller than min_exact_match_size {}",
                self.gap.max_search_size, self.gap.min_exact_match_size
            )));
        }
        if self.gap.max_bfs_paths == 0 {
            return Err(DbgError::InvalidSettings("max_bfs_paths must be positive".to_string()));
        }
        Ok(())
    }
}
