//! 错误类型。
//!
//! 结构性不一致（例如合并后的序列破坏了边界 k-mer）不属于错误，
//! 而是在 gap closing 中作为被拒绝的候选计数；图内部不变量被破坏则直接 panic。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbgError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 输入文件格式错误（FASTA / FASTQ）
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// 索引或图快照的 k-mer 长度与当前设置不一致
    #[error("k-mer size mismatch: expected {expected}, found {found}")]
    KmerSizeMismatch { expected: usize, found: usize },

    #[error("graph snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("graph contains no nodes")]
    EmptyGraph,

    /// `sanity_check` 发现的弧不对称等结构问题
    #[error("inconsistent graph: {0}")]
    Inconsistent(String),
}

pub type Result<T> = std::result::Result<T, DbgError>;
