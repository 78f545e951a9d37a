//! 序列比对打分：带状仿射间隙全局比对，用于评估 tip 重叠的相似度。

pub mod score;

pub use score::{banded_global_score, AlignmentScorer, BandedAligner, DpBuffer, ScoreParams};
