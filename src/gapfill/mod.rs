//! 基于双端 read 的 gap closing。
//!
//! 流程：找出 tip → 用 read pair 为 tip 对投票 → 按支持数贪心尝试连接。
//! 每个候选先确定方向，再在两端窗口内寻找重叠（必要时沿图路径补齐），
//! 通过相似度阈值后构造共识序列并校验，最后一次性提交合并。

pub mod evidence;
pub mod expand;
pub mod merge;
pub mod overlap;

use std::fmt;
use std::io::BufRead;

use ahash::AHashSet;
use serde::Serialize;
use tracing::{debug, info};

pub use evidence::{find_tips, mate_tips, stream_reads, TipCandidate, TipPair, TipVotes};
pub use expand::{expand_left, expand_right};
pub use merge::{check_consensus, commit_merge, plan_merge, MergePlan, MergeRejection};
pub use overlap::{extend_read, longest_common_substring, Overlap};

use crate::align::{AlignmentScorer, BandedAligner};
use crate::config::GapSettings;
use crate::error::Result;
use crate::graph::{DbGraph, NodeId};
use crate::index::KmerNppTable;
use crate::io::PairedFastqReader;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GapCloseReport {
    pub tips: usize,
    pub candidates: usize,
    pub joined: usize,
    /// 共识序列校验失败（破坏图结构）的候选
    pub rejected: usize,
    /// tip 已被使用或已失效
    pub skipped: usize,
    /// 重叠不足或相似度不够
    pub unsupported: usize,
}

impl fmt::Display for GapCloseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tips={} candidates={} joined={} rejected={} skipped={} unsupported={}",
            self.tips, self.candidates, self.joined, self.rejected, self.skipped, self.unsupported
        )
    }
}

pub struct GapCloser<S: AlignmentScorer> {
    settings: GapSettings,
    scorer: S,
}

impl GapCloser<BandedAligner> {
    pub fn with_default_scorer(settings: GapSettings) -> Self {
        Self::new(settings, BandedAligner::default())
    }
}

impl<S: AlignmentScorer> GapCloser<S> {
    pub fn new(settings: GapSettings, scorer: S) -> Self {
        Self { settings, scorer }
    }

    pub fn settings(&self) -> &GapSettings {
        &self.settings
    }

    /// 完整的 gap closing 流程，结束后执行一次无分支链合并
    pub fn close_gaps<R: BufRead>(
        &mut self,
        graph: &mut DbGraph,
        reader: &mut PairedFastqReader<R>,
    ) -> Result<GapCloseReport> {
        let tips = find_tips(graph);
        info!(tips = tips.len(), "tips found");

        let table = KmerNppTable::build(graph);
        let votes = stream_reads(graph, &table, &tips, reader)?;
        let candidates = votes.into_candidates(self.settings.min_numb_of_pairs);
        info!(
            candidates = candidates.len(),
            min_support = self.settings.min_numb_of_pairs,
            "tip pairs selected"
        );

        let mut report = self.check_for_tip_connection(graph, &table, &candidates)?;
        report.tips = tips.len();
        graph.concatenate_nodes();
        info!(%report, nodes = graph.num_valid_nodes(), "gap closing done");
        Ok(report)
    }

    /// 按顺序贪心处理候选；每个 tip 至多参与一次连接。
    ///
    /// `table` 的 k 与图不一致时直接报错，图保持不变。
    pub fn check_for_tip_connection(
        &mut self,
        graph: &mut DbGraph,
        table: &KmerNppTable,
        candidates: &[TipCandidate],
    ) -> Result<GapCloseReport> {
        table.check_kmer_size(graph.kmer_size())?;
        let mut report = GapCloseReport {
            candidates: candidates.len(),
            ..Default::default()
        };
        let mut handled: AHashSet<NodeId> = AHashSet::new();

        for cand in candidates {
            let TipPair { first, second } = cand.pair;
            if handled.contains(&first.abs())
                || handled.contains(&second.abs())
                || !graph.node(first).is_valid()
                || !graph.node(second).is_valid()
            {
                report.skipped += 1;
                continue;
            }

            let (first, second) = self.reorder_tips(graph, first, second);
            let Some((first_read, second_read)) = self.align_tips(graph, first, second) else {
                debug!(first, second, "no overlap reaching both tip ends");
                report.unsupported += 1;
                continue;
            };
            let sim = self.similarity(&first_read, &second_read);
            if first_read.len() <= self.settings.min_overlap_size || sim <= self.settings.min_sim {
                debug!(first, second, overlap = first_read.len(), sim, "overlap below threshold");
                report.unsupported += 1;
                continue;
            }

            let (a, b) = if graph.node(first).avg_kmer_cov() >= graph.node(second).avg_kmer_cov() {
                (first, second)
            } else {
                (-second, -first)
            };
            match plan_merge(graph, table, &self.settings, a, b) {
                Ok(plan) => {
                    commit_merge(graph, plan);
                    handled.insert(a.abs());
                    handled.insert(b.abs());
                    report.joined += 1;
                    debug!(a, b, support = cand.support, sim, "tips joined");
                }
                Err(why) => {
                    debug!(a, b, %why, "merge rejected");
                    report.rejected += 1;
                }
            }
        }
        info!(joined = report.joined, rejected = report.rejected, "tip connections checked");
        Ok(report)
    }

    /// 确定两个 tip 的方向，使 `first` 的右端面对 `second` 的左端
    pub fn reorder_tips(&mut self, graph: &DbGraph, first: NodeId, second: NodeId) -> (NodeId, NodeId) {
        let degrees = |id: NodeId| {
            let n = graph.node(id);
            (n.num_left_arcs(), n.num_right_arcs())
        };
        let (fl, fr) = degrees(first);
        let (sl, sr) = degrees(second);
        let first_open_left = fr != 0 && fl == 0;
        let second_open_right = sl != 0 && sr == 0;
        let first_isolated = fl == 0 && fr == 0;
        let second_isolated = sl == 0 && sr == 0;

        let flip_both = (first_open_left && (second_open_right || second_isolated))
            || (first_isolated && second_open_right);
        if flip_both {
            return (-first, -second);
        }
        if !(first_isolated && second_isolated) {
            return (first, second);
        }

        let mut best = (first, second);
        let mut best_sim = i32::MIN;
        for (a, b) in [(first, second), (-first, second), (first, -second), (-first, -second)] {
            if let Some((ra, rb)) = self.align_tips(graph, a, b) {
                let sim = self.similarity(&ra, &rb);
                if sim > best_sim {
                    best_sim = sim;
                    best = (a, b);
                }
            }
        }
        best
    }

    /// 计算 `first` 尾部与 `second` 头部的重叠片段，必要时沿图路径补齐未覆盖的部分；
    /// 重叠未能覆盖 `first` 的末端和 `second` 的起点时返回 None
    pub fn align_tips(
        &mut self,
        graph: &DbGraph,
        first: NodeId,
        second: NodeId,
    ) -> Option<(Vec<u8>, Vec<u8>)> {
        let s = &self.settings;
        let na = graph.node(first);
        let nb = graph.node(second);
        let sa = na.sequence();
        let sb = nb.sequence();
        let mut ov = extend_read(&sa, &sb, s.max_search_size, s.min_exact_match_size)?;

        if nb.num_right_arcs() != 0 && sa.len() > ov.first_end {
            let tail = &sa[ov.first_end..];
            let part = expand_right(graph, &mut self.scorer, second, tail, s.max_bfs_paths);
            ov.first_read.extend_from_slice(&tail[..part.len()]);
            ov.second_read.extend_from_slice(&part);
            ov.first_end += part.len();
        }
        if na.num_left_arcs() != 0 && ov.second_start > 0 {
            let head = &sb[..ov.second_start];
            let part = expand_left(graph, &mut self.scorer, first, head, s.max_bfs_paths);
            let n = part.len();
            let mut second_read = head[head.len() - n..].to_vec();
            second_read.extend_from_slice(&ov.second_read);
            let mut first_read = part;
            first_read.extend_from_slice(&ov.first_read);
            ov.first_read = first_read;
            ov.second_read = second_read;
            ov.second_start -= n;
        }

        ov.reaches_ends(sa.len()).then_some((ov.first_read, ov.second_read))
    }

    /// 百分比相似度：比对得分 × 100 / 重叠长度
    fn similarity(&mut self, first_read: &[u8], second_read: &[u8]) -> i32 {
        let score = self.scorer.align(first_read, second_read);
        score * 100 / first_read.len().max(1) as i32
    }
}
