use thiserror::Error;

use super::overlap::extend_read;
use crate::config::GapSettings;
use crate::graph::{DbGraph, NodeId};
use crate::index::{KmerIter, KmerNppTable};

/// 合并前校验失败的原因；图保持不变
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MergeRejection {
    #[error("k-mer index built with k={table}, graph uses k={graph}")]
    KmerSizeMismatch { graph: usize, table: usize },
    #[error("no sufficient exact overlap between {first} and {second}")]
    NoOverlap { first: NodeId, second: NodeId },
    #[error("consensus shorter than k")]
    TooShort,
    #[error("consensus does not keep the first k-1 bases of {0}")]
    PrefixChanged(NodeId),
    #[error("consensus does not keep the last k-1 bases of {0}")]
    SuffixChanged(NodeId),
    #[error("consensus k-mer at offset {offset} already belongs to node {node}")]
    ForeignKmer { offset: usize, node: NodeId },
}

/// 已通过校验的合并：`second` 并入 `first`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergePlan {
    pub first: NodeId,
    pub second: NodeId,
    pub sequence: Vec<u8>,
    pub kmer_cov: u64,
    pub read_start_cov: u64,
}

/// 校验共识序列：保留 `first` 的前 k-1 与 `second` 的后 k-1 个碱基，
/// 且每个 k-mer 在索引中只能指向这两个节点（或不存在）。
pub fn check_consensus(
    graph: &DbGraph,
    table: &KmerNppTable,
    first: NodeId,
    second: NodeId,
    consensus: &[u8],
) -> Result<(), MergeRejection> {
    let k = graph.kmer_size();
    if table.kmer_size() != k {
        return Err(MergeRejection::KmerSizeMismatch { graph: k, table: table.kmer_size() });
    }
    let overlap = k - 1;
    if consensus.len() < k {
        return Err(MergeRejection::TooShort);
    }
    let fa = graph.node(first);
    let fb = graph.node(second);
    if consensus[..overlap] != fa.substr(0, overlap)[..] {
        return Err(MergeRejection::PrefixChanged(first));
    }
    if consensus[consensus.len() - overlap..] != fb.substr(fb.len() - overlap, overlap)[..] {
        return Err(MergeRejection::SuffixChanged(second));
    }
    for (offset, kmer) in KmerIter::new(consensus, k) {
        let npp = table.find_npp(&kmer);
        if npp.is_valid() && npp.node_id.abs() != first.abs() && npp.node_id.abs() != second.abs() {
            return Err(MergeRejection::ForeignKmer { offset, node: npp.node_id });
        }
    }
    Ok(())
}

/// 只读阶段：重新计算 `first` 与 `second` 的重叠，构造并校验共识序列
pub fn plan_merge(
    graph: &DbGraph,
    table: &KmerNppTable,
    settings: &GapSettings,
    first: NodeId,
    second: NodeId,
) -> Result<MergePlan, MergeRejection> {
    assert_ne!(first.abs(), second.abs(), "cannot merge node {} with itself", first);
    let na = graph.node(first);
    let nb = graph.node(second);
    let sa = na.sequence();
    let sb = nb.sequence();
    let ov = extend_read(&sa, &sb, settings.max_search_size, settings.min_exact_match_size)
        .ok_or(MergeRejection::NoOverlap { first, second })?;

    let mut consensus = Vec::with_capacity(sa.len() + sb.len());
    consensus.extend_from_slice(&sa[..ov.first_start]);
    consensus.extend_from_slice(&ov.first_read);
    if sb.len() > ov.second_end {
        consensus.extend_from_slice(&sb[ov.second_end..]);
    }
    check_consensus(graph, table, first, second, &consensus)?;

    Ok(MergePlan {
        first,
        second,
        sequence: consensus,
        kmer_cov: na.kmer_cov() + nb.kmer_cov(),
        read_start_cov: na.read_start_cov() + nb.read_start_cov(),
    })
}

/// 写入阶段：断开 `first` 的右弧与 `second` 的左弧，丢弃两者之间的弧，
/// `first` 接管 `second` 的右弧并更新序列与覆盖度，`second` 失效。
pub fn commit_merge(graph: &mut DbGraph, plan: MergePlan) {
    let MergePlan { first, second, sequence, kmer_cov, read_start_cov } = plan;

    graph.detach_right_arcs(first);
    graph.detach_left_arcs(second);
    let internal: Vec<NodeId> = graph
        .node(second)
        .right_arcs()
        .map(|a| a.node_id)
        .filter(|t| t.abs() == first.abs() || t.abs() == second.abs())
        .collect();
    for t in internal {
        graph.detach_arc(second, t);
    }

    graph.inherit_right_arcs(first, second);
    graph.set_sequence(first, &sequence);
    graph.set_kmer_cov(first, kmer_cov);
    graph.set_read_start_cov(first, read_start_cov);
    graph.invalidate(second);
}
