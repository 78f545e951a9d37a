use std::collections::BTreeMap;
use std::io::BufRead;

use ahash::AHashSet;
use tracing::{debug, info};

use crate::error::Result;
use crate::graph::{DbGraph, NodeId};
use crate::index::KmerNppTable;
use crate::io::PairedFastqReader;

const PROGRESS_EVERY: usize = 100_000;

/// 至少一侧没有弧的有效节点（物理 id）
pub fn find_tips(graph: &DbGraph) -> AHashSet<NodeId> {
    graph
        .valid_ids()
        .filter(|&id| {
            let node = graph.node(id);
            node.num_left_arcs() == 0 || node.num_right_arcs() == 0
        })
        .collect()
}

/// 一对待连接的 tip：`first` 的右端接 `second` 的左端。
///
/// `(a, b)` 与 `(-b, -a)` 描述同一连接，规范形式取首个 id 绝对值较小的方向。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TipPair {
    pub first: NodeId,
    pub second: NodeId,
}

impl TipPair {
    pub fn canonical(a: NodeId, b: NodeId) -> Self {
        if a.abs() <= b.abs() {
            Self { first: a, second: b }
        } else {
            Self { first: -b, second: -a }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TipCandidate {
    pub pair: TipPair,
    pub support: u32,
}

/// read pair 对 tip 对的支持计数
#[derive(Clone, Debug, Default)]
pub struct TipVotes {
    counts: BTreeMap<TipPair, u32>,
}

impl TipVotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, a: NodeId, b: NodeId) {
        *self.counts.entry(TipPair::canonical(a, b)).or_insert(0) += 1;
    }

    pub fn support(&self, a: NodeId, b: NodeId) -> u32 {
        self.counts.get(&TipPair::canonical(a, b)).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// 保留支持数不少于 `min_support` 的 tip 对，按支持数降序排列，
    /// 支持数相同时按规范键顺序
    pub fn into_candidates(self, min_support: u32) -> Vec<TipCandidate> {
        let mut out: Vec<TipCandidate> = self
            .counts
            .into_iter()
            .filter(|&(_, support)| support >= min_support)
            .map(|(pair, support)| TipCandidate { pair, support })
            .collect();
        out.sort_by(|a, b| b.support.cmp(&a.support));
        out
    }
}

/// 找出一对 mate 各自落在的 tip。
///
/// mate1 取第一个锚定到右侧开放的 tip 视图；mate2 来自另一条链，
/// 取其锚定节点取反后左侧开放的 tip。
pub fn mate_tips(
    graph: &DbGraph,
    table: &KmerNppTable,
    tips: &AHashSet<NodeId>,
    mate1: &[u8],
    mate2: &[u8],
) -> Option<(NodeId, NodeId)> {
    let first = table.anchor_read(graph, mate1).into_iter().find_map(|npp| {
        let id = npp.node_id;
        (npp.is_valid() && tips.contains(&id.abs()) && graph.node(id).num_right_arcs() == 0).then_some(id)
    })?;
    let second = table.anchor_read(graph, mate2).into_iter().find_map(|npp| {
        let id = -npp.node_id;
        (npp.is_valid() && tips.contains(&id.abs()) && graph.node(id).num_left_arcs() == 0).then_some(id)
    })?;
    (first.abs() != second.abs()).then_some((first, second))
}

/// 顺序读取交错的双端 read，为每对落在两个不同 tip 上的 mate 投票
pub fn stream_reads<R: BufRead>(
    graph: &DbGraph,
    table: &KmerNppTable,
    tips: &AHashSet<NodeId>,
    reader: &mut PairedFastqReader<R>,
) -> Result<TipVotes> {
    table.check_kmer_size(graph.kmer_size())?;
    let mut votes = TipVotes::new();
    let mut pairs = 0usize;
    let mut voting = 0usize;
    while let Some((m1, m2)) = reader.next_pair()? {
        pairs += 1;
        if pairs % PROGRESS_EVERY == 0 {
            debug!(pairs, "streaming read pairs");
        }
        if let Some((a, b)) = mate_tips(graph, table, tips, &m1.seq, &m2.seq) {
            votes.record(a, b);
            voting += 1;
        }
    }
    info!(pairs, voting, tip_pairs = votes.len(), "read pairs streamed");
    Ok(votes)
}
