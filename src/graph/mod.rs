//! 双链 de Bruijn 图。
//!
//! 节点以正整数 `1..=num_nodes` 寻址，负 id 表示同一物理节点的反向互补视图。
//! 所有弧存放在一个 arena 向量中，每个节点按左右两侧各持有一段连续区间；
//! 删除节点只做墓碑标记（`valid = false`），槽位永不复用。

pub mod builder;
pub mod export;
pub mod stats;
pub mod view;

use std::io::{BufReader, BufWriter};
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{DbgError, Result};
use crate::util::dna;

pub use builder::GraphBuilder;
pub use stats::{Component, GraphStats};
pub use view::{ArcIter, NodeView};

/// 带符号的节点 id：绝对值为物理槽位，符号表示方向，0 非法
pub type NodeId = i32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arc {
    pub node_id: NodeId,
    pub coverage: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    fn flip(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// 视图 `id` 的某一侧对应物理节点的哪一侧
    fn physical(self, id: NodeId) -> Self {
        if id > 0 {
            self
        } else {
            self.flip()
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ArcSpan {
    first: u32,
    len: u32,
}

impl ArcSpan {
    fn range(&self) -> Range<usize> {
        let s = self.first as usize;
        s..s + self.len as usize
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Node {
    sequence: Vec<u8>,
    kmer_cov: u64,
    read_start_cov: u64,
    left: ArcSpan,
    right: ArcSpan,
    valid: bool,
}

impl Node {
    fn placeholder() -> Self {
        Self {
            sequence: Vec::new(),
            kmer_cov: 0,
            read_start_cov: 0,
            left: ArcSpan::default(),
            right: ArcSpan::default(),
            valid: false,
        }
    }

    fn span(&self, side: Side) -> ArcSpan {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    fn span_mut(&mut self, side: Side) -> &mut ArcSpan {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

/// 图快照元信息
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphMeta {
    pub source: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DbGraph {
    k: usize,
    /// 槽位 0 为占位，不代表任何节点
    nodes: Vec<Node>,
    arcs: Vec<Arc>,
    meta: GraphMeta,
}

#[inline]
fn stored_target(id: NodeId, target: NodeId) -> NodeId {
    if id > 0 {
        target
    } else {
        -target
    }
}

impl DbGraph {
    pub fn kmer_size(&self) -> usize {
        self.k
    }

    pub fn meta(&self) -> &GraphMeta {
        &self.meta
    }

    pub fn set_meta(&mut self, meta: GraphMeta) {
        self.meta = meta;
    }

    /// 物理节点数（含已失效节点）
    pub fn num_nodes(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn num_valid_nodes(&self) -> usize {
        self.nodes.iter().skip(1).filter(|n| n.valid).count()
    }

    /// 有效弧数：A→B 与 -B→-A 只计一次
    pub fn num_arcs(&self) -> usize {
        let mut count = 0usize;
        for id in self.valid_ids() {
            for oid in [id, -id] {
                for arc in self.node(oid).right_arcs() {
                    if (oid, arc.node_id) <= (-arc.node_id, -oid) {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// 按物理 id 升序迭代所有有效节点（正向 id）
    pub fn valid_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, n)| n.valid)
            .map(|(i, _)| i as NodeId)
    }

    #[inline]
    fn slot(&self, id: NodeId) -> usize {
        let u = id.unsigned_abs() as usize;
        assert!(id != 0 && u < self.nodes.len(), "node id {} out of range 1..={}", id, self.num_nodes());
        u
    }

    /// 取得节点 `id` 的方向视图，O(1)
    pub fn node(&self, id: NodeId) -> NodeView<'_> {
        let slot = self.slot(id);
        NodeView::new(self, &self.nodes[slot], id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id != 0 && (id.unsigned_abs() as usize) < self.nodes.len()
    }

    pub(crate) fn arc_slice(&self, id: NodeId, side: Side) -> &[Arc] {
        let slot = self.slot(id);
        let span = self.nodes[slot].span(side.physical(id));
        &self.arcs[span.range()]
    }

    // ── 单侧弧操作 ─────────────────────────────────────

    fn delete_arc(&mut self, id: NodeId, side: Side, target: NodeId) -> bool {
        let slot = self.slot(id);
        let pside = side.physical(id);
        let stored = stored_target(id, target);
        let range = self.nodes[slot].span(pside).range();
        let pos = self.arcs[range.clone()].iter().position(|a| a.node_id == stored);
        match pos {
            Some(p) => {
                // 与区间内最后一条交换后缩短区间
                self.arcs.swap(range.start + p, range.end - 1);
                self.nodes[slot].span_mut(pside).len -= 1;
                true
            }
            None => false,
        }
    }

    fn replace_arc_target(&mut self, id: NodeId, side: Side, old: NodeId, new: NodeId) -> bool {
        let slot = self.slot(id);
        let range = self.nodes[slot].span(side.physical(id)).range();
        let old_stored = stored_target(id, old);
        match self.arcs[range].iter_mut().find(|a| a.node_id == old_stored) {
            Some(arc) => {
                arc.node_id = stored_target(id, new);
                true
            }
            None => false,
        }
    }

    /// 删除 `id` 指向 `target` 的右弧（仅本侧）。
    pub fn delete_right_arc(&mut self, id: NodeId, target: NodeId) -> bool {
        self.delete_arc(id, Side::Right, target)
    }

    pub fn delete_left_arc(&mut self, id: NodeId, target: NodeId) -> bool {
        self.delete_arc(id, Side::Left, target)
    }

    /// 将 `id` 左侧指向 `old` 的弧改指 `new`，覆盖度不变
    pub fn replace_left_arc_target(&mut self, id: NodeId, old: NodeId, new: NodeId) -> bool {
        self.replace_arc_target(id, Side::Left, old, new)
    }

    /// 清空右弧（不处理对端）
    pub fn clear_right_arcs(&mut self, id: NodeId) {
        let slot = self.slot(id);
        self.nodes[slot].span_mut(Side::Right.physical(id)).len = 0;
    }

    pub fn clear_left_arcs(&mut self, id: NodeId) {
        let slot = self.slot(id);
        self.nodes[slot].span_mut(Side::Left.physical(id)).len = 0;
    }

    // ── 双侧弧操作 ─────────────────────────────────────

    /// 删除 `id` 的全部右弧，并同时删除邻居上的对称弧。
    pub fn detach_right_arcs(&mut self, id: NodeId) {
        let targets: Vec<NodeId> = self.node(id).right_arcs().map(|a| a.node_id).collect();
        for t in targets {
            // 发夹弧 id -> -id 只存一份
            if t == -id {
                continue;
            }
            let ok = self.delete_left_arc(t, id);
            assert!(ok, "arc {} -> {} has no reverse entry", id, t);
        }
        self.clear_right_arcs(id);
    }

    pub fn detach_left_arcs(&mut self, id: NodeId) {
        self.detach_right_arcs(-id);
    }

    /// 删除单条弧 `from -> to` 的两端
    pub fn detach_arc(&mut self, from: NodeId, to: NodeId) -> bool {
        if !self.delete_right_arc(from, to) {
            return false;
        }
        if to != -from {
            let ok = self.delete_left_arc(to, from);
            assert!(ok, "arc {} -> {} has no reverse entry", from, to);
        }
        true
    }

    /// `dst` 接管 `src` 的全部右弧，右侧邻居的左弧改指 `dst`。
    ///
    /// 调用方保证 `dst` 当前无右弧，且 `src` 的右弧不指向 `±src` / `±dst`。
    pub fn inherit_right_arcs(&mut self, dst: NodeId, src: NodeId) {
        let dst_slot = self.slot(dst);
        let src_slot = self.slot(src);
        assert_ne!(dst_slot, src_slot, "node {} cannot inherit its own arcs", dst);
        assert_eq!(self.node(dst).num_right_arcs(), 0, "node {} still has right arcs", dst);

        let src_side = Side::Right.physical(src);
        let dst_side = Side::Right.physical(dst);
        let span = self.nodes[src_slot].span(src_side);
        if (dst > 0) != (src > 0) {
            for arc in &mut self.arcs[span.range()] {
                arc.node_id = -arc.node_id;
            }
        }
        *self.nodes[dst_slot].span_mut(dst_side) = span;
        self.nodes[src_slot].span_mut(src_side).len = 0;

        let targets: Vec<NodeId> = self.node(dst).right_arcs().map(|a| a.node_id).collect();
        for t in targets {
            debug_assert!(t.abs() != src.abs() && t.abs() != dst.abs());
            let ok = self.replace_left_arc_target(t, src, dst);
            assert!(ok, "neighbour {} has no left arc to {}", t, src);
        }
    }

    // ── 节点操作 ───────────────────────────────────────

    /// 失效节点；节点必须已无任何弧
    pub fn invalidate(&mut self, id: NodeId) {
        let slot = self.slot(id);
        let node = &mut self.nodes[slot];
        assert!(node.left.len == 0 && node.right.len == 0, "node {} invalidated with arcs attached", id);
        node.valid = false;
    }

    /// 断开所有弧并失效节点
    pub fn remove_node(&mut self, id: NodeId) {
        self.detach_right_arcs(id);
        self.detach_left_arcs(id);
        self.invalidate(id);
    }

    /// 按视图方向设置序列（负 id 时存储其反向互补）
    pub fn set_sequence(&mut self, id: NodeId, seq: &[u8]) {
        let slot = self.slot(id);
        self.nodes[slot].sequence = if id > 0 { seq.to_vec() } else { dna::revcomp(seq) };
    }

    pub fn set_kmer_cov(&mut self, id: NodeId, cov: u64) {
        let slot = self.slot(id);
        self.nodes[slot].kmer_cov = cov;
    }

    pub fn set_read_start_cov(&mut self, id: NodeId, cov: u64) {
        let slot = self.slot(id);
        self.nodes[slot].read_start_cov = cov;
    }

    // ── 持久化 ─────────────────────────────────────────

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let f = std::fs::File::create(path)?;
        let mut w = BufWriter::new(f);
        bincode::serialize_into(&mut w, self)?;
        Ok(())
    }

    /// 读取图快照；给定 `expected_k` 时校验 k-mer 长度
    pub fn load_from_file(path: &str, expected_k: Option<usize>) -> Result<Self> {
        let f = std::fs::File::open(path)?;
        let graph: Self = bincode::deserialize_from(BufReader::new(f))?;
        if let Some(k) = expected_k {
            if graph.k != k {
                return Err(DbgError::KmerSizeMismatch { expected: k, found: graph.k });
            }
        }
        if graph.nodes.is_empty() {
            return Err(DbgError::EmptyGraph);
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A -> B -> C，B 另有一条弧指向 -D
    fn small_graph() -> DbGraph {
        let mut b = GraphBuilder::new(4);
        let a = b.add_node(b"ACGTAC", 30, 1);
        let bb = b.add_node(b"TACGGT", 20, 1);
        let c = b.add_node(b"GGTCCA", 10, 1);
        let d = b.add_node(b"TTACCA", 5, 0);
        b.add_arc(a, bb, 7);
        b.add_arc(bb, c, 5);
        b.add_arc(bb, -d, 2);
        b.build().unwrap()
    }

    #[test]
    fn negative_view_swaps_and_negates_arcs() {
        let g = small_graph();
        let b = g.node(2);
        assert_eq!(b.num_left_arcs(), 1);
        assert_eq!(b.num_right_arcs(), 2);

        let rb = g.node(-2);
        assert_eq!(rb.num_left_arcs(), 2);
        assert_eq!(rb.num_right_arcs(), 1);
        assert_eq!(rb.right_arcs().next().unwrap().node_id, -1);
        let mut lefts: Vec<NodeId> = rb.left_arcs().map(|a| a.node_id).collect();
        lefts.sort_unstable();
        assert_eq!(lefts, vec![-3, 4]);
        assert_eq!(rb.sequence().as_ref(), b"ACCGTA");
    }

    #[test]
    fn double_negation_is_identity() {
        let g = small_graph();
        for id in g.valid_ids() {
            let a = g.node(id);
            let b = g.node(-(-id));
            assert_eq!(a.sequence(), b.sequence());
            assert_eq!(a.kmer_cov(), b.kmer_cov());
            let la: Vec<Arc> = a.left_arcs().collect();
            let lb: Vec<Arc> = b.left_arcs().collect();
            assert_eq!(la, lb);
        }
    }

    #[test]
    fn delete_and_detach_keep_symmetry() {
        let mut g = small_graph();
        assert!(g.detach_arc(2, -4));
        assert_eq!(g.node(2).num_right_arcs(), 1);
        assert_eq!(g.node(4).num_right_arcs(), 0);
        assert!(!g.detach_arc(2, -4));
        assert!(g.sanity_check().is_ok());
    }

    #[test]
    fn remove_node_clears_neighbours() {
        let mut g = small_graph();
        g.remove_node(2);
        assert!(!g.node(2).is_valid());
        assert_eq!(g.node(1).num_right_arcs(), 0);
        assert_eq!(g.node(3).num_left_arcs(), 0);
        assert_eq!(g.node(4).num_right_arcs(), 0);
        assert_eq!(g.num_valid_nodes(), 3);
        assert!(g.sanity_check().is_ok());
    }

    #[test]
    fn inherit_right_arcs_repoints_neighbours() {
        let mut g = small_graph();
        g.detach_arc(1, 2);
        g.detach_left_arcs(2);
        g.inherit_right_arcs(1, 2);
        let mut rights: Vec<NodeId> = g.node(1).right_arcs().map(|a| a.node_id).collect();
        rights.sort_unstable();
        assert_eq!(rights, vec![-4, 3]);
        assert_eq!(g.node(3).left_arcs().next().unwrap().node_id, 1);
        assert_eq!(g.node(2).num_right_arcs(), 0);
        g.invalidate(2);
        assert!(g.sanity_check().is_ok());
    }

    #[test]
    fn inherit_preserves_arc_coverage() {
        let mut g = small_graph();
        g.detach_arc(1, 2);
        // -1 的右侧即 1 的物理左侧
        g.detach_right_arcs(-1);
        g.inherit_right_arcs(-1, 2);
        let cov: Vec<(NodeId, u32)> = g.node(-1).right_arcs().map(|a| (a.node_id, a.coverage)).collect();
        assert!(cov.contains(&(3, 5)));
        assert!(cov.contains(&(-4, 2)));
        assert_eq!(g.node(3).left_arc(-1).map(|a| a.coverage), Some(5));
        g.invalidate(2);
        assert!(g.sanity_check().is_ok());
    }

    #[test]
    fn set_sequence_on_negative_view_stores_revcomp() {
        let mut g = small_graph();
        g.set_sequence(-3, b"AAAACC");
        assert_eq!(g.node(3).sequence().as_ref(), b"GGTTTT");
    }

    #[test]
    fn snapshot_round_trip() {
        let g = small_graph();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.dbg");
        let p = path.to_str().unwrap();
        g.save_to_file(p).unwrap();

        let h = DbGraph::load_from_file(p, Some(4)).unwrap();
        assert_eq!(h.num_nodes(), g.num_nodes());
        for id in g.valid_ids() {
            assert_eq!(h.node(id).sequence(), g.node(id).sequence());
            assert_eq!(h.node(id).kmer_cov(), g.node(id).kmer_cov());
            let a: Vec<Arc> = g.node(id).right_arcs().collect();
            let b: Vec<Arc> = h.node(id).right_arcs().collect();
            assert_eq!(a, b);
        }

        match DbGraph::load_from_file(p, Some(5)) {
            Err(DbgError::KmerSizeMismatch { expected, found }) => {
                assert_eq!((expected, found), (5, 4));
            }
            other => panic!("unexpected: {:?}", other.map(|g| g.num_nodes())),
        }
    }

    #[test]
    #[should_panic]
    fn zero_id_is_rejected() {
        let g = small_graph();
        let _ = g.node(0);
    }
}
