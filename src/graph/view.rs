use std::borrow::Cow;

use super::{Arc, DbGraph, Node, NodeId, Side};
use crate::util::dna;

/// 节点的方向视图：负 id 读取反向互补序列，左右弧互换且端点取反。
#[derive(Clone, Copy)]
pub struct NodeView<'a> {
    graph: &'a DbGraph,
    node: &'a Node,
    id: NodeId,
}

impl<'a> NodeView<'a> {
    pub(super) fn new(graph: &'a DbGraph, node: &'a Node, id: NodeId) -> Self {
        Self { graph, node, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_valid(&self) -> bool {
        self.node.valid
    }

    pub fn len(&self) -> usize {
        self.node.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.sequence.is_empty()
    }

    /// k-mer 个数：`len - k + 1`
    pub fn marginal_length(&self) -> usize {
        (self.len() + 1).saturating_sub(self.graph.k)
    }

    pub fn sequence(&self) -> Cow<'a, [u8]> {
        if self.id > 0 {
            Cow::Borrowed(&self.node.sequence)
        } else {
            Cow::Owned(dna::revcomp(&self.node.sequence))
        }
    }

    /// 视图坐标下的单个碱基
    pub fn base(&self, pos: usize) -> u8 {
        if self.id > 0 {
            self.node.sequence[pos]
        } else {
            dna::complement(self.node.sequence[self.len() - 1 - pos])
        }
    }

    /// 视图坐标下的子串 `[start, start + len)`，越界部分截断
    pub fn substr(&self, start: usize, len: usize) -> Vec<u8> {
        let n = self.len();
        let start = start.min(n);
        let end = (start + len).min(n);
        if self.id > 0 {
            self.node.sequence[start..end].to_vec()
        } else {
            dna::revcomp(&self.node.sequence[n - end..n - start])
        }
    }

    pub fn kmer_cov(&self) -> u64 {
        self.node.kmer_cov
    }

    pub fn read_start_cov(&self) -> u64 {
        self.node.read_start_cov
    }

    pub fn avg_kmer_cov(&self) -> f64 {
        let m = self.marginal_length();
        if m == 0 {
            0.0
        } else {
            self.node.kmer_cov as f64 / m as f64
        }
    }

    pub fn num_left_arcs(&self) -> usize {
        self.graph.arc_slice(self.id, Side::Left).len()
    }

    pub fn num_right_arcs(&self) -> usize {
        self.graph.arc_slice(self.id, Side::Right).len()
    }

    pub fn left_arcs(&self) -> ArcIter<'a> {
        ArcIter::new(self.graph.arc_slice(self.id, Side::Left), self.id < 0)
    }

    pub fn right_arcs(&self) -> ArcIter<'a> {
        ArcIter::new(self.graph.arc_slice(self.id, Side::Right), self.id < 0)
    }

    pub fn left_arc(&self, target: NodeId) -> Option<Arc> {
        self.left_arcs().find(|a| a.node_id == target)
    }

    pub fn right_arc(&self, target: NodeId) -> Option<Arc> {
        self.right_arcs().find(|a| a.node_id == target)
    }
}

/// 按视图方向遍历弧；负向视图逆序遍历物理区间并对端点取反
pub struct ArcIter<'a> {
    inner: std::slice::Iter<'a, Arc>,
    reversed: bool,
}

impl<'a> ArcIter<'a> {
    fn new(slice: &'a [Arc], reversed: bool) -> Self {
        Self { inner: slice.iter(), reversed }
    }
}

impl Iterator for ArcIter<'_> {
    type Item = Arc;

    fn next(&mut self) -> Option<Arc> {
        if self.reversed {
            let a = self.inner.next_back()?;
            Some(Arc { node_id: -a.node_id, coverage: a.coverage })
        } else {
            self.inner.next().copied()
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ArcIter<'_> {}
