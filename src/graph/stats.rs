use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use ahash::AHashSet;
use serde::Serialize;

use super::{DbGraph, NodeId};
use crate::error::{DbgError, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub kmer_size: usize,
    pub num_nodes: usize,
    pub num_valid_nodes: usize,
    pub num_arcs: usize,
    pub num_tips: usize,
    pub total_marginal_length: usize,
    pub max_node_len: usize,
    /// 按节点序列长度计算的 N50
    pub n50: usize,
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "k-mer size:            {}", self.kmer_size)?;
        writeln!(f, "nodes (valid/total):   {}/{}", self.num_valid_nodes, self.num_nodes)?;
        writeln!(f, "arcs:                  {}", self.num_arcs)?;
        writeln!(f, "tips:                  {}", self.num_tips)?;
        writeln!(f, "total marginal length: {}", self.total_marginal_length)?;
        writeln!(f, "largest node:          {}", self.max_node_len)?;
        write!(f, "N50:                   {}", self.n50)
    }
}

/// 由 >1 个节点组成的连通分量
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Component {
    /// 物理 id，升序
    pub nodes: Vec<NodeId>,
    pub marginal_length: usize,
}

fn n50(mut lengths: Vec<usize>) -> usize {
    if lengths.is_empty() {
        return 0;
    }
    lengths.sort_unstable_by(|a, b| b.cmp(a));
    let total: usize = lengths.iter().sum();
    let mut acc = 0usize;
    for len in lengths {
        acc += len;
        if acc * 2 >= total {
            return len;
        }
    }
    0
}

impl DbGraph {
    pub fn stats(&self) -> GraphStats {
        let mut lengths = Vec::new();
        let mut total_marg = 0usize;
        let mut tips = 0usize;
        for id in self.valid_ids() {
            let node = self.node(id);
            lengths.push(node.len());
            total_marg += node.marginal_length();
            if node.num_left_arcs() == 0 || node.num_right_arcs() == 0 {
                tips += 1;
            }
        }
        GraphStats {
            kmer_size: self.k,
            num_nodes: self.num_nodes(),
            num_valid_nodes: lengths.len(),
            num_arcs: self.num_arcs(),
            num_tips: tips,
            total_marginal_length: total_marg,
            max_node_len: lengths.iter().copied().max().unwrap_or(0),
            n50: n50(lengths),
        }
    }

    /// 检查弧的对称性与有效性：每条右弧都必须在目标节点上有覆盖度相同的左弧，
    /// 有效节点不能连到失效节点，失效节点不能留有弧。
    pub fn sanity_check(&self) -> Result<()> {
        for slot in 1..=self.num_nodes() as NodeId {
            let node = self.node(slot);
            if !node.is_valid() {
                if node.num_left_arcs() != 0 || node.num_right_arcs() != 0 {
                    return Err(DbgError::Inconsistent(format!("invalid node {} still has arcs", slot)));
                }
                continue;
            }
            if node.len() < self.k {
                return Err(DbgError::Inconsistent(format!("node {} shorter than k", slot)));
            }
            for id in [slot, -slot] {
                for arc in self.node(id).right_arcs() {
                    let target = self.node(arc.node_id);
                    if !target.is_valid() {
                        return Err(DbgError::Inconsistent(format!(
                            "arc {} -> {} points to an invalid node",
                            id, arc.node_id
                        )));
                    }
                    match target.left_arc(id) {
                        Some(back) if back.coverage == arc.coverage => {}
                        Some(back) => {
                            return Err(DbgError::Inconsistent(format!(
                                "arc {} -> {} coverage {} differs from reverse entry {}",
                                id, arc.node_id, arc.coverage, back.coverage
                            )));
                        }
                        None => {
                            return Err(DbgError::Inconsistent(format!(
                                "arc {} -> {} has no reverse entry",
                                id, arc.node_id
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// 无向遍历所有有效节点，按深度优先队列扩展，返回节点数 > 1 的连通分量
    pub fn components(&self) -> Vec<Component> {
        let mut handled: AHashSet<NodeId> = AHashSet::new();
        let mut out = Vec::new();
        for src in self.valid_ids() {
            if handled.contains(&src) {
                continue;
            }
            let mut members = Vec::new();
            let mut marg = 0usize;
            let mut queue = BinaryHeap::new();
            queue.push(Reverse((0usize, src)));
            while let Some(Reverse((depth, id))) = queue.pop() {
                let phys = id.abs();
                if !handled.insert(phys) {
                    continue;
                }
                let node = self.node(id);
                members.push(phys);
                marg += node.marginal_length();
                let next = depth + node.marginal_length();
                for arc in node.right_arcs().chain(node.left_arcs()) {
                    if self.node(arc.node_id).is_valid() && !handled.contains(&arc.node_id.abs()) {
                        queue.push(Reverse((next, arc.node_id)));
                    }
                }
            }
            if members.len() > 1 {
                members.sort_unstable();
                out.push(Component { nodes: members, marginal_length: marg });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    #[test]
    fn n50_of_lengths() {
        assert_eq!(n50(vec![]), 0);
        assert_eq!(n50(vec![10]), 10);
        assert_eq!(n50(vec![2, 3, 4, 5, 6]), 5);
    }

    #[test]
    fn stats_and_components() {
        let mut b = GraphBuilder::new(3);
        let a = b.add_node(b"ACGTT", 6, 0);
        let c = b.add_node(b"TTGCA", 6, 0);
        let d = b.add_node(b"GGGGG", 3, 0);
        let e = b.add_node(b"CCAAT", 3, 0);
        b.add_arc(a, c, 2);
        b.add_arc(-e, -d, 1);
        let g = b.build().unwrap();

        let s = g.stats();
        assert_eq!(s.num_valid_nodes, 4);
        assert_eq!(s.num_arcs, 2);
        assert_eq!(s.num_tips, 4);
        assert_eq!(s.total_marginal_length, 12);
        assert!(s.to_string().contains("N50"));

        let comps = g.components();
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0].nodes, vec![a, c]);
        assert_eq!(comps[1].nodes, vec![d, e]);
        assert_eq!(comps[0].marginal_length, 6);
    }

    #[test]
    fn sanity_check_reports_one_sided_arc() {
        let mut b = GraphBuilder::new(3);
        let a = b.add_node(b"ACGTT", 6, 0);
        let c = b.add_node(b"TTGCA", 6, 0);
        b.add_arc(a, c, 2);
        let mut g = b.build().unwrap();
        assert!(g.sanity_check().is_ok());
        g.delete_left_arc(c, a);
        assert!(matches!(g.sanity_check(), Err(DbgError::Inconsistent(_))));
    }
}
