use tracing::debug;

use crate::graph::{DbGraph, NodeId};

impl DbGraph {
    /// 在有多个右邻居的节点端上，若覆盖度最低的邻居不超过 `cov_cutoff`，
    /// 且其余邻居的覆盖度之和已与该节点的覆盖度相差不超过 `cov_cutoff`，
    /// 则视该分支为错误并删除。返回是否修改了图。
    pub fn flow_correction(&mut self, cov_cutoff: f64) -> bool {
        self.remove_spurious_branches(cov_cutoff) > 0
    }

    /// 同 `flow_correction`，返回删除的分支数
    pub(crate) fn remove_spurious_branches(&mut self, cov_cutoff: f64) -> usize {
        let ids: Vec<NodeId> = self.valid_ids().collect();
        let mut removed = 0usize;
        for id in ids {
            for oid in [id, -id] {
                if let Some(spurious) = self.spurious_branch(oid, cov_cutoff) {
                    debug!(node = oid, branch = spurious, "flow correction");
                    if self.node(spurious).num_left_arcs() == 1 {
                        self.remove_node(spurious);
                    } else {
                        self.detach_arc(oid, spurious);
                    }
                    removed += 1;
                }
            }
        }
        removed
    }

    fn spurious_branch(&self, oid: NodeId, cov_cutoff: f64) -> Option<NodeId> {
        let node = self.node(oid);
        if !node.is_valid() || node.num_right_arcs() < 2 {
            return None;
        }
        let mut neighbours: Vec<(NodeId, f64)> = Vec::with_capacity(node.num_right_arcs());
        for arc in node.right_arcs() {
            if arc.node_id.abs() == oid.abs() {
                return None;
            }
            neighbours.push((arc.node_id, self.node(arc.node_id).avg_kmer_cov()));
        }

        let (weak_idx, &(weak_id, weak_cov)) = neighbours
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.1.total_cmp(&b.1))?;
        if weak_cov > cov_cutoff {
            return None;
        }
        let remaining: f64 = neighbours
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != weak_idx)
            .map(|(_, n)| n.1)
            .sum();
        if (node.avg_kmer_cov() - remaining).abs() > cov_cutoff {
            return None;
        }
        Some(weak_id)
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::GraphBuilder;

    #[test]
    fn removes_branch_not_needed_for_flow() {
        let mut b = GraphBuilder::new(3);
        let x = b.add_node(b"ACGTT", 60, 0);
        let y = b.add_node(b"TTGCA", 60, 0);
        let z = b.add_node(b"TTAAC", 6, 0);
        b.add_arc(x, y, 18);
        b.add_arc(x, z, 2);
        let mut g = b.build().unwrap();

        assert!(g.flow_correction(5.0));
        assert!(!g.node(z).is_valid());
        assert_eq!(g.node(x).num_right_arcs(), 1);
        assert!(g.sanity_check().is_ok());
        assert!(!g.flow_correction(5.0));
    }

    #[test]
    fn keeps_branch_when_flow_is_not_conserved() {
        let mut b = GraphBuilder::new(3);
        let x = b.add_node(b"ACGTT", 60, 0);
        // Y 覆盖度明显低于 X，去掉 Z 后流量不守恒
        let y = b.add_node(b"TTGCA", 30, 0);
        let z = b.add_node(b"TTAAC", 6, 0);
        b.add_arc(x, y, 18);
        b.add_arc(x, z, 2);
        let mut g = b.build().unwrap();
        assert!(!g.flow_correction(5.0));
        assert!(g.node(z).is_valid());
    }

    #[test]
    fn detaches_arc_when_branch_has_other_support() {
        let mut b = GraphBuilder::new(3);
        let x = b.add_node(b"ACGTT", 60, 0);
        let y = b.add_node(b"TTGCA", 60, 0);
        let z = b.add_node(b"TTAAC", 6, 0);
        let w = b.add_node(b"GGCTT", 6, 0);
        b.add_arc(x, y, 18);
        b.add_arc(x, z, 2);
        b.add_arc(w, z, 2);
        let mut g = b.build().unwrap();

        assert!(g.flow_correction(5.0));
        assert!(g.node(z).is_valid());
        assert!(g.node(x).right_arc(z).is_none());
        assert_eq!(g.node(z).num_left_arcs(), 1);
        assert!(g.sanity_check().is_ok());
    }
}
