use tracing::debug;

use crate::graph::{DbGraph, NodeId};

impl DbGraph {
    /// 删除一侧没有弧、平均覆盖度不超过 `cov_cutoff` 且 marginal length 不超过
    /// `max_marg_length` 的节点。返回是否删除了节点。
    pub fn clip_tips(&mut self, cov_cutoff: f64, max_marg_length: usize) -> bool {
        let ids: Vec<NodeId> = self.valid_ids().collect();
        let mut removed = 0usize;
        for id in ids {
            let node = self.node(id);
            if !node.is_valid() {
                continue;
            }
            if node.num_left_arcs() != 0 && node.num_right_arcs() != 0 {
                continue;
            }
            if node.avg_kmer_cov() > cov_cutoff || node.marginal_length() > max_marg_length {
                continue;
            }
            debug!(node = id, cov = node.avg_kmer_cov(), len = node.len(), "clip tip");
            self.remove_node(id);
            removed += 1;
        }
        removed > 0
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::GraphBuilder;

    #[test]
    fn clips_only_weak_short_tips() {
        let mut b = GraphBuilder::new(3);
        let a = b.add_node(b"ACGTT", 60, 0);
        let c = b.add_node(b"TTGCA", 60, 0);
        // 低覆盖度 tip
        let t = b.add_node(b"TTAAC", 3, 0);
        // 高覆盖度 tip
        let h = b.add_node(b"TTCCG", 90, 0);
        b.add_arc(a, c, 10);
        b.add_arc(a, t, 1);
        b.add_arc(a, h, 8);
        let mut g = b.build().unwrap();

        assert!(g.clip_tips(2.0, 10));
        assert!(!g.node(t).is_valid());
        assert!(g.node(h).is_valid());
        assert!(g.node(a).is_valid());
        assert_eq!(g.node(a).num_right_arcs(), 2);
        assert!(g.sanity_check().is_ok());

        assert!(!g.clip_tips(2.0, 10));
    }

    #[test]
    fn long_tips_are_kept() {
        let mut b = GraphBuilder::new(3);
        let a = b.add_node(b"ACGTTACGGAT", 1, 0);
        let mut g = b.build().unwrap();
        assert!(!g.clip_tips(5.0, 4));
        assert!(g.node(a).is_valid());
        assert!(g.clip_tips(5.0, 9));
        assert!(!g.node(a).is_valid());
    }
}
