use crate::graph::{DbGraph, NodeId};

impl DbGraph {
    /// 若 `a` 唯一的右邻居 `b` 也只有唯一的左邻居 `a`，把 `b` 并入 `a`。
    fn extend_right(&mut self, a: NodeId) -> bool {
        let k = self.kmer_size();
        let na = self.node(a);
        if na.num_right_arcs() != 1 {
            return false;
        }
        let Some(link) = na.right_arcs().next() else {
            return false;
        };
        let b = link.node_id;
        if b.abs() == a.abs() {
            return false;
        }
        let nb = self.node(b);
        if nb.num_left_arcs() != 1 {
            return false;
        }
        if nb.right_arcs().any(|arc| arc.node_id.abs() == a.abs() || arc.node_id.abs() == b.abs()) {
            return false;
        }

        let mut merged = na.sequence().into_owned();
        merged.extend_from_slice(&nb.sequence()[k - 1..]);
        let kmer_cov = na.kmer_cov() + nb.kmer_cov();
        let read_start_cov = na.read_start_cov() + nb.read_start_cov();

        self.clear_right_arcs(a);
        self.clear_left_arcs(b);
        self.inherit_right_arcs(a, b);
        self.set_sequence(a, &merged);
        self.set_kmer_cov(a, kmer_cov);
        self.set_read_start_cov(a, read_start_cov);
        self.invalidate(b);
        true
    }

    /// 合并所有无分支的链。返回是否合并了节点。
    pub fn concatenate_nodes(&mut self) -> bool {
        let ids: Vec<NodeId> = self.valid_ids().collect();
        let before = self.num_valid_nodes();
        for id in ids {
            if !self.node(id).is_valid() {
                continue;
            }
            while self.extend_right(id) {}
            while self.extend_right(-id) {}
        }
        self.num_valid_nodes() < before
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::GraphBuilder;

    #[test]
    fn chain_collapses_into_one_node() {
        let mut b = GraphBuilder::new(4);
        let x = b.add_node(b"AACGTG", 9, 1);
        let y = b.add_node(b"GTGCAT", 12, 2);
        let z = b.add_node(b"CATTTC", 6, 3);
        b.add_arc(x, y, 3);
        b.add_arc(y, z, 3);
        let mut g = b.build().unwrap();
        let marg: usize = [x, y, z].iter().map(|&i| g.node(i).marginal_length()).sum();

        assert!(g.concatenate_nodes());
        assert_eq!(g.num_valid_nodes(), 1);
        let n = g.node(x);
        assert_eq!(n.sequence().as_ref(), b"AACGTGCATTTC");
        assert_eq!(n.marginal_length(), marg);
        assert_eq!(n.kmer_cov(), 27);
        assert_eq!(n.read_start_cov(), 6);
        assert!(!g.node(y).is_valid());
        assert!(!g.node(z).is_valid());
        assert!(g.sanity_check().is_ok());
        assert!(!g.concatenate_nodes());
    }

    #[test]
    fn chain_through_reverse_strand() {
        let mut b = GraphBuilder::new(4);
        let x = b.add_node(b"AACGTG", 9, 0);
        // 以反向互补存储：-y = GTGCAT
        let y = b.add_node(b"ATGCAC", 12, 0);
        let z = b.add_node(b"CATTTC", 6, 0);
        let w = b.add_node(b"TTTCGG", 6, 0);
        b.add_arc(x, -y, 3);
        b.add_arc(-y, z, 3);
        b.add_arc(z, w, 2);
        b.add_arc(-w, -w, 1);
        let mut g = b.build().unwrap();

        assert!(g.concatenate_nodes());
        assert_eq!(g.node(x).sequence().as_ref(), b"AACGTGCATTTC");
        assert!(g.node(w).is_valid());
        assert_eq!(g.node(x).right_arc(w).map(|a| a.coverage), Some(2));
        assert_eq!(g.node(w).left_arc(x).map(|a| a.coverage), Some(2));
        assert!(g.sanity_check().is_ok());
    }

    #[test]
    fn branches_are_not_merged() {
        let mut b = GraphBuilder::new(4);
        let x = b.add_node(b"AACGTG", 9, 0);
        let y = b.add_node(b"GTGCAT", 12, 0);
        let z = b.add_node(b"GTGAAA", 6, 0);
        b.add_arc(x, y, 3);
        b.add_arc(x, z, 3);
        let mut g = b.build().unwrap();
        assert!(!g.concatenate_nodes());
        assert_eq!(g.num_valid_nodes(), 3);
    }
}
