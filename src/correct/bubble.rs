use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ahash::AHashMap;
use tracing::debug;

use crate::graph::{DbGraph, NodeId};

/// 单个源节点的 Dijkstra 搜索状态
#[derive(Default)]
struct Search {
    dist: AHashMap<NodeId, usize>,
    prev: AHashMap<NodeId, NodeId>,
    /// 到达该节点时经过的源节点首个分支
    branch: AHashMap<NodeId, NodeId>,
}

impl Search {
    fn path_to(&self, src: NodeId, dst: NodeId) -> Vec<NodeId> {
        let mut path = vec![dst];
        let mut cur = dst;
        while cur != src {
            cur = self.prev[&cur];
            path.push(cur);
        }
        path.reverse();
        path
    }
}

impl DbGraph {
    /// 内部节点（去掉首尾）的平均 k-mer 覆盖度；无内部节点时返回 None
    fn path_avg_kmer_cov(&self, path: &[NodeId]) -> Option<f64> {
        if path.len() < 3 {
            return None;
        }
        let (mut cov, mut marg) = (0u64, 0usize);
        for &id in &path[1..path.len() - 1] {
            let node = self.node(id);
            cov += node.kmer_cov();
            marg += node.marginal_length();
        }
        Some(if marg == 0 { 0.0 } else { cov as f64 / marg as f64 })
    }

    fn is_simple_interior(&self, path: &[NodeId]) -> bool {
        path.len() < 3
            || path[1..path.len() - 1].iter().all(|&id| {
                let node = self.node(id);
                node.num_left_arcs() == 1 && node.num_right_arcs() == 1
            })
    }

    /// 比较两条平行路径，删除覆盖度较低且不超过阈值的那条路径的内部节点
    fn handle_parallel_paths(&mut self, path_a: &[NodeId], path_b: &[NodeId], cov_cutoff: f64) -> bool {
        if !self.is_simple_interior(path_a) || !self.is_simple_interior(path_b) {
            return false;
        }
        let mut seen: Vec<u32> = path_a.iter().chain(path_b.iter()).map(|id| id.unsigned_abs()).collect();
        let total = seen.len();
        seen.sort_unstable();
        seen.dedup();
        // 两条路径只允许共享首尾节点
        if seen.len() != total - 2 {
            return false;
        }

        let cov_a = self.path_avg_kmer_cov(path_a).unwrap_or(f64::INFINITY);
        let cov_b = self.path_avg_kmer_cov(path_b).unwrap_or(f64::INFINITY);
        let (weak, weak_cov) = if cov_a <= cov_b { (path_a, cov_a) } else { (path_b, cov_b) };
        if weak_cov > cov_cutoff {
            return false;
        }

        debug!(path = ?weak, cov = weak_cov, "pop bubble");
        for &id in &weak[1..weak.len() - 1] {
            self.remove_node(id);
        }
        true
    }

    fn bubble_from(
        &mut self,
        src: NodeId,
        cov_cutoff: f64,
        max_marg_length: usize,
        max_nodes_visited: usize,
    ) -> bool {
        let mut search = Search::default();
        let mut heap = BinaryHeap::new();
        search.dist.insert(src, 0);
        heap.push(Reverse((0usize, src)));
        let mut visited = 0usize;

        while let Some(Reverse((d, u))) = heap.pop() {
            if search.dist.get(&u).is_some_and(|&best| d > best) {
                continue;
            }
            visited += 1;
            if visited > max_nodes_visited {
                break;
            }
            if d > max_marg_length {
                continue;
            }

            let arcs: Vec<NodeId> = self.node(u).right_arcs().map(|a| a.node_id).collect();
            for v in arcs {
                if v.abs() == src.abs() {
                    continue;
                }
                let nd = d + self.node(v).marginal_length();
                let b = if u == src { v } else { search.branch[&u] };
                match search.dist.get(&v).copied() {
                    None => {
                        search.dist.insert(v, nd);
                        search.prev.insert(v, u);
                        search.branch.insert(v, b);
                        heap.push(Reverse((nd, v)));
                    }
                    Some(_) if search.branch[&v] != b => {
                        let path_a = search.path_to(src, v);
                        let mut path_b = search.path_to(src, u);
                        path_b.push(v);
                        if self.handle_parallel_paths(&path_a, &path_b, cov_cutoff) {
                            return true;
                        }
                    }
                    Some(old) if nd < old => {
                        search.dist.insert(v, nd);
                        search.prev.insert(v, u);
                        heap.push(Reverse((nd, v)));
                    }
                    Some(_) => {}
                }
            }
        }
        false
    }

    /// 从每个有 ≥2 条右弧的节点端出发搜索平行路径并删除低覆盖度的一支。
    /// 返回是否删除了节点。
    pub fn bubble_detection(
        &mut self,
        cov_cutoff: f64,
        max_marg_length: usize,
        max_nodes_visited: usize,
    ) -> bool {
        let ids: Vec<NodeId> = self.valid_ids().collect();
        let mut changed = false;
        for id in ids {
            for src in [id, -id] {
                // 可能已被前面的路径删除
                let node = self.node(src);
                if !node.is_valid() || node.num_right_arcs() < 2 {
                    continue;
                }
                if self.bubble_from(src, cov_cutoff, max_marg_length, max_nodes_visited) {
                    changed = true;
                }
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{DbGraph, GraphBuilder};

    // S -> A -> D, S -> B -> D
    fn bubble(cov_a: u64, cov_b: u64) -> DbGraph {
        let mut b = GraphBuilder::new(3);
        let s = b.add_node(b"GGACG", 60, 0);
        let a = b.add_node(b"CGTAA", cov_a, 0);
        let bb = b.add_node(b"CGCAA", cov_b, 0);
        let d = b.add_node(b"AATTC", 60, 0);
        b.add_arc(s, a, 10);
        b.add_arc(s, bb, 1);
        b.add_arc(a, d, 10);
        b.add_arc(bb, d, 1);
        b.build().unwrap()
    }

    #[test]
    fn pops_low_coverage_branch() {
        let mut g = bubble(60, 6);
        assert!(g.bubble_detection(5.0, 20, 100));
        assert!(g.node(2).is_valid());
        assert!(!g.node(3).is_valid());
        assert_eq!(g.node(1).num_right_arcs(), 1);
        assert_eq!(g.node(4).num_left_arcs(), 1);
        assert!(g.sanity_check().is_ok());

        assert!(!g.bubble_detection(5.0, 20, 100));
    }

    #[test]
    fn keeps_bubble_above_cutoff() {
        let mut g = bubble(60, 30);
        assert!(!g.bubble_detection(5.0, 20, 100));
        assert_eq!(g.num_valid_nodes(), 4);
    }

    #[test]
    fn search_depth_is_bounded() {
        let mut g = bubble(60, 6);
        // 分支节点的 marginal length 为 3，超过深度上限 2 后不再向后扩展
        assert!(!g.bubble_detection(5.0, 2, 100));
        assert!(!g.bubble_detection(5.0, 20, 2));
    }

    #[test]
    fn branching_interior_is_not_removed() {
        let mut b = GraphBuilder::new(3);
        let s = b.add_node(b"GGACG", 60, 0);
        let a = b.add_node(b"CGTAA", 60, 0);
        let bb = b.add_node(b"CGCAA", 3, 0);
        let d = b.add_node(b"AATTC", 60, 0);
        let e = b.add_node(b"AAGGT", 60, 0);
        b.add_arc(s, a, 10);
        b.add_arc(s, bb, 1);
        b.add_arc(a, d, 10);
        b.add_arc(bb, d, 1);
        b.add_arc(bb, e, 1);
        let mut g = b.build().unwrap();
        assert!(!g.bubble_detection(5.0, 20, 100));
        assert!(g.node(bb).is_valid());
    }
}
