use crate::align::AlignmentScorer;
use crate::graph::{DbGraph, NodeId};
use crate::util::dna;

/// 从 `start` 向右逐层展开路径，直到序列长度达到 `target_len`。
///
/// 每条路径以 `start` 末尾的 k-1 个碱基开头，之后依次拼接各节点去掉重叠后的部分；
/// 未达到目标长度就走到尽头的路径被丢弃。展开的路径总数不超过 `max_paths`。
pub(crate) fn expand_paths(
    graph: &DbGraph,
    start: NodeId,
    target_len: usize,
    max_paths: usize,
) -> Vec<Vec<u8>> {
    let k = graph.kmer_size();
    let node = graph.node(start);
    let seed = node.substr(node.len() + 1 - k, k - 1);

    let mut done: Vec<Vec<u8>> = Vec::new();
    let mut frontier: Vec<(Vec<u8>, NodeId)> = vec![(seed, start)];
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for (seq, last) in frontier {
            if seq.len() >= target_len {
                done.push(seq);
                continue;
            }
            for arc in graph.node(last).right_arcs() {
                let n = graph.node(arc.node_id);
                let mut s = seq.clone();
                s.extend_from_slice(&n.substr(k - 1, n.marginal_length()));
                next.push((s, arc.node_id));
            }
        }
        let room = max_paths.saturating_sub(done.len());
        if next.len() > room {
            next.truncate(room);
        }
        frontier = next;
    }
    done
}

fn best_path<S>(scorer: &mut S, target: &[u8], candidates: impl Iterator<Item = Vec<u8>>) -> Vec<u8>
where
    S: AlignmentScorer,
{
    let mut best_score = -(target.len() as i32 * 2);
    let mut best = Vec::new();
    for part in candidates {
        let score = scorer.align(target, &part);
        if score > best_score {
            best_score = score;
            best = part;
        }
    }
    best
}

/// 用 `node` 右侧的图路径补齐 `tail`，返回与 `tail` 比对得分最高的路径片段
pub fn expand_right<S: AlignmentScorer>(
    graph: &DbGraph,
    scorer: &mut S,
    node: NodeId,
    tail: &[u8],
    max_paths: usize,
) -> Vec<u8> {
    if tail.is_empty() {
        return Vec::new();
    }
    let skip = graph.kmer_size() - 1;
    let paths = expand_paths(graph, node, tail.len() + skip, max_paths);
    best_path(
        scorer,
        tail,
        paths.into_iter().map(|p| {
            let end = (skip + tail.len()).min(p.len());
            p[skip..end].to_vec()
        }),
    )
}

/// 用 `node` 左侧的图路径补齐 `head`：在 `-node` 上向右展开，结果取反向互补
pub fn expand_left<S: AlignmentScorer>(
    graph: &DbGraph,
    scorer: &mut S,
    node: NodeId,
    head: &[u8],
    max_paths: usize,
) -> Vec<u8> {
    if head.is_empty() {
        return Vec::new();
    }
    let skip = graph.kmer_size() - 1;
    let paths = expand_paths(graph, -node, head.len() + skip, max_paths);
    best_path(
        scorer,
        head,
        paths.into_iter().map(|p| {
            let end = (skip + head.len()).min(p.len());
            let mut part = p[skip..end].to_vec();
            dna::revcomp_in_place(&mut part);
            part
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::BandedAligner;
    use crate::graph::GraphBuilder;

    // X -> Y1 / X -> Y2，Y1 与 Y2 只在末端不同
    fn fork() -> DbGraph {
        let mut b = GraphBuilder::new(4);
        let x = b.add_node(b"GGATCCA", 10, 0);
        let y1 = b.add_node(b"CCATTGACG", 10, 0);
        let y2 = b.add_node(b"CCAGCCTTT", 10, 0);
        b.add_arc(x, y1, 1);
        b.add_arc(x, y2, 1);
        b.build().unwrap()
    }

    #[test]
    fn paths_reach_target_length() {
        let g = fork();
        let paths = expand_paths(&g, 1, 8, 16);
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&b"CCATTGACG".to_vec()));
        assert!(paths.contains(&b"CCAGCCTTT".to_vec()));
        assert!(expand_paths(&g, 1, 8, 1).len() <= 1);
        // 无右邻居且长度不足的路径被丢弃
        assert!(expand_paths(&g, 2, 20, 16).is_empty());
    }

    #[test]
    fn right_expansion_picks_best_scoring_path() {
        let g = fork();
        let mut al = BandedAligner::default();
        let best = expand_right(&g, &mut al, 1, b"GCCTTA", 16);
        assert_eq!(best, b"GCCTTT");
        assert!(expand_right(&g, &mut al, 1, b"", 16).is_empty());
    }

    #[test]
    fn left_expansion_reads_reverse_strand() {
        let g = fork();
        let mut al = BandedAligner::default();
        // Y1 的左邻居是 X，实际在 -Y1 上向右展开
        let best = expand_left(&g, &mut al, 2, b"GGTT", 16);
        assert_eq!(best, b"GGAT");
        assert_eq!(expand_left(&g, &mut al, 2, b"GAA", 16), b"GAT");
        // X 左侧没有邻居
        assert!(expand_left(&g, &mut al, 1, b"ACGT", 16).is_empty());
    }
}
