//! 图纠错：tip 剪除、bubble 消除、流量校正与无分支链合并。
//!
//! 各 pass 以 `impl DbGraph` 的方式给出，返回是否修改了图；
//! [`Corrector`] 反复执行全部 pass 直到不再变化。

mod bubble;
mod concat;
mod flow;
mod tips;

use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::config::Settings;
use crate::graph::DbGraph;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CorrectionReport {
    pub rounds: usize,
    pub tips_removed: usize,
    pub bubble_nodes_removed: usize,
    /// 流量校正删除的节点与断开的弧数之和
    pub flow_branches_removed: usize,
    pub nodes_concatenated: usize,
    /// 达到 `max_rounds` 时仍有变化
    pub hit_round_limit: bool,
}

impl fmt::Display for CorrectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rounds={} tips={} bubble_nodes={} flow_branches={} concatenated={}{}",
            self.rounds,
            self.tips_removed,
            self.bubble_nodes_removed,
            self.flow_branches_removed,
            self.nodes_concatenated,
            if self.hit_round_limit { " (round limit reached)" } else { "" }
        )
    }
}

pub struct Corrector {
    settings: Settings,
}

impl Corrector {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn run(&self, graph: &mut DbGraph) -> CorrectionReport {
        let s = &self.settings;
        let mut report = CorrectionReport::default();
        loop {
            if report.rounds == s.max_rounds {
                report.hit_round_limit = true;
                break;
            }
            report.rounds += 1;
            let mut changed = false;

            let before = graph.num_valid_nodes();
            if graph.clip_tips(s.cov_cutoff, s.max_marg_length) {
                changed = true;
                report.tips_removed += before - graph.num_valid_nodes();
            }

            let before = graph.num_valid_nodes();
            if graph.bubble_detection(s.cov_cutoff, s.max_marg_length, s.max_nodes_visited) {
                changed = true;
                report.bubble_nodes_removed += before - graph.num_valid_nodes();
            }

            let branches = graph.remove_spurious_branches(s.cov_cutoff);
            if branches > 0 {
                changed = true;
                report.flow_branches_removed += branches;
            }

            let before = graph.num_valid_nodes();
            if graph.concatenate_nodes() {
                changed = true;
                report.nodes_concatenated += before - graph.num_valid_nodes();
            }

            info!(round = report.rounds, nodes = graph.num_valid_nodes(), "correction round finished");
            if !changed {
                break;
            }
        }
        info!(%report, "graph correction done");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    #[test]
    fn run_reaches_fixpoint() {
        // S -> A -> D 为主干，S -> B -> D 为低覆盖度 bubble，另有一个低覆盖度 tip T
        let mut b = GraphBuilder::new(3);
        let s = b.add_node(b"GGACG", 60, 0);
        let a = b.add_node(b"CGTAA", 60, 0);
        let bb = b.add_node(b"CGCAA", 3, 0);
        let d = b.add_node(b"AATTC", 60, 0);
        let t = b.add_node(b"TCGGA", 3, 0);
        b.add_arc(s, a, 10);
        b.add_arc(s, bb, 1);
        b.add_arc(a, d, 10);
        b.add_arc(bb, d, 1);
        b.add_arc(d, t, 1);
        let mut g = b.build().unwrap();

        let mut settings = Settings::new(3);
        settings.cov_cutoff = 2.0;
        let report = Corrector::new(settings).run(&mut g);

        assert!(!report.hit_round_limit);
        assert_eq!(report.tips_removed, 1);
        assert_eq!(report.bubble_nodes_removed, 1);
        assert_eq!(g.num_valid_nodes(), 1);
        assert_eq!(g.node(s).sequence().as_ref(), b"GGACGTAATTC");
        assert!(g.sanity_check().is_ok());

        // 已在不动点上，再执行各 pass 不应有变化
        assert!(!g.clip_tips(2.0, 6));
        assert!(!g.bubble_detection(2.0, 6, 100));
        assert!(!g.flow_correction(2.0));
        assert!(!g.concatenate_nodes());
    }

    #[test]
    fn round_limit_is_reported() {
        let mut b = GraphBuilder::new(3);
        let x = b.add_node(b"ACGTT", 30, 0);
        let y = b.add_node(b"TTGCA", 30, 0);
        b.add_arc(x, y, 5);
        let mut g = b.build().unwrap();
        let mut settings = Settings::new(3);
        settings.max_rounds = 1;
        let report = Corrector::new(settings).run(&mut g);
        assert_eq!(report.rounds, 1);
        assert_eq!(report.nodes_concatenated, 1);
        assert!(report.hit_round_limit);
    }
}
