mod common;

use std::fs;

use dbg_repair::config::Settings;
use dbg_repair::correct::Corrector;
use dbg_repair::graph::{DbGraph, GraphBuilder};
use dbg_repair::DbgError;

use common::{kmer_cov, make_genome, substitute};

const K: usize = 15;

/// U -> V -> W 为主干；U -> V' -> W 是只差一个碱基的低覆盖度 bubble；
/// V -> T 是低覆盖度 tip
fn noisy_chain() -> (DbGraph, Vec<u8>) {
    let genome = make_genome(300, 11);
    let mut alt = genome[86..200].to_vec();
    substitute(&mut alt, 54);
    let mut tip = genome[186..200].to_vec();
    tip.extend_from_slice(b"ACGTACGTAC");

    let mut b = GraphBuilder::new(K);
    let u = b.add_node(&genome[0..100], kmer_cov(100, K, 20), 10);
    let v = b.add_node(&genome[86..200], kmer_cov(114, K, 20), 10);
    let w = b.add_node(&genome[186..300], kmer_cov(114, K, 20), 10);
    let v_alt = b.add_node(&alt, kmer_cov(114, K, 1), 1);
    let t = b.add_node(&tip, kmer_cov(24, K, 1), 0);
    b.add_arc(u, v, 20);
    b.add_arc(u, v_alt, 1);
    b.add_arc(v, w, 20);
    b.add_arc(v_alt, w, 1);
    b.add_arc(v, t, 1);
    (b.build().unwrap(), genome)
}

fn settings() -> Settings {
    let mut s = Settings::new(K);
    s.max_marg_length = 150;
    s
}

#[test]
fn correction_collapses_noisy_chain() {
    let (mut g, genome) = noisy_chain();
    assert!(g.sanity_check().is_ok());
    assert_eq!(g.stats().num_tips, 3);

    let report = Corrector::new(settings()).run(&mut g);
    assert_eq!(report.tips_removed, 1);
    assert_eq!(report.bubble_nodes_removed, 1);
    assert_eq!(report.nodes_concatenated, 2);
    assert_eq!(report.rounds, 2);
    assert!(!report.hit_round_limit);

    assert_eq!(g.num_valid_nodes(), 1);
    assert_eq!(g.num_arcs(), 0);
    let contig = g.node(1);
    assert_eq!(contig.sequence().as_ref(), &genome[..]);
    assert_eq!(contig.read_start_cov(), 30);
    assert!(g.sanity_check().is_ok());
}

#[test]
fn flow_correction_handles_branch_beyond_search_depth() {
    let (mut g, genome) = noisy_chain();
    // 默认 max_marg_length = 2k，bubble 搜索到不了 W，由流量校正删除低覆盖度分支
    let report = Corrector::new(Settings::new(K)).run(&mut g);
    assert_eq!(report.bubble_nodes_removed, 0);
    assert_eq!(report.flow_branches_removed, 1);
    assert!(!g.node(4).is_valid());
    assert_eq!(g.num_valid_nodes(), 1);
    assert_eq!(g.node(1).sequence().as_ref(), &genome[..]);
    assert!(g.sanity_check().is_ok());
}

#[test]
fn snapshot_round_trip_after_correction() {
    let (mut g, genome) = noisy_chain();
    Corrector::new(settings()).run(&mut g);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrected.dbg");
    let path = path.to_str().unwrap();
    g.save_to_file(path).unwrap();

    let loaded = DbGraph::load_from_file(path, Some(K)).unwrap();
    assert_eq!(loaded.num_nodes(), g.num_nodes());
    assert_eq!(loaded.num_valid_nodes(), 1);
    assert_eq!(loaded.node(1).sequence().as_ref(), &genome[..]);
    assert!(!loaded.node(2).is_valid());

    let err = DbGraph::load_from_file(path, Some(21)).unwrap_err();
    assert!(matches!(err, DbgError::KmerSizeMismatch { expected: 21, found: 15 }));
}

#[test]
fn export_writes_cytoscape_and_fasta() {
    let (g, _) = noisy_chain();
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("noisy");
    let prefix = prefix.to_str().unwrap();

    assert_eq!(g.write_cytoscape(prefix, &[], 0).unwrap(), 5);
    let arcs = fs::read_to_string(format!("{}.arcs", prefix)).unwrap();
    assert!(arcs.starts_with("Source node\tTarget node\tArc coverage"));
    assert_eq!(arcs.lines().count(), 1 + 5);
    let nodes = fs::read_to_string(format!("{}.nodes", prefix)).unwrap();
    assert_eq!(nodes.lines().count(), 1 + 5);

    // 深度 0：种子 T 与其邻居 V，V 只记录不展开
    assert_eq!(g.write_cytoscape(prefix, &[5], 0).unwrap(), 2);
    // 无效种子不写任何内容
    assert_eq!(g.write_cytoscape(prefix, &[9], 3).unwrap(), 0);

    let mut out = Vec::new();
    assert_eq!(g.write_fasta(&mut out).unwrap(), 5);
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with(">1 "));
    assert_eq!(text.matches('>').count(), 5);
}

#[test]
fn components_follow_arcs_in_both_directions() {
    let (mut g, _) = noisy_chain();
    let comps = g.components();
    assert_eq!(comps.len(), 1);
    assert_eq!(comps[0].nodes, vec![1, 2, 3, 4, 5]);

    g.remove_node(5);
    g.remove_node(2);
    g.remove_node(4);
    // U 与 W 不再相连，单节点不计为连通分量
    assert!(g.components().is_empty());
}
