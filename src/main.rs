use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use dbg_repair::config::Settings;
use dbg_repair::correct::Corrector;
use dbg_repair::gapfill::GapCloser;
use dbg_repair::graph::{DbGraph, GraphBuilder, GraphMeta};
use dbg_repair::io::PairedFastqReader;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(
    name = "dbg-repair",
    author,
    version,
    about = "De Bruijn graph correction and paired-end gap closing",
    arg_required_else_help = true
)]
struct Cli {
    /// 输出 debug 级别日志
    #[arg(short, long, global = true)]
    verbose: bool,
    /// k-mer 表构建使用的线程数（0 表示全部核心）
    #[arg(short = 't', long = "threads", global = true, default_value_t = 0)]
    threads: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a graph snapshot from node sequences (FASTA) and arcs
    Build {
        /// Node FASTA; `KC:i:` / `RC:i:` tags give coverages
        nodes: String,
        #[arg(short = 'k', long = "kmer-size")]
        kmer_size: usize,
        /// Arc table (`from to coverage` per line)
        #[arg(long)]
        arcs: Option<String>,
        /// Infer arcs from (k-1)-base overlaps
        #[arg(long)]
        infer_arcs: bool,
        /// Output snapshot path
        #[arg(short, long, default_value = "graph.dbg")]
        output: String,
    },
    /// Clip tips, pop bubbles, remove spurious branches and concatenate chains
    Correct {
        graph: String,
        #[command(flatten)]
        opts: CorrectOpts,
        #[arg(short, long)]
        output: String,
    },
    /// Join tips supported by interleaved paired-end reads
    CloseGaps {
        graph: String,
        /// Interleaved paired-end FASTQ
        reads: String,
        #[command(flatten)]
        opts: GapOpts,
        #[arg(short, long)]
        output: String,
    },
    /// Write Cytoscape tables and optionally node FASTA
    Export {
        graph: String,
        /// Output prefix for `.arcs` / `.nodes`
        #[arg(short, long, default_value = "graph")]
        output: String,
        /// Seed nodes (comma separated, signed); whole graph when omitted
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        seeds: Vec<i32>,
        #[arg(long, default_value_t = 5)]
        depth: usize,
        /// Also write valid nodes as FASTA
        #[arg(long)]
        fasta: Option<String>,
    },
    /// Print graph statistics
    Stats {
        graph: String,
        /// Also list connected components
        #[arg(long)]
        components: bool,
        /// Run the arc symmetry check
        #[arg(long)]
        check: bool,
    },
}

#[derive(Args, Debug)]
struct CorrectOpts {
    #[arg(long = "cov-cutoff", default_value_t = 2.0)]
    cov_cutoff: f64,
    /// Defaults to 2k
    #[arg(long = "max-marg-length")]
    max_marg_length: Option<usize>,
    #[arg(long = "max-nodes-visited", default_value_t = 100)]
    max_nodes_visited: usize,
    #[arg(long = "max-rounds", default_value_t = 10)]
    max_rounds: usize,
}

#[derive(Args, Debug)]
struct GapOpts {
    /// Defaults to k + 20
    #[arg(long = "max-search-size")]
    max_search_size: Option<usize>,
    #[arg(long = "min-pairs", default_value_t = 10)]
    min_numb_of_pairs: u32,
    #[arg(long = "min-overlap", default_value_t = 15)]
    min_overlap_size: usize,
    #[arg(long = "min-sim", default_value_t = 50)]
    min_sim: i32,
    #[arg(long = "min-exact-match", default_value_t = 7)]
    min_exact_match_size: usize,
    #[arg(long = "max-paths", default_value_t = 1024)]
    max_bfs_paths: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .init();

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("cannot configure the thread pool")?;
    }

    match cli.command {
        Commands::Build { nodes, kmer_size, arcs, infer_arcs, output } => {
            run_build(&nodes, kmer_size, arcs.as_deref(), infer_arcs, &output)
        }
        Commands::Correct { graph, opts, output } => run_correct(&graph, &opts, &output),
        Commands::CloseGaps { graph, reads, opts, output } => run_close_gaps(&graph, &reads, &opts, &output),
        Commands::Export { graph, output, seeds, depth, fasta } => {
            run_export(&graph, &output, &seeds, depth, fasta.as_deref())
        }
        Commands::Stats { graph, components, check } => run_stats(&graph, components, check),
    }
}

fn load_graph(path: &str) -> Result<DbGraph> {
    DbGraph::load_from_file(path, None).with_context(|| format!("cannot load graph snapshot '{}'", path))
}

fn save_graph(graph: &DbGraph, path: &str) -> Result<()> {
    graph.save_to_file(path).with_context(|| format!("cannot write graph snapshot to '{}'", path))?;
    println!("graph saved: {}", path);
    Ok(())
}

fn run_build(
    nodes: &str,
    kmer_size: usize,
    arcs: Option<&str>,
    infer_arcs: bool,
    output: &str,
) -> Result<()> {
    Settings::new(kmer_size).validate()?;
    let meta = GraphMeta {
        source: Some(nodes.to_string()),
        build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
        build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
    };
    let mut builder = GraphBuilder::new(kmer_size).with_meta(meta);

    let fh = File::open(nodes).with_context(|| format!("cannot open node FASTA '{}'", nodes))?;
    let n = builder.read_fasta(BufReader::new(fh))?;
    info!(nodes = n, "node sequences read");

    if let Some(path) = arcs {
        let fh = File::open(path).with_context(|| format!("cannot open arc table '{}'", path))?;
        let added = builder.read_arcs(BufReader::new(fh))?;
        info!(arcs = added, "arcs read");
    }
    if infer_arcs {
        let added = builder.infer_arcs();
        info!(arcs = added, "arcs inferred from overlaps");
    }

    let graph = builder.build().with_context(|| format!("cannot build graph from '{}'", nodes))?;
    println!("{}", graph.stats());
    save_graph(&graph, output)
}

fn run_correct(path: &str, opts: &CorrectOpts, output: &str) -> Result<()> {
    let mut graph = load_graph(path)?;
    let mut settings = Settings::new(graph.kmer_size());
    settings.cov_cutoff = opts.cov_cutoff;
    if let Some(m) = opts.max_marg_length {
        settings.max_marg_length = m;
    }
    settings.max_nodes_visited = opts.max_nodes_visited;
    settings.max_rounds = opts.max_rounds;
    settings.validate()?;

    let report = Corrector::new(settings).run(&mut graph);
    println!("correction: {}", report);
    println!("{}", graph.stats());
    save_graph(&graph, output)
}

fn run_close_gaps(path: &str, reads: &str, opts: &GapOpts, output: &str) -> Result<()> {
    let mut graph = load_graph(path)?;
    let mut settings = Settings::new(graph.kmer_size());
    let gap = &mut settings.gap;
    if let Some(m) = opts.max_search_size {
        gap.max_search_size = m;
    }
    gap.min_numb_of_pairs = opts.min_numb_of_pairs;
    gap.min_overlap_size = opts.min_overlap_size;
    gap.min_sim = opts.min_sim;
    gap.min_exact_match_size = opts.min_exact_match_size;
    gap.max_bfs_paths = opts.max_bfs_paths;
    settings.validate()?;

    let fh = File::open(reads).with_context(|| format!("cannot open reads '{}'", reads))?;
    let mut reader = PairedFastqReader::new(BufReader::new(fh));
    let mut closer = GapCloser::with_default_scorer(settings.gap);
    let report = closer
        .close_gaps(&mut graph, &mut reader)
        .with_context(|| format!("gap closing failed while reading '{}'", reads))?;
    println!("gap closing: {}", report);
    println!("{}", graph.stats());
    save_graph(&graph, output)
}

fn run_export(path: &str, prefix: &str, seeds: &[i32], depth: usize, fasta: Option<&str>) -> Result<()> {
    let graph = load_graph(path)?;
    let n = graph
        .write_cytoscape(prefix, seeds, depth)
        .with_context(|| format!("cannot write cytoscape files with prefix '{}'", prefix))?;
    println!("cytoscape nodes written: {} ({}.arcs, {}.nodes)", n, prefix, prefix);

    if let Some(fasta_path) = fasta {
        let fh = File::create(fasta_path).with_context(|| format!("cannot create '{}'", fasta_path))?;
        let mut out = BufWriter::new(fh);
        let records = graph.write_fasta(&mut out)?;
        out.flush()?;
        println!("FASTA records written: {} ({})", records, fasta_path);
    }
    Ok(())
}

fn run_stats(path: &str, components: bool, check: bool) -> Result<()> {
    let graph = load_graph(path)?;
    let meta = graph.meta();
    if let Some(src) = &meta.source {
        println!("source:                {}", src);
    }
    if let Some(ts) = &meta.build_timestamp {
        println!("built:                 {}", ts);
    }
    println!("{}", graph.stats());

    if components {
        let comps = graph.components();
        println!("components:            {}", comps.len());
        for (i, c) in comps.iter().enumerate() {
            println!("  #{}\tnodes={}\tmarginal_length={}", i + 1, c.nodes.len(), c.marginal_length);
        }
    }
    if check {
        graph.sanity_check().context("graph failed the consistency check")?;
        println!("consistency check passed");
    }
    Ok(())
}
