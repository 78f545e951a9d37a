//! # dbg-repair
//!
//! de Bruijn 组装图的纠错与双端 gap closing。
//!
//! 图中每个节点同时代表一条序列及其反向互补：节点 id 取负即得到反向视图，
//! 左右弧随之互换。本 crate 提供：
//!
//! - **图存储**：带方向的节点 / 弧 arena，弧两端对称维护，支持快照读写
//! - **k-mer 索引**：规范 k-mer → (节点, 位置)，把 read 锚定到图上
//! - **图纠错**：tip 剪除、bubble 消除、流量校正、无分支链合并
//! - **gap closing**：用 read pair 为 tip 对投票，经重叠比对与共识校验后合并
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use dbg_repair::config::Settings;
//! use dbg_repair::correct::Corrector;
//! use dbg_repair::graph::GraphBuilder;
//!
//! let mut builder = GraphBuilder::new(5);
//! let a = builder.add_node(b"ACGTACGGT", 40, 2);
//! let b = builder.add_node(b"CGGTTAC", 30, 1);
//! builder.add_arc(a, b, 5);
//! let mut graph = builder.build().unwrap();
//!
//! let report = Corrector::new(Settings::new(5)).run(&mut graph);
//! println!("{}", report);
//! println!("{}", graph.stats());
//! ```
//!
//! ## 模块说明
//!
//! - [`graph`]：节点 / 弧存储、构建、统计、导出
//! - [`index`]：2-bit k-mer 与 k-mer → NPP 查找表
//! - [`correct`]：纠错 pass 与迭代驱动
//! - [`gapfill`]：tip 证据收集、重叠、图扩展与合并
//! - [`align`]：带状全局比对打分
//! - [`io`]：FASTA / FASTQ 解析
//! - [`util`]：DNA 编码 / 反向互补等工具函数

pub mod align;
pub mod config;
pub mod correct;
pub mod error;
pub mod gapfill;
pub mod graph;
pub mod index;
pub mod io;
pub mod util;

pub use error::{DbgError, Result};
