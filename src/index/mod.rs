pub mod kmer;
pub mod npp;

pub use kmer::{Kmer, KmerIter};
pub use npp::{KmerNppTable, NodePosPair};
