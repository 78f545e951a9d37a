pub mod fasta;
pub mod fastq;

pub use fasta::{FastaReader, FastaRecord};
pub use fastq::{FastqReader, FastqRecord, PairedFastqReader};
