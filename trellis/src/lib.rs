#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Trellis
//!
//! Trellis is a small engine for hidden Markov models with discrete states and discrete
//! emissions. It samples observations from a model and runs the Forward and Viterbi algorithms
//! over observed symbol sequences.
//!
//! ## Examples
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::{prelude::*, BufReader};
//!
//! use trellis::{split_symbols, Decoder, Model};
//!
//! // Reads `brown.trans` and `brown.emit`.
//! let model = Model::load("brown").unwrap();
//! let decoder = Decoder::new(model).unwrap();
//!
//! let f = BufReader::new(File::open("sentences.obs").unwrap());
//! for line in f.lines() {
//!     let Some(symbols) = split_symbols(&line.unwrap()) else {
//!         continue;
//!     };
//!     let path = decoder.viterbi(&symbols).unwrap();
//!     println!("{}", path.into_observation(symbols).unwrap());
//! }
//! ```
//!
//! Batch evaluation on worker threads requires **crate feature** `multithreading`. For more
//! details, see `MultithreadDecoder`.

mod decoder;
mod forward;
mod generator;
mod lattice;
mod model;
mod observation;
mod table;
mod utils;
mod viterbi;

pub mod errors;

pub use decoder::Decoder;
pub use forward::ForwardResult;
pub use generator::Generator;
pub use lattice::Trellis;
pub use model::{Model, EPSILON, START_MARKER};
pub use observation::Observation;
pub use table::ProbabilityTable;
pub use utils::split_symbols;
pub use viterbi::DecodedPath;

#[cfg(feature = "multithreading")]
pub use decoder::MultithreadDecoder;
