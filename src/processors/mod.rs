//! One module per placeholder kind (spec.md §4.1), dispatched from
//! [`crate::recursive::Walker`]. Grounded on the teacher's
//! `src/parser/include/{dependency,resolver}.rs` for the circular-inclusion
//! and depth-limiting bookkeeping, reused via `PreprocessorContext::enter_include`.

pub mod if_;
pub mod include;
pub mod insert;
pub mod nosub;
pub mod reference;
pub mod remove;
pub mod replace;
pub mod sub;
