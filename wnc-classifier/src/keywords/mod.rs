//! Keyword Classifier
//!
//! Weighted lexical scoring over titles. Used as the fallback when no
//! external source knows a work, and to split coarse platform labels during
//! refinement.

mod classifier;
pub mod table;
pub mod title;

pub use classifier::{GenreScore, KeywordClassifier, KeywordVerdict};
pub use table::{CompoundPattern, KeywordTable};
pub use title::{analyze_title, TitleKeywordHit};
