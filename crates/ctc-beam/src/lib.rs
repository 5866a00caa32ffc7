//! # ctc-beam
//!
//! Обобщенный лучевой поиск по выходной решетке CTC-сети.
//!
//! Движок не знает ничего про языковые модели: вся политика скоринга
//! вынесена в trait [`BeamScorer`], так что поверх одного и того же
//! каркаса поиска можно декодировать и с LM, и без нее ([`NullScorer`]).
//!
//! Жизненный цикл: `Idle -> step()* -> top_paths() -> reset() -> Idle`.
//! `step` после `top_paths` без `reset` — нарушенное предусловие.

pub mod scorer;
pub mod search;

pub use scorer::{BeamScorer, NullScorer};
pub use search::{BeamSearch, DecodedPath};
