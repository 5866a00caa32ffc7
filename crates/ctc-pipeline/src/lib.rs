//! # ctc-pipeline
//!
//! Пакетный вход декодера: валидация тензора вероятностей,
//! последовательное декодирование фраз и сборка результата в разреженное
//! представление.

pub mod output;
pub mod pipeline;

pub use output::{DecodeOutput, SparsePath};
pub use pipeline::DecodePipeline;
