//! # ctc-core
//!
//! Базовые типы, алфавит и определения ошибок для CTC-декодера.
//!
//! Этот крейт предоставляет фундаментальные абстракции для всех остальных
//! крейтов в workspace:
//!
//! - [`Alphabet`] — отображение индексов меток в строки и обратно
//! - Конфигурация скоринга и поиска ([`ScorerWeights`], [`DecodeOptions`])
//! - Унифицированная обработка ошибок через [`CtcError`]

pub mod alphabet;
pub mod config;
pub mod error;

pub use alphabet::{Alphabet, Label};
pub use config::{DecodeOptions, ScorerWeights};
pub use error::{CtcError, CtcResult};
