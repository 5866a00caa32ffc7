//! Типы ошибок CTC-декодера.

use thiserror::Error;

/// Основной тип ошибки для операций декодирования.
#[derive(Error, Debug)]
pub enum CtcError {
    /// Ошибки формата файла алфавита.
    #[error("Alphabet error: {0}")]
    Alphabet(String),

    /// Ошибки загрузки/формата языковой модели.
    #[error("Language model error: {0}")]
    LanguageModel(String),

    /// Ошибки формата файла префиксного дерева.
    #[error("Trie format error: {0}")]
    TrieFormat(String),

    /// Некорректные аргументы вызова (форма тензора, размерности).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Нарушенное предусловие (sequence_length > max_time,
    /// недостаточно лучей для top_paths, вызов step после top_paths).
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// I/O ошибки.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибки тензорных операций candle.
    #[error("Tensor error: {0}")]
    Candle(#[from] candle_core::Error),
}

/// Alias результата для операций декодирования.
pub type CtcResult<T> = Result<T, CtcError>;
