//! Конфигурационные структуры декодера.
//!
//! Все веса фиксируются на время сессии декодирования: структуры
//! передаются по значению при конструировании и дальше не мутируются.

use serde::{Deserialize, Serialize};

/// Веса скоринга, объединяющего акустическую модель, языковую модель
/// и префиксное дерево.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScorerWeights {
    /// alpha: вес языковой модели относительно акустической.
    pub lm_weight: f32,

    /// beta: бонус/штраф за каждое завершенное слово.
    pub word_count_weight: f32,

    /// beta': дополнительный бонус за слово, найденное в словаре LM.
    pub valid_word_count_weight: f32,

    /// Оценка недописанного слова, чей префикс отсутствует в словаре
    /// (log10-вероятность, большое отрицательное число).
    pub oov_score: f32,
}

impl Default for ScorerWeights {
    fn default() -> Self {
        Self {
            lm_weight: 0.75,
            word_count_weight: 1.85,
            valid_word_count_weight: 1.0,
            oov_score: -10.0,
        }
    }
}

/// Параметры лучевого поиска.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Ширина луча (количество выживающих гипотез на каждом шаге).
    pub beam_width: usize,

    /// Сколько лучших путей возвращать. Должно быть <= beam_width.
    pub top_paths: usize,

    /// Склеивать ли подряд идущие одинаковые метки без blank между ними.
    pub merge_repeated: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            beam_width: 100,
            top_paths: 1,
            merge_repeated: true,
        }
    }
}
