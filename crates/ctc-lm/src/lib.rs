//! # ctc-lm
//!
//! Интерфейс n-граммной языковой модели для лучевого поиска и две
//! реализации:
//!
//! - [`ArpaModel`] — backoff-модель, читаемая из текстового ARPA-файла
//! - [`NullLm`] — заглушка, всегда возвращающая 0 (декодирование без LM)
//!
//! Все оценки — log10-вероятности, как в KenLM: декодер не зависит от
//! основания логарифма, вес `lm_weight` поглощает разницу.

pub mod arpa;

use std::collections::HashMap;
use std::fmt::Debug;

pub use arpa::ArpaModel;

/// Индекс слова в словаре языковой модели.
pub type WordIndex = u32;

/// Словарь языковой модели.
///
/// Три зарезервированных слова занимают фиксированные индексы
/// (соглашение KenLM): `<unk>` = 0, `<s>` = 1, `</s>` = 2.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    index: HashMap<String, WordIndex>,
    words: Vec<String>,
}

/// Индекс, возвращаемый для слов вне словаря.
pub const NOT_FOUND: WordIndex = 0;

impl Vocabulary {
    /// Создать словарь, содержащий только зарезервированные слова.
    pub fn new() -> Self {
        let mut v = Self {
            index: HashMap::new(),
            words: Vec::new(),
        };
        v.insert("<unk>");
        v.insert("<s>");
        v.insert("</s>");
        v
    }

    /// Добавить слово; повторная вставка возвращает существующий индекс.
    pub fn insert(&mut self, word: &str) -> WordIndex {
        if let Some(&idx) = self.index.get(word) {
            return idx;
        }
        let idx = self.words.len() as WordIndex;
        self.index.insert(word.to_string(), idx);
        self.words.push(word.to_string());
        idx
    }

    /// Индекс слова; [`NOT_FOUND`] для слов вне словаря.
    pub fn index(&self, word: &str) -> WordIndex {
        self.index.get(word).copied().unwrap_or(NOT_FOUND)
    }

    /// Индекс для неизвестных слов.
    pub fn not_found(&self) -> WordIndex {
        NOT_FOUND
    }

    /// Индекс маркера начала предложения `<s>`.
    pub fn begin_sentence(&self) -> WordIndex {
        1
    }

    /// Индекс маркера конца предложения `</s>`.
    pub fn end_sentence(&self) -> WordIndex {
        2
    }

    /// Строковое представление слова по индексу.
    pub fn word(&self, idx: WordIndex) -> Option<&str> {
        self.words.get(idx as usize).map(|s| s.as_str())
    }

    /// Количество слов, включая зарезервированные.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Словарь без единого обычного слова.
    pub fn is_empty(&self) -> bool {
        self.words.len() <= 3
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

/// Языковая модель, потребляемая декодером.
///
/// Состояние рекурсивно: `full_score` принимает состояние «контекст,
/// достаточный для оценки следующего слова» и возвращает новое.
/// Реализации неизменяемы во время декодирования и могут безопасно
/// разделяться между потоками (`&self`-only API).
pub trait LanguageModel {
    /// Непрозрачное рекурсивное состояние модели.
    type State: Clone + Default + Debug;

    /// Состояние «начало предложения» (контекст `<s>`).
    fn begin_sentence_state(&self) -> Self::State;

    /// Оценить слово в контексте: (log10-вероятность, новое состояние).
    fn full_score(&self, state: &Self::State, word: WordIndex) -> (f32, Self::State);

    /// Словарь модели.
    fn vocabulary(&self) -> &Vocabulary;
}

/// Заглушка: любое слово имеет вероятность 1 (log-оценка 0).
///
/// Используется для декодирования без языковой модели и в тестах.
#[derive(Debug, Default)]
pub struct NullLm {
    vocabulary: Vocabulary,
}

impl NullLm {
    pub fn new() -> Self {
        Self {
            vocabulary: Vocabulary::new(),
        }
    }
}

impl LanguageModel for NullLm {
    type State = ();

    fn begin_sentence_state(&self) -> Self::State {}

    fn full_score(&self, _state: &Self::State, _word: WordIndex) -> (f32, Self::State) {
        (0.0, ())
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}
