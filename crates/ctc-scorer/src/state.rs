//! Состояние одного луча.

use ctc_trie::NodeId;

/// Изменяемая запись, сопровождающая каждую гипотезу лучевого поиска.
///
/// Обычное значение: расширение луча копирует родителя целиком и
/// мутирует копию. Единственное поле переменного размера — строка
/// недописанного слова, остальное копируется дешево.
#[derive(Debug, Clone)]
pub struct LmBeamState<S> {
    /// Текущая суммарная LM-оценка гипотезы, по которой идет ранжирование.
    pub score: f32,

    /// Накопленная оценка языковой модели (только завершенные слова
    /// и бонусы). На границе слова совпадает со `score`; внутри слова
    /// `score` убегает вперед на оценку префикса.
    pub lm_score: f32,

    /// Вклад последнего расширения; движок потребляет его через
    /// `state_expansion_score` / `state_end_expansion_score`.
    pub delta_score: f32,

    /// Символы, выданные с последней границы слова и еще не оцененные
    /// языковой моделью.
    pub incomplete_word: String,

    /// Докуда недописанное слово совпадает с известным префиксом
    /// словаря; `None` — префикс уже вне словаря. Только чтение,
    /// жизнь дерева не продлевает.
    pub trie_node: Option<NodeId>,

    /// Количество завершенных слов (для нормализации по длине).
    pub num_words: u32,

    /// Рекурсивное состояние языковой модели.
    pub model_state: S,
}

impl<S: Default> Default for LmBeamState<S> {
    fn default() -> Self {
        Self {
            score: 0.0,
            lm_score: 0.0,
            delta_score: 0.0,
            incomplete_word: String::new(),
            trie_node: None,
            num_words: 0,
            model_state: S::default(),
        }
    }
}
