//! Интерфейс политики скоринга лучей.

use ctc_core::Label;

/// Политика скоринга, подключаемая к [`crate::BeamSearch`].
///
/// Движок вызывает методы в таком порядке:
/// 1. `initialize_state` — один раз на корневое состояние;
/// 2. `expand_state` — при каждом расширении луча новой меткой
///    (не более одного раза на пару (родитель, метка) за шаг);
/// 3. `state_expansion_score` — сразу после `expand_state`, дешевое
///    чтение закэшированной дельты;
/// 4. `expand_state_end` — один раз на выживший луч после последнего
///    шага, перед финальным ранжированием;
/// 5. `state_end_expansion_score` — финальная дельта для ранжирования.
pub trait BeamScorer {
    /// Состояние одного луча. Расширение копирует родителя и мутирует
    /// копию; родитель не изменяется.
    type State: Clone + Default;

    /// Инициализировать корневое состояние.
    fn initialize_state(&self, state: &mut Self::State);

    /// Расширить `from` меткой `to_label` в `to`.
    ///
    /// `to` передается свежесозданным (`Default`); копирование полей
    /// родителя — обязанность реализации.
    fn expand_state(&self, from: &Self::State, from_label: Label, to: &mut Self::State, to_label: Label);

    /// Финальный скоринг луча после последнего шага.
    fn expand_state_end(&self, state: &mut Self::State);

    /// Накопленный вклад скоринга после `expand_state`: движок хранит
    /// возвращенное значение и складывает его с акустической оценкой.
    fn state_expansion_score(&self, state: &Self::State, previous_score: f32) -> f32;

    /// Финальная дельта после `expand_state_end`; движок прибавляет ее
    /// к итоговой оценке луча один раз.
    fn state_end_expansion_score(&self, state: &Self::State) -> f32;
}

/// Политика без скоринга: декодирование по чистым акустическим оценкам.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScorer;

impl BeamScorer for NullScorer {
    type State = ();

    fn initialize_state(&self, _state: &mut Self::State) {}

    fn expand_state(&self, _from: &Self::State, _from_label: Label, _to: &mut Self::State, _to_label: Label) {}

    fn expand_state_end(&self, _state: &mut Self::State) {}

    fn state_expansion_score(&self, _state: &Self::State, previous_score: f32) -> f32 {
        previous_score
    }

    fn state_end_expansion_score(&self, _state: &Self::State) -> f32 {
        0.0
    }
}
