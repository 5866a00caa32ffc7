//! Каркас лучевого поиска: расширение, слияние, отсечение, top-K.

use std::collections::HashSet;

use tracing::{debug, trace};

use ctc_core::{CtcError, CtcResult, Label};

use crate::scorer::BeamScorer;

/// Один результат декодирования: последовательность меток и ее
/// итоговая log-оценка.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPath {
    pub labels: Vec<Label>,
    pub log_prob: f32,
}

/// Одна живая гипотеза.
///
/// Идентичность луча — пара (выходной префикс, метка последнего кадра):
/// два луча с одинаковым выходом, но разным последним кадром, по-разному
/// реагируют на повтор метки, и сливать их нельзя.
#[derive(Debug, Clone)]
struct Beam<T> {
    /// Выданные символы (после CTC-склейки).
    labels: Vec<Label>,
    /// Метка, выбранная на последнем кадре; `None` — blank или старт.
    last_frame: Option<Label>,
    /// Сумма log-вероятностей выбранных на каждом кадре меток.
    acoustic_score: f32,
    /// Накопленный вклад политики скоринга (см. [`BeamScorer`]).
    scorer_score: f32,
    state: T,
}

impl<T> Beam<T> {
    fn total(&self) -> f32 {
        self.acoustic_score + self.scorer_score
    }
}

/// Лучевой поиск по решетке CTC.
///
/// Blank-метка — последний класс (`num_classes - 1`). Экземпляр
/// переиспользуется между фразами через [`BeamSearch::reset`]:
/// состояния лучей — значения, куч за пределами строк не трогаем.
pub struct BeamSearch<'a, S: BeamScorer> {
    scorer: &'a S,
    num_classes: usize,
    blank: Label,
    beam_width: usize,
    merge_repeated: bool,
    beams: Vec<Beam<S::State>>,
    finished: bool,
}

impl<'a, S: BeamScorer> BeamSearch<'a, S> {
    /// Создать движок. `num_classes` включает blank.
    pub fn new(
        num_classes: usize,
        beam_width: usize,
        merge_repeated: bool,
        scorer: &'a S,
    ) -> CtcResult<Self> {
        if num_classes < 2 {
            return Err(CtcError::InvalidArgument(format!(
                "num_classes = {}: нужна хотя бы одна метка плюс blank",
                num_classes
            )));
        }
        if beam_width == 0 {
            return Err(CtcError::InvalidArgument("beam_width = 0".to_string()));
        }
        let mut search = Self {
            scorer,
            num_classes,
            blank: num_classes - 1,
            beam_width,
            merge_repeated,
            beams: Vec::new(),
            finished: false,
        };
        search.reset();
        Ok(search)
    }

    /// Blank-метка.
    pub fn blank_label(&self) -> Label {
        self.blank
    }

    /// Очистить состояние поиска для следующей фразы.
    pub fn reset(&mut self) {
        let mut state = S::State::default();
        self.scorer.initialize_state(&mut state);
        self.beams = vec![Beam {
            labels: Vec::new(),
            last_frame: None,
            acoustic_score: 0.0,
            scorer_score: 0.0,
            state,
        }];
        self.finished = false;
    }

    /// Один временной шаг: расширить каждый живой луч каждой меткой,
    /// слить совпадающие гипотезы и отсечь до `beam_width`.
    ///
    /// `probs` — вероятности меток на этом кадре (не логарифмы),
    /// длины `num_classes`. Нулевые вероятности дают `-inf` и не
    /// считаются ошибкой.
    pub fn step(&mut self, probs: &[f32]) -> CtcResult<()> {
        if self.finished {
            return Err(CtcError::FailedPrecondition(
                "step() после top_paths(): нужен reset()".to_string(),
            ));
        }
        if probs.len() != self.num_classes {
            return Err(CtcError::InvalidArgument(format!(
                "кадр из {} классов, движок сконфигурирован на {}",
                probs.len(),
                self.num_classes
            )));
        }

        let mut candidates: Vec<Beam<S::State>> =
            Vec::with_capacity(self.beams.len() * self.num_classes);

        for beam in &self.beams {
            for label in 0..self.num_classes {
                let lp = probs[label].ln();

                if label == self.blank {
                    // Нового символа нет: выход и состояние не меняются.
                    candidates.push(Beam {
                        labels: beam.labels.clone(),
                        last_frame: None,
                        acoustic_score: beam.acoustic_score + lp,
                        scorer_score: beam.scorer_score,
                        state: beam.state.clone(),
                    });
                } else if self.merge_repeated && beam.last_frame == Some(label) {
                    // Повтор метки без blank между: продолжение того же
                    // символа, скоринг не вызывается.
                    candidates.push(Beam {
                        labels: beam.labels.clone(),
                        last_frame: Some(label),
                        acoustic_score: beam.acoustic_score + lp,
                        scorer_score: beam.scorer_score,
                        state: beam.state.clone(),
                    });
                } else {
                    let mut child = S::State::default();
                    let from_label = beam.last_frame.unwrap_or(self.blank);
                    self.scorer
                        .expand_state(&beam.state, from_label, &mut child, label);
                    let scorer_score =
                        self.scorer.state_expansion_score(&child, beam.scorer_score);
                    let mut labels = Vec::with_capacity(beam.labels.len() + 1);
                    labels.extend_from_slice(&beam.labels);
                    labels.push(label);
                    candidates.push(Beam {
                        labels,
                        last_frame: Some(label),
                        acoustic_score: beam.acoustic_score + lp,
                        scorer_score,
                        state: child,
                    });
                }
            }
        }

        // Сортировка задает и ранжирование, и разрешение слияний:
        // при совпадении ключа выживает первый (лучший) кандидат,
        // равные оценки упорядочены по меткам — вывод воспроизводим.
        candidates.sort_by(|a, b| {
            b.total()
                .total_cmp(&a.total())
                .then_with(|| a.labels.cmp(&b.labels))
                .then_with(|| a.last_frame.cmp(&b.last_frame))
        });

        let mut seen: HashSet<(Vec<Label>, Option<Label>)> =
            HashSet::with_capacity(self.beam_width);
        let mut survivors = Vec::with_capacity(self.beam_width);
        for cand in candidates {
            if survivors.len() == self.beam_width {
                break;
            }
            let key = (cand.labels.clone(), cand.last_frame);
            if seen.insert(key) {
                survivors.push(cand);
            }
        }

        trace!("шаг: {} лучей выжило", survivors.len());
        self.beams = survivors;
        Ok(())
    }

    /// Финализировать поиск и вернуть `k` лучших путей по убыванию
    /// оценки; последовательности меток в результате попарно различны.
    /// Склейка повторов уже произошла на шагах поиска.
    ///
    /// Вызывается один раз; повторный вызов или `step` после него —
    /// ошибка до `reset`.
    pub fn top_paths(&mut self, k: usize) -> CtcResult<Vec<DecodedPath>> {
        if self.finished {
            return Err(CtcError::FailedPrecondition(
                "top_paths() уже вызывался: нужен reset()".to_string(),
            ));
        }
        if k > self.beam_width {
            return Err(CtcError::InvalidArgument(format!(
                "top_paths {} > beam_width {}",
                k, self.beam_width
            )));
        }
        let mut finals: Vec<DecodedPath> = self
            .beams
            .iter()
            .map(|beam| {
                let mut state = beam.state.clone();
                self.scorer.expand_state_end(&mut state);
                let log_prob = beam.total() + self.scorer.state_end_expansion_score(&state);
                DecodedPath {
                    labels: beam.labels.clone(),
                    log_prob,
                }
            })
            .collect();

        finals.sort_by(|a, b| {
            b.log_prob
                .total_cmp(&a.log_prob)
                .then_with(|| a.labels.cmp(&b.labels))
        });

        // Лучи с разной меткой последнего кадра могут нести один и тот
        // же выход; в результат каждая последовательность попадает один
        // раз, с лучшей из своих оценок.
        let mut seen: HashSet<Vec<Label>> = HashSet::with_capacity(finals.len());
        finals.retain(|p| seen.insert(p.labels.clone()));

        if k > finals.len() {
            return Err(CtcError::FailedPrecondition(format!(
                "запрошено {} путей, различных гипотез только {}",
                k,
                finals.len()
            )));
        }
        self.finished = true;
        finals.truncate(k);

        if let Some(best) = finals.first() {
            debug!(
                "top_paths: лучший путь из {} меток, log_prob {:.4}",
                best.labels.len(),
                best.log_prob
            );
        }
        Ok(finals)
    }
}
