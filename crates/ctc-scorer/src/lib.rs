//! # ctc-scorer
//!
//! Политика скоринга лучей, сливающая три источника оценки:
//!
//! - акустическую вероятность (ее ведет сам движок поиска);
//! - n-граммную языковую модель — для завершенных слов;
//! - префиксное дерево словаря — нижняя граница для недописанных слов.
//!
//! Недописанное слово оценивается минимальной униграммой его поддерева;
//! как только префикс выпадает из словаря, включается фиксированный
//! OOV-штраф. На границе слова (метка-пробел) накопленное слово уходит
//! в языковую модель целиком.

pub mod state;

use tracing::debug;

use ctc_beam::BeamScorer;
use ctc_core::{Alphabet, CtcError, CtcResult, Label, ScorerWeights};
use ctc_lm::LanguageModel;
use ctc_trie::PrefixTrie;

pub use state::LmBeamState;

/// Скоринг лучей через языковую модель и префиксное дерево.
///
/// Дерево и алфавит принадлежат скореру; веса фиксируются при
/// конструировании. Во время декодирования все методы — `&self`,
/// экземпляр можно разделять между потоками (каждому — свой движок
/// поиска).
#[derive(Debug)]
pub struct LmBeamScorer<M: LanguageModel> {
    model: M,
    alphabet: Alphabet,
    trie: PrefixTrie,
    weights: ScorerWeights,
}

impl<M: LanguageModel> LmBeamScorer<M> {
    pub fn new(
        model: M,
        alphabet: Alphabet,
        trie: PrefixTrie,
        weights: ScorerWeights,
    ) -> CtcResult<Self> {
        if trie.alphabet_size() != alphabet.size() {
            return Err(CtcError::InvalidArgument(format!(
                "дерево построено для алфавита размера {}, алфавит содержит {} меток",
                trie.alphabet_size(),
                alphabet.size()
            )));
        }
        debug!(
            "скорер: алфавит {} меток, дерево {} узлов, словарь LM {} слов",
            alphabet.size(),
            trie.len(),
            model.vocabulary().len()
        );
        Ok(Self {
            model,
            alphabet,
            trie,
            weights,
        })
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn weights(&self) -> &ScorerWeights {
        &self.weights
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Оценить накопленное слово языковой моделью из контекста `from`.
    fn score_word(&self, from: &M::State, word: &str) -> (f32, M::State, bool) {
        let vocabulary = self.model.vocabulary();
        let index = vocabulary.index(word);
        let (delta, out) = self.model.full_score(from, index);
        (delta, out, index != vocabulary.not_found())
    }

    /// Перенести LM-дельту в состояние: score и lm_score синхронизируются,
    /// delta_score — вклад этого обновления.
    fn update_with_lm_score(state: &mut LmBeamState<M::State>, delta: f32) {
        let previous = state.score;
        state.lm_score += delta;
        state.score = state.lm_score;
        state.delta_score = state.score - previous;
    }

    fn reset_incomplete_word(state: &mut LmBeamState<M::State>) {
        state.incomplete_word.clear();
        state.trie_node = Some(ctc_trie::ROOT);
    }
}

impl<M: LanguageModel> BeamScorer for LmBeamScorer<M> {
    type State = LmBeamState<M::State>;

    fn initialize_state(&self, state: &mut Self::State) {
        state.score = 0.0;
        state.lm_score = 0.0;
        state.delta_score = 0.0;
        state.incomplete_word.clear();
        state.trie_node = Some(ctc_trie::ROOT);
        state.num_words = 0;
        state.model_state = self.model.begin_sentence_state();
    }

    fn expand_state(
        &self,
        from: &Self::State,
        _from_label: Label,
        to: &mut Self::State,
        to_label: Label,
    ) {
        *to = from.clone();

        if !self.alphabet.is_space(to_label) {
            // Движок передает только метки алфавита.
            if let Ok(s) = self.alphabet.string_from_label(to_label) {
                to.incomplete_word.push_str(s);
            }

            // Спуск по дереву; как только префикс выпал из словаря,
            // узел теряется до конца слова.
            to.trie_node = from
                .trie_node
                .and_then(|node| self.trie.child_at(node, to_label));
            let candidate = match to.trie_node {
                Some(node) => self.trie.node(node).min_unigram_score(),
                None => self.weights.oov_score,
            };

            // Накопленный LM-итог плюс нижняя граница недописанного слова.
            to.score = candidate + to.lm_score;
            to.delta_score = to.score - from.score;
        } else {
            let (lm_delta, out, in_vocabulary) =
                self.score_word(&from.model_state, &to.incomplete_word);
            if in_vocabulary {
                to.lm_score += self.weights.valid_word_count_weight;
            }
            to.lm_score += self.weights.word_count_weight;
            Self::update_with_lm_score(to, lm_delta);
            to.model_state = out;
            to.num_words += 1;
            Self::reset_incomplete_word(to);
        }
    }

    /// Финальный скоринг: хвостовое недописанное слово уходит в LM без
    /// словесных бонусов, затем оценивается `</s>`, затем итог
    /// нормализуется на количество слов.
    ///
    /// Дельта переписывается так, чтобы однократное прибавление
    /// `state_end_expansion_score` движком дало нормализованный итог;
    /// вес `lm_weight` уже учтен внутри.
    fn expand_state_end(&self, state: &mut Self::State) {
        let mut lm_delta = 0.0;
        if !state.incomplete_word.is_empty() {
            let (delta, out, _) = self.score_word(&state.model_state, &state.incomplete_word);
            lm_delta += delta;
            state.model_state = out;
            Self::reset_incomplete_word(state);
        }
        let (eos, _) = self
            .model
            .full_score(&state.model_state, self.model.vocabulary().end_sentence());
        lm_delta += eos;
        Self::update_with_lm_score(state, lm_delta);

        state.score += self.weights.lm_weight * state.delta_score;
        if state.num_words > 0 {
            let normalized = state.score / state.num_words as f32;
            state.delta_score = normalized - state.score;
        } else {
            state.delta_score *= self.weights.lm_weight;
        }
    }

    fn state_expansion_score(&self, state: &Self::State, previous_score: f32) -> f32 {
        self.weights.lm_weight * state.delta_score + previous_score
    }

    fn state_end_expansion_score(&self, state: &Self::State) -> f32 {
        state.delta_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctc_lm::{ArpaModel, NullLm};

    const ALPHABET: &str = " \na\nc\nd\ng\no\nt\n";

    const TOY_ARPA: &str = "\
\\data\\
ngram 1=5
ngram 2=2

\\1-grams:
-1.0\t<unk>
-99\t<s>\t-0.30103
-0.8\t</s>
-0.5\tcat\t-0.30103
-0.7\tdog

\\2-grams:
-0.2\t<s> cat
-0.3\tdog </s>

\\end\\
";

    fn alphabet() -> Alphabet {
        Alphabet::from_text(ALPHABET).unwrap()
    }

    fn scorer() -> LmBeamScorer<ArpaModel> {
        let a = alphabet();
        let model = ArpaModel::from_text(TOY_ARPA).unwrap();
        let mut trie = PrefixTrie::new(a.size());
        let cat = model.vocabulary().index("cat");
        let dog = model.vocabulary().index("dog");
        trie.insert("cat", &a, cat, -0.5).unwrap();
        trie.insert("dog", &a, dog, -0.7).unwrap();
        LmBeamScorer::new(model, a, trie, ScorerWeights::default()).unwrap()
    }

    fn label(a: &Alphabet, s: &str) -> Label {
        a.label_from_string(s).unwrap()
    }

    /// Провести состояние по пути из меток, возвращая каждый промежуточный шаг.
    fn drive(
        scorer: &LmBeamScorer<ArpaModel>,
        path: &str,
    ) -> Vec<LmBeamState<Vec<ctc_lm::WordIndex>>> {
        let a = scorer.alphabet().clone();
        let mut state = LmBeamState::default();
        scorer.initialize_state(&mut state);
        let mut out = Vec::new();
        for ch in path.chars() {
            let l = label(&a, &ch.to_string());
            let mut next = LmBeamState::default();
            scorer.expand_state(&state, 0, &mut next, l);
            out.push(next.clone());
            state = next;
        }
        out
    }

    #[test]
    fn test_mid_word_uses_trie_bound() {
        let s = scorer();
        let steps = drive(&s, "ca");
        // Префикс "c" и "ca" ведут только к cat: минимум -0.5
        assert_eq!(steps[0].score, -0.5);
        assert_eq!(steps[1].score, -0.5);
        assert!(steps[1].trie_node.is_some());
    }

    #[test]
    fn test_oov_penalty_sticks_after_descent_fails() {
        let s = scorer();
        // В дереве только cat и dog: путь "dta" выпадает после 'dt'
        let steps = drive(&s, "dta");
        assert_eq!(steps[0].score, -0.7); // "d" — префикс dog
        assert_eq!(steps[1].score, s.weights().oov_score);
        assert!(steps[1].trie_node.is_none());
        // Каждая следующая буква — тот же фиксированный штраф,
        // а не минимум из чужой ветки дерева.
        assert_eq!(steps[2].score, s.weights().oov_score);
        assert!(steps[2].trie_node.is_none());
    }

    #[test]
    fn test_word_boundary_syncs_score_and_lm_score() {
        let s = scorer();
        let steps = drive(&s, "cat dog ");
        // Инвариант: на каждой границе слова score == lm_score
        let boundaries = [3usize, 7];
        for &i in &boundaries {
            assert_eq!(steps[i].score, steps[i].lm_score, "шаг {}", i);
        }
        assert_eq!(steps[7].num_words, 2);
        // Между границами score уходит вперед на оценку префикса
        assert_ne!(steps[4].score, steps[4].lm_score);
    }

    #[test]
    fn test_valid_word_bonus_applied() {
        let s = scorer();
        let w = *s.weights();
        let steps = drive(&s, "cat ");
        let boundary = &steps[3];
        // bigram <s> cat = -0.2, плюс оба словесных бонуса
        let expected = -0.2 + w.valid_word_count_weight + w.word_count_weight;
        assert!((boundary.lm_score - expected).abs() < 1e-6);
        assert_eq!(boundary.incomplete_word, "");
        assert_eq!(boundary.trie_node, Some(ctc_trie::ROOT));
    }

    #[test]
    fn test_oov_word_gets_no_valid_bonus() {
        let s = scorer();
        let w = *s.weights();
        // "dt" нет в словаре LM: только word_count, слово оценено как <unk>
        let steps = drive(&s, "dt ");
        let boundary = &steps[2];
        // backoff(<s>) + unigram(<unk>) = -0.30103 - 1.0
        let expected = (-0.30103 - 1.0) + w.word_count_weight;
        assert!((boundary.lm_score - expected).abs() < 1e-5);
    }

    #[test]
    fn test_expand_does_not_mutate_parent() {
        let s = scorer();
        let a = alphabet();
        let mut root = LmBeamState::default();
        s.initialize_state(&mut root);
        let snapshot = root.clone();
        let mut child = LmBeamState::default();
        s.expand_state(&root, 0, &mut child, label(&a, "c"));
        assert_eq!(root.score, snapshot.score);
        assert_eq!(root.incomplete_word, snapshot.incomplete_word);
        assert_eq!(root.trie_node, snapshot.trie_node);
    }

    #[test]
    fn test_end_scores_trailing_word_and_eos() {
        let s = scorer();
        let mut state = drive(&s, "dog").into_iter().last().unwrap();
        s.expand_state_end(&mut state);
        assert!(state.incomplete_word.is_empty());
        // unigram(dog по backoff от <s>) + bigram dog </s>
        let expected = (-0.30103 - 0.7) + (-0.3);
        assert!((state.lm_score - expected).abs() < 1e-5);
    }

    #[test]
    fn test_length_normalization_divides_by_word_count() {
        // Синтетические лучи равной ненормализованной оценки:
        // 2 слова против 4 -- у более длинного итог ниже.
        let model = NullLm::new();
        let a = alphabet();
        let trie = PrefixTrie::new(a.size());
        let s = LmBeamScorer::new(model, a, trie, ScorerWeights::default()).unwrap();

        let mk = |num_words: u32| {
            let mut st: LmBeamState<()> = LmBeamState::default();
            s.initialize_state(&mut st);
            st.score = 8.0;
            st.lm_score = 8.0;
            st.num_words = num_words;
            st
        };

        let mut two = mk(2);
        let mut four = mk(4);
        s.expand_state_end(&mut two);
        s.expand_state_end(&mut four);
        let end_two = s.state_end_expansion_score(&two);
        let end_four = s.state_end_expansion_score(&four);
        // NullLm дает нулевую дельту, вся разница -- нормализация
        assert!((end_two - (8.0 / 2.0 - 8.0)).abs() < 1e-6);
        assert!((end_four - (8.0 / 4.0 - 8.0)).abs() < 1e-6);
        assert!(end_four < end_two);
    }

    #[test]
    fn test_trie_alphabet_mismatch_rejected() {
        let a = alphabet();
        let trie = PrefixTrie::new(a.size() + 3);
        let err = LmBeamScorer::new(NullLm::new(), a, trie, ScorerWeights::default());
        assert!(err.is_err());
    }
}
