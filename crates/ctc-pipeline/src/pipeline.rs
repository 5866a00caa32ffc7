//! Пакетный декодер: валидация входов и покадровый цикл поиска.

use std::path::Path;

use candle_core::Tensor;
use tracing::{debug, info};

use ctc_beam::BeamSearch;
use ctc_core::{Alphabet, CtcError, CtcResult, DecodeOptions, ScorerWeights};
use ctc_lm::{ArpaModel, LanguageModel};
use ctc_scorer::LmBeamScorer;
use ctc_trie::PrefixTrie;

use crate::output::DecodeOutput;

/// Декодер пакета фраз.
///
/// Фразы обрабатываются строго последовательно; скорер и его данные
/// (LM, дерево, алфавит) во время декодирования только читаются, так
/// что несколько экземпляров `DecodePipeline` могут разделять один
/// скорер через ссылку в будущем — сейчас каждый владеет своим.
#[derive(Debug)]
pub struct DecodePipeline<M: LanguageModel> {
    scorer: LmBeamScorer<M>,
    options: DecodeOptions,
}

impl DecodePipeline<ArpaModel> {
    /// Собрать декодер из файлов: ARPA-модель, дерево, алфавит.
    ///
    /// Любая проблема конфигурации фатальна: декодер либо создается
    /// целиком, либо не создается вовсе, частичных режимов нет.
    pub fn from_files(
        lm_path: impl AsRef<Path>,
        trie_path: impl AsRef<Path>,
        alphabet_path: impl AsRef<Path>,
        weights: ScorerWeights,
        options: DecodeOptions,
    ) -> CtcResult<Self> {
        let alphabet = Alphabet::from_file(alphabet_path)?;
        let model = ArpaModel::from_file(lm_path)?;
        let trie = PrefixTrie::load(trie_path, alphabet.size())?;
        info!(
            "декодер собран: алфавит {} меток, LM порядка {}, дерево {} узлов",
            alphabet.size(),
            model.order(),
            trie.len()
        );
        let scorer = LmBeamScorer::new(model, alphabet, trie, weights)?;
        Self::new(scorer, options)
    }
}

impl<M: LanguageModel> DecodePipeline<M> {
    pub fn new(scorer: LmBeamScorer<M>, options: DecodeOptions) -> CtcResult<Self> {
        if options.beam_width == 0 {
            return Err(CtcError::InvalidArgument("beam_width = 0".to_string()));
        }
        if options.top_paths == 0 || options.top_paths > options.beam_width {
            return Err(CtcError::InvalidArgument(format!(
                "top_paths = {} должно быть в пределах 1..=beam_width ({})",
                options.top_paths, options.beam_width
            )));
        }
        Ok(Self { scorer, options })
    }

    pub fn alphabet(&self) -> &Alphabet {
        self.scorer.alphabet()
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Декодировать батч.
    ///
    /// `inputs` — вероятности меток формы `[max_time, batch, num_classes]`
    /// (после softmax, не логиты); `num_classes` = размер алфавита + blank.
    /// `sequence_length[b]` — реальная длина фразы `b` в кадрах.
    pub fn decode(&self, inputs: &Tensor, sequence_length: &[usize]) -> CtcResult<DecodeOutput> {
        let dims = inputs.dims();
        if dims.len() != 3 {
            return Err(CtcError::InvalidArgument(format!(
                "inputs имеет ранг {}, ожидался 3-тензор [time, batch, num_classes]",
                dims.len()
            )));
        }
        let (max_time, batch_size, num_classes) = (dims[0], dims[1], dims[2]);
        if max_time == 0 {
            return Err(CtcError::InvalidArgument("max_time = 0".to_string()));
        }
        let expected_classes = self.scorer.alphabet().size() + 1;
        if num_classes != expected_classes {
            return Err(CtcError::InvalidArgument(format!(
                "num_classes = {}, алфавит с blank требует {}",
                num_classes, expected_classes
            )));
        }
        if sequence_length.len() != batch_size {
            return Err(CtcError::FailedPrecondition(format!(
                "len(sequence_length) = {} не равно batch_size = {}",
                sequence_length.len(),
                batch_size
            )));
        }
        for (b, &len) in sequence_length.iter().enumerate() {
            if len > max_time {
                return Err(CtcError::FailedPrecondition(format!(
                    "sequence_length[{}] = {} > max_time = {}",
                    b, len, max_time
                )));
            }
        }

        let probs = inputs.to_vec3::<f32>()?;

        let mut sequences = Vec::with_capacity(batch_size);
        let mut log_probability = Vec::with_capacity(batch_size);

        for (b, &len) in sequence_length.iter().enumerate() {
            let mut search = BeamSearch::new(
                num_classes,
                self.options.beam_width,
                self.options.merge_repeated,
                &self.scorer,
            )?;
            for frame in probs.iter().take(len) {
                search.step(&frame[b])?;
            }
            let paths = search.top_paths(self.options.top_paths)?;
            debug!(
                "фраза {}: {} кадров, лучший log_prob {:.4}",
                b, len, paths[0].log_prob
            );
            log_probability.push(paths.iter().map(|p| p.log_prob).collect());
            sequences.push(paths.into_iter().map(|p| p.labels).collect());
        }

        Ok(DecodeOutput::assemble(sequences, log_probability))
    }
}
