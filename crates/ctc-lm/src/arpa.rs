//! Backoff n-gram модель из текстового ARPA-файла.
//!
//! Формат ARPA:
//!
//! ```text
//! \data\
//! ngram 1=N1
//! ngram 2=N2
//!
//! \1-grams:
//! <log10 prob>\t<word>\t[<log10 backoff>]
//! ...
//! \2-grams:
//! <log10 prob>\t<w1> <w2>\t[<log10 backoff>]
//! ...
//! \end\
//! ```
//!
//! Оценка слова в контексте — стандартный Katz backoff: ищется самая
//! длинная известная n-грамма (суффикс контекста + слово); за каждый
//! спуск на уровень ниже прибавляется backoff-вес укороченного контекста.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use ctc_core::{CtcError, CtcResult};

use crate::{LanguageModel, Vocabulary, WordIndex};

/// Log10-оценка `<unk>`, если ARPA-файл его не описывает.
const DEFAULT_UNK_LOG_PROB: f32 = -99.0;

#[derive(Debug, Clone, Copy)]
struct NgramEntry {
    log_prob: f32,
    backoff: f32,
}

/// Backoff n-gram модель.
///
/// Состояние — последние `order - 1` индексов слов (самое свежее в конце).
#[derive(Debug)]
pub struct ArpaModel {
    vocabulary: Vocabulary,
    /// ngrams[n-1]: полная n-грамма -> (log prob, backoff).
    ngrams: Vec<HashMap<Vec<WordIndex>, NgramEntry>>,
    order: usize,
    unk_log_prob: f32,
}

impl ArpaModel {
    /// Загрузить модель из ARPA-файла.
    pub fn from_file(path: impl AsRef<Path>) -> CtcResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            CtcError::LanguageModel(format!("не удалось прочитать {:?}: {e}", path))
        })?;
        Self::from_text(&data)
    }

    /// Разобрать модель из содержимого ARPA-файла.
    pub fn from_text(text: &str) -> CtcResult<Self> {
        let mut counts: Vec<usize> = Vec::new();
        let mut vocabulary = Vocabulary::new();
        let mut ngrams: Vec<HashMap<Vec<WordIndex>, NgramEntry>> = Vec::new();

        // None — до \data\; Some(0) — секция счетчиков; Some(n) — \n-grams:.
        let mut section: Option<usize> = None;
        let mut finished = false;

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || finished {
                continue;
            }

            if line == "\\data\\" {
                section = Some(0);
                continue;
            }
            if line == "\\end\\" {
                finished = true;
                continue;
            }
            if let Some(n) = parse_section_header(line) {
                if n == 0 || n > counts.len() {
                    return Err(CtcError::LanguageModel(format!(
                        "строка {}: секция \\{}-grams: не согласована с \\data\\",
                        lineno + 1,
                        n
                    )));
                }
                while ngrams.len() < n {
                    ngrams.push(HashMap::new());
                }
                section = Some(n);
                continue;
            }

            match section {
                Some(0) => {
                    // ngram N=M
                    let rest = line.strip_prefix("ngram ").ok_or_else(|| {
                        CtcError::LanguageModel(format!(
                            "строка {}: ожидался счетчик 'ngram N=M', получено {:?}",
                            lineno + 1,
                            line
                        ))
                    })?;
                    let (n, m) = rest.split_once('=').ok_or_else(|| {
                        CtcError::LanguageModel(format!(
                            "строка {}: некорректный счетчик {:?}",
                            lineno + 1,
                            line
                        ))
                    })?;
                    let n: usize = n.trim().parse().map_err(|_| {
                        CtcError::LanguageModel(format!("строка {}: порядок {:?}", lineno + 1, n))
                    })?;
                    let m: usize = m.trim().parse().map_err(|_| {
                        CtcError::LanguageModel(format!("строка {}: счетчик {:?}", lineno + 1, m))
                    })?;
                    if n != counts.len() + 1 {
                        return Err(CtcError::LanguageModel(format!(
                            "строка {}: счетчики ngram должны идти подряд, начиная с 1",
                            lineno + 1
                        )));
                    }
                    counts.push(m);
                }
                Some(n) => {
                    let entry = parse_ngram_line(line, n, &mut vocabulary, lineno + 1)?;
                    ngrams[n - 1].insert(entry.0, entry.1);
                }
                None => {
                    // Преамбула до \data\ игнорируется.
                }
            }
        }

        if counts.is_empty() {
            return Err(CtcError::LanguageModel(
                "секция \\data\\ не найдена или пуста".to_string(),
            ));
        }
        if !finished {
            return Err(CtcError::LanguageModel(
                "маркер \\end\\ не найден, файл оборван".to_string(),
            ));
        }

        let order = counts.len();
        while ngrams.len() < order {
            ngrams.push(HashMap::new());
        }
        for (n, (&expected, map)) in counts.iter().zip(ngrams.iter()).enumerate() {
            if map.len() != expected {
                warn!(
                    "ARPA: заявлено {} {}-грамм, прочитано {}",
                    expected,
                    n + 1,
                    map.len()
                );
            }
        }

        let unk_log_prob = match ngrams[0].get([crate::NOT_FOUND].as_slice()) {
            Some(e) => e.log_prob,
            None => {
                warn!(
                    "ARPA: <unk> отсутствует в 1-граммах, используется {}",
                    DEFAULT_UNK_LOG_PROB
                );
                DEFAULT_UNK_LOG_PROB
            }
        };

        debug!(
            "ARPA модель загружена: порядок {}, словарь {} слов",
            order,
            vocabulary.len()
        );

        Ok(Self {
            vocabulary,
            ngrams,
            order,
            unk_log_prob,
        })
    }

    /// Порядок модели (максимальное N).
    pub fn order(&self) -> usize {
        self.order
    }

    /// Пустой контекст: оценка через `full_score` дает униграмму.
    ///
    /// Используется оффлайн-построителем префиксного дерева.
    pub fn null_context_state(&self) -> Vec<WordIndex> {
        Vec::new()
    }

    fn lookup(&self, context: &[WordIndex], word: WordIndex) -> Option<&NgramEntry> {
        let n = context.len() + 1;
        let map = self.ngrams.get(n - 1)?;
        let mut key = Vec::with_capacity(n);
        key.extend_from_slice(context);
        key.push(word);
        map.get(key.as_slice())
    }

    fn backoff_weight(&self, context: &[WordIndex]) -> f32 {
        self.ngrams
            .get(context.len() - 1)
            .and_then(|m| m.get(context))
            .map(|e| e.backoff)
            .unwrap_or(0.0)
    }
}

impl LanguageModel for ArpaModel {
    type State = Vec<WordIndex>;

    fn begin_sentence_state(&self) -> Self::State {
        vec![self.vocabulary.begin_sentence()]
    }

    fn full_score(&self, state: &Self::State, word: WordIndex) -> (f32, Self::State) {
        let max_ctx = (self.order - 1).min(state.len());
        let mut context = &state[state.len() - max_ctx..];
        let mut backoff = 0.0f32;

        let score = loop {
            if let Some(e) = self.lookup(context, word) {
                break e.log_prob + backoff;
            }
            if context.is_empty() {
                // Даже униграммы нет: слово вне словаря модели.
                break self.unk_log_prob + backoff;
            }
            backoff += self.backoff_weight(context);
            context = &context[1..];
        };

        let keep = self.order - 1;
        let mut next = Vec::with_capacity(keep);
        if keep > 0 {
            let tail = state.len().saturating_sub(keep - 1);
            next.extend_from_slice(&state[tail..]);
            next.push(word);
        }
        (score, next)
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

fn parse_section_header(line: &str) -> Option<usize> {
    let rest = line.strip_prefix('\\')?.strip_suffix("-grams:")?;
    rest.parse().ok()
}

fn parse_ngram_line(
    line: &str,
    n: usize,
    vocabulary: &mut Vocabulary,
    lineno: usize,
) -> CtcResult<(Vec<WordIndex>, NgramEntry)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    // prob + N слов [+ backoff]
    if fields.len() != n + 1 && fields.len() != n + 2 {
        return Err(CtcError::LanguageModel(format!(
            "строка {}: ожидалось {}-{} полей для {}-граммы, получено {}",
            lineno,
            n + 1,
            n + 2,
            n,
            fields.len()
        )));
    }

    let log_prob: f32 = fields[0].parse().map_err(|_| {
        CtcError::LanguageModel(format!("строка {}: вероятность {:?}", lineno, fields[0]))
    })?;
    let backoff: f32 = if fields.len() == n + 2 {
        fields[n + 1].parse().map_err(|_| {
            CtcError::LanguageModel(format!("строка {}: backoff {:?}", lineno, fields[n + 1]))
        })?
    } else {
        0.0
    };

    let mut key = Vec::with_capacity(n);
    for &w in &fields[1..=n] {
        let idx = if n == 1 {
            vocabulary.insert(w)
        } else {
            let idx = vocabulary.index(w);
            if idx == crate::NOT_FOUND && w != "<unk>" {
                return Err(CtcError::LanguageModel(format!(
                    "строка {}: слово {:?} в {}-грамме отсутствует среди 1-грамм",
                    lineno, w, n
                )));
            }
            idx
        };
        key.push(idx);
    }

    Ok((key, NgramEntry { log_prob, backoff }))
}
