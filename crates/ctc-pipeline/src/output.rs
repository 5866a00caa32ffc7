//! Разреженное представление результатов декодирования.
//!
//! Для каждого запрошенного пути `p` — тройка (indices, values, shape),
//! кодирующая последовательности меток всех фраз батча как
//! `SparseTensor<i64, 2>`: строки indices — `[batch, time]`.

use serde::{Deserialize, Serialize};

use ctc_core::{Alphabet, CtcResult, Label};

/// Один декодированный путь по всему батчу.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparsePath {
    /// Координаты `[batch, time]` каждого значения.
    pub indices: Vec<[i64; 2]>,
    /// Метки в порядке следования.
    pub values: Vec<i64>,
    /// `[batch_size, max_decoded_length]`.
    pub shape: [i64; 2],
}

/// Полный результат пакетного декодирования.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeOutput {
    /// sequences[b][p] — метки пути `p` фразы `b`.
    pub sequences: Vec<Vec<Vec<Label>>>,
    /// Разреженные тройки, по одной на путь.
    pub paths: Vec<SparsePath>,
    /// log_probability[b][p] — итоговая оценка пути `p` фразы `b`.
    pub log_probability: Vec<Vec<f32>>,
}

impl DecodeOutput {
    /// Собрать выход из последовательностей и оценок.
    pub fn assemble(sequences: Vec<Vec<Vec<Label>>>, log_probability: Vec<Vec<f32>>) -> Self {
        let batch_size = sequences.len();
        let top_paths = sequences.first().map(|s| s.len()).unwrap_or(0);

        let mut paths = Vec::with_capacity(top_paths);
        for p in 0..top_paths {
            let mut indices = Vec::new();
            let mut values = Vec::new();
            let mut max_decoded = 0i64;
            for (b, batch_seqs) in sequences.iter().enumerate() {
                let seq = &batch_seqs[p];
                max_decoded = max_decoded.max(seq.len() as i64);
                for (t, &label) in seq.iter().enumerate() {
                    indices.push([b as i64, t as i64]);
                    values.push(label as i64);
                }
            }
            paths.push(SparsePath {
                indices,
                values,
                shape: [batch_size as i64, max_decoded],
            });
        }

        Self {
            sequences,
            paths,
            log_probability,
        }
    }

    /// Отрисовать все пути в строки: `transcripts[b][p]`.
    pub fn transcripts(&self, alphabet: &Alphabet) -> CtcResult<Vec<Vec<String>>> {
        self.sequences
            .iter()
            .map(|batch_seqs| {
                batch_seqs
                    .iter()
                    .map(|seq| alphabet.render(seq))
                    .collect()
            })
            .collect()
    }
}
