//! # ctc-trie
//!
//! Префиксное дерево словаря поверх алфавита меток.
//!
//! Каждый узел агрегирует минимальную униграммную log10-оценку среди всех
//! слов словаря, разделяющих его префикс. Во время поиска недописанное
//! слово оценивается этим минимумом — нижней границей того, во что оно
//! может дорасти.
//!
//! Узлы лежат в арене ([`PrefixTrie::nodes`]), ссылки между ними и из
//! состояний лучей — индексы [`NodeId`], а не указатели: состояние луча
//! никогда не продлевает жизнь дерева.

pub mod format;

use ctc_core::{Alphabet, CtcError, CtcResult, Label};
use ctc_lm::WordIndex;

/// Индекс узла в арене дерева.
pub type NodeId = u32;

/// Корневой узел (пустой префикс).
pub const ROOT: NodeId = 0;

/// Один узел дерева: статистика префикса и дочерние ссылки.
#[derive(Debug, Clone, PartialEq)]
pub struct TrieNode {
    prefix_count: u32,
    min_score_word: WordIndex,
    min_unigram_score: f32,
    children: Vec<Option<NodeId>>,
}

impl TrieNode {
    fn new(alphabet_size: usize) -> Self {
        Self {
            prefix_count: 0,
            min_score_word: 0,
            min_unigram_score: f32::MAX,
            children: vec![None; alphabet_size],
        }
    }

    /// Сколько слов словаря разделяют этот префикс.
    pub fn prefix_count(&self) -> u32 {
        self.prefix_count
    }

    /// Индекс слова с минимальной униграммной оценкой в поддереве.
    pub fn min_score_word(&self) -> WordIndex {
        self.min_score_word
    }

    /// Минимальная униграммная оценка по поддереву.
    pub fn min_unigram_score(&self) -> f32 {
        self.min_unigram_score
    }
}

/// Префиксное дерево словаря.
///
/// Строится один раз оффлайн, при декодировании только читается;
/// разделяется между потоками без синхронизации.
#[derive(Debug, Clone)]
pub struct PrefixTrie {
    alphabet_size: usize,
    nodes: Vec<TrieNode>,
}

impl PrefixTrie {
    /// Пустое дерево (только корень) над алфавитом заданного размера.
    pub fn new(alphabet_size: usize) -> Self {
        Self {
            alphabet_size,
            nodes: vec![TrieNode::new(alphabet_size)],
        }
    }

    /// Размер алфавита (степень ветвления).
    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    /// Количество узлов, включая корень.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].prefix_count == 0
    }

    /// Узел по индексу. Паника при выходе за арену — индексы выдает
    /// само дерево, чужих тут быть не может.
    pub fn node(&self, id: NodeId) -> &TrieNode {
        &self.nodes[id as usize]
    }

    /// Дочерний узел по метке, O(1).
    pub fn child_at(&self, id: NodeId, label: Label) -> Option<NodeId> {
        self.nodes[id as usize].children.get(label).copied().flatten()
    }

    /// Вставить слово словаря с его униграммной оценкой.
    ///
    /// На каждом узле вдоль пути (включая корень и лист) увеличивается
    /// `prefix_count` и обновляется минимум. Повторная вставка того же
    /// слова не дедуплицируется — счетчики растут снова.
    pub fn insert(
        &mut self,
        word: &str,
        alphabet: &Alphabet,
        word_index: WordIndex,
        unigram_score: f32,
    ) -> CtcResult<()> {
        let mut labels = Vec::with_capacity(word.chars().count());
        let mut buf = [0u8; 4];
        for ch in word.chars() {
            let s = ch.encode_utf8(&mut buf);
            let label = alphabet.label_from_string(s).ok_or_else(|| {
                CtcError::Alphabet(format!("символ {:?} слова {:?} вне алфавита", s, word))
            })?;
            labels.push(label);
        }

        if let Some(&label) = labels.iter().find(|&&l| l >= self.alphabet_size) {
            return Err(CtcError::InvalidArgument(format!(
                "метка {} не помещается в дерево со степенью ветвления {}",
                label, self.alphabet_size
            )));
        }

        let mut id = ROOT;
        self.update_node(id, word_index, unigram_score);
        for label in labels {
            id = match self.nodes[id as usize].children[label] {
                Some(child) => child,
                None => {
                    let child = self.nodes.len() as NodeId;
                    self.nodes.push(TrieNode::new(self.alphabet_size));
                    self.nodes[id as usize].children[label] = Some(child);
                    child
                }
            };
            self.update_node(id, word_index, unigram_score);
        }
        Ok(())
    }

    fn update_node(&mut self, id: NodeId, word_index: WordIndex, unigram_score: f32) {
        let node = &mut self.nodes[id as usize];
        node.prefix_count += 1;
        if unigram_score < node.min_unigram_score {
            node.min_unigram_score = unigram_score;
            node.min_score_word = word_index;
        }
    }
}
