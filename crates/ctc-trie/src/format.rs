//! Сериализация префиксного дерева.
//!
//! Тело файла — pre-order обход: для каждого присутствующего узла три
//! строки (`prefix_count`, `min_score_word`, `min_unigram_score`), затем
//! рекурсивно дети в порядке меток `0..alphabet_size`; отсутствующий
//! ребенок кодируется строкой `-1`. Читатель и писатель обязаны
//! согласоваться позиционно — поэтому перед телом идет двухстрочный
//! заголовок с магической строкой, версией и размером алфавита, и любое
//! рассогласование дает [`CtcError::TrieFormat`] вместо тихого мусора.
//!
//! ```text
//! ctc-trie 1
//! <alphabet_size>
//! <тело pre-order>
//! ```

use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use ctc_core::{CtcError, CtcResult};
use ctc_lm::WordIndex;

use crate::{NodeId, PrefixTrie, TrieNode};

/// Магическая строка заголовка.
const MAGIC: &str = "ctc-trie";

/// Текущая версия формата.
const VERSION: u32 = 1;

impl PrefixTrie {
    /// Записать дерево в поток.
    pub fn write_to(&self, w: &mut impl Write) -> CtcResult<()> {
        writeln!(w, "{} {}", MAGIC, VERSION)?;
        writeln!(w, "{}", self.alphabet_size)?;
        self.write_node(w, crate::ROOT)?;
        Ok(())
    }

    fn write_node(&self, w: &mut impl Write, id: NodeId) -> CtcResult<()> {
        let node = &self.nodes[id as usize];
        writeln!(w, "{}", node.prefix_count)?;
        writeln!(w, "{}", node.min_score_word)?;
        writeln!(w, "{}", node.min_unigram_score)?;
        for i in 0..self.alphabet_size {
            match node.children[i] {
                None => writeln!(w, "-1")?,
                Some(child) => self.write_node(w, child)?,
            }
        }
        Ok(())
    }

    /// Прочитать дерево из потока, проверив заголовок.
    ///
    /// `expected_alphabet_size` — размер алфавита, с которым дерево будет
    /// использоваться; несовпадение с заголовком — ошибка формата.
    pub fn read_from(r: &mut impl Read, expected_alphabet_size: usize) -> CtcResult<Self> {
        let mut reader = BufReader::new(r);

        let header = read_line(&mut reader)?;
        let mut parts = header.split_whitespace();
        if parts.next() != Some(MAGIC) {
            return Err(CtcError::TrieFormat(format!(
                "отсутствует заголовок {:?}: файл другого формата или без версии",
                MAGIC
            )));
        }
        let version: u32 = parts
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| CtcError::TrieFormat("нечитаемая версия в заголовке".to_string()))?;
        if version != VERSION {
            return Err(CtcError::TrieFormat(format!(
                "версия формата {} не поддерживается (ожидалась {})",
                version, VERSION
            )));
        }

        let alphabet_size: usize = read_line(&mut reader)?.trim().parse().map_err(|_| {
            CtcError::TrieFormat("нечитаемый размер алфавита в заголовке".to_string())
        })?;
        if alphabet_size != expected_alphabet_size {
            return Err(CtcError::TrieFormat(format!(
                "дерево построено для алфавита размера {}, декодер использует {}",
                alphabet_size, expected_alphabet_size
            )));
        }

        let mut body = String::new();
        reader.read_to_string(&mut body)?;
        let mut tokens = body.split_ascii_whitespace();

        let mut nodes = Vec::new();
        let root = read_node(&mut tokens, &mut nodes, alphabet_size)?;
        if root.is_none() {
            return Err(CtcError::TrieFormat("корневой узел отсутствует".to_string()));
        }
        if tokens.next().is_some() {
            return Err(CtcError::TrieFormat(
                "лишние данные после корневого поддерева".to_string(),
            ));
        }

        debug!("дерево прочитано: {} узлов", nodes.len());
        Ok(Self {
            alphabet_size,
            nodes,
        })
    }

    /// Записать дерево в файл.
    pub fn save(&self, path: impl AsRef<Path>) -> CtcResult<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|e| {
            CtcError::TrieFormat(format!("не удалось создать {:?}: {e}", path))
        })?;
        let mut w = BufWriter::new(file);
        self.write_to(&mut w)?;
        w.flush()?;
        Ok(())
    }

    /// Прочитать дерево из файла.
    pub fn load(path: impl AsRef<Path>, expected_alphabet_size: usize) -> CtcResult<Self> {
        let path = path.as_ref();
        let mut file = std::fs::File::open(path).map_err(|e| {
            CtcError::TrieFormat(format!("не удалось открыть {:?}: {e}", path))
        })?;
        Self::read_from(&mut file, expected_alphabet_size)
    }
}

fn read_line(reader: &mut impl BufRead) -> CtcResult<String> {
    let mut line = String::new();
    let n = reader.read_line(&mut line)?;
    if n == 0 {
        return Err(CtcError::TrieFormat("файл оборван на заголовке".to_string()));
    }
    Ok(line.trim_end().to_string())
}

fn read_node<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    nodes: &mut Vec<TrieNode>,
    alphabet_size: usize,
) -> CtcResult<Option<NodeId>> {
    let first = next_token(tokens)?;
    let prefix_count: i64 = first
        .parse()
        .map_err(|_| CtcError::TrieFormat(format!("нечитаемый prefix_count {:?}", first)))?;
    if prefix_count == -1 {
        return Ok(None);
    }
    if prefix_count < 0 {
        return Err(CtcError::TrieFormat(format!(
            "отрицательный prefix_count {}",
            prefix_count
        )));
    }

    let id = nodes.len() as NodeId;
    let mut node = TrieNode::new(alphabet_size);
    node.prefix_count = prefix_count as u32;
    let word = next_token(tokens)?;
    node.min_score_word = word
        .parse::<WordIndex>()
        .map_err(|_| CtcError::TrieFormat(format!("нечитаемый min_score_word {:?}", word)))?;
    let score = next_token(tokens)?;
    node.min_unigram_score = score
        .parse::<f32>()
        .map_err(|_| CtcError::TrieFormat(format!("нечитаемый min_unigram_score {:?}", score)))?;
    nodes.push(node);

    for i in 0..alphabet_size {
        let child = read_node(tokens, nodes, alphabet_size)?;
        nodes[id as usize].children[i] = child;
    }
    Ok(Some(id))
}

fn next_token<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> CtcResult<&'a str> {
    tokens
        .next()
        .ok_or_else(|| CtcError::TrieFormat("файл оборван посреди узла".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctc_core::Alphabet;

    fn sample() -> (PrefixTrie, Alphabet) {
        let a = Alphabet::from_text(" \na\nc\nd\ng\no\nr\nt\n").unwrap();
        let mut t = PrefixTrie::new(a.size());
        t.insert("cat", &a, 10, -1.5).unwrap();
        t.insert("car", &a, 11, -0.9).unwrap();
        t.insert("dog", &a, 12, -2.3).unwrap();
        (t, a)
    }

    fn to_bytes(t: &PrefixTrie) -> Vec<u8> {
        let mut buf = Vec::new();
        t.write_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_round_trip_identical() {
        let (t, _) = sample();
        let buf = to_bytes(&t);
        let read = PrefixTrie::read_from(&mut buf.as_slice(), t.alphabet_size()).unwrap();
        // Структурное и значенческое равенство каждого узла: pre-order
        // нумерация совпадает, так что сравниваем арены поэлементно.
        assert_eq!(t.len(), read.len());
        for id in 0..t.len() as NodeId {
            assert_eq!(t.node(id), read.node(id), "узел {}", id);
        }
    }

    #[test]
    fn test_round_trip_bytes_stable() {
        let (t, _) = sample();
        let buf = to_bytes(&t);
        let read = PrefixTrie::read_from(&mut buf.as_slice(), t.alphabet_size()).unwrap();
        assert_eq!(buf, to_bytes(&read));
    }

    #[test]
    fn test_empty_trie_round_trip() {
        let t = PrefixTrie::new(5);
        let buf = to_bytes(&t);
        let read = PrefixTrie::read_from(&mut buf.as_slice(), 5).unwrap();
        assert!(read.is_empty());
        assert_eq!(read.node(crate::ROOT).min_unigram_score(), f32::MAX);
    }

    #[test]
    fn test_missing_header() {
        let data = b"0\n0\n0\n-1\n-1\n";
        let err = PrefixTrie::read_from(&mut data.as_slice(), 2).unwrap_err();
        assert!(matches!(err, CtcError::TrieFormat(_)));
    }

    #[test]
    fn test_wrong_version() {
        let data = b"ctc-trie 99\n2\n";
        assert!(PrefixTrie::read_from(&mut data.as_slice(), 2).is_err());
    }

    #[test]
    fn test_alphabet_size_mismatch() {
        let (t, _) = sample();
        let buf = to_bytes(&t);
        assert!(PrefixTrie::read_from(&mut buf.as_slice(), 3).is_err());
    }

    #[test]
    fn test_truncated_body() {
        let (t, _) = sample();
        let buf = to_bytes(&t);
        let cut = &buf[..buf.len() / 2];
        assert!(PrefixTrie::read_from(&mut cut.to_vec().as_slice(), t.alphabet_size()).is_err());
    }

    #[test]
    fn test_trailing_garbage() {
        let (t, _) = sample();
        let mut buf = to_bytes(&t);
        buf.extend_from_slice(b"7\n");
        assert!(PrefixTrie::read_from(&mut buf.as_slice(), t.alphabet_size()).is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let (t, _) = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.trie");
        t.save(&path).unwrap();
        let read = PrefixTrie::load(&path, t.alphabet_size()).unwrap();
        assert_eq!(t.len(), read.len());
        for id in 0..t.len() as NodeId {
            assert_eq!(t.node(id), read.node(id));
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = PrefixTrie::load("/нет/такого/файла.trie", 4).unwrap_err();
        assert!(matches!(err, CtcError::TrieFormat(_)));
    }
}
