//! Алфавит: отображение label ↔ строка.
//!
//! Формат файла — одна метка на строку:
//! - строка `#` начинает комментарий; литеральный символ `#` кодируется как `\#`;
//! - строка, состоящая из одного пробела, задает метку-разделитель слов;
//! - пустые строки игнорируются.
//!
//! Индексы меток присваиваются по порядку следования строк. Blank-метка
//! в файле не описывается: по соглашению CTC это индекс `size()`,
//! то есть последний класс выхода сети.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{CtcError, CtcResult};

/// Индекс метки в алфавите.
pub type Label = usize;

/// Алфавит выходных меток CTC-сети.
#[derive(Debug, Clone)]
pub struct Alphabet {
    label_to_str: Vec<String>,
    str_to_label: HashMap<String, Label>,
    space_label: Option<Label>,
}

impl Alphabet {
    /// Загрузить алфавит из текстового файла.
    pub fn from_file(path: impl AsRef<Path>) -> CtcResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            CtcError::Alphabet(format!("не удалось прочитать {:?}: {e}", path))
        })?;
        Self::from_text(&data)
    }

    /// Разобрать алфавит из содержимого файла.
    pub fn from_text(text: &str) -> CtcResult<Self> {
        let mut label_to_str = Vec::new();
        let mut str_to_label = HashMap::new();
        let mut space_label = None;

        for raw in text.lines() {
            // Поддержка CRLF-файлов: lines() оставляет '\r' в конце.
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            // Метка "#" задается только через экранирование \#; любая
            // другая строка с '#' в начале — комментарий.
            let line = if line == "\\#" {
                "#"
            } else {
                if line.starts_with('#') {
                    continue;
                }
                line
            };
            if line.is_empty() {
                continue;
            }
            if line == " " {
                space_label = Some(label_to_str.len());
            }
            str_to_label.insert(line.to_string(), label_to_str.len());
            label_to_str.push(line.to_string());
        }

        if label_to_str.is_empty() {
            return Err(CtcError::Alphabet("алфавит пуст".to_string()));
        }

        Ok(Self {
            label_to_str,
            str_to_label,
            space_label,
        })
    }

    /// Строковое представление метки.
    pub fn string_from_label(&self, label: Label) -> CtcResult<&str> {
        self.label_to_str
            .get(label)
            .map(|s| s.as_str())
            .ok_or_else(|| {
                CtcError::InvalidArgument(format!(
                    "метка {} вне алфавита размера {}",
                    label,
                    self.label_to_str.len()
                ))
            })
    }

    /// Метка по строковому представлению.
    pub fn label_from_string(&self, s: &str) -> Option<Label> {
        self.str_to_label.get(s).copied()
    }

    /// Является ли метка разделителем слов.
    pub fn is_space(&self, label: Label) -> bool {
        self.space_label == Some(label)
    }

    /// Количество меток (без blank).
    pub fn size(&self) -> usize {
        self.label_to_str.len()
    }

    /// Склеить последовательность меток в строку.
    pub fn render(&self, labels: &[Label]) -> CtcResult<String> {
        let mut out = String::new();
        for &l in labels {
            out.push_str(self.string_from_label(l)?);
        }
        Ok(out)
    }
}
