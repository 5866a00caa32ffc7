//!
//! CLI для CTC-декодера: сборка префиксного дерева словаря и
//! декодирование сохраненных вероятностей в текст.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::warn;

use ctc_core::{Alphabet, DecodeOptions, ScorerWeights};
use ctc_lm::{ArpaModel, LanguageModel, NOT_FOUND};
use ctc_pipeline::DecodePipeline;
use ctc_trie::PrefixTrie;

#[derive(Parser)]
#[command(name = "ctcdecode")]
#[command(author, version, about = "CTC beam search decoder with n-gram LM", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Собрать префиксное дерево словаря с униграммными оценками LM
    BuildTrie {
        /// Файл алфавита (одна метка на строку)
        #[arg(long)]
        alphabet: PathBuf,

        /// ARPA-файл языковой модели
        #[arg(long)]
        lm: PathBuf,

        /// Список слов словаря, одно на строку
        #[arg(long)]
        vocabulary: PathBuf,

        /// Куда записать дерево
        #[arg(long)]
        output: PathBuf,
    },

    /// Декодировать вероятности меток в текст
    Decode {
        /// JSON-файл вероятностей: [time][num_classes], после softmax
        #[arg(long)]
        probs: PathBuf,

        /// ARPA-файл языковой модели
        #[arg(long)]
        lm: PathBuf,

        /// Префиксное дерево словаря (см. build-trie)
        #[arg(long)]
        trie: PathBuf,

        /// Файл алфавита (одна метка на строку)
        #[arg(long)]
        alphabet: PathBuf,

        /// Ширина луча
        #[arg(long, default_value_t = 100)]
        beam_width: usize,

        /// Сколько лучших гипотез вывести
        #[arg(long, default_value_t = 1)]
        top_paths: usize,

        /// Вес языковой модели (alpha)
        #[arg(long, default_value_t = 0.75)]
        lm_weight: f32,

        /// Бонус за слово (beta)
        #[arg(long, default_value_t = 1.85)]
        word_count_weight: f32,

        /// Дополнительный бонус за слово из словаря LM
        #[arg(long, default_value_t = 1.0)]
        valid_word_count_weight: f32,

        /// Склеивать ли повторы меток без blank между ними
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        merge_repeated: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::BuildTrie {
            alphabet,
            lm,
            vocabulary,
            output,
        } => run_build_trie(&alphabet, &lm, &vocabulary, &output),

        Commands::Decode {
            probs,
            lm,
            trie,
            alphabet,
            beam_width,
            top_paths,
            lm_weight,
            word_count_weight,
            valid_word_count_weight,
            merge_repeated,
        } => {
            let weights = ScorerWeights {
                lm_weight,
                word_count_weight,
                valid_word_count_weight,
                ..ScorerWeights::default()
            };
            let options = DecodeOptions {
                beam_width,
                top_paths,
                merge_repeated,
            };
            run_decode(&probs, &lm, &trie, &alphabet, weights, options)
        }
    }
}

fn run_build_trie(
    alphabet_path: &PathBuf,
    lm_path: &PathBuf,
    vocabulary_path: &PathBuf,
    output_path: &PathBuf,
) -> Result<()> {
    println!("🌳 Сборка префиксного дерева");
    println!("============================");
    println!("Алфавит: {}", alphabet_path.display());
    println!("LM:      {}", lm_path.display());
    println!("Словарь: {}", vocabulary_path.display());
    println!();

    let start = Instant::now();

    let alphabet = Alphabet::from_file(alphabet_path)?;
    println!("📖 Алфавит: {} меток", alphabet.size());

    let model = ArpaModel::from_file(lm_path)?;
    println!("🧠 LM порядка {} загружена", model.order());

    let words = std::fs::read_to_string(vocabulary_path)
        .with_context(|| format!("не удалось прочитать {}", vocabulary_path.display()))?;

    let mut trie = PrefixTrie::new(alphabet.size());
    let context = model.null_context_state();
    let mut inserted = 0usize;
    let mut missing = 0usize;
    for word in words.lines().map(str::trim).filter(|w| !w.is_empty()) {
        let index = model.vocabulary().index(word);
        if index == NOT_FOUND {
            warn!("слово {:?} отсутствует в словаре LM, получит оценку <unk>", word);
            missing += 1;
        }
        let (score, _) = model.full_score(&context, index);
        trie.insert(word, &alphabet, index, score)?;
        inserted += 1;
    }
    if inserted == 0 {
        bail!("словарь {} пуст", vocabulary_path.display());
    }

    trie.save(output_path)?;
    println!(
        "✅ Дерево из {} узлов ({} слов, {} вне LM) записано в {} за {:.2}s",
        trie.len(),
        inserted,
        missing,
        output_path.display(),
        start.elapsed().as_secs_f32()
    );
    Ok(())
}

fn run_decode(
    probs_path: &PathBuf,
    lm_path: &PathBuf,
    trie_path: &PathBuf,
    alphabet_path: &PathBuf,
    weights: ScorerWeights,
    options: DecodeOptions,
) -> Result<()> {
    println!("🔍 CTC-декодирование");
    println!("====================");
    println!("Вероятности: {}", probs_path.display());
    println!("LM:          {}", lm_path.display());
    println!("Дерево:      {}", trie_path.display());
    println!();

    let start = Instant::now();

    let text = std::fs::read_to_string(probs_path)
        .with_context(|| format!("не удалось прочитать {}", probs_path.display()))?;
    let frames: Vec<Vec<f32>> =
        serde_json::from_str(&text).context("вероятности должны быть JSON [time][num_classes]")?;
    if frames.is_empty() {
        bail!("файл вероятностей пуст");
    }
    let num_classes = frames[0].len();
    if let Some(bad) = frames.iter().position(|f| f.len() != num_classes) {
        bail!(
            "кадр {} имеет {} классов, ожидалось {}",
            bad,
            frames[bad].len(),
            num_classes
        );
    }

    let pipeline = DecodePipeline::from_files(lm_path, trie_path, alphabet_path, weights, options)?;

    let max_time = frames.len();
    let flat: Vec<f32> = frames.into_iter().flatten().collect();
    let inputs = candle_core::Tensor::from_vec(
        flat,
        (max_time, 1, num_classes),
        &candle_core::Device::Cpu,
    )?;

    let output = pipeline.decode(&inputs, &[max_time])?;
    let transcripts = output.transcripts(pipeline.alphabet())?;

    println!("✅ Декодировано за {:.2}s", start.elapsed().as_secs_f32());
    println!();
    for (p, text) in transcripts[0].iter().enumerate() {
        println!("{:>2}. [{:9.4}] {}", p + 1, output.log_probability[0][p], text);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_flags_parse() {
        let cli = Cli::parse_from([
            "ctcdecode",
            "decode",
            "--probs",
            "p.json",
            "--lm",
            "m.arpa",
            "--trie",
            "words.trie",
            "--alphabet",
            "a.txt",
            "--valid-word-count-weight",
            "0.5",
            "--merge-repeated",
            "false",
        ]);
        match cli.command {
            Commands::Decode {
                valid_word_count_weight,
                merge_repeated,
                lm_weight,
                ..
            } => {
                assert_eq!(valid_word_count_weight, 0.5);
                assert!(!merge_repeated);
                assert_eq!(lm_weight, 0.75);
            }
            _ => panic!("ожидалась подкоманда decode"),
        }
    }

    #[test]
    fn test_decode_flag_defaults() {
        let cli = Cli::parse_from([
            "ctcdecode", "decode", "--probs", "p.json", "--lm", "m.arpa", "--trie", "words.trie",
            "--alphabet", "a.txt",
        ]);
        match cli.command {
            Commands::Decode {
                valid_word_count_weight,
                merge_repeated,
                ..
            } => {
                assert_eq!(valid_word_count_weight, 1.0);
                assert!(merge_repeated);
            }
            _ => panic!("ожидалась подкоманда decode"),
        }
    }
}
