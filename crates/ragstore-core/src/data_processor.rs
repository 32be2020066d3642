use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{Chunk, SourceText};

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];
const TEXT_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Recursive character splitter. Lengths are counted in characters.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidInput("chunk_size must be >= 1".into()));
        }
        if overlap > chunk_size {
            return Err(Error::InvalidInput(format!("overlap ({overlap}) must not exceed chunk_size ({chunk_size})")));
        }
        Ok(Self { chunk_size, overlap })
    }

    /// Split every document and number the chunks by their position in the
    /// resulting sequence.
    pub fn split_documents(&self, docs: &[SourceText]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for doc in docs {
            for text in self.split_text(&doc.text) {
                chunks.push(Chunk { id: chunks.len(), source_document: doc.source.clone(), text });
            }
        }
        chunks
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_with(text, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // First separator present in the text; "" always matches.
        let (idx, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
            .map(|(i, sep)| (i, *sep))
            .unwrap_or((separators.len(), ""));
        let remaining = separators.get(idx + 1..).unwrap_or(&[]);

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator).filter(|s| !s.is_empty()).map(str::to_string).collect()
        };

        let mut out = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        for piece in pieces {
            if char_len(&piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                out.extend(self.merge(&pending, separator));
                pending.clear();
            }
            if remaining.is_empty() {
                out.push(piece);
            } else {
                out.extend(self.split_with(&piece, remaining));
            }
        }
        if !pending.is_empty() {
            out.extend(self.merge(&pending, separator));
        }
        out
    }

    /// Greedily join pieces up to `chunk_size`, seeding each new chunk with
    /// trailing pieces of the previous one totalling at most `overlap`.
    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut docs = Vec::new();
        let mut window: std::collections::VecDeque<&str> = std::collections::VecDeque::new();
        let mut total = 0usize;
        for piece in pieces {
            let len = char_len(piece);
            let joined_len = |total: usize, window_len: usize| total + len + if window_len > 0 { sep_len } else { 0 };
            if joined_len(total, window.len()) > self.chunk_size && !window.is_empty() {
                push_joined(&mut docs, &window, separator);
                while total > self.overlap || (total > 0 && joined_len(total, window.len()) > self.chunk_size) {
                    let Some(first) = window.pop_front() else { break };
                    total -= char_len(first) + if window.is_empty() { 0 } else { sep_len };
                }
            }
            total += len + if window.is_empty() { 0 } else { sep_len };
            window.push_back(piece);
        }
        push_joined(&mut docs, &window, separator);
        docs
    }
}

fn push_joined(docs: &mut Vec<String>, window: &std::collections::VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize { s.chars().count() }

/// Loads plain-text documents from a directory tree.
#[derive(Default)]
pub struct DataProcessor;

impl DataProcessor {
    pub fn new() -> Self { Self }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<SourceText>> {
        self.process_files(data_dir, self.list_text_files(data_dir))
    }

    pub fn process_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<SourceText>> {
        let mut files = self.list_text_files(data_dir);
        files.truncate(limit);
        self.process_files(data_dir, files)
    }

    fn process_files(&self, data_dir: &Path, files: Vec<PathBuf>) -> Result<Vec<SourceText>> {
        if !data_dir.is_dir() {
            return Err(Error::InvalidInput(format!("{} is not a directory", data_dir.display())));
        }
        let mut docs = Vec::with_capacity(files.len());
        for file_path in &files {
            let text = self.read_file_content(file_path)?;
            if text.trim().is_empty() { continue; }
            docs.push(SourceText { text, source: file_path.to_string_lossy().to_string() });
        }
        Ok(docs)
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        let bytes = fs::read(file_path)
            .map_err(|e| Error::InvalidInput(format!("cannot read {}: {e}", file_path.display())))?;
        Ok(match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).to_string(),
        })
    }

    fn list_text_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|s| s.to_str()).is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext)))
            .collect();
        files.sort();
        files
    }
}
