use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use regex::Regex;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::PodKey;
use crate::writer::indexer::IncomingDocument;

const DESCRIPTION_TAG: &str = "{{DESCRIPTION}}";
const BODY_TAG: &str = "{{BODY}}";

/// One document of a crawl corpus
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusEntry {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub description: String,
    /// Description followed by the body text
    pub body: String,
}

impl CorpusEntry {
    pub fn into_document(self, pod: PodKey) -> IncomingDocument {
        IncomingDocument {
            url: self.url,
            pod,
            title: self.title,
            snippet: self.snippet,
            description: self.description,
            body: self.body,
        }
    }
}

/// Reader for the crawler's corpus files:
///
/// ```text
/// <doc title='Annual report' url='/home/ann/report.txt'>
/// {{DESCRIPTION}} Figures for the year
/// {{BODY}} first body line
/// more body
/// </doc>
/// ```
pub struct CorpusReader {
    url_re: Regex,
    title_re: Regex,
    snippet_length: usize,
}

impl CorpusReader {
    pub fn new(snippet_length: usize) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::new(ErrorKind::InvalidArgument, e.to_string()))
        };
        Ok(CorpusReader {
            url_re: compile(r"url='([^']*)'")?,
            title_re: compile(r"title='([^']*)'")?,
            snippet_length,
        })
    }

    pub fn read_file(&self, path: &Path) -> Result<Vec<CorpusEntry>> {
        self.read(BufReader::new(File::open(path)?))
    }

    pub fn parse_str(&self, content: &str) -> Result<Vec<CorpusEntry>> {
        self.read(content.as_bytes())
    }

    pub fn read<R: BufRead>(&self, reader: R) -> Result<Vec<CorpusEntry>> {
        let mut entries = Vec::new();
        let mut open: Option<(String, String)> = None;
        let mut description = String::new();
        let mut body = String::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;

            if line.starts_with("<doc") {
                let url = self.capture(&self.url_re, &line).ok_or_else(|| {
                    Error::new(ErrorKind::Parse, format!("corpus line {}: <doc> without url", line_no + 1))
                })?;
                let title = self.capture(&self.title_re, &line).unwrap_or_default();
                open = Some((url, title));
                description.clear();
                body.clear();
            } else if line.contains("</doc") {
                let Some((url, title)) = open.take() else {
                    return Err(Error::new(
                        ErrorKind::Parse,
                        format!("corpus line {}: </doc> without <doc>", line_no + 1),
                    ));
                };
                let snippet: String = body.chars().take(self.snippet_length).collect();
                entries.push(CorpusEntry {
                    url,
                    title,
                    snippet: snippet.trim_end().to_string(),
                    body: format!("{} {}", description, body.trim_end()).trim().to_string(),
                    description: std::mem::take(&mut description),
                });
                body.clear();
            } else if let Some(rest) = line.strip_prefix(DESCRIPTION_TAG) {
                description = rest.trim_start().to_string();
            } else {
                let text = line.strip_prefix(BODY_TAG).map(str::trim_start).unwrap_or(&line);
                body.push_str(text);
                body.push(' ');
            }
        }

        Ok(entries)
    }

    fn capture(&self, re: &Regex, line: &str) -> Option<String> {
        re.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
    }
}
