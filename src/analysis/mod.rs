pub mod vocabulary;
pub mod language;
pub mod tokenizer;
pub mod vectorizer;
pub mod analyzer;
