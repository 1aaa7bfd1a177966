//! Rich diagnostics for YAML documents that fail to parse

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A YAML syntax or shape error with the offending source attached
#[derive(Debug, Error, Diagnostic)]
#[error("Failed to parse {filename}: {message}")]
#[diagnostic(
    code(coilqc::yaml::syntax),
    help("Fix the document by hand or restore it from a backup")
)]
pub struct YamlSyntaxError {
    pub filename: String,
    pub message: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("here")]
    pub span: Option<SourceSpan>,
}

impl YamlSyntaxError {
    /// Build a diagnostic from a serde_yml error, pointing at its location
    pub fn from_serde_error(err: &serde_yml::Error, content: &str, filename: &str) -> Self {
        let span = err
            .location()
            .map(|loc| SourceSpan::from((loc.index().min(content.len()), 1)));
        Self {
            filename: filename.to_string(),
            message: err.to_string(),
            src: NamedSource::new(filename, content.to_string()),
            span,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum YamlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("Failed to read document: {0}")]
    #[diagnostic(code(coilqc::yaml::io))]
    Io(#[from] std::io::Error),
}
