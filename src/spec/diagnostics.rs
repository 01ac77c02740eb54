use std::fmt;

use crate::spec::source::SourceMap;

/// One element of a field path inside a spec document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PathElem {
    Key(String),
    Index(usize),
}

/// Field path such as `blocks[2].bbox.relative.width`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SpecPath(Vec<PathElem>);

impl SpecPath {
    pub(crate) fn root() -> Self {
        Self::default()
    }

    pub(crate) fn key(&self, k: &str) -> Self {
        let mut p = self.0.clone();
        p.push(PathElem::Key(k.to_owned()));
        Self(p)
    }

    pub(crate) fn index(&self, i: usize) -> Self {
        let mut p = self.0.clone();
        p.push(PathElem::Index(i));
        Self(p)
    }
}

impl fmt::Display for SpecPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(document)");
        }
        for (i, elem) in self.0.iter().enumerate() {
            match elem {
                PathElem::Key(k) if i == 0 => f.write_str(k)?,
                PathElem::Key(k) => write!(f, ".{k}")?,
                PathElem::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

/// A single located spec problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecError {
    /// Spec file the error belongs to (`structure.yaml`, ...).
    pub file: String,
    pub path: String,
    /// 1-based source line, when it could be located.
    pub line: Option<usize>,
    pub message: String,
    pub value: Option<String>,
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}: {}", self.file, line, self.path, self.message)?,
            None => write!(f, "{}: {}: {}", self.file, self.path, self.message)?,
        }
        if let Some(v) = &self.value {
            write!(f, " (got {v})")?;
        }
        Ok(())
    }
}

/// Ordered collection of every problem found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecErrors {
    /// Errors in discovery order: structural first, then semantic.
    pub errors: Vec<SpecError>,
}

impl SpecErrors {
    /// Number of collected errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Return `true` when nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Append every error of `other`.
    pub fn extend(&mut self, other: SpecErrors) {
        self.errors.extend(other.errors);
    }
}

impl fmt::Display for SpecErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SpecErrors {}

/// Error collector bound to one source document.
pub(crate) struct Diagnostics<'a> {
    file: &'a str,
    source: &'a SourceMap,
    errors: Vec<SpecError>,
}

impl<'a> Diagnostics<'a> {
    pub(crate) fn new(file: &'a str, source: &'a SourceMap) -> Self {
        Self {
            file,
            source,
            errors: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, path: &SpecPath, message: impl Into<String>) {
        self.push(path, message.into(), None);
    }

    pub(crate) fn error_value(
        &mut self,
        path: &SpecPath,
        message: impl Into<String>,
        value: impl fmt::Display,
    ) {
        self.push(path, message.into(), Some(value.to_string()));
    }

    pub(crate) fn error_at_line(&mut self, line: Option<usize>, message: impl Into<String>) {
        self.errors.push(SpecError {
            file: self.file.to_owned(),
            path: SpecPath::root().to_string(),
            line,
            message: message.into(),
            value: None,
        });
    }

    pub(crate) fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub(crate) fn into_errors(self) -> SpecErrors {
        SpecErrors {
            errors: self.errors,
        }
    }

    fn push(&mut self, path: &SpecPath, message: String, value: Option<String>) {
        let rendered = path.to_string();
        let line = self.source.line_of(&rendered);
        self.errors.push(SpecError {
            file: self.file.to_owned(),
            path: rendered,
            line,
            message,
            value,
        });
    }
}
