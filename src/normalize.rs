// src/normalize.rs

use crate::model::ClassKey;

/// Resolves tool-specific class references (source paths, qualified names) to a `ClassKey`.
///
/// Paths lose everything up to and including a known source root, then the source
/// extension, then have their separators turned into dots. Qualified names are taken as
/// they are. Either way, a nested-class suffix (`Outer$Inner`) collapses onto the
/// enclosing top-level class, matching what a per-file reference can express.
#[derive(Debug, Clone)]
pub struct ClassKeyNormalizer {
    source_roots: Vec<String>,
    extension: String,
}

impl Default for ClassKeyNormalizer {
    fn default() -> Self {
        ClassKeyNormalizer::new(vec!["src/main/java/".to_string()], ".java")
    }
}

impl ClassKeyNormalizer {
    pub fn new(source_roots: Vec<String>, extension: &str) -> Self {
        let source_roots = source_roots
            .into_iter()
            .map(|root| {
                let root = root.replace('\\', "/");
                let root = root.trim_matches('/');
                format!("{root}/")
            })
            .filter(|root| root != "/")
            .collect();
        let extension = if extension.is_empty() || extension.starts_with('.') {
            extension.to_string()
        } else {
            format!(".{extension}")
        };
        ClassKeyNormalizer {
            source_roots,
            extension,
        }
    }

    pub fn normalize(&self, raw: &str) -> ClassKey {
        let raw = raw.trim().replace('\\', "/");
        let is_path = raw.contains('/');

        let mut rel = raw.as_str();
        if is_path {
            for root in &self.source_roots {
                if let Some(rest) = rel.strip_prefix(root.as_str()) {
                    rel = rest;
                    break;
                }
                if let Some(idx) = rel.find(&format!("/{root}")) {
                    rel = &rel[idx + root.len() + 1..];
                    break;
                }
            }
        }

        // A dotted qualified name only carries the extension when it is a bare file name.
        if !self.extension.is_empty() {
            if let Some(stem) = rel.strip_suffix(self.extension.as_str()) {
                if is_path || !stem.contains('.') {
                    rel = stem;
                }
            }
        }

        let dotted = rel.trim_matches('/').replace('/', ".");
        let top_level = match dotted.find('$') {
            Some(idx) => &dotted[..idx],
            None => dotted.as_str(),
        };
        ClassKey::from_canonical(top_level.to_string())
    }
}
