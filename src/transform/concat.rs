// src/transform/concat.rs

use std::path::{Component, PathBuf};

use crate::transform::{SourceFile, Transform, TransformError};

/// Join every input into one file named `output`, in input order,
/// separated by newlines.
///
/// An empty batch yields an empty batch; no output file is written.
#[derive(Debug, Clone)]
pub struct Concat {
    output: PathBuf,
}

impl Concat {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

impl Transform for Concat {
    fn apply(&self, files: Vec<SourceFile>) -> Result<Vec<SourceFile>, TransformError> {
        let relative_name = self
            .output
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if self.output.as_os_str().is_empty() || !relative_name {
            return Err(TransformError::malformed(
                &self.output,
                "concat output must be a relative file name",
            ));
        }

        if files.is_empty() {
            return Ok(Vec::new());
        }

        let total: usize = files.iter().map(|f| f.contents.len() + 1).sum();
        let mut contents = Vec::with_capacity(total);
        for (i, file) in files.iter().enumerate() {
            if i > 0 {
                contents.push(b'\n');
            }
            contents.extend_from_slice(&file.contents);
        }

        Ok(vec![SourceFile::new(self.output.clone(), contents)])
    }

    fn name(&self) -> String {
        format!("concat({})", self.output.display())
    }
}
