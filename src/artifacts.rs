//! On-disk layout of the files produced for one test instance.
//!
//! For an instance named `T` under the generation root `R` every artifact
//! lives in `R/T/`:
//!
//! | file            | role                           |
//! |-----------------|--------------------------------|
//! | `T.opb`         | source constraint              |
//! | `T.pbp`         | encoder proof                  |
//! | `T.cnf`         | encoded clauses                |
//! | `T.min.opt.opb` | minimization query             |
//! | `T.max.opt.opb` | maximization query             |
//!
//! The files are kept after the run for post-hoc inspection.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::tools::EncoderOutput;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ArtifactPaths {
    dir: PathBuf,
    test_name: String,
}

impl ArtifactPaths {
    /// # Panics
    ///
    /// Panics if `test_name` is empty or contains a path separator.
    pub fn new(root: impl AsRef<Path>, test_name: impl Into<String>) -> Self {
        match Self::try_new(root, test_name) {
            Ok(paths) => paths,
            Err(error) => panic!("{}", error),
        }
    }

    pub fn try_new(root: impl AsRef<Path>, test_name: impl Into<String>) -> Result<Self, PipelineError> {
        let test_name = test_name.into();
        if test_name.is_empty() || test_name.contains(['/', '\\']) {
            return Err(PipelineError::InvalidTestName(test_name));
        }
        Ok(Self {
            dir: root.as_ref().join(&test_name),
            test_name,
        })
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.test_name, suffix))
    }

    pub fn source(&self) -> PathBuf {
        self.file("opb")
    }

    pub fn proof(&self) -> PathBuf {
        self.file("pbp")
    }

    pub fn cnf(&self) -> PathBuf {
        self.file("cnf")
    }

    pub fn min_query(&self) -> PathBuf {
        self.file("min.opt.opb")
    }

    pub fn max_query(&self) -> PathBuf {
        self.file("max.opt.opb")
    }

    /// Where the encoder is expected to leave its output for [`source`](Self::source).
    pub fn encoder_output(&self) -> EncoderOutput {
        EncoderOutput {
            cnf: self.cnf(),
            proof: self.proof(),
        }
    }

    pub fn create_dir(&self) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.dir).map_err(|e| PipelineError::io(&self.dir, e))
    }
}
