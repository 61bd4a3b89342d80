// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decoding of the on-disk service-spec JSON file.
//!
//! The file is an object keyed by label, pointed at by the
//! `SVCINIT_SERVICE_SPECS_RLOCATION_PATH` environment variable and
//! produced by a build-system integration out of scope for this crate.
//! Paths inside the file are runfile-relative and are resolved by the
//! caller (`svcinit-daemon`), not here.

use indexmap::IndexMap;
use thiserror::Error;

use svcinit_core::{Label, ServiceSpec};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to read service spec file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse service spec file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("label mismatch: key {key:?} does not match spec.label {label:?}")]
    LabelMismatch { key: String, label: String },
}

/// Decode a service-spec JSON file's contents into an ordered map from
/// label to spec.
///
/// Preserves on-disk key order so dependent code that iterates without an
/// explicit dependency-aware sort still sees a deterministic, file-order
/// traversal. Unknown JSON fields are ignored for forward compatibility
/// with the build-system-side writer.
pub fn decode_spec_file(path: &str, contents: &str) -> Result<IndexMap<Label, ServiceSpec>, WireError> {
    let raw: IndexMap<String, ServiceSpec> =
        serde_json::from_str(contents).map_err(|source| WireError::Parse {
            path: path.to_string(),
            source,
        })?;

    let mut specs = IndexMap::with_capacity(raw.len());
    for (key, spec) in raw {
        if spec.label.as_str() != key {
            return Err(WireError::LabelMismatch {
                key,
                label: spec.label.to_string(),
            });
        }
        specs.insert(spec.label.clone(), spec);
    }
    Ok(specs)
}

/// Read and decode the service-spec file at `path`.
pub fn read_spec_file(path: &str) -> Result<IndexMap<Label, ServiceSpec>, WireError> {
    let contents = std::fs::read_to_string(path).map_err(|source| WireError::Read {
        path: path.to_string(),
        source,
    })?;
    decode_spec_file(path, &contents)
}

#[cfg(test)]
#[path = "spec_file_tests.rs"]
mod tests;
