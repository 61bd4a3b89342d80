// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-buffered, color-prefixed log writer (spec.md §4.3).
//!
//! Each complete line read from a child's stdout/stderr is prefixed with
//! the instance's color + label and written to both the supervisor's own
//! stdout and a per-service log file, the latter exposed to the
//! control-plane `GET /v0/log` endpoint via [`LogWriter::path`].

use std::path::{Path, PathBuf};

use svcinit_core::colorize;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Owns the per-service log file and the label prefix applied to every
/// line teed through it.
#[derive(Clone)]
pub struct LogWriter {
    path: PathBuf,
    prefix: String,
}

impl LogWriter {
    /// Create (or truncate) the log file at `path`, prefixing every future
    /// line with `label` colorized with `color`.
    pub async fn create(path: impl Into<PathBuf>, label: &str, color: u8) -> std::io::Result<Self> {
        let path = path.into();
        File::create(&path).await?;
        Ok(Self {
            path,
            prefix: format!("{} ", colorize(color, &format!("[{label}]"))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain `reader` line by line until EOF, writing each prefixed line
    /// to both `stdout_mirror` and the log file.
    pub async fn pump<R, W>(&self, reader: R, mut stdout_mirror: W) -> std::io::Result<()>
    where
        R: tokio::io::AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut file = tokio::fs::OpenOptions::new().append(true).open(&self.path).await?;
        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            let prefixed = format!("{}{}\n", self.prefix, line);
            stdout_mirror.write_all(prefixed.as_bytes()).await?;
            file.write_all(prefixed.as_bytes()).await?;
        }
        stdout_mirror.flush().await?;
        file.flush().await
    }
}

#[cfg(test)]
#[path = "log_writer_tests.rs"]
mod tests;
