//! Scripted stand-in for the extraction tool.
//!
//! The script understands the subset of the real command line the service
//! emits (`--dump-json`, `-o`, `-f`, `-x`, `--audio-format`,
//! `--merge-output-format`, `--cookies`), prints progress in the real tool's
//! format and writes a small artifact at the resolved template path. It runs
//! through `/bin/sh <script>` rather than being executed directly, which
//! sidesteps `ETXTBSY` races when tests write and spawn in parallel.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reelay_config::ToolSettings;
use tempfile::TempDir;

use crate::fixtures::{SAMPLE_INFO_JSON, SHELL};

/// Behaviour of the fake tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeToolMode {
    /// Print progress and write the artifact.
    Succeed,
    /// Like [`FakeToolMode::Succeed`] but pauses between progress lines.
    Slow,
    /// Print a diagnostic on stderr and exit with status 1.
    Fail,
    /// Sleep far longer than any test waits.
    Hang,
    /// Emit non-JSON output in metadata mode.
    Garbage,
    /// Exit successfully without writing an artifact.
    NoArtifact,
}

impl FakeToolMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Succeed => "succeed",
            Self::Slow => "slow",
            Self::Fail => "fail",
            Self::Hang => "hang",
            Self::Garbage => "garbage",
            Self::NoArtifact => "no-artifact",
        }
    }
}

/// Installed fake tool living in its own temporary directory.
pub struct FakeTool {
    dir: TempDir,
    script: PathBuf,
    args_log: PathBuf,
}

impl FakeTool {
    /// Write the script for `mode` into a fresh temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or script cannot be created.
    pub fn install(mode: FakeToolMode) -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create fake tool directory")?;
        let script = dir.path().join("fake-ytdlp.sh");
        let args_log = dir.path().join("args.log");
        let body = render_script(mode, &args_log);
        fs::write(&script, body)
            .with_context(|| format!("failed to write {}", script.display()))?;
        Ok(Self {
            dir,
            script,
            args_log,
        })
    }

    /// Directory holding the script; usable as scratch space.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Program to launch.
    #[must_use]
    pub fn program(&self) -> String {
        SHELL.to_string()
    }

    /// Leading arguments that select the script.
    #[must_use]
    pub fn base_args(&self) -> Vec<String> {
        vec![self.script.display().to_string()]
    }

    /// Tool settings pointing at this fake.
    #[must_use]
    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            program: self.program(),
            base_args: self.base_args(),
            cookies_file: None,
            extra_path: Vec::new(),
            combined_hosts: vec!["youtube.com".to_string(), "youtu.be".to_string()],
        }
    }

    /// Arguments received by the most recent invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool has not run yet.
    pub fn recorded_args(&self) -> Result<Vec<String>> {
        let raw = fs::read_to_string(&self.args_log)
            .with_context(|| format!("failed to read {}", self.args_log.display()))?;
        Ok(raw.lines().map(str::to_string).collect())
    }
}

fn render_script(mode: FakeToolMode, args_log: &Path) -> String {
    format!(
        r#"#!/bin/sh
mode='{mode}'
printf '%s\n' "$@" > '{args_log}'
dump=0
out=''
audio=''
merge=''
url=''
while [ $# -gt 0 ]; do
  case "$1" in
    --dump-json) dump=1 ;;
    -o) shift; out="$1" ;;
    -f|--audio-quality|--cookies) shift ;;
    --audio-format) shift; audio="$1" ;;
    --merge-output-format) shift; merge="$1" ;;
    -*) ;;
    *) url="$1" ;;
  esac
  shift
done

if [ "$mode" = "fail" ]; then
  echo "ERROR: [generic] Unable to download webpage: HTTP Error 404: Not Found" >&2
  exit 1
fi

if [ "$dump" = "1" ]; then
  if [ "$mode" = "garbage" ]; then
    echo "this is not json"
    exit 0
  fi
  printf '%s\n' '{info}'
  exit 0
fi

if [ "$mode" = "hang" ]; then
  exec sleep 600
fi

ext=mp4
if [ -n "$audio" ]; then
  ext="$audio"
elif [ -n "$merge" ]; then
  ext="$merge"
fi
dest=$(printf '%s' "$out" | sed "s/%(ext)s/$ext/")

echo "[generic] Extracting URL: $url"
echo "[download] Destination: $dest"
for pct in 10.0 42.5 75.0 100.0; do
  echo "[download]  $pct% of 1.00MiB at 1.2MiB/s ETA 00:01"
  if [ "$mode" = "slow" ]; then
    sleep 1
  fi
done
echo "[download]  100% of 1.00MiB in 00:00:01 at 1.00MiB/s" >&2

if [ "$mode" != "no-artifact" ]; then
  printf 'fake %s payload for %s\n' "$ext" "$url" > "$dest"
fi
exit 0
"#,
        mode = mode.as_str(),
        args_log = args_log.display(),
        info = SAMPLE_INFO_JSON,
    )
}
