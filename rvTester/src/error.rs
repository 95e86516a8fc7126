use std::io;
use std::path::PathBuf;

use thiserror::Error;
use types::NameError;

/// Problems with the corpus itself. These abort the run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to read test directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    MalformedName(#[from] NameError),
}

#[derive(Debug, Error)]
pub enum SymbolError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse ELF {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: goblin::error::Error,
    },

    #[error("symbol `{symbol}` not found in {}", path.display())]
    Missing { symbol: String, path: PathBuf },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to write configuration in {}: {source}", dir.display())]
    Write {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to keep configuration as {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting for simulator: {0}")]
    Wait(#[source] io::Error),

    #[error("debugger mode requested but the runner has no debugger configured")]
    NoDebugger,

    #[error("run cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to create results directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
