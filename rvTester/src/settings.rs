//! Operator defaults that rarely change between runs.
//!
//! Everything here has a built-in default; a TOML file passed with
//! `--settings` overrides individual keys:
//!
//! ```toml
//! max_block_size = 100
//!
//! [memory]
//! origin = 0x80000000
//! length = 0x00100000
//!
//! [symbols]
//! completion = "tohost"
//! failure = "fail"
//! subtest_prefix = "test_"
//!
//! [debugger]
//! program = "gdb"
//! breakpoint = "etiss::plugin::FileLogger::log"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::SettingsError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub memory: MemoryLayout,
    /// `etiss.max_block_size`: instructions translated per JIT block.
    pub max_block_size: u64,
    pub symbols: SymbolNames,
    pub debugger: DebuggerSettings,
    /// Text printed right before the signalled value.
    pub marker: String,
    /// Extra `[BoolConfigurations]` entries, merged over the defaults.
    pub bool_options: BTreeMap<String, bool>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            memory: MemoryLayout::default(),
            max_block_size: 100,
            symbols: SymbolNames::default(),
            debugger: DebuggerSettings::default(),
            marker: "FileLogger".to_string(),
            bool_options: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// The single RAM segment handed to `simple_mem_system`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryLayout {
    pub origin: u64,
    pub length: u64,
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            origin: 0x8000_0000,
            length: 0x0010_0000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolRole {
    Completion,
    Failure,
    Subtest,
}

/// Naming conventions of the test binaries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SymbolNames {
    pub completion: String,
    pub failure: String,
    /// Sub-tests are `<prefix><number>`, e.g. `test_2`.
    pub subtest_prefix: String,
}

impl Default for SymbolNames {
    fn default() -> Self {
        Self {
            completion: "tohost".to_string(),
            failure: "fail".to_string(),
            subtest_prefix: "test_".to_string(),
        }
    }
}

impl SymbolNames {
    pub fn role(&self, name: &str) -> Option<SymbolRole> {
        if name == self.completion {
            return Some(SymbolRole::Completion);
        }
        if name == self.failure {
            return Some(SymbolRole::Failure);
        }
        let index = name.strip_prefix(self.subtest_prefix.as_str())?;
        if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
            Some(SymbolRole::Subtest)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebuggerSettings {
    pub program: PathBuf,
    /// Routine that receives every write to the signal address.
    pub breakpoint: String,
}

impl Default for DebuggerSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("gdb"),
            breakpoint: "etiss::plugin::FileLogger::log".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtest_names_need_a_number() {
        let names = SymbolNames::default();
        assert_eq!(names.role("tohost"), Some(SymbolRole::Completion));
        assert_eq!(names.role("fail"), Some(SymbolRole::Failure));
        assert_eq!(names.role("test_2"), Some(SymbolRole::Subtest));
        assert_eq!(names.role("test_117"), Some(SymbolRole::Subtest));
        assert_eq!(names.role("test_"), None);
        assert_eq!(names.role("test_data"), None);
        assert_eq!(names.role("fromhost"), None);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            max_block_size = 50

            [memory]
            length = 0x200000

            [symbols]
            completion = "begin_signature"
            "#,
        )
        .expect("valid settings");
        assert_eq!(settings.max_block_size, 50);
        assert_eq!(settings.memory.origin, 0x8000_0000);
        assert_eq!(settings.memory.length, 0x20_0000);
        assert_eq!(settings.symbols.completion, "begin_signature");
        assert_eq!(settings.symbols.failure, "fail");
        assert_eq!(settings.marker, "FileLogger");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Settings>("max_blocks = 3").is_err());
    }
}
