//! Documents handed to the simulator and to the debugger.
//!
//! Both are plain structs rendered on demand; nothing here is shared
//! between work items.

use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use types::{ResolvedSymbols, TestCase};

use crate::error::ConfigError;
use crate::options::{JitBackend, RunOptions};
use crate::settings::{MemoryLayout, Settings};

/// Diagnostic toggles that are always written; `Settings::bool_options`
/// overrides them by key.
const DEFAULT_BOOL_OPTIONS: &[(&str, bool)] = &[
    ("simple_mem_system.print_dbus_access", false),
    ("simple_mem_system.print_ibus_access", false),
    ("simple_mem_system.print_dot_loadfile", false),
    ("simple_mem_system.print_to_file", false),
];

/// Where the FileLogger plugin intercepts writes: an access hits when
/// `access & mask == addr & mask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalTap {
    pub addr: u64,
    pub mask: u64,
}

impl SignalTap {
    /// Exact match on `addr` within a `bits`-wide address space.
    pub fn exact(addr: u64, bits: u32) -> Self {
        let mask = if bits >= 64 {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        };
        Self { addr, mask }
    }
}

/// One simulator configuration, specific to a (test, architecture) pair.
#[derive(Debug, Clone)]
pub struct RunConfig<'a> {
    pub binary: &'a Path,
    pub arch: &'a str,
    pub jit: JitBackend,
    pub memory: MemoryLayout,
    pub max_block_size: u64,
    pub bool_options: BTreeMap<&'a str, bool>,
    pub signal: SignalTap,
    /// File the logger plugin writes values to; empty means stdout.
    pub value_file: Option<&'a Path>,
    pub trace: bool,
}

impl<'a> RunConfig<'a> {
    pub fn for_case(
        case: &'a TestCase,
        symbols: &ResolvedSymbols,
        arch: &'a str,
        options: &RunOptions,
        settings: &'a Settings,
    ) -> Self {
        let mut bool_options: BTreeMap<&str, bool> = DEFAULT_BOOL_OPTIONS.iter().copied().collect();
        for (key, value) in &settings.bool_options {
            bool_options.insert(key.as_str(), *value);
        }
        Self {
            binary: &case.binary,
            arch,
            jit: options.jit,
            memory: settings.memory,
            max_block_size: settings.max_block_size,
            bool_options,
            signal: SignalTap::exact(symbols.completion, case.bits()),
            value_file: None,
            trace: options.trace,
        }
    }

    /// Sends the logger's output to `path` instead of stdout.
    pub fn log_values_to(mut self, path: &'a Path) -> Self {
        self.value_file = Some(path);
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "[StringConfigurations]")?;
        writeln!(out, "vp.elf_file={}", self.binary.display())?;
        writeln!(out, "arch.cpu={}", self.arch)?;
        writeln!(out, "jit.type={}", self.jit.id())?;
        writeln!(out)?;

        writeln!(out, "[IntConfigurations]")?;
        writeln!(out, "simple_mem_system.memseg_origin_00={:#010x}", self.memory.origin)?;
        writeln!(out, "simple_mem_system.memseg_length_00={:#010x}", self.memory.length)?;
        writeln!(out, "etiss.max_block_size={}", self.max_block_size)?;
        writeln!(out)?;

        writeln!(out, "[BoolConfigurations]")?;
        for (key, value) in &self.bool_options {
            writeln!(out, "{key}={value}")?;
        }
        writeln!(out)?;

        writeln!(out, "[Plugin FileLogger]")?;
        writeln!(out, "plugin.filelogger.logaddr={}", self.signal.addr)?;
        writeln!(out, "plugin.filelogger.logmask={}", self.signal.mask)?;
        match self.value_file {
            Some(path) => writeln!(out, "plugin.filelogger.output_path={}", path.display())?,
            None => writeln!(out, "plugin.filelogger.output_path=")?,
        }
        writeln!(out, "plugin.filelogger.terminate_on_write=true")?;

        if self.trace {
            writeln!(out)?;
            writeln!(out, "[Plugin PrintInstruction]")?;
        }
        Ok(())
    }

    /// Writes the document to a fresh file in `dir`. The name embeds the
    /// test and architecture plus a random suffix, so concurrent items
    /// never collide.
    pub fn write(&self, dir: &Path, stem: &str) -> Result<ConfigFile, ConfigError> {
        let write_err = |source| ConfigError::Write {
            dir: dir.to_path_buf(),
            source,
        };
        let mut file = tempfile::Builder::new()
            .prefix(&format!("etiss_{stem}_{}_", self.arch))
            .suffix(".ini")
            .tempfile_in(dir)
            .map_err(write_err)?;
        file.write_all(self.render().as_bytes()).map_err(write_err)?;
        file.flush().map_err(write_err)?;
        Ok(ConfigFile {
            path: file.into_temp_path(),
        })
    }
}

/// A generated configuration on disk. Removed on drop unless kept.
#[derive(Debug)]
pub struct ConfigFile {
    path: TempPath,
}

impl ConfigFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Moves the file to `dest` and stops tracking it.
    pub fn keep_as(self, dest: &Path) -> Result<PathBuf, ConfigError> {
        let persist_err = |source| ConfigError::Persist {
            path: dest.to_path_buf(),
            source,
        };
        self.path.persist(dest).map_err(|err| persist_err(err.error))?;
        Ok(dest.to_path_buf())
    }
}

/// Empty per-item file the logger plugin writes signalled values into.
/// Removed on drop.
#[derive(Debug)]
pub struct ValueFile {
    path: TempPath,
}

impl ValueFile {
    pub fn create(dir: &Path, stem: &str, arch: &str) -> Result<Self, ConfigError> {
        let file = tempfile::Builder::new()
            .prefix(&format!("etiss_{stem}_{arch}_"))
            .suffix(".log")
            .tempfile_in(dir)
            .map_err(|source| ConfigError::Write {
                dir: dir.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// GDB command file that stops in the logger routine and prints the value
/// being written, prefixed with the result marker.
#[derive(Debug, Clone)]
pub struct DebuggerScript<'a> {
    pub breakpoint: &'a str,
    pub marker: &'a str,
}

impl<'a> DebuggerScript<'a> {
    pub fn from_settings(settings: &'a Settings) -> Self {
        Self {
            breakpoint: &settings.debugger.breakpoint,
            marker: &settings.marker,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "set breakpoint pending on\n\
             set pagination off\n\
             break {breakpoint}\n\
             run\n\
             printf \"{marker} %#x\\n\", *(unsigned int *)buf\n\
             kill\n\
             quit\n",
            breakpoint = self.breakpoint,
            marker = self.marker,
        )
    }

    /// Writes the script once per run; the returned path deletes it on drop.
    pub fn write_temp(&self) -> std::io::Result<TempPath> {
        let mut file = tempfile::Builder::new()
            .prefix("etiss_gdb_")
            .suffix(".gdb")
            .tempfile()?;
        file.write_all(self.render().as_bytes())?;
        file.flush()?;
        Ok(file.into_temp_path())
    }
}
