//! Test identity as encoded in corpus file names.
//!
//! Every binary in the corpus is named `<arch-tag>-<virt-tag>-<name>`, where
//! the arch tag is `rv<bits><runlevel><extensions>` (`rv32ui`, `rv64imcfd`)
//! and the virt tag is `p` (physical memory) or `v` (virtual memory).

use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Virt {
    Physical,
    Virtual,
}

impl Virt {
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'p' => Some(Virt::Physical),
            'v' => Some(Virt::Virtual),
            _ => None,
        }
    }

    pub fn tag(self) -> char {
        match self {
            Virt::Physical => 'p',
            Virt::Virtual => 'v',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchTag {
    pub bits: u32,
    pub runlevel: char,
    pub extensions: String,
}

impl ArchTag {
    /// Parses `rv<bits><runlevel><extensions>`. The extension string may be
    /// empty; bits and runlevel may not.
    pub fn parse(tag: &str) -> Option<Self> {
        let rest = tag.strip_prefix("rv")?;
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        let bits = rest[..digits].parse().ok()?;
        let mut tail = rest[digits..].chars();
        let runlevel = tail.next().filter(|c| c.is_ascii_lowercase())?;
        let extensions: String = tail.collect();
        if !extensions.chars().all(|c| c.is_ascii_lowercase()) {
            return None;
        }
        Some(Self {
            bits,
            runlevel,
            extensions,
        })
    }
}

impl fmt::Display for ArchTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rv{}{}{}", self.bits, self.runlevel, self.extensions)
    }
}

/// A file name that does not follow the corpus grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameError {
    pub name: String,
    pub reason: &'static str,
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed test name `{}`: {}", self.name, self.reason)
    }
}

impl std::error::Error for NameError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// The ELF binary handed to the simulator.
    pub binary: PathBuf,
    /// Full identifier, e.g. `rv32ui-p-add`.
    pub stem: String,
    pub arch: ArchTag,
    pub virt: Virt,
    /// Short name, e.g. `add`.
    pub name: String,
}

impl TestCase {
    pub fn from_stem(stem: &str, binary: PathBuf) -> Result<Self, NameError> {
        let malformed = |reason| NameError {
            name: stem.to_string(),
            reason,
        };

        let mut fields = stem.splitn(3, '-');
        let (Some(arch), Some(virt), Some(name)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(malformed("expected <arch>-<virt>-<name>"));
        };
        if name.is_empty() {
            return Err(malformed("empty test name"));
        }
        let arch = ArchTag::parse(arch).ok_or_else(|| malformed("bad arch tag"))?;
        let mut virt_chars = virt.chars();
        let virt = match (virt_chars.next(), virt_chars.next()) {
            (Some(tag), None) => Virt::from_tag(tag),
            _ => None,
        }
        .ok_or_else(|| malformed("virt tag must be `p` or `v`"))?;

        Ok(Self {
            binary,
            stem: stem.to_string(),
            arch,
            virt,
            name: name.to_string(),
        })
    }

    /// Builds a test case from its objdump description file; the binary sits
    /// next to it with the `.dump` extension removed.
    pub fn from_description(path: &Path) -> Result<Self, NameError> {
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| NameError {
                name: path.display().to_string(),
                reason: "file name is not valid UTF-8",
            })?;
        Self::from_stem(stem, path.with_extension(""))
    }

    pub fn bits(&self) -> u32 {
        self.arch.bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_riscv_tests_names() {
        let case = TestCase::from_stem("rv32imfd-p-add", PathBuf::from("/t/rv32imfd-p-add"))
            .expect("valid name");
        assert_eq!(case.bits(), 32);
        assert_eq!(case.arch.runlevel, 'i');
        assert_eq!(case.arch.extensions, "mfd");
        assert_eq!(case.virt, Virt::Physical);
        assert_eq!(case.name, "add");
    }

    #[test]
    fn keeps_dashes_in_the_name_field() {
        let case = TestCase::from_stem("rv64ui-v-ld-st", PathBuf::new()).expect("valid name");
        assert_eq!(case.name, "ld-st");
        assert_eq!(case.virt, Virt::Virtual);
        assert_eq!(case.arch.to_string(), "rv64ui");
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = TestCase::from_stem("rv32ui-add", PathBuf::new()).unwrap_err();
        assert_eq!(err.name, "rv32ui-add");
        assert!(TestCase::from_stem("rv32ui", PathBuf::new()).is_err());
        assert!(TestCase::from_stem("rv32ui-p-", PathBuf::new()).is_err());
    }

    #[test]
    fn rejects_bad_tags() {
        assert!(TestCase::from_stem("x86ui-p-add", PathBuf::new()).is_err());
        assert!(TestCase::from_stem("rvui-p-add", PathBuf::new()).is_err());
        assert!(TestCase::from_stem("rv32-p-add", PathBuf::new()).is_err());
        assert!(TestCase::from_stem("rv32ui-pt-add", PathBuf::new()).is_err());
        assert!(TestCase::from_stem("rv32ui-x-add", PathBuf::new()).is_err());
    }

    #[test]
    fn description_points_at_sibling_binary() {
        let case = TestCase::from_description(Path::new("/corpus/rv32uc-p-rvc.dump"))
            .expect("valid name");
        assert_eq!(case.binary, PathBuf::from("/corpus/rv32uc-p-rvc"));
        assert_eq!(case.stem, "rv32uc-p-rvc");
    }
}
