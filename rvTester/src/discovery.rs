//! Finding the tests to run: scan → parse → select → expand.
//!
//! Each stage is a plain function over the previous stage's output, so the
//! filtering rules can be checked without touching a simulator.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use types::{TestCase, Virt};

use crate::arch::Architecture;
use crate::error::DiscoveryError;
use crate::pipeline::WorkItem;

/// Extension of the objdump listings that sit next to every test binary.
const DESCRIPTION_EXT: &str = "dump";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub bits: BTreeSet<u32>,
    pub runlevels: BTreeSet<char>,
    pub extensions: BTreeSet<char>,
    pub virt: BTreeSet<Virt>,
}

impl Filter {
    pub fn new(
        bits: impl IntoIterator<Item = u32>,
        runlevels: &str,
        extensions: &str,
        virt: impl IntoIterator<Item = Virt>,
    ) -> Self {
        Self {
            bits: bits.into_iter().collect(),
            runlevels: runlevels.chars().collect(),
            extensions: extensions.chars().collect(),
            virt: virt.into_iter().collect(),
        }
    }

    pub fn matches(&self, case: &TestCase) -> bool {
        self.bits.contains(&case.arch.bits)
            && self.runlevels.contains(&case.arch.runlevel)
            && case
                .arch
                .extensions
                .chars()
                .all(|ext| self.extensions.contains(&ext))
            && self.virt.contains(&case.virt)
    }
}

/// Lists the `.dump` files directly inside `dir`, sorted by path.
pub fn scan(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let read_err = |source| DiscoveryError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == DESCRIPTION_EXT) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Parses every description path. The first malformed name aborts.
pub fn parse_all(paths: &[PathBuf]) -> Result<Vec<TestCase>, DiscoveryError> {
    paths
        .iter()
        .map(|path| TestCase::from_description(path).map_err(DiscoveryError::from))
        .collect()
}

/// Keeps the cases the filter accepts, ordered and de-duplicated by their
/// full identifier.
pub fn select(cases: Vec<TestCase>, filter: &Filter) -> Vec<TestCase> {
    let mut selected = BTreeMap::new();
    for case in cases {
        if filter.matches(&case) {
            selected.entry(case.stem.clone()).or_insert(case);
        } else {
            debug!(test = %case.stem, "filtered out");
        }
    }
    selected.into_values().collect()
}

pub fn discover(dir: &Path, filter: &Filter) -> Result<Vec<TestCase>, DiscoveryError> {
    let paths = scan(dir)?;
    let cases = parse_all(&paths)?;
    let total = cases.len();
    let selected = select(cases, filter);
    info!(
        dir = %dir.display(),
        "{} of {total} tests match the filters",
        selected.len()
    );
    Ok(selected)
}

/// One work item per (case, architecture) pair the architecture accepts.
///
/// Results are keyed by the short test name; when two cases accepted by the
/// same architecture share a short name, both fall back to their full
/// identifier in that architecture's results.
pub fn expand(cases: &[TestCase], archs: &[Architecture]) -> Vec<WorkItem> {
    let cases: Vec<Arc<TestCase>> = cases.iter().cloned().map(Arc::new).collect();
    let mut items = Vec::new();
    for arch in archs {
        let accepted: Vec<&Arc<TestCase>> = cases.iter().filter(|case| arch.accepts(case)).collect();
        let mut name_counts: HashMap<&str, usize> = HashMap::new();
        for case in &accepted {
            *name_counts.entry(case.name.as_str()).or_default() += 1;
        }
        items.extend(accepted.iter().map(|case| {
            let label = if name_counts[case.name.as_str()] > 1 {
                case.stem.clone()
            } else {
                case.name.clone()
            };
            WorkItem {
                case: Arc::clone(case),
                arch: arch.clone(),
                label,
            }
        }));
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(stem: &str) -> TestCase {
        TestCase::from_stem(stem, PathBuf::from(stem)).expect("valid name")
    }

    #[test]
    fn every_extension_must_be_requested() {
        let filter = Filter::new([32], "u", "imc", [Virt::Physical]);
        assert!(filter.matches(&case("rv32ui-p-add")));
        assert!(filter.matches(&case("rv32uimc-p-add")));
        assert!(!filter.matches(&case("rv32uf-p-fadd")));
        assert!(!filter.matches(&case("rv32uimf-p-x")));
    }

    #[test]
    fn each_tag_is_checked() {
        let filter = Filter::new([32], "u", "i", [Virt::Physical]);
        assert!(!filter.matches(&case("rv64ui-p-add")));
        assert!(!filter.matches(&case("rv32mi-p-csr")));
        assert!(!filter.matches(&case("rv32ui-v-add")));
    }

    #[test]
    fn select_sorts_and_dedups() {
        let filter = Filter::new([32, 64], "u", "i", [Virt::Physical]);
        let picked = select(
            vec![
                case("rv64ui-p-sub"),
                case("rv32ui-p-add"),
                case("rv32ui-p-add"),
                case("rv32uf-p-fadd"),
            ],
            &filter,
        );
        let stems: Vec<_> = picked.iter().map(|c| c.stem.as_str()).collect();
        assert_eq!(stems, ["rv32ui-p-add", "rv64ui-p-sub"]);
    }

    #[test]
    fn expand_pairs_by_width() {
        let cases = [case("rv32ui-p-add"), case("rv64ui-p-sub")];
        let archs = [
            Architecture::new("RV32IMACFD"),
            Architecture::new("RV64IMACFD"),
            Architecture::new("RISCV"),
        ];
        let items = expand(&cases, &archs);
        let pairs: Vec<_> = items
            .iter()
            .map(|item| (item.arch.id(), item.label.as_str()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("RV32IMACFD", "add"),
                ("RV64IMACFD", "sub"),
                ("RISCV", "add"),
                ("RISCV", "sub"),
            ]
        );
    }

    #[test]
    fn colliding_short_names_use_full_identifier() {
        let cases = [case("rv32ui-p-add"), case("rv32ui-v-add"), case("rv32ui-p-sub")];
        let items = expand(&cases, &[Architecture::new("RV32")]);
        let labels: Vec<_> = items.iter().map(|item| item.label.as_str()).collect();
        assert_eq!(labels, ["rv32ui-p-add", "rv32ui-v-add", "sub"]);
    }

    #[test]
    fn collisions_are_counted_per_architecture() {
        let cases = [case("rv32ui-p-add"), case("rv64ui-p-add")];
        let archs = [
            Architecture::new("RV32"),
            Architecture::new("RV64"),
            Architecture::new("RISCV"),
        ];
        let items = expand(&cases, &archs);
        let pairs: Vec<_> = items
            .iter()
            .map(|item| (item.arch.id(), item.label.as_str()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("RV32", "add"),
                ("RV64", "add"),
                ("RISCV", "rv32ui-p-add"),
                ("RISCV", "rv64ui-p-add"),
            ]
        );
    }
}
