use std::fs;

use goblin::elf::{Elf, Symtab};
use goblin::strtab::Strtab;
use tracing::{debug, warn};
use types::ResolvedSymbols;

use crate::error::SymbolError;
use crate::options::ElfTarget;
use crate::settings::{SymbolNames, SymbolRole};

/// Reads the symbol tables of `elf` and picks out the addresses the harness
/// cares about. The file is read once and never written.
pub fn resolve(elf: &ElfTarget, names: &SymbolNames) -> Result<ResolvedSymbols, SymbolError> {
    let bytes = fs::read(&elf.path).map_err(|source| SymbolError::Read {
        path: elf.path.clone(),
        source,
    })?;
    let parsed = Elf::parse(&bytes).map_err(|source| SymbolError::Parse {
        path: elf.path.clone(),
        source,
    })?;

    let mut scan = Scan::default();
    scan.table(&parsed.syms, &parsed.strtab, names);
    scan.table(&parsed.dynsyms, &parsed.dynstrtab, names);

    let Some(completion) = scan.completion else {
        return Err(SymbolError::Missing {
            symbol: names.completion.clone(),
            path: elf.path.clone(),
        });
    };
    if completion == 0 {
        warn!(
            elf = %elf.path.display(),
            "`{}` is at address 0; the logger will see every access",
            names.completion
        );
    }
    debug!(
        elf = %elf.path.display(),
        subtests = scan.resolved.subtests.len(),
        "completion at {completion:#x}, failure at {:#x}",
        scan.resolved.failure
    );

    scan.resolved.completion = completion;
    Ok(scan.resolved)
}

#[derive(Default)]
struct Scan {
    completion: Option<u64>,
    resolved: ResolvedSymbols,
}

impl Scan {
    fn table(&mut self, syms: &Symtab<'_>, strtab: &Strtab<'_>, names: &SymbolNames) {
        for sym in syms.iter() {
            let Some(name) = strtab.get_at(sym.st_name) else {
                continue;
            };
            match names.role(name) {
                Some(SymbolRole::Completion) => {
                    self.completion.get_or_insert(sym.st_value);
                }
                Some(SymbolRole::Failure) => {
                    if self.resolved.failure == 0 {
                        self.resolved.failure = sym.st_value;
                    }
                }
                Some(SymbolRole::Subtest) => {
                    self.resolved
                        .subtests
                        .entry(sym.st_value)
                        .or_insert_with(|| name.to_string());
                }
                None => {}
            }
        }
    }
}
