//! Shared helpers: tiny ELF images, corpus directories and stand-in tools.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

const EHDR_SIZE: usize = 52;
const SHDR_SIZE: usize = 40;
const SYM_SIZE: usize = 16;

const SHT_SYMTAB: u32 = 2;
const SHT_STRTAB: u32 = 3;
const SHN_ABS: u16 = 0xfff1;
const EM_RISCV: u16 = 0xf3;

/// Builds a little-endian ELF32 RISC-V executable with no code and a
/// `.symtab` holding `symbols`, each a global absolute symbol.
pub fn elf32_with_symbols(symbols: &[(&str, u32)]) -> Vec<u8> {
    let mut strtab = vec![0u8];
    let mut symtab = vec![0u8; SYM_SIZE];
    for (name, value) in symbols {
        let name_off = strtab.len() as u32;
        strtab.extend_from_slice(name.as_bytes());
        strtab.push(0);

        symtab.extend_from_slice(&name_off.to_le_bytes());
        symtab.extend_from_slice(&value.to_le_bytes());
        symtab.extend_from_slice(&0u32.to_le_bytes());
        symtab.push(0x10); // STB_GLOBAL, STT_NOTYPE
        symtab.push(0);
        symtab.extend_from_slice(&SHN_ABS.to_le_bytes());
    }
    let shstrtab = b"\0.symtab\0.strtab\0.shstrtab\0".to_vec();

    let symtab_off = EHDR_SIZE;
    let strtab_off = symtab_off + symtab.len();
    let shstrtab_off = strtab_off + strtab.len();
    let shoff = (shstrtab_off + shstrtab.len()).next_multiple_of(4);

    let mut out = Vec::with_capacity(shoff + 4 * SHDR_SIZE);
    out.extend_from_slice(&[0x7f, b'E', b'L', b'F', 1, 1, 1, 0]);
    out.extend_from_slice(&[0; 8]);
    out.extend_from_slice(&2u16.to_le_bytes()); // ET_EXEC
    out.extend_from_slice(&EM_RISCV.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&0x8000_0000u32.to_le_bytes()); // entry
    out.extend_from_slice(&0u32.to_le_bytes()); // phoff
    out.extend_from_slice(&(shoff as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // flags
    out.extend_from_slice(&(EHDR_SIZE as u16).to_le_bytes());
    out.extend_from_slice(&32u16.to_le_bytes()); // phentsize
    out.extend_from_slice(&0u16.to_le_bytes()); // phnum
    out.extend_from_slice(&(SHDR_SIZE as u16).to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes()); // shnum
    out.extend_from_slice(&3u16.to_le_bytes()); // shstrndx
    assert_eq!(out.len(), EHDR_SIZE);

    out.extend_from_slice(&symtab);
    out.extend_from_slice(&strtab);
    out.extend_from_slice(&shstrtab);
    out.resize(shoff, 0);

    let sections = [
        [0u32; 10],
        [
            1,
            SHT_SYMTAB,
            0,
            0,
            symtab_off as u32,
            symtab.len() as u32,
            2,
            1,
            4,
            SYM_SIZE as u32,
        ],
        [9, SHT_STRTAB, 0, 0, strtab_off as u32, strtab.len() as u32, 0, 0, 1, 0],
        [
            17,
            SHT_STRTAB,
            0,
            0,
            shstrtab_off as u32,
            shstrtab.len() as u32,
            0,
            0,
            1,
            0,
        ],
    ];
    for header in sections {
        for field in header {
            out.extend_from_slice(&field.to_le_bytes());
        }
    }
    out
}

/// Writes a binary and its `.dump` listing; returns the binary path.
pub fn add_test(dir: &Path, stem: &str, symbols: &[(&str, u32)]) -> PathBuf {
    let binary = dir.join(stem);
    fs::write(&binary, elf32_with_symbols(symbols)).expect("write test binary");
    fs::write(dir.join(format!("{stem}.dump")), format!("{stem}:     file format elf32\n"))
        .expect("write dump");
    binary
}

/// Writes only the `.dump` listing, for discovery-only tests.
pub fn add_listing(dir: &Path, stem: &str) {
    fs::write(dir.join(format!("{stem}.dump")), "").expect("write dump");
}

/// Writes an executable `/bin/sh` script.
#[cfg(unix)]
pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut perms = fs::metadata(&path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod script");
    path
}

pub const TOHOST: u32 = 0x8000_1000;
pub const FAIL: u32 = 0x8000_0f00;
