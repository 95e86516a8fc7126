//! Marks known addresses in captured simulator output so a failing log can
//! be read without cross-referencing the disassembly.

use types::ResolvedSymbols;

/// The form in which the instruction printer emits a program counter.
pub fn address_token(addr: u64) -> String {
    format!("0x{addr:016x}:")
}

/// Returns `stdout` with a `### <label> ###` line inserted before the line
/// holding the first occurrence of each landmark address. Output with no
/// landmark in it comes back unchanged.
pub fn annotate(stdout: &[u8], symbols: &ResolvedSymbols) -> Vec<u8> {
    let mut inserts: Vec<(usize, &str)> = symbols
        .landmarks()
        .into_iter()
        .filter_map(|(addr, label)| {
            let at = find(stdout, address_token(addr).as_bytes())?;
            Some((line_start(stdout, at), label))
        })
        .collect();
    if inserts.is_empty() {
        return stdout.to_vec();
    }
    inserts.sort_by_key(|(offset, _)| *offset);

    let extra: usize = inserts.iter().map(|(_, label)| label.len() + 9).sum();
    let mut out = Vec::with_capacity(stdout.len() + extra);
    let mut copied = 0;
    for (offset, label) in inserts {
        out.extend_from_slice(&stdout[copied..offset]);
        out.extend_from_slice(format!("### {label} ###\n").as_bytes());
        copied = offset;
    }
    out.extend_from_slice(&stdout[copied..]);
    out
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn line_start(buf: &[u8], at: usize) -> usize {
    buf[..at]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |newline| newline + 1)
}
