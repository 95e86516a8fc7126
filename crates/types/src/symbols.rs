use std::collections::BTreeMap;

/// Addresses pulled out of a test binary's symbol tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSymbols {
    /// Where the test writes its result. Always present once resolved.
    pub completion: u64,
    /// Start of the abnormal-termination path; 0 when the binary has none.
    pub failure: u64,
    /// Sub-test entry points, address -> symbol name.
    pub subtests: BTreeMap<u64, String>,
}

impl ResolvedSymbols {
    pub fn new(completion: u64) -> Self {
        Self {
            completion,
            ..Self::default()
        }
    }

    /// Every address worth marking in captured output, paired with its label.
    pub fn landmarks(&self) -> Vec<(u64, &str)> {
        let mut marks = Vec::with_capacity(self.subtests.len() + 1);
        if self.failure != 0 {
            marks.push((self.failure, "fail"));
        }
        marks.extend(
            self.subtests
                .iter()
                .map(|(addr, label)| (*addr, label.as_str())),
        );
        marks
    }
}
