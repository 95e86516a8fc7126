use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use types::TestCase;

/// A simulator CPU model (`arch.cpu`) that tests are run against.
///
/// Ids that spell out a register width (`RV32IMACFD`, `RV64`) only accept
/// tests of that width; anything else (`RISCV`) accepts every test.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Architecture {
    id: String,
    bits: Option<u32>,
}

impl Architecture {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let bits = width_of(&id);
        Self { id, bits }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bits(&self) -> Option<u32> {
        self.bits
    }

    pub fn accepts(&self, case: &TestCase) -> bool {
        self.bits.is_none_or(|bits| bits == case.bits())
    }
}

fn width_of(id: &str) -> Option<u32> {
    let prefix = id.get(..2)?;
    if !prefix.eq_ignore_ascii_case("rv") {
        return None;
    }
    let digits: String = id[2..].chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

impl FromStr for Architecture {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
