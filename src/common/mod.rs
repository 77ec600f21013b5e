//! Commonly used code.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

/// Pharmacogenes that the pipeline evaluates.
///
/// Parsing from text is exact, matching the `GENE` INFO annotation verbatim.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum Gene {
    /// CYP2D6
    #[serde(rename = "CYP2D6")]
    #[strum(serialize = "CYP2D6")]
    Cyp2d6,
    /// CYP2C19
    #[serde(rename = "CYP2C19")]
    #[strum(serialize = "CYP2C19")]
    Cyp2c19,
    /// CYP2C9
    #[serde(rename = "CYP2C9")]
    #[strum(serialize = "CYP2C9")]
    Cyp2c9,
    /// SLCO1B1
    #[serde(rename = "SLCO1B1")]
    #[strum(serialize = "SLCO1B1")]
    Slco1b1,
    /// TPMT
    #[serde(rename = "TPMT")]
    #[strum(serialize = "TPMT")]
    Tpmt,
    /// DPYD
    #[serde(rename = "DPYD")]
    #[strum(serialize = "DPYD")]
    Dpyd,
}

/// Drugs with a pharmacogenomic rule.
///
/// Parsing from text ignores ASCII case, so `codeine` and `CODEINE` are the
/// same drug.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Drug {
    /// Codeine, metabolized by CYP2D6.
    Codeine,
    /// Warfarin, metabolized by CYP2C9.
    Warfarin,
    /// Clopidogrel, activated by CYP2C19.
    Clopidogrel,
    /// Simvastatin, transported by SLCO1B1.
    Simvastatin,
    /// Azathioprine, inactivated by TPMT.
    Azathioprine,
    /// Fluorouracil, catabolized by DPYD.
    Fluorouracil,
}

impl Drug {
    /// The gene that governs the response to this drug.
    pub fn gene(self) -> Gene {
        match self {
            Drug::Codeine => Gene::Cyp2d6,
            Drug::Warfarin => Gene::Cyp2c9,
            Drug::Clopidogrel => Gene::Cyp2c19,
            Drug::Simvastatin => Gene::Slco1b1,
            Drug::Azathioprine => Gene::Tpmt,
            Drug::Fluorouracil => Gene::Dpyd,
        }
    }
}
