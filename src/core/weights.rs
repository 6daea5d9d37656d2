//! Turning a member's classification into a weighted vote

use crate::bio::taxonomy::TaxonId;
use crate::core::config::VoteMode;
use crate::{Result, TaxaggError};

/// Weight used when an alignment reports an e-value of exactly zero
pub const MAX_WEIGHT: f64 = 1000.0;

/// Columns of an alignment result line without backtrace
pub const ALN_RES_COLUMNS: usize = 10;

/// Column holding the e-value in an alignment result line
const EVALUE_COLUMN: usize = 3;

/// A member's taxon together with its vote weight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxHit {
    pub taxon: TaxonId,
    pub evalue: f64,
    pub weight: f64,
}

impl TaxHit {
    pub fn is_assigned(&self) -> bool {
        self.taxon != 0
    }

    /// Build a hit from a member's taxon and, when alignment statistics are
    /// in use, the whitespace-separated columns of its best alignment.
    pub fn from_entry(
        taxon: TaxonId,
        use_alignment: bool,
        alignment: &[&str],
        vote_mode: VoteMode,
    ) -> Result<Self> {
        if taxon == 0 {
            return Ok(Self::unassigned());
        }

        let mut evalue = 1.0;
        if use_alignment {
            if alignment.len() < ALN_RES_COLUMNS {
                return Err(TaxaggError::MissingAlignment(taxon));
            }
            evalue = parse_evalue(alignment[EVALUE_COLUMN])?;
        }

        let weight = match vote_mode {
            VoteMode::Uniform => 1.0,
            VoteMode::Evalue => evalue_weight(evalue),
        };

        Ok(Self {
            taxon,
            evalue,
            weight,
        })
    }

    pub fn unassigned() -> Self {
        Self {
            taxon: 0,
            evalue: 1.0,
            weight: 0.0,
        }
    }
}

/// `-ln(evalue)`, capped at [`MAX_WEIGHT`] for a zero e-value and floored at 0
pub fn evalue_weight(evalue: f64) -> f64 {
    if evalue > 0.0 {
        (-evalue.ln()).max(0.0)
    } else {
        MAX_WEIGHT
    }
}

fn parse_evalue(field: &str) -> Result<f64> {
    let evalue: f64 = field
        .parse()
        .map_err(|e| TaxaggError::Parse(format!("invalid evalue '{}': {}", field, e)))?;
    if evalue.is_nan() || evalue < 0.0 {
        return Err(TaxaggError::Parse(format!("invalid evalue '{}'", field)));
    }
    Ok(evalue)
}
