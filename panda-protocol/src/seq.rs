//! Row encoding for the sequencer (`SEQ`) block table.
//!
//! This is a helper for one specific table consumer, not part of the
//! protocol engine: the sequencer expects each table row as four decimal
//! words `CODE POS TIME1 TIME2`, where `CODE` packs the repeat count,
//! trigger condition and both phase output masks into 32 bits:
//!
//! ```text
//! 31      26 25      20 19  16 15             0
//! [ phase2 ] [ phase1 ] [trig] [   repeats    ]
//! ```
//!
//! Within each phase block, bit 0 is output `a` and bit 5 is output `f`.

use std::fmt::Display;
use std::str::FromStr;

/// Trigger conditions understood by the sequencer block.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SeqTrigger {
    Immediate,
    BitaZero,
    BitaOne,
    BitbZero,
    BitbOne,
    BitcZero,
    BitcOne,
    PosaGte,
    PosaLte,
    PosbGte,
    PosbLte,
    PoscGte,
    PoscLte,
}

impl SeqTrigger {
    /// The 4-bit trigger id packed into the row code.
    pub fn code(self) -> u32 {
        match self {
            SeqTrigger::Immediate => 0,
            SeqTrigger::BitaZero => 1,
            SeqTrigger::BitaOne => 2,
            SeqTrigger::BitbZero => 3,
            SeqTrigger::BitbOne => 4,
            SeqTrigger::BitcZero => 5,
            SeqTrigger::BitcOne => 6,
            SeqTrigger::PosaGte => 7,
            SeqTrigger::PosaLte => 8,
            SeqTrigger::PosbGte => 9,
            SeqTrigger::PosbLte => 10,
            SeqTrigger::PoscGte => 11,
            SeqTrigger::PoscLte => 12,
        }
    }

    /// The enumeration label used by the block's `TRIGGER` field.
    pub fn as_str(self) -> &'static str {
        match self {
            SeqTrigger::Immediate => "Immediate",
            SeqTrigger::BitaZero => "bita=0",
            SeqTrigger::BitaOne => "bita=1",
            SeqTrigger::BitbZero => "bitb=0",
            SeqTrigger::BitbOne => "bitb=1",
            SeqTrigger::BitcZero => "bitc=0",
            SeqTrigger::BitcOne => "bitc=1",
            SeqTrigger::PosaGte => "posa>=position",
            SeqTrigger::PosaLte => "posa<=position",
            SeqTrigger::PosbGte => "posb>=position",
            SeqTrigger::PosbLte => "posb<=position",
            SeqTrigger::PoscGte => "posc>=position",
            SeqTrigger::PoscLte => "posc<=position",
        }
    }
}

impl Display for SeqTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeqTrigger {
    type Err = ();

    fn from_str(s: &str) -> Result<SeqTrigger, ()> {
        match s {
            "Immediate" => Ok(SeqTrigger::Immediate),
            "bita=0" => Ok(SeqTrigger::BitaZero),
            "bita=1" => Ok(SeqTrigger::BitaOne),
            "bitb=0" => Ok(SeqTrigger::BitbZero),
            "bitb=1" => Ok(SeqTrigger::BitbOne),
            "bitc=0" => Ok(SeqTrigger::BitcZero),
            "bitc=1" => Ok(SeqTrigger::BitcOne),
            "posa>=position" => Ok(SeqTrigger::PosaGte),
            "posa<=position" => Ok(SeqTrigger::PosaLte),
            "posb>=position" => Ok(SeqTrigger::PosbGte),
            "posb<=position" => Ok(SeqTrigger::PosbLte),
            "posc>=position" => Ok(SeqTrigger::PoscGte),
            "posc<=position" => Ok(SeqTrigger::PoscLte),
            _ => Err(()),
        }
    }
}

/// One sequencer phase: six named output flags.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SeqPhase {
    pub a: bool,
    pub b: bool,
    pub c: bool,
    pub d: bool,
    pub e: bool,
    pub f: bool,
}

impl SeqPhase {
    /// All outputs low.
    pub const NONE: SeqPhase = SeqPhase {
        a: false,
        b: false,
        c: false,
        d: false,
        e: false,
        f: false,
    };

    /// The 6-bit output mask, `a` in bit 0 through `f` in bit 5.
    pub fn bits(self) -> u32 {
        u32::from(self.a)
            | u32::from(self.b) << 1
            | u32::from(self.c) << 2
            | u32::from(self.d) << 3
            | u32::from(self.e) << 4
            | u32::from(self.f) << 5
    }
}

/// Packs repeat count, trigger and phase masks into the 32-bit row code.
pub fn row_code(repeats: u16, trigger: SeqTrigger, phase1: SeqPhase, phase2: SeqPhase) -> u32 {
    phase2.bits() << 26 | phase1.bits() << 20 | trigger.code() << 16 | u32::from(repeats)
}

/// Renders one `CODE POS TIME1 TIME2` row per position.
///
/// All rows of one call share the same code; an empty position sequence
/// yields an empty table body, which is a valid table assignment.
pub fn table_rows(
    repeats: u16,
    trigger: SeqTrigger,
    positions: &[i32],
    time1: u32,
    phase1: SeqPhase,
    time2: u32,
    phase2: SeqPhase,
) -> Vec<String> {
    let code = row_code(repeats, trigger, phase1, phase2);
    positions
        .iter()
        .map(|position| format!("{code} {position} {time1} {time2}"))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn phase_bit_order_is_lexicographic() {
        let phase = SeqPhase {
            a: true,
            f: true,
            ..SeqPhase::NONE
        };
        assert_eq!(phase.bits(), 0b100001);
    }

    #[test]
    fn immediate_trigger_code() {
        let phase1 = SeqPhase {
            a: true,
            ..SeqPhase::NONE
        };
        assert_eq!(
            row_code(1, SeqTrigger::Immediate, phase1, SeqPhase::NONE),
            1_048_577
        );
    }

    #[test]
    fn position_compare_trigger_code() {
        let phase1 = SeqPhase {
            a: true,
            ..SeqPhase::NONE
        };
        assert_eq!(SeqTrigger::PosaGte.code(), 7);
        assert_eq!(
            row_code(1, SeqTrigger::PosaGte, phase1, SeqPhase::NONE),
            1_507_329
        );
    }

    #[test]
    fn rows_share_code_and_vary_position() {
        let phase1 = SeqPhase {
            a: true,
            ..SeqPhase::NONE
        };
        let rows = table_rows(1, SeqTrigger::Immediate, &[0, 1, 2], 1, phase1, 2, SeqPhase::NONE);
        assert_eq!(
            rows,
            vec!["1048577 0 1 2", "1048577 1 1 2", "1048577 2 1 2"]
        );
    }

    #[test]
    fn empty_positions_yield_empty_body() {
        assert!(
            table_rows(1, SeqTrigger::Immediate, &[], 1, SeqPhase::NONE, 2, SeqPhase::NONE)
                .is_empty()
        );
    }

    #[test]
    fn trigger_labels_round_trip() {
        for trigger in [
            SeqTrigger::Immediate,
            SeqTrigger::BitbOne,
            SeqTrigger::PoscLte,
        ] {
            assert_eq!(trigger.as_str().parse::<SeqTrigger>(), Ok(trigger));
        }
    }
}
