//! Auralization-mode bitmask and its string syntax (§6).
//!
//! `DS,ER,DD,SD,MA,TV,SC,DF,NF,DP,SL,TR,AB` tokens, optionally prefixed with
//! `+`/`-`, plus the literals `NULL`/`NONE`/`DEFAULT`/`ALL`/`*`.

use serde::{Deserialize, Serialize};

use crate::error::{VaError, VaResult};

/// One auralization mode bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AuralizationComponent {
    DirectSound = 0,
    EarlyReflections = 1,
    DiffuseDecay = 2,
    SourceDirectivity = 3,
    MediumAbsorption = 4,
    TemporalVariation = 5,
    Scattering = 6,
    Diffraction = 7,
    NearField = 8,
    Doppler = 9,
    SpreadingLoss = 10,
    Transmission = 11,
    Absorption = 12,
}

impl AuralizationComponent {
    const ALL: [(Self, &'static str); 13] = [
        (Self::DirectSound, "DS"),
        (Self::EarlyReflections, "ER"),
        (Self::DiffuseDecay, "DD"),
        (Self::SourceDirectivity, "SD"),
        (Self::MediumAbsorption, "MA"),
        (Self::TemporalVariation, "TV"),
        (Self::Scattering, "SC"),
        (Self::Diffraction, "DF"),
        (Self::NearField, "NF"),
        (Self::Doppler, "DP"),
        (Self::SpreadingLoss, "SL"),
        (Self::Transmission, "TR"),
        (Self::Absorption, "AB"),
    ];

    fn bit(self) -> u32 {
        1u32 << (self as u32)
    }

    fn from_token(token: &str) -> Option<Self> {
        Self::ALL.iter().find(|(_, s)| s.eq_ignore_ascii_case(token)).map(|(c, _)| *c)
    }
}

/// A bitmask of [`AuralizationComponent`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuralizationMode(pub u32);

impl AuralizationMode {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self((1u32 << AuralizationComponent::ALL.len()) - 1);

    pub fn contains(self, component: AuralizationComponent) -> bool {
        self.0 & component.bit() != 0
    }

    pub fn with(self, component: AuralizationComponent) -> Self {
        Self(self.0 | component.bit())
    }

    pub fn without(self, component: AuralizationComponent) -> Self {
        Self(self.0 & !component.bit())
    }

    /// Canonical string encoding: every set bit as a bare (no-operator) token,
    /// comma-separated, in declaration order. `parse(to_string(m)) == m` for
    /// any `m` in `[0, ALL]` (§8 idempotence property) because bare tokens
    /// always assign rather than OR/AND-NOT.
    pub fn to_canonical_string(self) -> String {
        if self == Self::NONE {
            return String::new();
        }
        AuralizationComponent::ALL
            .iter()
            .filter(|(c, _)| self.contains(*c))
            .map(|(_, s)| *s)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Parse an auralization-mode string against a `base` mask (used when the
/// string consists only of `+`/`-` operator tokens, which modify `base`
/// instead of replacing it).
///
/// Grammar: comma-separated tokens, each either a two-letter mode token with
/// an optional leading `+`/`-`, or one of the literals `NULL`/`NONE` (empty
/// mask), `DEFAULT` (`base` verbatim), `ALL`/`*` (every bit set). A token
/// without a leading operator *assigns*: the first bare token in the list
/// resets the accumulator to empty before it is OR'd in, matching "bare token
/// list implies assignment". `-` tokens are applied after all `+`/bare tokens
/// regardless of their position in the string (AND-NOT binds last).
pub fn parse_auralization_mode_str(input: &str, base: AuralizationMode) -> VaResult<AuralizationMode> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(AuralizationMode::NONE);
    }

    let mut accumulator: Option<u32> = None;
    let mut negatives: Vec<u32> = Vec::new();

    for raw_token in trimmed.split(',') {
        let token = raw_token.trim();
        if token.is_empty() {
            continue;
        }

        match token.to_ascii_uppercase().as_str() {
            "NULL" | "NONE" => {
                accumulator = Some(accumulator.unwrap_or(0));
                continue;
            }
            "DEFAULT" => {
                accumulator = Some(accumulator.unwrap_or(0) | base.0);
                continue;
            }
            "ALL" | "*" => {
                accumulator = Some(accumulator.unwrap_or(0) | AuralizationMode::ALL.0);
                continue;
            }
            _ => {}
        }

        let (op, body) = match token.as_bytes().first() {
            Some(b'+') => (Some('+'), &token[1..]),
            Some(b'-') => (Some('-'), &token[1..]),
            _ => (None, token),
        };

        let component = AuralizationComponent::from_token(body)
            .ok_or_else(|| VaError::invalid_parameter(format!("unrecognized auralization mode token '{token}'")))?;
        let bit = component.bit();

        match op {
            None => {
                // Bare token: first bare token resets to base-less accumulation (assignment).
                let base_value = accumulator.unwrap_or(0);
                accumulator = Some(base_value | bit);
            }
            Some('+') => {
                let base_value = accumulator.unwrap_or(base.0);
                accumulator = Some(base_value | bit);
            }
            Some('-') => {
                negatives.push(bit);
                accumulator = accumulator.or(Some(base.0));
            }
            _ => unreachable!(),
        }
    }

    let mut result = accumulator.unwrap_or(0);
    for bit in negatives {
        result &= !bit;
    }
    Ok(AuralizationMode(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s6_parser_scenarios() {
        let all = AuralizationMode::ALL;
        let parsed = parse_auralization_mode_str("DS,+ER,-DD", all).unwrap();
        // A bare token is an assignment: it forgets `base` entirely (matches
        // `IVAInterface::ParseAuralizationModeStr`'s "Assignment => Forget
        // about the base"), so the result is `(DS|ER) & ~DD`, not `(base|ER) & ~DD`.
        let expected = AuralizationMode(
            (AuralizationComponent::DirectSound.bit() | AuralizationComponent::EarlyReflections.bit())
                & !AuralizationComponent::DiffuseDecay.bit(),
        );
        assert_eq!(parsed, expected);

        assert_eq!(parse_auralization_mode_str("*", all).unwrap(), all);
        assert_eq!(parse_auralization_mode_str("", all).unwrap(), AuralizationMode::NONE);
    }

    #[test]
    fn parse_is_idempotent_on_canonical_forms() {
        for bits in 0..=AuralizationMode::ALL.0 {
            let mode = AuralizationMode(bits);
            let canonical = mode.to_canonical_string();
            let reparsed = parse_auralization_mode_str(&canonical, AuralizationMode::NONE).unwrap();
            assert_eq!(reparsed, mode, "round-trip failed for {canonical}");
        }
    }

    #[test]
    fn unknown_token_is_invalid_parameter() {
        assert!(parse_auralization_mode_str("ZZ", AuralizationMode::NONE).is_err());
    }
}
</content>
