//! Regroups authorized identities back into white/black player pairs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{Identity, Slot};
use crate::ids::UserId;
use crate::tokens::Side;

/// Two resolved players destined to meet in one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPair {
    pub white: UserId,
    pub black: UserId,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PairingError {
    #[error("odd number of identities: {0}")]
    OddIdentityCount(usize),

    #[error("slot {0:?} is outside the submitted pairs")]
    SlotOutOfRange(Slot),

    #[error("slot {0:?} was resolved twice")]
    DuplicateSlot(Slot),

    #[error("pair {pair} has no {side:?} player")]
    MissingSide { pair: usize, side: Side },
}

/// Rebuilds pairs in submission order from slot-tagged identities.
///
/// Each identity lands in the cell named by its slot, so the result never
/// depends on the order the identities arrive in.
pub fn reconstruct_pairs(
    identities: Vec<(Slot, Identity)>,
) -> Result<Vec<PlayerPair>, PairingError> {
    if identities.len() % 2 != 0 {
        return Err(PairingError::OddIdentityCount(identities.len()));
    }

    let n = identities.len() / 2;
    let mut cells: Vec<(Option<UserId>, Option<UserId>)> = vec![(None, None); n];

    for (slot, identity) in identities {
        let cell = cells
            .get_mut(slot.pair)
            .ok_or(PairingError::SlotOutOfRange(slot))?;
        let side = match slot.side {
            Side::White => &mut cell.0,
            Side::Black => &mut cell.1,
        };
        if side.replace(identity.user).is_some() {
            return Err(PairingError::DuplicateSlot(slot));
        }
    }

    cells
        .into_iter()
        .enumerate()
        .map(|(pair, cell)| match cell {
            (Some(white), Some(black)) => Ok(PlayerPair { white, black }),
            (None, _) => Err(PairingError::MissingSide {
                pair,
                side: Side::White,
            }),
            (_, None) => Err(PairingError::MissingSide {
                pair,
                side: Side::Black,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::bulk_pairing_scopes;

    fn tagged(pair: usize, side: Side, user: &str) -> (Slot, Identity) {
        (
            Slot { pair, side },
            Identity {
                user: UserId::from(user),
                scopes: bulk_pairing_scopes(),
            },
        )
    }

    #[test]
    fn regroups_consecutive_identities() {
        let got = reconstruct_pairs(vec![
            tagged(0, Side::White, "alice"),
            tagged(0, Side::Black, "bob"),
            tagged(1, Side::White, "carol"),
            tagged(1, Side::Black, "dave"),
        ])
        .unwrap();

        assert_eq!(
            got,
            vec![
                PlayerPair {
                    white: "alice".into(),
                    black: "bob".into()
                },
                PlayerPair {
                    white: "carol".into(),
                    black: "dave".into()
                },
            ]
        );
    }

    #[test]
    fn arrival_order_does_not_matter() {
        let got = reconstruct_pairs(vec![
            tagged(1, Side::Black, "dave"),
            tagged(0, Side::Black, "bob"),
            tagged(1, Side::White, "carol"),
            tagged(0, Side::White, "alice"),
        ])
        .unwrap();

        assert_eq!(got[0].white, UserId::from("alice"));
        assert_eq!(got[0].black, UserId::from("bob"));
        assert_eq!(got[1].white, UserId::from("carol"));
        assert_eq!(got[1].black, UserId::from("dave"));
    }

    #[test]
    fn rejects_odd_count() {
        let err = reconstruct_pairs(vec![tagged(0, Side::White, "alice")]).unwrap_err();
        assert_eq!(err, PairingError::OddIdentityCount(1));
    }

    #[test]
    fn rejects_doubly_filled_slot() {
        let err = reconstruct_pairs(vec![
            tagged(0, Side::White, "alice"),
            tagged(0, Side::White, "bob"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            PairingError::DuplicateSlot(Slot {
                pair: 0,
                side: Side::White
            })
        );
    }

    #[test]
    fn rejects_out_of_range_slot() {
        let err = reconstruct_pairs(vec![
            tagged(0, Side::White, "alice"),
            tagged(3, Side::Black, "bob"),
        ])
        .unwrap_err();
        assert!(matches!(err, PairingError::SlotOutOfRange(_)));
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert_eq!(reconstruct_pairs(vec![]), Ok(vec![]));
    }
}
