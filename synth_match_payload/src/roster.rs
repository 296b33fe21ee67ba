//! Player to kart roster.
//!
//! A roster is built once per run and never changes afterward. Each player is
//! named `player<N>` and is bound to a kart identifier that no other player in
//! the same roster shares.

use std::{fmt, iter};

use rand::Rng;
use rustc_hash::FxHashSet;

use crate::Error;

/// The largest number of players a single match supports.
pub const MAX_PLAYERS: u8 = 8;

/// A single roster entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Player identifier, `player1` through `player8`
    pub id: String,
    /// Kart identifier, unique within the roster
    pub kart: u16,
}

/// The immutable player to kart mapping for one run.
///
/// `player1` is held apart from the rest so the roster cannot be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    first: Player,
    rest: Vec<Player>,
}

impl Roster {
    /// Create a new [`Roster`] of `players` entries.
    ///
    /// Kart identifiers are drawn uniformly from the full `u16` range,
    /// rejecting any value already handed out.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PlayerCount`] if `players` is zero or exceeds
    /// [`MAX_PLAYERS`].
    pub fn new<R>(rng: &mut R, players: u8) -> Result<Self, Error>
    where
        R: Rng + ?Sized,
    {
        if players == 0 || players > MAX_PLAYERS {
            return Err(Error::PlayerCount { count: players });
        }

        let mut used: FxHashSet<u16> = FxHashSet::default();
        let mut draw = |idx: u8| {
            let kart = loop {
                let candidate: u16 = rng.random();
                if used.insert(candidate) {
                    break candidate;
                }
            };
            Player {
                id: format!("player{idx}"),
                kart,
            }
        };
        let first = draw(1);
        let rest = (2..=players).map(&mut draw).collect();

        Ok(Self { first, rest })
    }

    /// Choose a player uniformly at random, with replacement.
    pub fn choose<R>(&self, rng: &mut R) -> &Player
    where
        R: Rng + ?Sized,
    {
        let idx = rng.random_range(0..self.len());
        self.iter().nth(idx).unwrap_or(&self.first)
    }

    /// Look up the kart bound to `player_id`, if any.
    #[must_use]
    pub fn kart(&self, player_id: &str) -> Option<u16> {
        self.iter().find(|p| p.id == player_id).map(|p| p.kart)
    }

    /// Iterate the roster in player order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        iter::once(&self.first).chain(self.rest.iter())
    }

    /// Number of players in the roster.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    /// Always false, a roster holds at least one player.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for Roster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, player) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", player.id, player.kart)?;
        }
        f.write_str("}")
    }
}
