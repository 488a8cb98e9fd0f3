//! Generated identities.
//!
//! A first start without a stored name gets `user` plus five random digits,
//! and `create` picks a five digit room code. Both draw from the
//! [`Environment`] RNG so simulated runs are reproducible.

use tocsin_proto::{DisplayName, RoomCode};

use crate::env::Environment;

/// Lowest generated number (inclusive).
pub const GENERATED_MIN: u64 = 10_000;

/// Highest generated number (exclusive).
pub const GENERATED_MAX: u64 = 100_000;

/// Random placeholder name in `user10000..=user99999`.
pub fn generate_display_name<E: Environment>(env: &E) -> DisplayName {
    DisplayName::numbered(draw(env))
}

/// Random numeric room code in `10000..=99999`.
pub fn generate_room_code<E: Environment>(env: &E) -> RoomCode {
    RoomCode::numeric(draw(env))
}

fn draw<E: Environment>(env: &E) -> u32 {
    let n = env.random_range(GENERATED_MIN, GENERATED_MAX);
    u32::try_from(n).unwrap_or(u32::MAX)
}
