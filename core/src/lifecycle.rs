// core/src/lifecycle.rs

//! Order status state machine.
//!
//! Providers and finders drive disjoint sets of edges:
//!
//! | actor    | from                        | to                      |
//! |----------|-----------------------------|-------------------------|
//! | provider | booked                      | on_the_way, declined    |
//! | provider | on_the_way                  | started, completed      |
//! | provider | started                     | completed               |
//! | finder   | booked, on_the_way, started | cancelled               |
//! | finder   | on_the_way, started         | completed               |
//!
//! `completed`, `cancelled` and `declined` are terminal for everyone.

use std::fmt;

use crate::error::{MarketError, MarketResult};
use crate::models::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
  Finder,
  Provider,
}

impl fmt::Display for Actor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Actor::Finder => "finder",
      Actor::Provider => "provider",
    })
  }
}

pub fn is_allowed(actor: Actor, from: OrderStatus, to: OrderStatus) -> bool {
  use OrderStatus::*;
  match actor {
    Actor::Provider => matches!(
      (from, to),
      (Booked, OnTheWay) | (Booked, Declined) | (OnTheWay, Started) | (OnTheWay, Completed) | (Started, Completed)
    ),
    Actor::Finder => matches!(
      (from, to),
      (Booked, Cancelled)
        | (OnTheWay, Cancelled)
        | (Started, Cancelled)
        | (OnTheWay, Completed)
        | (Started, Completed)
    ),
  }
}

/// Validates `from -> to` for `actor`, rejecting any move out of a terminal state.
pub fn check_transition(actor: Actor, from: OrderStatus, to: OrderStatus) -> MarketResult<()> {
  if from.is_terminal() {
    return Err(MarketError::validation(format!(
      "order is already {} and can no longer change status",
      from
    )));
  }
  if !is_allowed(actor, from, to) {
    return Err(MarketError::validation(format!(
      "invalid {} transition: {} -> {}",
      actor, from, to
    )));
  }
  Ok(())
}

/// Statuses `actor` may move an order to from `from`.
pub fn next_statuses(actor: Actor, from: OrderStatus) -> Vec<OrderStatus> {
  OrderStatus::ALL
    .into_iter()
    .filter(|to| !from.is_terminal() && is_allowed(actor, from, *to))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use OrderStatus::*;

  #[test]
  fn provider_cannot_complete_from_booked() {
    let err = check_transition(Actor::Provider, Booked, Completed).unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert!(err.to_string().contains("invalid provider transition: booked -> completed"));
  }

  #[test]
  fn provider_paths_to_completion() {
    for path in [
      vec![Booked, OnTheWay, Completed],
      vec![Booked, OnTheWay, Started, Completed],
    ] {
      for pair in path.windows(2) {
        assert!(check_transition(Actor::Provider, pair[0], pair[1]).is_ok(), "{:?}", pair);
      }
    }
    assert!(check_transition(Actor::Provider, Booked, Started).is_err());
  }

  #[test]
  fn finder_completes_only_after_provider_moved() {
    assert!(check_transition(Actor::Finder, Booked, Completed).is_err());
    assert!(check_transition(Actor::Finder, OnTheWay, Completed).is_ok());
    assert!(check_transition(Actor::Finder, Started, Completed).is_ok());
  }

  #[test]
  fn finder_cancels_from_any_open_state() {
    for from in [Booked, OnTheWay, Started] {
      assert!(check_transition(Actor::Finder, from, Cancelled).is_ok());
    }
    assert!(check_transition(Actor::Provider, Booked, Cancelled).is_err());
  }

  #[test]
  fn terminal_states_reject_every_actor_and_target() {
    for from in [Completed, Cancelled, Declined] {
      for actor in [Actor::Finder, Actor::Provider] {
        for to in OrderStatus::ALL {
          let err = check_transition(actor, from, to).unwrap_err();
          assert_eq!(err.status_code(), 400);
        }
        assert!(next_statuses(actor, from).is_empty());
      }
    }
  }

  #[test]
  fn next_statuses_follow_the_tables() {
    assert_eq!(next_statuses(Actor::Provider, Booked), vec![OnTheWay, Declined]);
    assert_eq!(next_statuses(Actor::Finder, Started), vec![Completed, Cancelled]);
  }
}
