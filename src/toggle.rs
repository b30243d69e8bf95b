//! Add-if-absent / remove-if-present membership flips shared by follows,
//! likes and dislikes.
//!
//! Reaction sets are kept as sorted, duplicate-free id vectors so they can be
//! read straight out of a Postgres `ARRAY(... ORDER BY user_id)` and compared
//! against the in-process store without conversion.

use serde::Serialize;

use crate::models::Id;

/// Outcome of a single toggle: whether the actor is now a member, and the
/// set's cardinality after the flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Toggled {
    pub active: bool,
    pub count: usize,
}

pub fn toggle(set: &mut Vec<Id>, user: Id) -> Toggled {
    let active = match set.binary_search(&user) {
        Ok(pos) => {
            set.remove(pos);
            false
        }
        Err(pos) => {
            set.insert(pos, user);
            true
        }
    };
    Toggled { active, count: set.len() }
}

pub fn contains(set: &[Id], user: Id) -> bool {
    set.binary_search(&user).is_ok()
}

/// Drop `user` from the set if present. Used when an account goes away.
pub fn forget(set: &mut Vec<Id>, user: Id) {
    if let Ok(pos) = set.binary_search(&user) {
        set.remove(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flips_and_reports_count() {
        let mut set = vec![2, 9];
        assert_eq!(toggle(&mut set, 5), Toggled { active: true, count: 3 });
        assert_eq!(set, vec![2, 5, 9]);
        assert_eq!(toggle(&mut set, 5), Toggled { active: false, count: 2 });
        assert_eq!(set, vec![2, 9]);
    }

    #[test]
    fn double_toggle_restores_original() {
        let original = vec![1, 3, 4];
        for user in [1, 2, 3, 4, 5] {
            let mut set = original.clone();
            toggle(&mut set, user);
            toggle(&mut set, user);
            assert_eq!(set, original);
        }
    }

    #[test]
    fn membership_stays_unique() {
        let mut set = Vec::new();
        for _ in 0..5 {
            toggle(&mut set, 7);
        }
        assert_eq!(set, vec![7]);
        assert!(contains(&set, 7));
        forget(&mut set, 7);
        forget(&mut set, 7);
        assert!(set.is_empty());
    }
}
