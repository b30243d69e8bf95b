use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::Id;
use crate::toggle::Toggled;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowError {
    #[error("You cannot follow yourself.")]
    SelfFollow,
    #[error("You are already following this user.")]
    AlreadyFollowing,
    #[error("You are not following this user.")]
    NotFollowing,
}

/// One directed `follower -> followee` edge; the persisted form of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub follower: Id,
    pub followee: Id,
}

/// Directed follow graph with a forward (`following`) and a reverse
/// (`followers`) index. Both indexes change together inside every mutation,
/// so `followers` is always exactly the inverse of `following`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<Edge>", into = "Vec<Edge>")]
pub struct FollowGraph {
    following: BTreeMap<Id, BTreeSet<Id>>,
    followers: BTreeMap<Id, BTreeSet<Id>>,
}

impl FollowGraph {
    pub fn is_following(&self, follower: Id, followee: Id) -> bool {
        self.following.get(&follower).is_some_and(|s| s.contains(&followee))
    }

    /// Flip `follower`'s membership in its own `following` set with respect to
    /// `followee`. The returned count is the followee's follower count.
    pub fn toggle(&mut self, follower: Id, followee: Id) -> Result<Toggled, FollowError> {
        if follower == followee {
            return Err(FollowError::SelfFollow);
        }
        let active = if self.is_following(follower, followee) {
            self.unlink(follower, followee);
            false
        } else {
            self.link(follower, followee);
            true
        };
        Ok(Toggled { active, count: self.followers_count(followee) })
    }

    /// Add the edge; fails instead of flipping when it already exists.
    pub fn follow(&mut self, follower: Id, followee: Id) -> Result<Toggled, FollowError> {
        if follower == followee {
            return Err(FollowError::SelfFollow);
        }
        if self.is_following(follower, followee) {
            return Err(FollowError::AlreadyFollowing);
        }
        self.link(follower, followee);
        Ok(Toggled { active: true, count: self.followers_count(followee) })
    }

    pub fn unfollow(&mut self, follower: Id, followee: Id) -> Result<Toggled, FollowError> {
        if follower == followee {
            return Err(FollowError::SelfFollow);
        }
        if !self.is_following(follower, followee) {
            return Err(FollowError::NotFollowing);
        }
        self.unlink(follower, followee);
        Ok(Toggled { active: false, count: self.followers_count(followee) })
    }

    fn link(&mut self, follower: Id, followee: Id) {
        self.following.entry(follower).or_default().insert(followee);
        self.followers.entry(followee).or_default().insert(follower);
    }

    fn unlink(&mut self, follower: Id, followee: Id) {
        if let Some(s) = self.following.get_mut(&follower) {
            s.remove(&followee);
            if s.is_empty() {
                self.following.remove(&follower);
            }
        }
        if let Some(s) = self.followers.get_mut(&followee) {
            s.remove(&follower);
            if s.is_empty() {
                self.followers.remove(&followee);
            }
        }
    }

    pub fn following(&self, id: Id) -> Vec<Id> {
        self.following.get(&id).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    pub fn followers(&self, id: Id) -> Vec<Id> {
        self.followers.get(&id).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    pub fn followers_count(&self, id: Id) -> usize {
        self.followers.get(&id).map_or(0, BTreeSet::len)
    }

    pub fn following_count(&self, id: Id) -> usize {
        self.following.get(&id).map_or(0, BTreeSet::len)
    }

    /// Remove every edge touching `id`, in both directions.
    pub fn remove_user(&mut self, id: Id) {
        for followee in self.following(id) {
            self.unlink(id, followee);
        }
        for follower in self.followers(id) {
            self.unlink(follower, id);
        }
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.following
            .iter()
            .flat_map(|(&follower, set)| set.iter().map(move |&followee| Edge { follower, followee }))
    }
}

impl From<Vec<Edge>> for FollowGraph {
    fn from(edges: Vec<Edge>) -> Self {
        let mut g = FollowGraph::default();
        for e in edges.into_iter().filter(|e| e.follower != e.followee) {
            g.link(e.follower, e.followee);
        }
        g
    }
}

impl From<FollowGraph> for Vec<Edge> {
    fn from(g: FollowGraph) -> Self {
        g.edges().collect()
    }
}
