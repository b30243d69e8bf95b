//! Ownership and visibility rules.
//!
//! Deletion is wider than editing: the author of a post may
//! remove any comment under it, and the author of a comment may remove any
//! sub-comment under it.

use crate::models::{Comment, Id, Post, SubComment};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PermissionDenied(pub &'static str);

type Policy = Result<(), PermissionDenied>;

fn allow_if(ok: bool, msg: &'static str) -> Policy {
    if ok { Ok(()) } else { Err(PermissionDenied(msg)) }
}

pub fn can_view_post(viewer: Option<Id>, post: &Post) -> bool {
    post.is_public || viewer == Some(post.author_id)
}

pub fn view_post(viewer: Id, post: &Post) -> Policy {
    allow_if(can_view_post(Some(viewer), post), "You do not have permission to view this post.")
}

pub fn edit_post(actor: Id, post: &Post) -> Policy {
    allow_if(actor == post.author_id, "You do not have permission to edit this post.")
}

pub fn delete_post(actor: Id, post: &Post) -> Policy {
    allow_if(actor == post.author_id, "You do not have permission to delete this post.")
}

pub fn edit_comment(actor: Id, comment: &Comment) -> Policy {
    allow_if(actor == comment.author_id, "You do not have permission to edit this comment.")
}

pub fn delete_comment(actor: Id, comment: &Comment, post_author: Id) -> Policy {
    allow_if(
        actor == comment.author_id || actor == post_author,
        "You do not have permission to delete this comment.",
    )
}

pub fn edit_subcomment(actor: Id, sub: &SubComment) -> Policy {
    allow_if(actor == sub.author_id, "You do not have permission to edit this sub-comment.")
}

pub fn delete_subcomment(actor: Id, sub: &SubComment, comment_author: Id) -> Policy {
    allow_if(
        actor == sub.author_id || actor == comment_author,
        "You do not have permission to delete this sub-comment.",
    )
}

pub fn edit_profile(actor: Id, profile_id: Id) -> Policy {
    allow_if(actor == profile_id, "You do not have permission to edit this profile.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post(author_id: Id, is_public: bool) -> Post {
        let now = Utc::now();
        Post {
            id: 1,
            author_id,
            content: Some("x".into()),
            image: None,
            is_public,
            created_at: now,
            updated_at: now,
            likes: vec![],
            dislikes: vec![],
            reposted_from: None,
            reposted_by: None,
        }
    }

    fn comment(author_id: Id) -> Comment {
        Comment { id: 1, post_id: 1, author_id, content: "c".into(), created_at: Utc::now(), likes: vec![] }
    }

    #[test]
    fn private_post_only_visible_to_author() {
        let p = post(1, false);
        assert!(can_view_post(Some(1), &p));
        assert!(!can_view_post(Some(2), &p));
        assert!(!can_view_post(None, &p));
        assert!(can_view_post(None, &post(1, true)));
    }

    #[test]
    fn post_author_may_delete_foreign_comment() {
        let c = comment(5);
        assert!(delete_comment(5, &c, 9).is_ok());
        assert!(delete_comment(9, &c, 9).is_ok());
        assert!(delete_comment(7, &c, 9).is_err());
        // editing stays with the comment author
        assert!(edit_comment(9, &c).is_err());
    }

    #[test]
    fn comment_author_may_delete_foreign_subcomment() {
        let now = Utc::now();
        let s = SubComment { id: 1, comment_id: 1, author_id: 5, content: "s".into(), created_at: now, updated_at: now, likes: vec![] };
        assert!(delete_subcomment(3, &s, 3).is_ok());
        assert_eq!(
            delete_subcomment(4, &s, 3),
            Err(PermissionDenied("You do not have permission to delete this sub-comment."))
        );
        assert!(edit_subcomment(3, &s).is_err());
    }
}
