//! Flattens a comment thread while tracking the collapsed parts that still
//! need fetching.

use crate::api::{RedditCommentData, RedditCommentNode, RedditMoreData};
use harvester_core::RemoteComment;
use std::collections::{HashSet, VecDeque};

/// `/api/morechildren` accepts at most this many ids per call.
pub const MORE_CHILDREN_CHUNK: usize = 100;

/// Next fetch needed to finish expanding a thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Expansion {
    /// Collapsed sibling ids, at most [`MORE_CHILDREN_CHUNK`] of them.
    Children(Vec<String>),
    /// A "continue this thread" link rooted at this comment id.
    Thread { comment_id: String },
}

#[derive(Debug, Default)]
pub struct CommentTree {
    comments: Vec<RemoteComment>,
    seen: HashSet<String>,
    pending: VecDeque<RedditMoreData>,
    requested: HashSet<String>,
}

impl CommentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every comment reachable from `nodes`, depth first, queueing the
    /// collapsed placeholders. Comments already absorbed are ignored.
    pub fn absorb(&mut self, nodes: Vec<RedditCommentNode>) {
        let mut stack: Vec<RedditCommentNode> = nodes.into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            match node {
                RedditCommentNode::Comment(comment) => {
                    let RedditCommentData {
                        id,
                        body,
                        permalink,
                        score,
                        created_utc,
                        replies,
                        ..
                    } = *comment;
                    stack.extend(replies.into_iter().rev());
                    if self.seen.insert(id.clone()) {
                        self.comments.push(RemoteComment {
                            id,
                            body,
                            permalink,
                            score,
                            created_utc,
                        });
                    }
                }
                RedditCommentNode::More(more) => self.pending.push_back(more),
            }
        }
    }

    /// Pops the next fetch, skipping anything already absorbed or requested.
    pub fn next_expansion(&mut self) -> Option<Expansion> {
        while let Some(more) = self.pending.pop_front() {
            if more.is_thread_continuation() {
                let Some(comment_id) = more.parent_id.strip_prefix("t1_") else {
                    continue;
                };
                let key = format!("thread:{}", comment_id);
                if self.requested.insert(key) {
                    return Some(Expansion::Thread {
                        comment_id: comment_id.to_string(),
                    });
                }
                continue;
            }

            let mut ids: Vec<String> = more
                .children
                .into_iter()
                .filter(|id| !self.seen.contains(id) && !self.requested.contains(id))
                .collect();
            if ids.is_empty() {
                continue;
            }

            if ids.len() > MORE_CHILDREN_CHUNK {
                let rest = ids.split_off(MORE_CHILDREN_CHUNK);
                self.pending.push_front(RedditMoreData {
                    id: more.id,
                    parent_id: more.parent_id,
                    count: rest.len() as u64,
                    children: rest,
                });
            }
            self.requested.extend(ids.iter().cloned());
            return Some(Expansion::Children(ids));
        }
        None
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn into_comments(self) -> Vec<RemoteComment> {
        self.comments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nodes(value: serde_json::Value) -> Vec<RedditCommentNode> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_absorb_flattens_depth_first() {
        let mut tree = CommentTree::new();
        tree.absorb(nodes(json!([
            { "kind": "t1", "data": { "id": "a", "replies": { "kind": "Listing", "data": { "children": [
                { "kind": "t1", "data": { "id": "a1", "replies": "" } }
            ] } } } },
            { "kind": "t1", "data": { "id": "b", "replies": "" } }
        ])));

        let ids: Vec<String> = tree.into_comments().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a", "a1", "b"]);
    }

    #[test]
    fn test_duplicate_comments_are_absorbed_once() {
        let mut tree = CommentTree::new();
        let batch = json!([{ "kind": "t1", "data": { "id": "a", "body": "x" } }]);
        tree.absorb(nodes(batch.clone()));
        tree.absorb(nodes(batch));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_more_children_are_chunked() {
        let children: Vec<String> = (0..250).map(|i| format!("c{}", i)).collect();
        let mut tree = CommentTree::new();
        tree.absorb(nodes(json!([
            { "kind": "more", "data": { "id": "m", "parent_id": "t3_p", "count": 250, "children": children } }
        ])));

        let mut sizes = Vec::new();
        while let Some(expansion) = tree.next_expansion() {
            match expansion {
                Expansion::Children(ids) => sizes.push(ids.len()),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn test_known_children_are_not_requested_again() {
        let mut tree = CommentTree::new();
        tree.absorb(nodes(json!([
            { "kind": "t1", "data": { "id": "a" } },
            { "kind": "more", "data": { "id": "m1", "parent_id": "t3_p", "children": ["a", "b"] } },
            { "kind": "more", "data": { "id": "m2", "parent_id": "t3_p", "children": ["b"] } }
        ])));

        assert_eq!(
            tree.next_expansion(),
            Some(Expansion::Children(vec!["b".to_string()]))
        );
        assert_eq!(tree.next_expansion(), None);
    }

    #[test]
    fn test_thread_continuation_requested_once() {
        let stub = json!({ "kind": "more", "data": { "id": "_", "parent_id": "t1_deep", "count": 0, "children": [] } });
        let mut tree = CommentTree::new();
        tree.absorb(nodes(json!([stub.clone(), stub])));

        assert_eq!(
            tree.next_expansion(),
            Some(Expansion::Thread {
                comment_id: "deep".to_string()
            })
        );
        assert_eq!(tree.next_expansion(), None);
    }
}
