use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Post, RoleTag};

/// A participant: anyone who authored or liked at least one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNode {
    /// Username.
    pub id: String,
    pub post_count: u64,
    pub received_like_count: u64,
    pub given_like_count: u64,
    pub is_admin: bool,
    pub is_mod: bool,
    pub trust_level: u32,
}

impl UserNode {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            post_count: 0,
            received_like_count: 0,
            given_like_count: 0,
            is_admin: false,
            is_mod: false,
            trust_level: 0,
        }
    }
}

/// One like event, from the liker to the liked post's author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
}

/// Parallel likes between the same ordered pair, folded together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedLink {
    pub source: String,
    pub target: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialGraph {
    /// Nodes in first-seen order.
    pub nodes: Vec<UserNode>,
    /// One link per like, in post order.
    pub links: Vec<Link>,
}

impl SocialGraph {
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&UserNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    #[must_use]
    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Group links by `(source, target)`, keeping first-occurrence order.
    #[must_use]
    pub fn aggregated_links(&self) -> Vec<AggregatedLink> {
        let mut positions: HashMap<(&str, &str), usize> = HashMap::new();
        let mut aggregated: Vec<AggregatedLink> = Vec::new();

        for link in &self.links {
            let key = (link.source.as_str(), link.target.as_str());
            if let Some(&index) = positions.get(&key) {
                aggregated[index].count += 1;
            } else {
                positions.insert(key, aggregated.len());
                aggregated.push(AggregatedLink {
                    source: link.source.clone(),
                    target: link.target.clone(),
                    count: 1,
                });
            }
        }

        aggregated
    }
}

/// Fold one authored post into its author's node.
///
/// Role flags only ever turn on and trust level only ever rises, so folding
/// an author's posts in any order yields the same node.
#[must_use]
pub fn merge_role(mut existing: UserNode, post: &Post) -> UserNode {
    existing.post_count += 1;
    existing.received_like_count += post.like_count;
    existing.is_admin |= post.has_tag(RoleTag::Admin);
    existing.is_mod |= post.has_tag(RoleTag::Mod);
    existing.trust_level = existing.trust_level.max(post.author_trust_level);
    existing
}

/// Build the like graph of a thread in a single pass over its posts.
#[must_use]
pub fn build_graph(posts: &[Post]) -> SocialGraph {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut nodes: Vec<UserNode> = Vec::new();
    let mut links = Vec::new();

    for post in posts {
        let author = node_slot(&mut index, &mut nodes, &post.author);
        let current = std::mem::replace(&mut nodes[author], UserNode::new(""));
        nodes[author] = merge_role(current, post);

        for liker in &post.liked_by {
            let i = node_slot(&mut index, &mut nodes, liker);
            nodes[i].given_like_count += 1;
            links.push(Link {
                source: liker.clone(),
                target: post.author.clone(),
            });
        }
    }

    SocialGraph { nodes, links }
}

fn node_slot(index: &mut HashMap<String, usize>, nodes: &mut Vec<UserNode>, name: &str) -> usize {
    if let Some(&i) = index.get(name) {
        return i;
    }
    nodes.push(UserNode::new(name));
    index.insert(name.to_string(), nodes.len() - 1);
    nodes.len() - 1
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashSet};

    use chrono::{DateTime, Utc};

    use super::*;

    fn post(floor: usize, author: &str, likes: u64, liked_by: &[&str]) -> Post {
        Post {
            id: floor as i64 * 10,
            floor,
            author: author.to_string(),
            author_display_name: author.to_string(),
            author_avatar: None,
            author_trust_level: 0,
            author_role_tags: BTreeSet::new(),
            body_text: String::new(),
            created_at: DateTime::<Utc>::default(),
            like_count: likes,
            read_count: 0,
            liked_by: liked_by.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_counts_and_links() {
        let posts = vec![
            post(1, "alice", 2, &["bob", "carol"]),
            post(2, "bob", 1, &["alice"]),
            post(3, "alice", 0, &[]),
        ];
        let graph = build_graph(&posts);

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob", "carol"]);

        let alice = graph.node("alice").unwrap();
        assert_eq!(alice.post_count, 2);
        assert_eq!(alice.received_like_count, 2);
        assert_eq!(alice.given_like_count, 1);

        let carol = graph.node("carol").unwrap();
        assert_eq!(carol.post_count, 0);
        assert_eq!(carol.given_like_count, 1);

        assert_eq!(graph.links.len(), 3);
        assert_eq!(
            graph.links[0],
            Link {
                source: "bob".to_string(),
                target: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_post_count_sum_and_unique_nodes() {
        let posts = vec![
            post(1, "a", 3, &["b", "c", "d"]),
            post(2, "b", 1, &["a"]),
            post(3, "c", 2, &["a", "b"]),
            post(4, "a", 1, &["e"]),
            post(5, "f", 0, &[]),
        ];
        let graph = build_graph(&posts);

        let total: u64 = graph.nodes.iter().map(|n| n.post_count).sum();
        assert_eq!(total, posts.len() as u64);

        let mut expected: HashSet<&str> = posts.iter().map(|p| p.author.as_str()).collect();
        for p in &posts {
            expected.extend(p.liked_by.iter().map(String::as_str));
        }
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
        assert_eq!(unique, expected);
    }

    #[test]
    fn test_mod_flag_is_cumulative_in_both_orders() {
        let mut tagged = post(1, "mia", 0, &[]);
        tagged.author_role_tags.insert(RoleTag::Mod);
        let untagged = post(2, "mia", 0, &[]);

        let forward = build_graph(&[tagged.clone(), untagged.clone()]);
        assert!(forward.node("mia").unwrap().is_mod);

        let reverse = build_graph(&[untagged, tagged]);
        assert!(reverse.node("mia").unwrap().is_mod);
        assert!(!reverse.node("mia").unwrap().is_admin);
    }

    #[test]
    fn test_trust_level_running_max() {
        let posts: Vec<Post> = [1, 3, 2]
            .into_iter()
            .enumerate()
            .map(|(i, level)| {
                let mut p = post(i + 1, "tom", 0, &[]);
                p.author_trust_level = level;
                p
            })
            .collect();
        assert_eq!(build_graph(&posts).node("tom").unwrap().trust_level, 3);
    }

    #[test]
    fn test_merge_role_is_order_insensitive() {
        let mut admin_post = post(1, "x", 4, &[]);
        admin_post.author_role_tags.insert(RoleTag::Admin);
        admin_post.author_trust_level = 1;
        let mut senior_post = post(2, "x", 1, &[]);
        senior_post.author_trust_level = 4;

        let a = merge_role(merge_role(UserNode::new("x"), &admin_post), &senior_post);
        let b = merge_role(merge_role(UserNode::new("x"), &senior_post), &admin_post);
        assert_eq!(a, b);
        assert!(a.is_admin);
        assert_eq!(a.trust_level, 4);
        assert_eq!(a.received_like_count, 5);
    }

    #[test]
    fn test_aggregated_links() {
        let posts = vec![
            post(1, "a", 1, &["b"]),
            post(2, "a", 2, &["b", "c"]),
            post(3, "b", 1, &["a"]),
        ];
        let aggregated = build_graph(&posts).aggregated_links();
        assert_eq!(
            aggregated,
            vec![
                AggregatedLink {
                    source: "b".to_string(),
                    target: "a".to_string(),
                    count: 2
                },
                AggregatedLink {
                    source: "c".to_string(),
                    target: "a".to_string(),
                    count: 1
                },
                AggregatedLink {
                    source: "a".to_string(),
                    target: "b".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_empty_thread() {
        let graph = build_graph(&[]);
        assert!(graph.nodes.is_empty());
        assert!(graph.links.is_empty());
    }
}
