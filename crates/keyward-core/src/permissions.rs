use serde::{Deserialize, Serialize};

/// Ordered set of subject patterns or tags.
///
/// `add` never inserts a value that is already present, so duplicates
/// arriving from different flag sources collapse silently. Blank values
/// are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringList(Vec<String>);

impl StringList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn add<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for item in items {
            let item = item.as_ref().trim();
            if !item.is_empty() && !self.contains(item) {
                self.0.push(item.to_string());
            }
        }
    }

    pub fn remove<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for item in items {
            let item = item.as_ref();
            self.0.retain(|v| v != item);
        }
    }

    pub fn contains(&self, item: &str) -> bool {
        self.0.iter().any(|v| v == item)
    }

    pub fn sort(&mut self) {
        self.0.sort();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for StringList {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut list = StringList::new();
        list.add(iter);
        list
    }
}

/// Allow/deny pair for one direction (publish or subscribe).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default, skip_serializing_if = "StringList::is_empty")]
    pub allow: StringList,
    #[serde(default, skip_serializing_if = "StringList::is_empty")]
    pub deny: StringList,
}

impl Permission {
    /// Merge direction-specific and combined lists into this permission.
    ///
    /// Both sequences are sorted afterwards. The same pattern may end up
    /// in allow and deny; precedence is up to whoever consumes the claim.
    pub fn merge(
        &mut self,
        allow: &[String],
        allow_both: &[String],
        deny: &[String],
        deny_both: &[String],
    ) {
        self.allow.add(allow);
        self.allow.add(allow_both);
        self.allow.sort();

        self.deny.add(deny);
        self.deny.add(deny_both);
        self.deny.sort();
    }

    /// Drop patterns from both allow and deny.
    pub fn remove(&mut self, patterns: &[String]) {
        self.allow.remove(patterns);
        self.deny.remove(patterns);
    }

    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }
}

/// Build a fresh permission from the four input lists.
pub fn merge(
    allow: &[String],
    allow_both: &[String],
    deny: &[String],
    deny_both: &[String],
) -> Permission {
    let mut perm = Permission::default();
    perm.merge(allow, allow_both, deny, deny_both);
    perm
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(rename = "pub", default, skip_serializing_if = "Permission::is_empty")]
    pub publish: Permission,
    #[serde(rename = "sub", default, skip_serializing_if = "Permission::is_empty")]
    pub subscribe: Permission,
}

/// The six categorized permission inputs of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionLists {
    pub allow_pub: Vec<String>,
    pub allow_sub: Vec<String>,
    pub allow_pubsub: Vec<String>,
    pub deny_pub: Vec<String>,
    pub deny_sub: Vec<String>,
    pub deny_pubsub: Vec<String>,
}

impl PermissionLists {
    /// Overwrite-merge into an existing permission container.
    ///
    /// Pub receives the pub-only and pubsub lists, Sub the sub-only and
    /// pubsub lists.
    pub fn apply(&self, perms: &mut Permissions) {
        perms.publish.merge(
            &self.allow_pub,
            &self.allow_pubsub,
            &self.deny_pub,
            &self.deny_pubsub,
        );
        perms.subscribe.merge(
            &self.allow_sub,
            &self.allow_pubsub,
            &self.deny_sub,
            &self.deny_pubsub,
        );
    }

    pub fn build(&self) -> Permissions {
        let mut perms = Permissions::default();
        self.apply(&mut perms);
        perms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn string_list_add_skips_duplicates() {
        let mut list = StringList::new();
        list.add(["b", "a", "b"]);
        list.add(["a", "c"]);
        assert_eq!(list.as_slice(), &v(&["b", "a", "c"])[..]);
        list.sort();
        assert_eq!(list.as_slice(), &v(&["a", "b", "c"])[..]);
        list.remove(["b"]);
        assert_eq!(list.as_slice(), &v(&["a", "c"])[..]);
    }

    #[test]
    fn string_list_add_skips_blank_entries() {
        let mut list = StringList::new();
        list.add(["a", "", "  ", " b "]);
        assert_eq!(list.as_slice(), &v(&["a", "b"])[..]);
        let perm = merge(&v(&["a", "", "b"]), &v(&[""]), &v(&[" "]), &[]);
        assert_eq!(perm.allow.as_slice(), &v(&["a", "b"])[..]);
        assert!(perm.deny.is_empty());
    }

    #[test]
    fn merge_sorts_and_dedups_across_sources() {
        let perm = merge(
            &v(&["foo.>", "bar.>"]),
            &v(&["bar.>", "alpha"]),
            &v(&["zed", "x"]),
            &v(&["x"]),
        );
        assert_eq!(perm.allow.as_slice(), &v(&["alpha", "bar.>", "foo.>"])[..]);
        assert_eq!(perm.deny.as_slice(), &v(&["x", "zed"])[..]);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut perm = Permission::default();
        let (a, b, c, d) = (v(&["q", "p"]), v(&["p", "r"]), v(&["s"]), v(&["t", "s"]));
        perm.merge(&a, &b, &c, &d);
        let once = perm.clone();
        perm.merge(&a, &b, &c, &d);
        assert_eq!(perm, once);
    }

    #[test]
    fn merge_is_order_independent() {
        let a = v(&["m", "c", "x", "c"]);
        let b = v(&["b", "m", "a"]);
        let c = v(&["d3", "d1", "d2"]);
        let d = v(&["d2", "d0"]);
        let reference = merge(&a, &b, &c, &d);

        let rev = |x: &Vec<String>| x.iter().rev().cloned().collect::<Vec<_>>();
        let rotated = |x: &Vec<String>| {
            let mut r = x.clone();
            r.rotate_left(1);
            r
        };
        assert_eq!(merge(&rev(&a), &rev(&b), &rev(&c), &rev(&d)), reference);
        assert_eq!(
            merge(&rotated(&a), &rotated(&b), &rotated(&c), &rotated(&d)),
            reference
        );
        // swapping the two allow sources does not matter either
        assert_eq!(merge(&b, &a, &d, &c), reference);
    }

    #[test]
    fn allow_and_deny_may_overlap() {
        let perm = merge(&v(&["foo"]), &[], &v(&["foo"]), &[]);
        assert!(perm.allow.contains("foo"));
        assert!(perm.deny.contains("foo"));
    }

    #[test]
    fn lists_split_pubsub_into_both_directions() {
        let lists = PermissionLists {
            allow_pub: v(&["foo.>"]),
            allow_pubsub: v(&["bar.>"]),
            deny_sub: v(&["baz.>"]),
            ..Default::default()
        };
        let perms = lists.build();
        assert_eq!(perms.publish.allow.as_slice(), &v(&["bar.>", "foo.>"])[..]);
        assert!(perms.publish.deny.is_empty());
        assert_eq!(perms.subscribe.allow.as_slice(), &v(&["bar.>"])[..]);
        assert_eq!(perms.subscribe.deny.as_slice(), &v(&["baz.>"])[..]);
    }

    #[test]
    fn permissions_serialize_compactly() {
        let lists = PermissionLists {
            allow_pub: v(&["a"]),
            ..Default::default()
        };
        let json = serde_json::to_value(lists.build()).unwrap();
        assert_eq!(json, serde_json::json!({"pub": {"allow": ["a"]}}));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn list_and_shuffled() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
            prop::collection::vec("[a-d ]{0,3}(\\.>)?", 0..8)
                .prop_flat_map(|list| (Just(list.clone()), Just(list).prop_shuffle()))
        }

        fn strictly_sorted(list: &StringList) -> bool {
            list.as_slice().windows(2).all(|w| w[0] < w[1])
                && list.as_slice().iter().all(|s| !s.trim().is_empty())
        }

        proptest! {
            #[test]
            fn merge_ignores_input_order(
                (a, sa) in list_and_shuffled(),
                (b, sb) in list_and_shuffled(),
                (c, sc) in list_and_shuffled(),
                (d, sd) in list_and_shuffled(),
            ) {
                let reference = merge(&a, &b, &c, &d);
                prop_assert_eq!(&merge(&sa, &sb, &sc, &sd), &reference);
                prop_assert_eq!(&merge(&b, &a, &d, &c), &reference);
                prop_assert!(strictly_sorted(&reference.allow));
                prop_assert!(strictly_sorted(&reference.deny));

                let mut again = reference.clone();
                again.merge(&a, &b, &c, &d);
                prop_assert_eq!(again, reference);
            }
        }
    }
}
