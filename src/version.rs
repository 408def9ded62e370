use std::cmp::Ordering;

/// Orders version strings. Injected wherever versions are compared so that
/// tests can substitute their own ordering.
pub trait VersionComparator {
    fn compare(&self, left: &str, right: &str) -> Ordering;
}

/// Whether moving from `old` to `new` is a change worth making. Equal versions
/// never are; lower ones only while downgrades are allowed.
pub fn should_upgrade(
    comparator: &dyn VersionComparator,
    old: &str,
    new: &str,
    do_not_downgrade: bool,
) -> bool {
    match comparator.compare(new, old) {
        Ordering::Greater => true,
        Ordering::Less => !do_not_downgrade,
        Ordering::Equal => false,
    }
}

/// Maven style ordering of versions.
///
/// Versions are split into numeric and textual items on `.`, `-` and on every
/// transition between digits and letters; `-` and transitions open a nested list.
/// Known qualifiers rank `alpha < beta < milestone < rc (cr) < snapshot < release
/// (ga, final) < sp`; any other qualifier (such as `redhat`) ranks above all of
/// them, so a vendor-suffixed version is newer than its unsuffixed base.
#[derive(Debug, Default, Clone, Copy)]
pub struct MavenVersionComparator;

impl VersionComparator for MavenVersionComparator {
    fn compare(&self, left: &str, right: &str) -> Ordering {
        compare_lists(&parse(left), &parse(right))
    }
}

const QUALIFIERS: [&str; 7] = ["alpha", "beta", "milestone", "rc", "snapshot", "", "sp"];
const RELEASE_INDEX: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    /// Digits with leading zeros removed.
    Int(String),
    Str(String),
    List(Vec<Item>),
}

impl Item {
    fn is_null(&self) -> bool {
        match self {
            Item::Int(digits) => digits.is_empty(),
            Item::Str(value) => value.is_empty(),
            Item::List(items) => items.is_empty(),
        }
    }
}

fn int_item(digits: &str) -> Item {
    Item::Int(digits.trim_start_matches('0').to_owned())
}

fn str_item(value: &str, followed_by_digit: bool) -> Item {
    let value = if followed_by_digit && value.len() == 1 {
        match value {
            "a" => "alpha",
            "b" => "beta",
            "m" => "milestone",
            other => other,
        }
    } else {
        value
    };
    let value = match value {
        "ga" | "final" | "release" => "",
        "cr" => "rc",
        other => other,
    };
    Item::Str(value.to_owned())
}

fn token_item(token: &str, is_digit: bool, followed_by_digit: bool) -> Item {
    if is_digit {
        int_item(token)
    } else {
        str_item(token, followed_by_digit)
    }
}

fn parse(version: &str) -> Vec<Item> {
    let version = version.trim().to_lowercase();
    let chars = version.char_indices().collect::<Vec<_>>();

    // Every open list; the last one receives new items.
    let mut stack: Vec<Vec<Item>> = vec![Vec::new()];
    let mut start = 0;
    let mut is_digit = false;

    for &(index, c) in &chars {
        match c {
            '.' | '-' => {
                let item = if index == start {
                    int_item("")
                } else {
                    token_item(&version[start..index], is_digit, false)
                };
                current(&mut stack).push(item);
                start = index + 1;
                if c == '-' {
                    stack.push(Vec::new());
                }
            }
            c if c.is_ascii_digit() => {
                if !is_digit && index > start {
                    current(&mut stack).push(str_item(&version[start..index], true));
                    start = index;
                    stack.push(Vec::new());
                }
                is_digit = true;
            }
            _ => {
                if is_digit && index > start {
                    current(&mut stack).push(int_item(&version[start..index]));
                    start = index;
                    stack.push(Vec::new());
                }
                is_digit = false;
            }
        }
    }
    if version.len() > start {
        let item = token_item(&version[start..], is_digit, false);
        current(&mut stack).push(item);
    }

    while stack.len() > 1 {
        let mut list = stack.pop().unwrap_or_default();
        normalize(&mut list);
        current(&mut stack).push(Item::List(list));
    }
    let mut root = stack.pop().unwrap_or_default();
    normalize(&mut root);
    root
}

fn current(stack: &mut [Vec<Item>]) -> &mut Vec<Item> {
    let last = stack.len() - 1;
    &mut stack[last]
}

/// Drops trailing null items, stepping over nested lists.
fn normalize(items: &mut Vec<Item>) {
    let mut index = items.len();
    while index > 0 {
        index -= 1;
        if items[index].is_null() {
            items.remove(index);
        } else if !matches!(items[index], Item::List(_)) {
            break;
        }
    }
}

fn comparable_qualifier(qualifier: &str) -> String {
    match QUALIFIERS.iter().position(|known| *known == qualifier) {
        Some(index) => index.to_string(),
        None => format!("{}-{}", QUALIFIERS.len(), qualifier),
    }
}

fn compare_digits(left: &str, right: &str) -> Ordering {
    left.len().cmp(&right.len()).then_with(|| left.cmp(right))
}

fn compare_items(left: Option<&Item>, right: Option<&Item>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (Some(item), None) => compare_to_null(item),
        (None, Some(item)) => compare_to_null(item).reverse(),
        (Some(left), Some(right)) => match (left, right) {
            (Item::Int(left), Item::Int(right)) => compare_digits(left, right),
            (Item::Int(_), _) => Ordering::Greater,
            (Item::Str(_), Item::Int(_)) => Ordering::Less,
            (Item::Str(left), Item::Str(right)) => {
                comparable_qualifier(left).cmp(&comparable_qualifier(right))
            }
            (Item::Str(_), Item::List(_)) => Ordering::Less,
            (Item::List(_), Item::Int(_)) => Ordering::Less,
            (Item::List(_), Item::Str(_)) => Ordering::Greater,
            (Item::List(left), Item::List(right)) => compare_lists(left, right),
        },
    }
}

fn compare_to_null(item: &Item) -> Ordering {
    match item {
        Item::Int(digits) if digits.is_empty() => Ordering::Equal,
        Item::Int(_) => Ordering::Greater,
        Item::Str(value) => comparable_qualifier(value).cmp(&RELEASE_INDEX.to_string()),
        Item::List(items) => match items.first() {
            Some(first) => compare_to_null(first),
            None => Ordering::Equal,
        },
    }
}

fn compare_lists(left: &[Item], right: &[Item]) -> Ordering {
    let length = left.len().max(right.len());
    (0..length)
        .map(|index| compare_items(left.get(index), right.get(index)))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_order(versions: &[&str]) {
        let comparator = MavenVersionComparator;
        for (index, lower) in versions.iter().enumerate() {
            for higher in &versions[index + 1..] {
                assert_eq!(
                    comparator.compare(lower, higher),
                    Ordering::Less,
                    "expected {lower} < {higher}"
                );
                assert_eq!(
                    comparator.compare(higher, lower),
                    Ordering::Greater,
                    "expected {higher} > {lower}"
                );
            }
        }
    }

    fn assert_equal(left: &str, right: &str) {
        assert_eq!(
            MavenVersionComparator.compare(left, right),
            Ordering::Equal,
            "expected {left} == {right}"
        );
    }

    #[test]
    fn numeric_ordering_is_not_lexicographic() {
        assert_order(&["1", "1.2", "1.9", "1.10", "2.0", "10.0"]);
    }

    #[test]
    fn qualifier_ordering() {
        assert_order(&[
            "1.0-alpha1",
            "1.0-beta1",
            "1.0-milestone1",
            "1.0-cr1",
            "1.0-SNAPSHOT",
            "1.0",
            "1.0-sp1",
        ]);
        assert_order(&["1.0.Alpha1", "1.0.Beta1", "1.0.CR1", "1.0.Final"]);
    }

    #[test]
    fn release_aliases_are_equal() {
        assert_equal("1.0", "1.0.Final");
        assert_equal("1.0", "1.0-ga");
        assert_equal("1.0", "1.0.0");
        assert_equal("1.0-cr1", "1.0-rc1");
        assert_equal("1.0a1", "1.0-alpha-1");
        assert_equal("01.2", "1.2");
    }

    #[test]
    fn vendor_suffix_is_newer_than_base() {
        assert_order(&["2.13.4.Final", "2.13.4.Final-redhat-00001", "2.13.4.Final-redhat-00002"]);
        assert_order(&["1.2.3", "1.2.3.redhat-1", "1.2.4"]);
    }

    #[test]
    fn downgrades_are_gated() {
        let comparator = MavenVersionComparator;
        assert!(should_upgrade(&comparator, "1.0", "2.0", true));
        assert!(should_upgrade(&comparator, "2.0", "1.0", false));
        assert!(!should_upgrade(&comparator, "2.0", "1.0", true));
        assert!(!should_upgrade(&comparator, "1.0", "1.0.Final", false));
    }
}
