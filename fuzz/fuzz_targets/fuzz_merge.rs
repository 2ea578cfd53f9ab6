#![no_main]
use keyward_core::permissions::merge;
use libfuzzer_sys::fuzz_target;

// Four newline-separated lists, split on 0xff.
fuzz_target!(|data: &[u8]| {
    let mut lists: Vec<Vec<String>> = data
        .split(|b| *b == 0xff)
        .take(4)
        .map(|chunk| {
            String::from_utf8_lossy(chunk)
                .lines()
                .map(String::from)
                .collect()
        })
        .collect();
    lists.resize(4, Vec::new());

    let perm = merge(&lists[0], &lists[1], &lists[2], &lists[3]);
    for list in [perm.allow.as_slice(), perm.deny.as_slice()] {
        assert!(list.windows(2).all(|w| w[0] < w[1]), "unsorted or duplicated: {list:?}");
    }

    // Reordered inputs, with the two allow and two deny sources swapped.
    let shift = data.len();
    let shuffled: Vec<Vec<String>> = lists
        .iter()
        .map(|list| {
            let mut list: Vec<String> = list.iter().rev().cloned().collect();
            if !list.is_empty() {
                let len = list.len();
                list.rotate_left(shift % len);
            }
            list
        })
        .collect();
    assert_eq!(
        merge(&shuffled[1], &shuffled[0], &shuffled[3], &shuffled[2]),
        perm
    );

    let mut again = perm.clone();
    again.merge(&lists[0], &lists[1], &lists[2], &lists[3]);
    assert_eq!(perm, again);
});
