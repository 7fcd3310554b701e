use std::collections::BTreeSet;

use errprop_core::SourceIdGenerator;
use proptest::prelude::*;

fn issue_concurrently(threads: usize, per_thread: usize, block: usize) -> Vec<u64> {
    let ids = SourceIdGenerator::new();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(|| {
                    let mut issued = Vec::new();
                    for _ in 0..per_thread {
                        let range = ids.next_ids(block).unwrap();
                        let raw: Vec<u64> = range.raw().collect();
                        assert!(raw.windows(2).all(|w| w[0] < w[1]));
                        issued.extend(raw);
                    }
                    issued
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    })
}

#[test]
fn eight_threads_never_share_an_id() {
    let issued = issue_concurrently(8, 500, 3);
    let unique: BTreeSet<u64> = issued.iter().copied().collect();
    assert_eq!(issued.len(), 8 * 500 * 3);
    assert_eq!(unique.len(), issued.len());
    assert!(!unique.contains(&0));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]
    #[test]
    fn ids_unique_for_any_thread_count(
        threads in 1usize..6,
        per_thread in 1usize..50,
        block in 1usize..5,
    ) {
        let issued = issue_concurrently(threads, per_thread, block);
        let unique: BTreeSet<u64> = issued.iter().copied().collect();
        prop_assert_eq!(unique.len(), threads * per_thread * block);
    }
}
