// Gc property tests.
//
// Property 1: counts match live handles.
//  - Model: the list of live handles; each handle's address is read back
//    from the handle itself.
//  - Invariant: for every live handle, refcount(address) equals the number
//    of live handles on that address. After any sweep (collect or drop),
//    len() equals the number of distinct live addresses.
//  - Operations: construct, clone, drop, assign to a fresh allocation,
//    assign from another handle, collect.
//
// Property 2: every allocation is freed exactly once.
//  - Model: per-allocation drop counters.
//  - Invariant: once all handles are gone, every counter reads 1.
use proptest::prelude::*;
use rc_collect::{Gc, Registry};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

struct Counted {
    drops: Rc<Cell<u32>>,
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

fn fresh(counters: &mut Vec<Rc<Cell<u32>>>) -> Box<Counted> {
    let drops = Rc::new(Cell::new(0));
    counters.push(Rc::clone(&drops));
    Box::new(Counted { drops })
}

fn per_address(live: &[Gc<Counted>]) -> HashMap<*const Counted, usize> {
    let mut m = HashMap::new();
    for g in live {
        *m.entry(g.as_ptr()).or_insert(0) += 1;
    }
    m
}

proptest! {
    #[test]
    fn prop_counts_match_live_handles(
        ops in proptest::collection::vec((0u8..=5u8, 0usize..64usize, 0usize..64usize), 1..128)
    ) {
        let reg: Registry<Counted> = Registry::new();
        let mut counters = Vec::new();
        let mut live: Vec<Gc<Counted>> = Vec::new();

        for (op, i, j) in ops {
            let mut swept = false;
            match op {
                // Construct over a fresh allocation.
                0 => live.push(Gc::new(&reg, fresh(&mut counters))),
                // Clone an existing handle.
                1 => {
                    if !live.is_empty() {
                        let g = live[i % live.len()].clone();
                        live.push(g);
                    }
                }
                // Drop a handle; drop always sweeps.
                2 => {
                    if !live.is_empty() {
                        let g = live.swap_remove(i % live.len());
                        drop(g);
                        swept = true;
                    }
                }
                // Reassign to a fresh allocation.
                3 => {
                    if !live.is_empty() {
                        let n = live.len();
                        live[i % n].assign(fresh(&mut counters));
                    }
                }
                // Reassign from another handle.
                4 => {
                    if !live.is_empty() {
                        let n = live.len();
                        let src = live[j % n].clone();
                        live[i % n].assign_from(&src);
                        drop(src);
                        swept = true;
                    }
                }
                // Explicit collect.
                5 => {
                    reg.collect();
                    swept = true;
                }
                _ => unreachable!(),
            }

            let expected = per_address(&live);
            for (addr, n) in &expected {
                prop_assert_eq!(reg.refcount(*addr), Some(*n));
            }
            if swept {
                prop_assert_eq!(reg.len(), expected.len());
            } else {
                prop_assert!(reg.len() >= expected.len());
            }
        }

        drop(live);
        reg.collect();
        prop_assert!(reg.is_empty());
        for c in &counters {
            prop_assert_eq!(c.get(), 1);
        }
    }
}

// Property 3: reassignment moves exactly one count.
proptest! {
    #[test]
    fn prop_reassign_moves_one_count(extra_old in 0usize..4, extra_new in 0usize..4) {
        let reg: Registry<u32> = Registry::new();
        let mut h = Gc::new(&reg, Box::new(0));
        let old_clones: Vec<_> = (0..extra_old).map(|_| h.clone()).collect();
        let target = Gc::new(&reg, Box::new(1));
        let new_clones: Vec<_> = (0..extra_new).map(|_| target.clone()).collect();

        let old = h.as_ptr();
        let old_before = reg.refcount(old).unwrap();
        let new_before = reg.refcount(target.as_ptr()).unwrap();

        h.assign_from(&target);
        prop_assert_eq!(reg.refcount(old), Some(old_before - 1));
        prop_assert_eq!(reg.refcount(target.as_ptr()), Some(new_before + 1));

        let before_fresh = reg.refcount(h.as_ptr()).unwrap();
        h.assign(Box::new(2));
        prop_assert_eq!(reg.refcount(target.as_ptr()), Some(before_fresh - 1));
        prop_assert_eq!(reg.refcount(h.as_ptr()), Some(1));

        drop(old_clones);
        drop(new_clones);
    }
}
