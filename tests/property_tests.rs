//! Property-based tests for the invariants spec.md §8 states in general
//! terms ("for every sequence of put/del...", "for every sequence of
//! push/pop...") rather than as one fixed scenario.

use std::collections::HashMap;
use std::rc::Rc;

use corert::{DynAllocator, KeyedArray, RawArray, SystemAllocator};
use proptest::prelude::*;

fn allocator() -> DynAllocator {
    Rc::new(SystemAllocator::new())
}

#[derive(Debug, Clone)]
enum ArrayOp {
    Push(i64),
    Pop,
}

fn array_op_strategy() -> impl Strategy<Value = ArrayOp> {
    prop_oneof![
        any::<i64>().prop_map(ArrayOp::Push),
        Just(ArrayOp::Pop),
    ]
}

proptest! {
    /// A `RawArray` driven by an arbitrary sequence of push/pop matches a
    /// `Vec` driven by the same sequence, element for element.
    #[test]
    fn raw_array_matches_a_vec_reference(ops in prop::collection::vec(array_op_strategy(), 0..200)) {
        let mut arr: RawArray<i64> = RawArray::new(allocator());
        let mut reference: Vec<i64> = Vec::new();

        for op in ops {
            match op {
                ArrayOp::Push(v) => {
                    arr.push(v).unwrap();
                    reference.push(v);
                }
                ArrayOp::Pop => {
                    prop_assert_eq!(arr.pop(), reference.pop());
                }
            }
        }
        prop_assert_eq!(arr.as_slice(), reference.as_slice());
    }

    /// `deln` always shrinks the array by exactly `min(n, len - i)` and
    /// leaves every surviving element in its original relative order.
    #[test]
    fn deln_matches_vec_drain(
        values in prop::collection::vec(any::<i32>(), 1..100),
        i in 0usize..100,
        n in 0usize..100,
    ) {
        let i = i % values.len();
        let mut arr: RawArray<i32> = RawArray::new(allocator());
        for &v in &values {
            arr.push(v).unwrap();
        }
        let mut reference = values.clone();

        arr.deln(i, n);
        let clamped_n = n.min(reference.len() - i);
        reference.drain(i..i + clamped_n);

        prop_assert_eq!(arr.as_slice(), reference.as_slice());
    }
}

#[derive(Debug, Clone)]
enum MapOp {
    Put(u16, i32),
    Del(u16),
}

fn map_op_strategy() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        (any::<u16>(), any::<i32>()).prop_map(|(k, v)| MapOp::Put(k, v)),
        any::<u16>().prop_map(MapOp::Del),
    ]
}

proptest! {
    /// For any interleaving of put/del — including enough puts to cross the
    /// linear-to-hash upgrade threshold and enough dels to force tombstones
    /// and a rehash — every key the reference `HashMap` says is live is
    /// findable via `geti`, and every key it says is gone is not.
    #[test]
    fn keyed_array_tracks_a_hashmap_reference(ops in prop::collection::vec(map_op_strategy(), 0..300)) {
        let mut map: KeyedArray<(u16, i32)> = KeyedArray::new(allocator());
        let mut reference: HashMap<u16, i32> = HashMap::new();

        for op in ops {
            match op {
                MapOp::Put(k, v) => {
                    map.put((k, v)).unwrap();
                    reference.insert(k, v);
                }
                MapOp::Del(k) => {
                    let removed = map.del(&k);
                    let expected = reference.remove(&k);
                    prop_assert_eq!(removed.map(|(_, v)| v), expected);
                }
            }
        }

        prop_assert_eq!(map.len(), reference.len());
        for (&k, &v) in &reference {
            let i = map.geti(&k).expect("reference key must be findable");
            prop_assert_eq!(map.as_slice()[i].1, v);
        }
    }
}
