// Cursor test suite.
//
// Invariants exercised:
// - Bounds: for a cursor over `len` elements positioned at the start,
//   index(i) succeeds iff 0 <= i < len.
// - Moves never check bounds; reads do.
// - begin()/end() bound exactly the handle's allocation: one element for
//   single objects, N for arrays.
// - Cursors never change reference counts.
use rc_collect::{Cursor, Error, Gc, Registry};
use std::cell::Cell;

// Test: array handle traversal.
// Scenario: 10-element array; begin/end are 10 apart; write 0..9, then
// index 10 is out of range.
#[test]
fn ten_element_array_bounds() {
    let reg: Registry<i32, 10> = Registry::new();
    let mut ap = Gc::new_array(&reg, Box::new([0; 10]));

    {
        let begin = ap.begin();
        let end = ap.end();
        assert_eq!(end - begin, 10);
        assert_eq!(begin.len(), 10);
    }

    let slots = Gc::get_mut(&mut ap).expect("sole handle");
    for (i, slot) in slots.iter_mut().enumerate() {
        *slot = i as i32;
    }

    let begin = ap.begin();
    for i in 0..10 {
        assert_eq!(*begin.index(i).unwrap(), i as i32);
        assert_eq!(ap[i as usize], i as i32);
    }
    match begin.index(10) {
        Err(Error::OutOfRange { offset, len }) => {
            assert_eq!(offset, 10);
            assert_eq!(len, 10);
        }
        other => panic!("expected OutOfRange, got {other:?}"),
    }
    assert!(begin.index(-1).is_err());
    assert!(ap.end().get().is_err());
}

// Test: writing through a cursor with interior mutability.
// Verifies: every in-range position is writable; the walk stops at end().
#[test]
fn walk_and_write_through_cells() {
    let reg: Registry<Cell<u32>, 4> = Registry::new();
    let ap = Gc::new_array(&reg, Box::new(std::array::from_fn(|_| Cell::new(0))));

    let mut c = ap.begin();
    let end = ap.end();
    let mut n = 0;
    while c < end {
        c.get().unwrap().set(n * n);
        c.inc();
        n += 1;
    }
    assert_eq!(n, 4);
    assert_eq!(c, end);
    let squares: Vec<u32> = ap.as_slice().iter().map(Cell::get).collect();
    assert_eq!(squares, vec![0, 1, 4, 9]);
}

// Test: single-object handles bound one element.
#[test]
fn single_object_cursor_spans_one() {
    let reg: Registry<String> = Registry::new();
    let p = Gc::new(&reg, Box::new("solo".to_string()));
    let begin = p.begin();
    assert_eq!(p.end() - begin, 1);
    assert_eq!(begin.get().unwrap(), "solo");
    assert!((begin + 1).get().is_err());
    assert!(begin.index(1).is_err());
}

// Test: cursors are ownership-inert.
#[test]
fn cursors_do_not_touch_counts() {
    let reg: Registry<u8, 3> = Registry::new();
    let ap = Gc::new_array(&reg, Box::new([1, 2, 3]));
    let before = reg.refcount(ap.as_ptr());
    let cursors: Vec<Cursor<'_, u8>> = (0..5).map(|i| ap.begin() + i).collect();
    assert_eq!(reg.refcount(ap.as_ptr()), before);
    assert_eq!(cursors.iter().filter(|c| c.get().is_ok()).count(), 3);
}

// Test: pre/post increment and decrement and offset arithmetic.
#[test]
fn movement_forms() {
    let reg: Registry<u8, 5> = Registry::new();
    let ap = Gc::new_array(&reg, Box::new([10, 11, 12, 13, 14]));
    let mut c = ap.begin();

    assert_eq!(*c.post_inc().get().unwrap(), 10);
    assert_eq!(*c.get().unwrap(), 11);
    assert_eq!(*c.inc().get().unwrap(), 12);
    assert_eq!(*c.post_dec().get().unwrap(), 12);
    assert_eq!(*c.dec().get().unwrap(), 10);

    c += 4;
    assert_eq!(*c.get().unwrap(), 14);
    c -= 10;
    assert_eq!(c.offset(), -6);
    assert!(c.get().is_err());
    assert_eq!(*(c + 6).get().unwrap(), 10);
    assert_eq!(*((ap.end()) - 1).get().unwrap(), 14);
}

// Test: detached cursor over caller-managed memory.
#[test]
fn raw_parts_cursor() {
    let data = vec![5u16, 6, 7];
    let base = std::ptr::NonNull::new(data.as_ptr().cast_mut()).unwrap();
    let c = unsafe { Cursor::from_raw_parts(base, data.len(), 2) };
    assert_eq!(*c.get().unwrap(), 7);
    assert!(c.index(1).is_err());
    assert_eq!(*c.index(-2).unwrap(), 5);
}
