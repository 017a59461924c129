extern crate gpucache;
extern crate rand;

use gpucache::utils::prelude::*;

#[test]
fn handle_set() {
    let mut set: HandlePool<Handle> = HandlePool::new();
    assert_eq!(set.len(), 0);

    let e1 = set.create();
    assert!(e1.is_valid());
    assert!(set.is_alive(e1));
    assert_eq!(set.len(), 1);

    let e2 = e1;
    assert!(set.is_alive(e2));
    assert!(!set.is_alive(Handle::nil()));

    assert!(set.free(e2));
    assert!(!set.is_alive(e2));
    assert!(!set.is_alive(e1));
    assert!(set.is_empty());
}

#[test]
fn index_reuse() {
    let mut set: HandlePool<Handle> = HandlePool::new();

    let mut v = vec![];
    for _ in 0..10 {
        v.push(set.create());
    }

    assert_eq!(set.len(), 10);
    for e in v.iter() {
        set.free(*e);
    }

    for _ in 0..10 {
        let e = set.create();
        assert!((e.index() as usize) < v.len());
        assert!(v[e.index() as usize].version() != e.version());
        assert!(!set.is_alive(v[e.index() as usize]));
    }
}

#[test]
fn index_compact_reuse() {
    let mut set: HandlePool<Handle> = HandlePool::new();

    let mut v = vec![];
    for _ in 0..5 {
        for _ in 0..50 {
            v.push(set.create());
        }

        let size = v.len() / 2;
        for _ in 0..size {
            let len = v.len();
            set.free(v.swap_remove(rand::random::<usize>() % len));
        }
    }

    for i in v {
        set.free(i);
    }

    for index in 0..50 {
        let handle = set.create();
        assert_eq!(handle.index(), index);
    }
}

#[test]
fn iter() {
    let mut set: HandlePool<Handle> = HandlePool::new();
    let mut v = vec![];

    for _ in 0..20 {
        v.push(set.create());
    }

    for i in (0..20).rev() {
        if i % 3 == 0 {
            set.free(v.remove(i));
        }
    }

    let alive: Vec<_> = set.iter().collect();
    assert_eq!(alive, v);
    assert_eq!(set.len(), v.len());
}
