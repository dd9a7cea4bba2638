// Reentrancy policy: lookups that call back into the same map from user
// code (here, the hash strategy) panic in debug builds; read-only access
// from an iteration visitor is allowed.
use linhash::{Djb2, HashStrategy, LinearHashMap};
use std::cell::Cell;
use std::rc::Rc;

type Map = LinearHashMap<String, i32, Reenter>;

// Hash strategy that, once armed, queries the map it belongs to.
#[derive(Clone)]
struct Reenter {
    map: Rc<Cell<*const Map>>,
    armed: Rc<Cell<bool>>,
}

impl HashStrategy for Reenter {
    fn hash_bytes(&self, bytes: &[u8]) -> u32 {
        if self.armed.replace(false) {
            // Safety: the pointer is set to the live map before arming and
            // only shared access is taken.
            let m = unsafe { &*self.map.get() };
            let _ = m.contains_key("other");
        }
        Djb2.hash_bytes(bytes)
    }
}

#[cfg(debug_assertions)]
#[test]
fn reentry_from_hash_strategy_panics() {
    let strategy = Reenter {
        map: Rc::new(Cell::new(std::ptr::null())),
        armed: Rc::new(Cell::new(false)),
    };
    let mut m: Map = LinearHashMap::with_strategy(strategy.clone());
    m.insert("k".to_string(), 1);
    strategy.map.set(&m as *const Map);

    strategy.armed.set(true);
    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = m.find("k");
    }));
    assert!(res.is_err(), "expected reentrancy to panic in debug builds");

    // The guard is released by unwinding; the map is usable again.
    assert_eq!(m.get("k"), Some(&1));
}

#[cfg(not(debug_assertions))]
#[test]
fn reentry_from_hash_strategy_is_unchecked_in_release() {
    let strategy = Reenter {
        map: Rc::new(Cell::new(std::ptr::null())),
        armed: Rc::new(Cell::new(false)),
    };
    let mut m: Map = LinearHashMap::with_strategy(strategy.clone());
    m.insert("k".to_string(), 1);
    strategy.map.set(&m as *const Map);
    strategy.armed.set(true);
    assert!(m.find("k").is_some());
}

#[test]
fn read_only_visitor_may_query_the_map() {
    let mut m: LinearHashMap<u32, u32> = LinearHashMap::new();
    for k in 0..32 {
        m.insert(k, k * 2);
    }
    let mut seen = 0;
    m.for_each(|k, v| {
        assert_eq!(m.get(k), Some(v));
        seen += 1;
    });
    assert_eq!(seen, 32);
}
