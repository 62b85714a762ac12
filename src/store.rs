// src/store.rs

//! Thread-safe key/value store shared by every node of a DAG.
//!
//! Callbacks use it to hand data to each other, e.g. a setup hook publishes
//! a generated e-mail address that a later login test reads back.
//!
//! Values are type-erased; the reader names the type it expects:
//!
//! ```
//! use tdag::store::Store;
//!
//! let store = Store::new();
//! store.set("email", String::from("test@example.com"));
//! let email: String = store.get("email").unwrap();
//! assert_eq!(email, "test@example.com");
//! assert!(store.get::<String>("missing").is_err());
//! ```

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::errors::{Result, TdagError};

type Value = Arc<dyn Any + Send + Sync>;

/// Mutex-guarded map from string keys to values of any type.
///
/// Every operation holds the single internal lock for the duration of one
/// map access. Last write wins.
#[derive(Default)]
pub struct Store {
    items: Mutex<HashMap<String, Value>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing whatever was there.
    pub fn set<V>(&self, key: impl Into<String>, value: V)
    where
        V: Any + Send + Sync,
    {
        let key = key.into();
        self.items.lock().insert(key, Arc::new(value));
    }

    /// Clone out the value stored under `key`.
    ///
    /// Fails with [`TdagError::KeyNotFound`] if the key was never set and
    /// with [`TdagError::TypeMismatch`] if it holds some other type.
    pub fn get<V>(&self, key: &str) -> Result<V>
    where
        V: Any + Clone + Send + Sync,
    {
        self.get_arc::<V>(key).map(|v| V::clone(&v))
    }

    /// Like [`Store::get`] but hands back the shared allocation instead of a
    /// clone. Useful for values that are expensive or impossible to clone.
    pub fn get_arc<V>(&self, key: &str) -> Result<Arc<V>>
    where
        V: Any + Send + Sync,
    {
        let value = self.items.lock().get(key).cloned();
        let Some(value) = value else {
            debug!(key, "store miss");
            return Err(TdagError::KeyNotFound(key.to_string()));
        };

        value.downcast::<V>().map_err(|_| TdagError::TypeMismatch {
            key: key.to_string(),
            expected: type_name::<V>(),
        })
    }

    /// Whether a value was ever stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.items.lock().contains_key(key)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.items.lock().len();
        f.debug_struct("Store").field("len", &len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn get_returns_last_written_value() {
        let store = Store::new();
        store.set("k", 1u32);
        store.set("k", 2u32);
        assert_eq!(store.get::<u32>("k").unwrap(), 2);
    }

    #[test]
    fn missing_key_is_distinct_from_falsy_value() {
        let store = Store::new();
        store.set("flag", false);

        assert!(!store.get::<bool>("flag").unwrap());
        match store.get::<bool>("other") {
            Err(TdagError::KeyNotFound(k)) => assert_eq!(k, "other"),
            other => panic!("expected KeyNotFound, got {other:?}"),
        }
    }

    #[test]
    fn wrong_type_is_reported() {
        let store = Store::new();
        store.set("n", 7i64);
        match store.get::<String>("n") {
            Err(TdagError::TypeMismatch { key, expected }) => {
                assert_eq!(key, "n");
                assert!(expected.contains("String"));
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn overwrite_may_change_type() {
        let store = Store::new();
        store.set("v", 1u8);
        store.set("v", "now a str");
        assert_eq!(store.get::<&str>("v").unwrap(), "now a str");
        assert!(store.get::<u8>("v").is_err());
    }

    #[test]
    fn get_arc_shares_the_allocation() {
        let store = Store::new();
        store.set("list", vec![1, 2, 3]);
        let a = store.get_arc::<Vec<i32>>("list").unwrap();
        let b = store.get_arc::<Vec<i32>>("list").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn concurrent_writers_leave_one_of_their_values() {
        let store = Arc::new(Store::new());
        let handles: Vec<_> = (0..8u32)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..100 {
                        store.set("shared", i);
                        store.set(format!("own.{i}"), i);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let last: u32 = store.get("shared").unwrap();
        assert!(last < 8);
        for i in 0..8u32 {
            assert_eq!(store.get::<u32>(&format!("own.{i}")).unwrap(), i);
        }
    }
}
