//! Open-addressing hash table keyed by interned strings.
//!
//! This one structure backs both global-variable bindings and the string
//! interning set. Capacity is always a power of two so the probe sequence
//! can wrap with a mask instead of a modulo. Deletion writes a tombstone
//! (no key, `true` value) so later probes keep walking.

use std::rc::Rc;

use crate::object::LarkString;
use crate::value::Value;

const TABLE_MAX_LOAD: f64 = 0.75;
const MIN_CAPACITY: usize = 8;

#[derive(Debug, Clone)]
struct Entry {
    key: Option<Rc<LarkString>>,
    value: Value,
}

impl Entry {
    fn empty() -> Self {
        Self {
            key: None,
            value: Value::Nil,
        }
    }

    fn is_tombstone(&self) -> bool {
        self.key.is_none() && !matches!(self.value, Value::Nil)
    }
}

/// Map from interned string to value.
#[derive(Debug, Default)]
pub struct Table {
    /// Live entries plus tombstones. Tombstones keep counting toward the
    /// load factor until the next growth rehash discards them.
    count: usize,
    entries: Vec<Entry>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied slots (live entries and tombstones).
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Probe for `key`'s slot. Returns the matching entry, or the slot an
    /// insertion should use: the first tombstone seen if any, otherwise
    /// the terminating empty slot.
    fn find_entry(entries: &[Entry], key: &Rc<LarkString>) -> usize {
        let mask = entries.len() - 1;
        let mut index = key.hash as usize & mask;
        let mut tombstone: Option<usize> = None;

        // A slot is always found because growth keeps the table under the
        // load factor.
        loop {
            let entry = &entries[index];
            match &entry.key {
                None => {
                    if !entry.is_tombstone() {
                        return tombstone.unwrap_or(index);
                    }
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Some(existing) => {
                    if Rc::ptr_eq(existing, key) {
                        return index;
                    }
                }
            }
            index = (index + 1) & mask;
        }
    }

    pub fn get(&self, key: &Rc<LarkString>) -> Option<Value> {
        if self.count == 0 {
            return None;
        }
        let index = Self::find_entry(&self.entries, key);
        let entry = &self.entries[index];
        entry.key.as_ref().map(|_| entry.value.clone())
    }

    /// Insert or overwrite. Returns true when the key was not previously
    /// present.
    pub fn set(&mut self, key: Rc<LarkString>, value: Value) -> bool {
        if (self.count + 1) as f64 > self.entries.len() as f64 * TABLE_MAX_LOAD {
            let capacity = (self.entries.len() * 2).max(MIN_CAPACITY);
            self.adjust_capacity(capacity);
        }

        let index = Self::find_entry(&self.entries, &key);
        let entry = &mut self.entries[index];
        let is_new_key = entry.key.is_none();
        // Replacing a tombstone reuses its slot, so the count stands.
        if is_new_key && !entry.is_tombstone() {
            self.count += 1;
        }
        entry.key = Some(key);
        entry.value = value;
        is_new_key
    }

    /// Remove a key by writing a tombstone. The table never shrinks.
    pub fn delete(&mut self, key: &Rc<LarkString>) -> bool {
        if self.count == 0 {
            return false;
        }
        let index = Self::find_entry(&self.entries, key);
        let entry = &mut self.entries[index];
        if entry.key.is_none() {
            return false;
        }
        entry.key = None;
        entry.value = Value::Bool(true);
        true
    }

    /// Content lookup for the interning path: compares hash, length, and
    /// characters, never allocates. Everywhere else key comparison is
    /// pointer identity; this is the one place content equality runs.
    pub fn find_string(&self, chars: &str, hash: u32) -> Option<Rc<LarkString>> {
        if self.count == 0 {
            return None;
        }
        let mask = self.entries.len() - 1;
        let mut index = hash as usize & mask;
        loop {
            let entry = &self.entries[index];
            match &entry.key {
                None => {
                    if matches!(entry.value, Value::Nil) {
                        return None;
                    }
                }
                Some(key) => {
                    if key.hash == hash && key.chars == chars {
                        return Some(Rc::clone(key));
                    }
                }
            }
            index = (index + 1) & mask;
        }
    }

    /// Grow to `capacity` and rehash. Tombstones are dropped and the
    /// count retaken from the live entries.
    fn adjust_capacity(&mut self, capacity: usize) {
        debug_assert!(capacity.is_power_of_two());
        let mut entries = vec![Entry::empty(); capacity];
        let mut count = 0;

        for entry in self.entries.drain(..) {
            if let Some(key) = entry.key {
                let index = Self::find_entry(&entries, &key);
                entries[index] = Entry {
                    key: Some(key),
                    value: entry.value,
                };
                count += 1;
            }
        }

        self.entries = entries;
        self.count = count;
    }
}
