//! Typed key-value storage that lets subsystems attach their own state to a
//! material pass without the pass knowing about them.

use std::any::Any;
use std::fmt;

use rustc_hash::FxHashMap;

type UserObject = Box<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct UserObjectBindings {
    objects: FxHashMap<String, UserObject>,
}

impl fmt::Debug for UserObjectBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.objects.keys()).finish()
    }
}

impl UserObjectBindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous object.
    pub fn set<T: Any + Send + Sync>(&mut self, key: &str, value: T) {
        self.set_boxed(key, Box::new(value));
    }

    /// Stores an already boxed object.
    pub fn set_boxed(&mut self, key: &str, value: Box<dyn Any + Send + Sync>) {
        if let Some(slot) = self.objects.get_mut(key) {
            *slot = value;
        } else {
            self.objects.insert(key.to_string(), value);
        }
    }

    /// Returns the object under `key` if it exists and has type `T`.
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.objects.get(key)?.downcast_ref()
    }

    #[must_use]
    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.objects.get_mut(key)?.downcast_mut()
    }

    /// Temporarily takes ownership of the object under `key`.
    ///
    /// The key entry is kept, so putting the object back with
    /// [`restore`](Self::restore) does not allocate.
    pub fn take<T: Any + Send + Sync>(&mut self, key: &str) -> Option<Box<T>> {
        let slot = self.objects.get_mut(key)?;
        if !slot.is::<T>() {
            return None;
        }
        let taken = std::mem::replace(slot, Box::new(()));
        taken.downcast().ok()
    }

    /// Returns an object obtained from [`take`](Self::take).
    pub fn restore<T: Any + Send + Sync>(&mut self, key: &str, value: Box<T>) {
        self.set_boxed(key, value);
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.objects.remove(key).is_some()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}
