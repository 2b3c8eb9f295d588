use super::TreeValue;

/// An insertion-ordered map from `TreeValue` keys to `TreeValue` values.
///
/// Backed by a vector rather than `hashlink::LinkedHashMap`: tagged values
/// (`Sub`, `If`, `Include`, ...) carry a payload that implements `Hash` only
/// by discriminant, so two distinct placeholder keys would collide in a real
/// hash table. Config documents are small enough that linear lookup is not a
/// concern.
#[derive(Debug, Clone, Default)]
pub struct TreeMap {
    entries: Vec<(TreeValue, TreeValue)>,
}

impl TreeMap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            entries: Vec::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &TreeValue) -> Option<&TreeValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&TreeValue> {
        self.get(&TreeValue::Str(key.to_string()))
    }

    pub fn get_mut(&mut self, key: &TreeValue) -> Option<&mut TreeValue> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &TreeValue) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn contains_key_str(&self, key: &str) -> bool {
        self.contains_key(&TreeValue::Str(key.to_string()))
    }

    /// Inserts a key/value pair, preserving first-insertion position if the
    /// key already exists (value is overwritten in place).
    pub fn insert(&mut self, key: TreeValue, value: TreeValue) -> Option<TreeValue> {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut entry.1, value));
        }
        self.entries.push((key, value));
        None
    }

    /// Inserts only if the key is absent; used pervasively by merge-key and
    /// package-merge "first wins" semantics.
    pub fn insert_if_absent(&mut self, key: TreeValue, value: TreeValue) {
        if !self.contains_key(&key) {
            self.entries.push((key, value));
        }
    }

    pub fn remove(&mut self, key: &TreeValue) -> Option<TreeValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn remove_str(&mut self, key: &str) -> Option<TreeValue> {
        self.remove(&TreeValue::Str(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TreeValue, &TreeValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&TreeValue, &mut TreeValue)> {
        self.entries.iter_mut().map(|(k, v)| (&*k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &TreeValue> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &TreeValue> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&TreeValue, &TreeValue) -> bool,
    {
        self.entries.retain(|(k, v)| f(k, v));
    }
}

impl PartialEq for TreeMap {
    fn eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries
            .iter()
            .all(|(k, v)| other.get(k).is_some_and(|ov| ov == v))
    }
}
impl Eq for TreeMap {}

impl FromIterator<(TreeValue, TreeValue)> for TreeMap {
    fn from_iter<T: IntoIterator<Item = (TreeValue, TreeValue)>>(iter: T) -> Self {
        let mut map = TreeMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for TreeMap {
    type Item = (TreeValue, TreeValue);
    type IntoIter = std::vec::IntoIter<(TreeValue, TreeValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
