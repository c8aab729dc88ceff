/// ==============================================================================================
/// ==================================== Global Data Vector =======================================
/// ==============================================================================================
//
// `gdata` is shared read-only by every node; names are optional but, when present, expose
// `gdata.get("name")` / `gdata.set("name", value)` (`spec.md` §6).

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct GlobalData {
    values: Vec<f64>,
    names: HashMap<String, usize>,
}

impl GlobalData {
    pub fn unnamed(values: Vec<f64>) -> Self {
        Self {
            values,
            names: HashMap::new(),
        }
    }

    pub fn named(pairs: Vec<(String, f64)>) -> Self {
        let mut values = Vec::with_capacity(pairs.len());
        let mut names = HashMap::with_capacity(pairs.len());
        for (idx, (name, value)) in pairs.into_iter().enumerate() {
            values.push(value);
            names.insert(name, idx);
        }
        Self { values, names }
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names.get(name).map(|&idx| self.values[idx])
    }

    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match self.names.get(name) {
            Some(&idx) => {
                self.values[idx] = value;
                true
            }
            None => false,
        }
    }
}
