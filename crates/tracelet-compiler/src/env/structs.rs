use std::sync::Arc;

use indexmap::IndexMap;
use tracelet_core::{SizedType, StructLayout};

/// Struct layouts defined by the script itself.
#[derive(Debug, Clone, Default)]
pub struct StructRegistry {
    layouts: IndexMap<String, Arc<StructLayout>>,
}

impl StructRegistry {
    /// Registers `name` (including its `struct `/`union ` prefix). A later
    /// definition with the same name replaces the earlier one.
    pub fn define(&mut self, name: &str, fields: Vec<(String, SizedType)>) -> Arc<StructLayout> {
        let layout = Arc::new(StructLayout::from_fields(name, fields));
        self.layouts.insert(name.to_string(), Arc::clone(&layout));
        layout
    }

    pub fn get(&self, name: &str) -> Option<Arc<StructLayout>> {
        self.layouts.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layouts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}
