//! External type information: kernel/user struct layouts, typedefs,
//! function prototypes and probe argument records.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracelet_core::{Field, SizedType, StructLayout};

use crate::ast::AttachPoint;

/// Source of type information that does not come from the script.
pub trait TypeProvider: std::fmt::Debug {
    fn lookup_struct(&self, name: &str) -> Option<Arc<StructLayout>>;

    /// Named scalar types such as `pid_t`.
    fn lookup_type(&self, name: &str) -> Option<SizedType>;

    fn function(&self, name: &str) -> Option<FunctionProto>;

    /// The `args` record of a probe. Probes with a return value carry it
    /// as a `$retval` field.
    fn probe_args(&self, attach: &AttachPoint) -> Option<SizedType>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedType {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SizedType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionProto {
    #[serde(default)]
    pub args: Vec<NamedType>,
    pub ret: SizedType,
}

/// Enum variant name to `(value, enum name)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumDefs {
    variants: HashMap<String, (u64, String)>,
}

impl EnumDefs {
    pub fn insert(&mut self, enum_name: &str, variant: &str, value: u64) {
        self.variants
            .insert(variant.to_string(), (value, enum_name.to_string()));
    }

    pub fn get(&self, variant: &str) -> Option<(u64, &str)> {
        self.variants
            .get(variant)
            .map(|(value, name)| (*value, name.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// In-memory provider, deserializable from the JSON file given to the CLI:
///
/// ```json
/// {
///   "structs": [{ "name": "struct task", "size": 8, "fields": [{ "name": "pid", "type": "int32", "offset": 0 }] }],
///   "types": { "pid_t": "int32" },
///   "functions": { "vfs_read": { "args": [{ "name": "count", "type": "uint64" }], "ret": "int64" } },
///   "probe_args": { "fentry:vfs_read": [{ "name": "count", "type": "uint64" }] },
///   "enums": { "color": { "RED": 0, "GREEN": 1 } }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticTypeProvider {
    structs: Vec<StructLayout>,
    types: IndexMap<String, SizedType>,
    functions: IndexMap<String, FunctionProto>,
    probe_args: IndexMap<String, Vec<NamedType>>,
    enums: IndexMap<String, IndexMap<String, u64>>,
    #[serde(skip)]
    layouts: IndexMap<String, Arc<StructLayout>>,
}

impl StaticTypeProvider {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let provider: Self = serde_json::from_str(text)?;
        Ok(provider.index())
    }

    pub fn with_struct(mut self, layout: StructLayout) -> Self {
        self.structs.push(layout);
        self.index()
    }

    pub fn with_type(mut self, name: &str, ty: SizedType) -> Self {
        self.types.insert(name.to_string(), ty);
        self
    }

    pub fn with_function(mut self, name: &str, proto: FunctionProto) -> Self {
        self.functions.insert(name.to_string(), proto);
        self
    }

    /// `key` is `kind:func` or `kind:target:func`, e.g. `fentry:vfs_read`.
    pub fn with_probe_args(mut self, key: &str, args: Vec<NamedType>) -> Self {
        self.probe_args.insert(key.to_string(), args);
        self
    }

    pub fn with_enum(mut self, name: &str, variants: &[(&str, u64)]) -> Self {
        let entry = self.enums.entry(name.to_string()).or_default();
        for (variant, value) in variants {
            entry.insert(variant.to_string(), *value);
        }
        self
    }

    pub fn enum_defs(&self) -> EnumDefs {
        let mut defs = EnumDefs::default();
        for (name, variants) in &self.enums {
            for (variant, value) in variants {
                defs.insert(name, variant, *value);
            }
        }
        defs
    }

    fn index(mut self) -> Self {
        self.layouts = self
            .structs
            .iter()
            .map(|layout| (layout.name.clone(), Arc::new(layout.clone())))
            .collect();
        self
    }
}

impl TypeProvider for StaticTypeProvider {
    fn lookup_struct(&self, name: &str) -> Option<Arc<StructLayout>> {
        self.layouts.get(name).cloned()
    }

    fn lookup_type(&self, name: &str) -> Option<SizedType> {
        self.types.get(name).cloned()
    }

    fn function(&self, name: &str) -> Option<FunctionProto> {
        self.functions.get(name).cloned()
    }

    fn probe_args(&self, attach: &AttachPoint) -> Option<SizedType> {
        let kind = attach.kind.name();
        let full = format!("{}:{}:{}", kind, attach.target, attach.func);
        let short = format!("{}:{}", kind, attach.func);
        let args = self
            .probe_args
            .get(&full)
            .or_else(|| self.probe_args.get(&short))?;
        let fields = args
            .iter()
            .map(|arg| Field::new(arg.name.clone(), arg.ty.clone()))
            .collect();
        Some(SizedType::record(fields))
    }
}
