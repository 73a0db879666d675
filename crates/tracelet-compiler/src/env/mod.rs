//! Collaborators the resolver consults: struct layouts, external type
//! information, enum variants and macro expansion.

mod macros;
mod provider;
mod structs;

#[cfg(test)]
mod env_tests;

use std::sync::Arc;

use tracelet_core::{SizedType, StructLayout, StructRef, TypeShape};

use crate::Config;

pub use macros::{MacroRegistry, NoMacros};
pub use provider::{EnumDefs, FunctionProto, NamedType, StaticTypeProvider, TypeProvider};
pub use structs::StructRegistry;

/// Everything the resolver needs besides the AST itself.
#[derive(Debug)]
pub struct Env {
    pub config: Config,
    pub structs: StructRegistry,
    pub provider: Box<dyn TypeProvider>,
    pub enums: EnumDefs,
    pub macros: Box<dyn MacroRegistry>,
}

impl Default for Env {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Env {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            structs: StructRegistry::default(),
            provider: Box::new(StaticTypeProvider::default()),
            enums: EnumDefs::default(),
            macros: Box::new(NoMacros),
        }
    }

    pub fn with_provider(mut self, provider: impl TypeProvider + 'static) -> Self {
        self.provider = Box::new(provider);
        self
    }

    pub fn with_enums(mut self, enums: EnumDefs) -> Self {
        self.enums = enums;
        self
    }

    pub fn with_macros(mut self, macros: impl MacroRegistry + 'static) -> Self {
        self.macros = Box::new(macros);
        self
    }

    /// Script-local definitions shadow provider structs.
    pub fn lookup_struct(&self, name: &str) -> Option<Arc<StructLayout>> {
        self.structs
            .get(name)
            .or_else(|| self.provider.lookup_struct(name))
    }

    /// Fill in the layout of a struct reference, recursively through
    /// pointers and arrays. Unknown names stay unresolved.
    pub fn resolve_struct_refs(&self, ty: &SizedType) -> SizedType {
        let shape = match &ty.shape {
            TypeShape::Struct(sref) if sref.layout.is_none() => match self.lookup_struct(&sref.name)
            {
                Some(layout) => TypeShape::Struct(StructRef::resolved(layout)),
                None => return ty.clone(),
            },
            TypeShape::Pointer(inner) => TypeShape::Pointer(Box::new(self.resolve_struct_refs(inner))),
            TypeShape::Array { elem, len } => TypeShape::Array {
                elem: Box::new(self.resolve_struct_refs(elem)),
                len: *len,
            },
            _ => return ty.clone(),
        };
        SizedType { shape, ..ty.clone() }
    }
}
