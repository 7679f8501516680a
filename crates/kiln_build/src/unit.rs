//! Generated code units, as seen by the batch planner.
//!
//! The real semantics of generated code belong to the compiler backend; the
//! planner only inspects the narrow surface modeled here: which types a unit
//! declares, which of them are partial fragments, and what members each
//! fragment carries. That is exactly the information needed to decide whether
//! two units may share a compiled module.

use kiln_common::VirtualPath;

/// A member declared by a type fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Member {
    /// A method with its parameter type list.
    Method {
        /// The method name.
        name: String,
        /// Parameter type names, in order.
        params: Vec<String>,
    },
    /// A typed field.
    Field {
        /// The field name.
        name: String,
        /// The field type name.
        ty: String,
    },
    /// Any other named member (property, event, nested declaration).
    Other {
        /// The member name.
        name: String,
    },
}

impl Member {
    /// The member's declared name.
    pub fn name(&self) -> &str {
        match self {
            Member::Method { name, .. } | Member::Field { name, .. } | Member::Other { name } => {
                name
            }
        }
    }
}

/// A type declared by a code unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDecl {
    /// The type name.
    pub name: String,
    /// Whether this is a partial fragment, merged with same-named fragments
    /// from other units at compile time.
    pub is_partial: bool,
    /// The members this fragment declares.
    pub members: Vec<Member>,
}

/// The generated code payload for one candidate source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeUnit {
    /// The source this unit was generated from.
    pub source: VirtualPath,
    /// Declared types. Empty for directive-only declarative stubs.
    pub types: Vec<TypeDecl>,
}

impl CodeUnit {
    /// An empty unit for a declarative stub.
    pub fn declarative(source: VirtualPath) -> Self {
        Self {
            source,
            types: Vec::new(),
        }
    }

    /// Whether this unit contributes no compilable code.
    pub fn is_declarative(&self) -> bool {
        self.types.is_empty()
    }

    /// The partial-type fragments this unit declares.
    pub fn partial_types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.types.iter().filter(|t| t.is_partial)
    }
}
