use std::collections::HashMap;
use std::fmt;

use emberscript_foundation::{
    errors::{Diagnostic, DiagnosticSink},
    ident::CaseInsensitive,
    source::Span,
};
use indexmap::IndexMap;
use tracing::trace;

use crate::type_system::{Primitive, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(u32);

/// Namespace-qualified class name. Both halves compare case-insensitively
/// while keeping the spelling they were declared with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub namespace: CaseInsensitive<String>,
    pub name: CaseInsensitive<String>,
}

impl QualifiedName {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: CaseInsensitive::new(namespace.to_owned()),
            name: CaseInsensitive::new(name.to_owned()),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// A script class and its member tables.
#[derive(Debug)]
pub struct Class {
    pub namespace: String,
    pub name: String,
    /// Fields in declaration order; the position within this list is the
    /// field's slot in emitted images.
    pub fields: Vec<VarId>,
    field_slots_by_name: HashMap<CaseInsensitive<String>, usize>,
    /// Methods in declaration order; the position within this map is the
    /// method's slot in emitted images.
    pub methods: IndexMap<CaseInsensitive<String>, FunctionId>,
}

impl Class {
    pub fn new(namespace: String, name: String) -> Self {
        Self {
            namespace,
            name,
            fields: vec![],
            field_slots_by_name: HashMap::new(),
            methods: IndexMap::new(),
        }
    }

    pub fn field_slot(&self, name: &str) -> Option<usize> {
        self.field_slots_by_name
            .get(CaseInsensitive::new_ref(name))
            .copied()
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.field_slot(name).is_some()
            || self.methods.contains_key(CaseInsensitive::new_ref(name))
    }

    pub fn add_field(&mut self, name: &str, var: VarId) {
        self.field_slots_by_name
            .insert(CaseInsensitive::new(name.to_owned()), self.fields.len());
        self.fields.push(var);
    }

    pub fn add_method(&mut self, name: &str, function: FunctionId) {
        self.methods
            .insert(CaseInsensitive::new(name.to_owned()), function);
    }
}

/// A field, parameter, or local variable.
#[derive(Debug, Clone)]
pub struct Var {
    pub name: String,
    pub name_span: Span,
    pub ty: TypeId,
}

/// A method signature together with how calls to it are carried out.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub name_span: Span,
    pub params: Vec<VarId>,
    pub return_ty: TypeId,
}

#[derive(Debug, Default)]
pub struct Environment {
    pub diagnostics: Vec<Diagnostic>,

    class_ids_by_name: HashMap<QualifiedName, ClassId>,
    classes: Vec<Class>,

    types: Vec<Type>,
    type_names_by_id: Vec<String>,
    type_ids_by_name: HashMap<CaseInsensitive<String>, TypeId>,

    vars: Vec<Var>,
    functions: Vec<Function>,
}

impl Environment {
    pub fn new() -> Self {
        let mut env = Self::default();
        env.register_fundamental_types();
        env
    }
}

/// # Class registry
impl Environment {
    pub fn declare_class(&mut self, qualified: QualifiedName, class: Class) -> ClassId {
        let id = ClassId(
            self.classes
                .len()
                .try_into()
                .expect("too many classes declared"),
        );
        trace!(%qualified, ?id, "declaring class");
        self.class_ids_by_name.insert(qualified, id);
        self.classes.push(class);
        id
    }

    pub fn get_class(&self, qualified: &QualifiedName) -> Option<ClassId> {
        self.class_ids_by_name.get(qualified).copied()
    }

    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.0 as usize]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut Class {
        &mut self.classes[id.0 as usize]
    }
}

/// # Type registry
impl Environment {
    pub fn register_type(&mut self, name: &str, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        trace!(%name, ?id, "registering type");
        self.types.push(ty);
        self.type_names_by_id.push(name.to_owned());
        self.type_ids_by_name
            .insert(CaseInsensitive::new(name.to_owned()), id);
        id
    }

    pub fn get_type(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn type_name(&self, id: TypeId) -> &str {
        &self.type_names_by_id[id.0 as usize]
    }

    pub fn type_id_by_name(&self, name: &str) -> Option<TypeId> {
        self.type_ids_by_name
            .get(CaseInsensitive::new_ref(name))
            .copied()
    }
}

/// # Variable registry
impl Environment {
    pub fn register_var(&mut self, var: Var) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(var);
        id
    }

    pub fn get_var(&self, id: VarId) -> &Var {
        &self.vars[id.0 as usize]
    }
}

/// # Function registry
impl Environment {
    pub fn register_function(&mut self, function: Function) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(function);
        id
    }

    pub fn get_function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0 as usize]
    }
}

impl DiagnosticSink for Environment {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

impl Environment {
    fn register_fundamental_types(&mut self) {
        // NOTE: Order matters here! The TypeIds must match exactly those in
        // the consts below.
        self.register_type("error type", Type::Error);
        self.register_type("void", Type::Void);
        self.register_type("bool", Type::Primitive(Primitive::Bool));
        self.register_type("int", Type::Primitive(Primitive::Int));
        self.register_type("float", Type::Primitive(Primitive::Float));
        self.register_type("string", Type::Primitive(Primitive::String));
    }
}

impl TypeId {
    pub const ERROR: Self = Self(0);
    pub const VOID: Self = Self(1);
    pub const BOOL: Self = Self(2);
    pub const INT: Self = Self(3);
    pub const FLOAT: Self = Self(4);
    pub const STRING: Self = Self(5);
}
