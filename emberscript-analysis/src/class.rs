//! Registration of namespaces, classes, and members.

use emberscript_foundation::{
    errors::{Diagnostic, DiagnosticSink, Label},
    ident::CaseInsensitive,
    source::Spanned,
};
use emberscript_syntax::ast;

use crate::{
    diagnostics::notes,
    native::{NativeClass, NativeLibrary},
    type_system::Type,
    Analyzer, Class, ClassId, Function, Import, ImportKind, QualifiedName, TypeId, Var,
};

/// Where a type reference appeared; `void` is only meaningful in one of
/// these places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypePosition {
    Field,
    Param,
    Local,
    Return,
}

/// # Using directives
impl<'a> Analyzer<'a> {
    pub(crate) fn resolve_usings(&mut self, unit: &ast::File) {
        for using in &unit.usings {
            let name = using.path.dotted();

            let declared_in_unit = unit.namespaces.iter().any(|namespace| {
                CaseInsensitive::new_ref(namespace.path.dotted().as_str())
                    == CaseInsensitive::new_ref(&name)
            });
            if declared_in_unit {
                self.imports.push(Import {
                    name,
                    span: using.span,
                    kind: ImportKind::Script,
                    // Importing a namespace the unit itself declares is
                    // always redundant but harmless; don't warn about it.
                    used: true,
                });
                continue;
            }

            let mut classes: Vec<(&'static NativeLibrary, &'static NativeClass)> = vec![];
            for &library in self.references {
                for class in library.classes {
                    if CaseInsensitive::new_ref(class.namespace) == CaseInsensitive::new_ref(&name)
                    {
                        classes.push((library, class));
                    }
                }
            }
            if classes.is_empty() {
                self.env.emit(
                    Diagnostic::error(
                        self.file,
                        format!("the namespace `{name}` could not be found"),
                    )
                    .with_code("E0302")
                    .with_label(Label::primary(using.path.span(), ""))
                    .with_note(notes::MISSING_REFERENCE),
                );
            } else {
                self.imports.push(Import {
                    name,
                    span: using.span,
                    kind: ImportKind::Native(classes),
                    used: false,
                });
            }
        }
    }

    pub(crate) fn warn_unused_usings(&mut self) {
        let unused: Vec<(String, emberscript_foundation::source::Span)> = self
            .imports
            .iter()
            .filter(|import| !import.used)
            .map(|import| (import.name.clone(), import.span))
            .collect();
        for (name, span) in unused {
            self.env.emit(
                Diagnostic::warning(
                    self.file,
                    format!("the using directive for `{name}` is unnecessary"),
                )
                .with_code("W0001")
                .with_label(Label::primary(span, "")),
            );
        }
    }
}

/// # Class and member registration
impl<'a> Analyzer<'a> {
    /// Declares every class in the unit, so that later passes see forward
    /// references. Returns ids aligned with the unit's namespace/class
    /// nesting; `None` marks a duplicate that was reported and dropped.
    pub(crate) fn register_classes(&mut self, unit: &ast::File) -> Vec<Vec<Option<ClassId>>> {
        let mut class_ids = vec![];
        for namespace in &unit.namespaces {
            let namespace_name = namespace.path.dotted();
            let mut ids = vec![];
            for class in &namespace.classes {
                let qualified = QualifiedName::new(&namespace_name, &class.name.name);
                if self.env.get_class(&qualified).is_some() {
                    self.env.emit(
                        Diagnostic::error(
                            self.file,
                            format!(
                                "the namespace `{namespace_name}` already contains a definition for `{}`",
                                class.name
                            ),
                        )
                        .with_code("E0304")
                        .with_label(Label::primary(class.name.span, "")),
                    );
                    ids.push(None);
                } else {
                    ids.push(Some(self.env.declare_class(
                        qualified,
                        Class::new(namespace_name.clone(), class.name.name.clone()),
                    )));
                }
            }
            class_ids.push(ids);
        }
        class_ids
    }

    pub(crate) fn register_members(
        &mut self,
        unit: &ast::File,
        class_ids: &[Vec<Option<ClassId>>],
    ) {
        for (namespace, ids) in unit.namespaces.iter().zip(class_ids) {
            let namespace_name = namespace.path.dotted();
            for (class, &id) in namespace.classes.iter().zip(ids) {
                let Some(id) = id else { continue };
                for member in &class.members {
                    self.register_member(&namespace_name, class, id, member);
                }
            }
        }
    }

    fn register_member(
        &mut self,
        namespace: &str,
        class: &ast::ClassDecl,
        class_id: ClassId,
        member: &ast::MemberDecl,
    ) {
        let name = member.name();
        if self.env.class(class_id).has_member(&name.name) {
            self.env.emit(
                Diagnostic::error(
                    self.file,
                    format!(
                        "class `{}` already defines a member named `{name}`",
                        class.name
                    ),
                )
                .with_code("E0304")
                .with_label(Label::primary(name.span, "")),
            );
            return;
        }
        match member {
            ast::MemberDecl::Field(field) => {
                let ty = self.resolve_type(&field.ty, TypePosition::Field, Some(namespace));
                let var = self.env.register_var(Var {
                    name: field.name.name.clone(),
                    name_span: field.name.span,
                    ty,
                });
                self.env.class_mut(class_id).add_field(&field.name.name, var);
            }
            ast::MemberDecl::Method(method) => {
                let return_ty =
                    self.resolve_type(&method.return_ty, TypePosition::Return, Some(namespace));
                let params = method
                    .params
                    .iter()
                    .map(|param| {
                        let ty = self.resolve_type(&param.ty, TypePosition::Param, Some(namespace));
                        self.env.register_var(Var {
                            name: param.name.name.clone(),
                            name_span: param.name.span,
                            ty,
                        })
                    })
                    .collect();
                let function = self.env.register_function(Function {
                    name: method.name.name.clone(),
                    name_span: method.name.span,
                    params,
                    return_ty,
                });
                self.env
                    .class_mut(class_id)
                    .add_method(&method.name.name, function);
            }
        }
    }

    /// Members recovered outside any class never run, but the names they
    /// mention still get resolved, the same way proper members do.
    pub(crate) fn check_orphans(&mut self, unit: &ast::File) {
        for orphan in &unit.orphans {
            match orphan {
                ast::MemberDecl::Field(field) => {
                    self.resolve_type(&field.ty, TypePosition::Field, None);
                }
                ast::MemberDecl::Method(method) => {
                    self.resolve_type(&method.return_ty, TypePosition::Return, None);
                    for param in &method.params {
                        self.resolve_type(&param.ty, TypePosition::Param, None);
                    }
                }
            }
        }
    }
}

/// # Type resolution
impl<'a> Analyzer<'a> {
    pub(crate) fn resolve_type(
        &mut self,
        ty: &ast::TypeExpr,
        position: TypePosition,
        current_namespace: Option<&str>,
    ) -> TypeId {
        let name = &ty.name.name;
        if let Some(id) = self.env.type_id_by_name(name) {
            if id == TypeId::VOID && position != TypePosition::Return {
                self.env.emit(
                    Diagnostic::error(
                        self.file,
                        "`void` can only be used as a method return type",
                    )
                    .with_code("E0305")
                    .with_label(Label::primary(ty.name.span, "")),
                );
                return TypeId::ERROR;
            }
            debug_assert!(!matches!(self.env.get_type(id), Type::Error));
            return id;
        }

        if self.find_script_class(current_namespace, name).is_some()
            || self.find_native_class(name).is_some()
        {
            self.env.emit(
                Diagnostic::error(
                    self.file,
                    format!("class `{name}` cannot be used as a value type"),
                )
                .with_code("E0303")
                .with_label(Label::primary(ty.name.span, "")),
            );
            return TypeId::ERROR;
        }

        self.env.emit(
            Diagnostic::error(
                self.file,
                format!("the type or namespace name `{name}` could not be found"),
            )
            .with_code("E0301")
            .with_label(Label::primary(ty.name.span, "")),
        );
        TypeId::ERROR
    }

    /// Finds a script class by simple name: the current namespace first,
    /// then `using` imports of script namespaces.
    pub(crate) fn find_script_class(
        &mut self,
        current_namespace: Option<&str>,
        name: &str,
    ) -> Option<ClassId> {
        if let Some(namespace) = current_namespace {
            if let Some(id) = self.env.get_class(&QualifiedName::new(namespace, name)) {
                return Some(id);
            }
        }
        for import in &self.imports {
            if let ImportKind::Script = import.kind {
                if let Some(id) = self.env.get_class(&QualifiedName::new(&import.name, name)) {
                    return Some(id);
                }
            }
        }
        None
    }

    /// Finds a native class by simple name through `using` imports, marking
    /// the import that supplied it as used.
    pub(crate) fn find_native_class(
        &mut self,
        name: &str,
    ) -> Option<(&'static NativeLibrary, &'static NativeClass)> {
        for import in &mut self.imports {
            if let ImportKind::Native(classes) = &import.kind {
                if let Some(&found) = classes.iter().find(|(_, class)| {
                    class.name.eq_ignore_ascii_case(name)
                }) {
                    import.used = true;
                    return Some(found);
                }
            }
        }
        None
    }
}
