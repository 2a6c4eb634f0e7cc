//! Catalog of native reference libraries.
//!
//! A reference location such as `ember:lang` resolves to one of these
//! libraries; the classes inside become callable as `Class.method(...)` once
//! their namespace is imported with `using`. Only signatures live here - the
//! implementations are linked in by symbol when an image is loaded.

use crate::TypeId;

#[derive(Debug, Clone, Copy)]
pub struct NativeLibrary {
    pub location: &'static str,
    pub classes: &'static [NativeClass],
}

#[derive(Debug, Clone, Copy)]
pub struct NativeClass {
    pub namespace: &'static str,
    pub name: &'static str,
    pub methods: &'static [NativeMethod],
}

#[derive(Debug, Clone, Copy)]
pub struct NativeMethod {
    pub name: &'static str,
    pub params: &'static [TypeId],
    pub return_ty: TypeId,
}

impl NativeClass {
    pub fn method(&self, name: &str) -> Option<&'static NativeMethod> {
        self.methods
            .iter()
            .find(|method| method.name.eq_ignore_ascii_case(name))
    }

    pub fn symbol(&self, library: &NativeLibrary, method: &NativeMethod) -> String {
        format!(
            "{}/{}.{}.{}",
            library.location, self.namespace, self.name, method.name
        )
    }
}

/// The host's own base runtime library.
pub const LANG: NativeLibrary = NativeLibrary {
    location: "ember:lang",
    classes: &[
        NativeClass {
            namespace: "System",
            name: "Math",
            methods: &[
                NativeMethod {
                    name: "abs",
                    params: &[TypeId::INT],
                    return_ty: TypeId::INT,
                },
                NativeMethod {
                    name: "min",
                    params: &[TypeId::INT, TypeId::INT],
                    return_ty: TypeId::INT,
                },
                NativeMethod {
                    name: "max",
                    params: &[TypeId::INT, TypeId::INT],
                    return_ty: TypeId::INT,
                },
            ],
        },
        NativeClass {
            namespace: "System",
            name: "Convert",
            methods: &[NativeMethod {
                name: "toString",
                params: &[TypeId::INT],
                return_ty: TypeId::STRING,
            }],
        },
    ],
};

/// Console/IO support library.
pub const CONSOLE: NativeLibrary = NativeLibrary {
    location: "ember:console",
    classes: &[NativeClass {
        namespace: "System",
        name: "Console",
        methods: &[
            NativeMethod {
                name: "write",
                params: &[TypeId::STRING],
                return_ty: TypeId::VOID,
            },
            NativeMethod {
                name: "writeLine",
                params: &[TypeId::STRING],
                return_ty: TypeId::VOID,
            },
        ],
    }],
};

pub fn builtin_libraries() -> &'static [NativeLibrary] {
    &[LANG, CONSOLE]
}

/// Resolves a reference location to a library, if it names one.
pub fn find(location: &str) -> Option<&'static NativeLibrary> {
    builtin_libraries()
        .iter()
        .find(|library| library.location.eq_ignore_ascii_case(location))
}
