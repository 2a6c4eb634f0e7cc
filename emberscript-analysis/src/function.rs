//! Typechecking and lowering of method bodies.
//!
//! Checking and lowering happen in one pass: expressions emit their ops as
//! their types are computed. When a type error is found the resulting chunk
//! is garbage, which is fine - images with error diagnostics are never run.

use emberscript_foundation::{
    errors::{Diagnostic, DiagnosticSink, Label},
    ident::CaseInsensitive,
    source::{Span, Spanned},
};
use emberscript_syntax::ast;

use crate::{
    class::TypePosition,
    diagnostics::notes,
    ir::{Chunk, ImageClass, ImageField, ImageMethod, Op, Value},
    type_system::{Primitive, Type},
    Analyzer, ClassId, TypeId,
};

/// # Lowering of classes
impl<'a> Analyzer<'a> {
    pub(crate) fn lower_classes(
        &mut self,
        unit: &ast::File,
        class_ids: &[Vec<Option<ClassId>>],
    ) -> Vec<ImageClass> {
        let mut classes = vec![];
        for (namespace, ids) in unit.namespaces.iter().zip(class_ids) {
            for (class, &id) in namespace.classes.iter().zip(ids) {
                let Some(id) = id else { continue };
                classes.push(self.lower_class(class, id));
            }
        }
        classes
    }

    fn lower_class(&mut self, decl: &ast::ClassDecl, class_id: ClassId) -> ImageClass {
        let fields: Vec<ImageField> = self
            .env
            .class(class_id)
            .fields
            .clone()
            .into_iter()
            .map(|var_id| {
                let var = self.env.get_var(var_id);
                ImageField {
                    name: var.name.clone(),
                    default: default_value(self.env.get_type(var.ty)),
                }
            })
            .collect();

        let initializer = self.lower_initializer(decl, class_id);
        let methods = self.lower_methods(decl, class_id);

        let class = self.env.class(class_id);
        ImageClass {
            namespace: class.namespace.clone(),
            name: class.name.clone(),
            fields,
            initializer,
            methods,
        }
    }

    /// Lowers the implicit no-argument constructor: every explicit field
    /// initializer, stored in declaration order.
    fn lower_initializer(&mut self, decl: &ast::ClassDecl, class_id: ClassId) -> Chunk {
        let mut lowerer = FunctionLowerer::new(self, class_id, TypeId::VOID);
        for member in &decl.members {
            let ast::MemberDecl::Field(field) = member else {
                continue;
            };
            let Some(init) = &field.init else { continue };
            let Some(slot) = lowerer
                .an
                .env
                .class(class_id)
                .field_slot(&field.name.name)
            else {
                continue;
            };
            let var_id = lowerer.an.env.class(class_id).fields[slot];
            let (expected, owner_span) = {
                let var = lowerer.an.env.get_var(var_id);
                (var.ty, var.name_span)
            };
            if owner_span != field.name.span {
                // A duplicate member; only the first declaration owns the
                // field slot.
                continue;
            }
            let found = lowerer.check_value_expr(init);
            lowerer.type_mismatch_unless(expected, found, init.span());
            lowerer.chunk.ops.push(Op::StoreField(slot as u16));
        }
        lowerer.chunk.ops.push(Op::ReturnVoid);
        lowerer.chunk
    }

    fn lower_methods(&mut self, decl: &ast::ClassDecl, class_id: ClassId) -> Vec<ImageMethod> {
        let mut methods = vec![];
        for member in &decl.members {
            let ast::MemberDecl::Method(method) = member else {
                continue;
            };
            let Some(&function_id) = self
                .env
                .class(class_id)
                .methods
                .get(CaseInsensitive::new_ref(&method.name.name))
            else {
                continue;
            };
            let (name_span, return_ty, param_ids) = {
                let function = self.env.get_function(function_id);
                (function.name_span, function.return_ty, function.params.clone())
            };
            if name_span != method.name.span {
                continue;
            }

            let mut lowerer = FunctionLowerer::new(self, class_id, return_ty);
            for &param_id in &param_ids {
                let (name, span, ty) = {
                    let var = lowerer.an.env.get_var(param_id);
                    (var.name.clone(), var.name_span, var.ty)
                };
                lowerer.declare_local(&name, span, ty);
            }
            lowerer.check_block(&method.body);

            if return_ty == TypeId::VOID || return_ty == TypeId::ERROR {
                lowerer.chunk.ops.push(Op::ReturnVoid);
            } else if !block_always_returns(&method.body) {
                let diagnostic = Diagnostic::error(
                    lowerer.an.file,
                    format!(
                        "not all control paths of method `{}` return a value",
                        method.name
                    ),
                )
                .with_code("E0312")
                .with_label(Label::primary(method.name.span, ""));
                lowerer.an.env.emit(diagnostic);
                lowerer.chunk.ops.push(Op::ReturnVoid);
            }

            let local_count = lowerer.max_locals as u8;
            methods.push(ImageMethod {
                name: method.name.name.clone(),
                param_count: param_ids.len() as u8,
                local_count,
                chunk: lowerer.chunk,
            });
        }
        methods
    }
}

fn default_value(ty: &Type) -> Value {
    match ty {
        Type::Primitive(Primitive::Bool) => Value::Bool(false),
        Type::Primitive(Primitive::Int) => Value::Int(0),
        Type::Primitive(Primitive::Float) => Value::Float(0.0),
        Type::Primitive(Primitive::String) => Value::String(String::new()),
        _ => Value::Void,
    }
}

pub(crate) fn block_always_returns(block: &ast::Block) -> bool {
    block.stmts.iter().any(stmt_always_returns)
}

fn stmt_always_returns(stmt: &ast::Stmt) -> bool {
    match stmt {
        ast::Stmt::Return(_) => true,
        ast::Stmt::If(if_stmt) => if_always_returns(if_stmt),
        _ => false,
    }
}

fn if_always_returns(if_stmt: &ast::IfStmt) -> bool {
    let else_returns = match &if_stmt.else_arm {
        None => false,
        Some(ast::ElseArm::Block(block)) => block_always_returns(block),
        Some(ast::ElseArm::If(nested)) => if_always_returns(nested),
    };
    block_always_returns(&if_stmt.then_block) && else_returns
}

struct Local {
    name: String,
    ty: TypeId,
    slot: u8,
}

/// Per-method checking and lowering state.
pub(crate) struct FunctionLowerer<'a, 'b> {
    pub an: &'b mut Analyzer<'a>,
    class_id: ClassId,
    class_name: String,
    namespace: String,
    return_ty: TypeId,
    locals: Vec<Local>,
    pub chunk: Chunk,
    max_locals: usize,
}

enum Place {
    Local(u8, TypeId),
    Field(u16, TypeId),
}

impl<'a, 'b> FunctionLowerer<'a, 'b> {
    fn new(an: &'b mut Analyzer<'a>, class_id: ClassId, return_ty: TypeId) -> Self {
        let class = an.env.class(class_id);
        let (class_name, namespace) = (class.name.clone(), class.namespace.clone());
        Self {
            an,
            class_id,
            class_name,
            namespace,
            return_ty,
            locals: vec![],
            chunk: Chunk::new(),
            max_locals: 0,
        }
    }

    fn error(&mut self, code: &str, message: String, span: Span) {
        let diagnostic = Diagnostic::error(self.an.file, message)
            .with_code(code)
            .with_label(Label::primary(span, ""));
        self.an.env.emit(diagnostic);
    }

    fn type_name(&self, ty: TypeId) -> String {
        self.an.env.type_name(ty).to_owned()
    }

    fn type_mismatch_unless(&mut self, expected: TypeId, found: TypeId, span: Span) {
        if expected != TypeId::ERROR && found != TypeId::ERROR && expected != found {
            let message = format!(
                "mismatched types: expected `{}`, found `{}`",
                self.type_name(expected),
                self.type_name(found)
            );
            self.error("E0310", message, span);
        }
    }

    fn declare_local(&mut self, name: &str, span: Span, ty: TypeId) -> Option<u8> {
        if self
            .locals
            .iter()
            .any(|local| local.name.eq_ignore_ascii_case(name))
        {
            self.error(
                "E0316",
                format!("a parameter or local variable named `{name}` is already declared"),
                span,
            );
            return None;
        }
        if self.locals.len() >= 255 {
            self.error("E0317", "too many local variables in method".to_owned(), span);
            return None;
        }
        let slot = self.locals.len() as u8;
        self.locals.push(Local {
            name: name.to_owned(),
            ty,
            slot,
        });
        self.max_locals = self.max_locals.max(self.locals.len());
        Some(slot)
    }

    fn resolve_place(&mut self, name: &ast::Ident) -> Option<Place> {
        if let Some(local) = self
            .locals
            .iter()
            .rev()
            .find(|local| local.name.eq_ignore_ascii_case(&name.name))
        {
            return Some(Place::Local(local.slot, local.ty));
        }
        let class = self.an.env.class(self.class_id);
        if let Some(slot) = class.field_slot(&name.name) {
            let ty = self.an.env.get_var(class.fields[slot]).ty;
            return Some(Place::Field(slot as u16, ty));
        }
        None
    }

    fn emit_jump(&mut self, op: Op) -> usize {
        let index = self.chunk.ops.len();
        self.chunk.ops.push(op);
        index
    }

    fn patch_to_here(&mut self, index: usize) {
        let target = self.chunk.ops.len() as u32;
        self.chunk.ops[index] = match self.chunk.ops[index] {
            Op::Jump(_) => Op::Jump(target),
            Op::JumpIfFalse(_) => Op::JumpIfFalse(target),
            Op::JumpIfTrue(_) => Op::JumpIfTrue(target),
            other => other,
        };
    }
}

/// # Statements
impl<'a, 'b> FunctionLowerer<'a, 'b> {
    fn check_block(&mut self, block: &ast::Block) {
        let enter = self.locals.len();
        for stmt in &block.stmts {
            self.check_stmt(stmt);
        }
        self.locals.truncate(enter);
    }

    fn check_stmt(&mut self, stmt: &ast::Stmt) {
        match stmt {
            ast::Stmt::Local(decl) => {
                let ty = self
                    .an
                    .resolve_type(&decl.ty, TypePosition::Local, Some(&self.namespace));
                let found = self.check_value_expr(&decl.init);
                self.type_mismatch_unless(ty, found, decl.init.span());
                if let Some(slot) = self.declare_local(&decl.name.name, decl.name.span, ty) {
                    self.chunk.ops.push(Op::StoreLocal(slot));
                }
            }
            ast::Stmt::Assign(assign) => {
                let place = self.resolve_place(&assign.target);
                let found = self.check_value_expr(&assign.value);
                match place {
                    Some(Place::Local(slot, ty)) => {
                        self.type_mismatch_unless(ty, found, assign.value.span());
                        self.chunk.ops.push(Op::StoreLocal(slot));
                    }
                    Some(Place::Field(slot, ty)) => {
                        self.type_mismatch_unless(ty, found, assign.value.span());
                        self.chunk.ops.push(Op::StoreField(slot));
                    }
                    None => {
                        let message = format!(
                            "cannot find value `{}` in this scope",
                            assign.target
                        );
                        self.error("E0306", message, assign.target.span);
                    }
                }
            }
            ast::Stmt::Expr(stmt) => {
                let ty = self.check_expr(&stmt.expr);
                if ty != TypeId::VOID && ty != TypeId::ERROR {
                    self.chunk.ops.push(Op::Pop);
                }
            }
            ast::Stmt::If(if_stmt) => self.check_if(if_stmt),
            ast::Stmt::While(while_stmt) => {
                let start = self.chunk.ops.len() as u32;
                self.check_condition(&while_stmt.condition);
                let exit = self.emit_jump(Op::JumpIfFalse(0));
                self.check_block(&while_stmt.body);
                self.chunk.ops.push(Op::Jump(start));
                self.patch_to_here(exit);
            }
            ast::Stmt::Return(ret) => self.check_return(ret),
        }
    }

    fn check_if(&mut self, if_stmt: &ast::IfStmt) {
        self.check_condition(&if_stmt.condition);
        let skip_then = self.emit_jump(Op::JumpIfFalse(0));
        self.check_block(&if_stmt.then_block);
        match &if_stmt.else_arm {
            None => self.patch_to_here(skip_then),
            Some(arm) => {
                let skip_else = self.emit_jump(Op::Jump(0));
                self.patch_to_here(skip_then);
                match arm {
                    ast::ElseArm::Block(block) => self.check_block(block),
                    ast::ElseArm::If(nested) => self.check_if(nested),
                }
                self.patch_to_here(skip_else);
            }
        }
    }

    fn check_return(&mut self, ret: &ast::ReturnStmt) {
        match (&ret.value, self.return_ty) {
            (None, ty) if ty == TypeId::VOID || ty == TypeId::ERROR => {
                self.chunk.ops.push(Op::ReturnVoid);
            }
            (None, ty) => {
                let message = format!(
                    "a method returning `{}` must return a value",
                    self.type_name(ty)
                );
                self.error("E0313", message, ret.span);
                self.chunk.ops.push(Op::ReturnVoid);
            }
            (Some(expr), ty) if ty == TypeId::VOID => {
                self.error(
                    "E0313",
                    "cannot return a value from a method returning `void`".to_owned(),
                    expr.span(),
                );
                self.check_value_expr(expr);
                self.chunk.ops.push(Op::ReturnVoid);
            }
            (Some(expr), ty) => {
                let found = self.check_value_expr(expr);
                self.type_mismatch_unless(ty, found, expr.span());
                self.chunk.ops.push(Op::Return);
            }
        }
    }

    fn check_condition(&mut self, condition: &ast::Expr) {
        let ty = self.check_value_expr(condition);
        if ty != TypeId::BOOL && ty != TypeId::ERROR {
            let message = format!(
                "mismatched types: expected `bool`, found `{}`",
                self.type_name(ty)
            );
            self.error("E0310", message, condition.span());
        }
    }
}

/// # Expressions
impl<'a, 'b> FunctionLowerer<'a, 'b> {
    /// Checks an expression that is required to produce a value.
    fn check_value_expr(&mut self, expr: &ast::Expr) -> TypeId {
        let ty = self.check_expr(expr);
        if ty == TypeId::VOID {
            self.error(
                "E0314",
                "this expression does not produce a value".to_owned(),
                expr.span(),
            );
            return TypeId::ERROR;
        }
        ty
    }

    fn check_expr(&mut self, expr: &ast::Expr) -> TypeId {
        match expr {
            ast::Expr::Lit(lit) => {
                let (value, ty) = match &lit.kind {
                    ast::LitKind::Bool(x) => (Value::Bool(*x), TypeId::BOOL),
                    ast::LitKind::Int(x) => (Value::Int(*x), TypeId::INT),
                    ast::LitKind::Float(x) => (Value::Float(*x), TypeId::FLOAT),
                    ast::LitKind::String(x) => (Value::String(x.clone()), TypeId::STRING),
                };
                let index = self.chunk.push_const(value);
                self.chunk.ops.push(Op::PushConst(index));
                ty
            }
            ast::Expr::Ident(ident) => match self.resolve_place(ident) {
                Some(Place::Local(slot, ty)) => {
                    self.chunk.ops.push(Op::LoadLocal(slot));
                    ty
                }
                Some(Place::Field(slot, ty)) => {
                    self.chunk.ops.push(Op::LoadField(slot));
                    ty
                }
                None => {
                    let message = format!("cannot find value `{ident}` in this scope");
                    self.error("E0306", message, ident.span);
                    TypeId::ERROR
                }
            },
            ast::Expr::Unary(unary) => self.check_unary(unary),
            ast::Expr::Binary(binary) => self.check_binary(binary),
            ast::Expr::Call(call) => self.check_call(call),
        }
    }

    fn check_unary(&mut self, unary: &ast::UnaryExpr) -> TypeId {
        let ty = self.check_value_expr(&unary.operand);
        if ty == TypeId::ERROR {
            return TypeId::ERROR;
        }
        match unary.op {
            ast::UnaryOp::Neg if ty == TypeId::INT || ty == TypeId::FLOAT => {
                self.chunk.ops.push(Op::Neg);
                ty
            }
            ast::UnaryOp::Not if ty == TypeId::BOOL => {
                self.chunk.ops.push(Op::Not);
                ty
            }
            _ => {
                let op = match unary.op {
                    ast::UnaryOp::Neg => "-",
                    ast::UnaryOp::Not => "!",
                };
                let message = format!(
                    "operator `{op}` cannot be applied to operand of type `{}`",
                    self.type_name(ty)
                );
                self.error("E0311", message, unary.op_span);
                TypeId::ERROR
            }
        }
    }

    fn check_binary(&mut self, binary: &ast::BinaryExpr) -> TypeId {
        use ast::BinaryOp as B;

        if matches!(binary.op, B::And | B::Or) {
            return self.check_logical(binary);
        }

        let lhs = self.check_value_expr(&binary.lhs);
        let rhs = self.check_value_expr(&binary.rhs);
        if lhs == TypeId::ERROR || rhs == TypeId::ERROR {
            return TypeId::ERROR;
        }

        let numeric = lhs == TypeId::INT || lhs == TypeId::FLOAT;
        let lowered = if lhs != rhs {
            None
        } else {
            match binary.op {
                B::Add if lhs == TypeId::STRING => Some((Op::Concat, TypeId::STRING)),
                B::Add if numeric => Some((Op::Add, lhs)),
                B::Sub if numeric => Some((Op::Sub, lhs)),
                B::Mul if numeric => Some((Op::Mul, lhs)),
                B::Div if numeric => Some((Op::Div, lhs)),
                B::Rem if numeric => Some((Op::Rem, lhs)),
                B::Lt if numeric => Some((Op::Lt, TypeId::BOOL)),
                B::Le if numeric => Some((Op::Le, TypeId::BOOL)),
                B::Gt if numeric => Some((Op::Gt, TypeId::BOOL)),
                B::Ge if numeric => Some((Op::Ge, TypeId::BOOL)),
                B::Eq => Some((Op::Eq, TypeId::BOOL)),
                B::Ne => Some((Op::Ne, TypeId::BOOL)),
                _ => None,
            }
        };
        match lowered {
            Some((op, ty)) => {
                self.chunk.ops.push(op);
                ty
            }
            None => {
                let message = format!(
                    "operator `{}` cannot be applied to operands of type `{}` and `{}`",
                    binary.op.pretty_name(),
                    self.type_name(lhs),
                    self.type_name(rhs)
                );
                self.error("E0311", message, binary.op_span);
                TypeId::ERROR
            }
        }
    }

    fn check_logical(&mut self, binary: &ast::BinaryExpr) -> TypeId {
        let lhs = self.check_value_expr(&binary.lhs);
        self.require_bool_operand(lhs, binary.op, binary.lhs.span());
        let short_circuit = match binary.op {
            ast::BinaryOp::And => self.emit_jump(Op::JumpIfFalse(0)),
            _ => self.emit_jump(Op::JumpIfTrue(0)),
        };
        let rhs = self.check_value_expr(&binary.rhs);
        self.require_bool_operand(rhs, binary.op, binary.rhs.span());
        let done = self.emit_jump(Op::Jump(0));
        self.patch_to_here(short_circuit);
        let short_value = Value::Bool(binary.op == ast::BinaryOp::Or);
        let index = self.chunk.push_const(short_value);
        self.chunk.ops.push(Op::PushConst(index));
        self.patch_to_here(done);
        TypeId::BOOL
    }

    fn require_bool_operand(&mut self, ty: TypeId, op: ast::BinaryOp, span: Span) {
        if ty != TypeId::BOOL && ty != TypeId::ERROR {
            let message = format!(
                "operator `{}` cannot be applied to operand of type `{}`",
                op.pretty_name(),
                self.type_name(ty)
            );
            self.error("E0311", message, span);
        }
    }

    fn check_call(&mut self, call: &ast::CallExpr) -> TypeId {
        match &call.callee {
            ast::Callee::Method(name) => {
                let Some(index) = self
                    .an
                    .env
                    .class(self.class_id)
                    .methods
                    .get_index_of(CaseInsensitive::new_ref(&name.name))
                else {
                    self.check_args_only(&call.args);
                    let message = format!(
                        "cannot find method `{name}` in class `{}`",
                        self.class_name
                    );
                    self.error("E0307", message, name.span);
                    return TypeId::ERROR;
                };
                let (params, return_ty) = {
                    let class = self.an.env.class(self.class_id);
                    let (_, &function_id) = class
                        .methods
                        .get_index(index)
                        .expect("method index just resolved");
                    let function = self.an.env.get_function(function_id);
                    let params: Vec<TypeId> = function
                        .params
                        .iter()
                        .map(|&param| self.an.env.get_var(param).ty)
                        .collect();
                    (params, function.return_ty)
                };
                self.check_call_args(&name.name, call, &params);
                self.chunk.ops.push(Op::CallMethod {
                    method: index as u16,
                    args: call.args.len() as u8,
                });
                return_ty
            }
            ast::Callee::Static { class, method } => {
                let namespace = self.namespace.clone();
                if self
                    .an
                    .find_script_class(Some(&namespace), &class.name)
                    .is_some()
                {
                    self.check_args_only(&call.args);
                    let message = format!("class `{class}` does not have static methods");
                    self.error("E0315", message, class.span);
                    return TypeId::ERROR;
                }
                let Some((library, native_class)) = self.an.find_native_class(&class.name)
                else {
                    self.check_args_only(&call.args);
                    let diagnostic = Diagnostic::error(
                        self.an.file,
                        format!("the name `{class}` does not exist in the current context"),
                    )
                    .with_code("E0308")
                    .with_label(Label::primary(class.span, ""))
                    .with_note(notes::MISSING_USING);
                    self.an.env.emit(diagnostic);
                    return TypeId::ERROR;
                };
                let Some(native_method) = native_class.method(&method.name) else {
                    self.check_args_only(&call.args);
                    let message = format!(
                        "cannot find method `{method}` in class `{}`",
                        native_class.name
                    );
                    self.error("E0307", message, method.span);
                    return TypeId::ERROR;
                };
                self.check_call_args(&method.name, call, native_method.params);
                let symbol = native_class.symbol(library, native_method);
                let native = self.an.intern_native(symbol);
                self.chunk.ops.push(Op::CallNative {
                    native,
                    args: call.args.len() as u8,
                });
                native_method.return_ty
            }
        }
    }

    fn check_call_args(&mut self, name: &str, call: &ast::CallExpr, params: &[TypeId]) {
        if call.args.len() != params.len() {
            let message = format!(
                "method `{name}` takes {} argument(s) but {} were supplied",
                params.len(),
                call.args.len()
            );
            self.error("E0309", message, call.span);
        }
        for (i, arg) in call.args.iter().enumerate() {
            let found = self.check_value_expr(arg);
            if let Some(&expected) = params.get(i) {
                self.type_mismatch_unless(expected, found, arg.span());
            }
        }
    }

    fn check_args_only(&mut self, args: &[ast::Expr]) {
        for arg in args {
            self.check_value_expr(arg);
        }
    }
}
