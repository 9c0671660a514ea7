//! Minimal Java source model.
//!
//! Enough structure to emit one utility class: a compilation unit holds a
//! class, the class holds fields, constructors and methods, and method bodies
//! are statement trees. Expressions stay plain strings. Everything renders
//! with four-space indentation.

use std::fmt::Write as _;

const INDENT: &str = "    ";

/// One `.java` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    /// Package declaration
    pub package: String,
    /// Fully qualified imports, emitted sorted and deduplicated
    pub imports: Vec<String>,
    /// The single top-level class
    pub class: ClassDecl,
}

/// A class declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassDecl {
    /// Javadoc lines, without comment markers
    pub doc: Vec<String>,
    /// Modifiers, e.g. `public final`
    pub modifiers: String,
    /// Simple class name
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<Field>,
    /// Constructors, rendered before methods
    pub constructors: Vec<Method>,
    /// Methods in declaration order
    pub methods: Vec<Method>,
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Modifiers, e.g. `private static`
    pub modifiers: String,
    /// Java type
    pub ty: String,
    /// Field name
    pub name: String,
    /// Initializer expression
    pub initializer: Option<String>,
}

/// A method or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Method {
    /// Modifiers, e.g. `public static synchronized`
    pub modifiers: String,
    /// Return type; `None` renders a constructor
    pub return_type: Option<String>,
    /// Method name (the class name for constructors)
    pub name: String,
    /// `(type, name)` pairs, rendered `final`
    pub params: Vec<(String, String)>,
    /// Checked exceptions
    pub throws: Vec<String>,
    /// Body statements
    pub body: Vec<Stmt>,
}

/// A statement inside a method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// A complete single-line statement including its `;`
    Line(String),
    /// A `//` comment
    Comment(String),
    /// `if` / `else if` chain with an optional trailing `else`
    If {
        /// `(condition, body)` in order
        branches: Vec<(String, Vec<Stmt>)>,
        /// Final `else` body
        otherwise: Option<Vec<Stmt>>,
    },
    /// Any `header { body }` construct, e.g. loops
    Block {
        /// Everything before the opening brace
        header: String,
        /// Loop or block body
        body: Vec<Stmt>,
    },
    /// `try` with optional resources, catch clauses and finally block
    Try {
        /// Resource declarations for try-with-resources
        resources: Vec<String>,
        /// Guarded statements
        body: Vec<Stmt>,
        /// Catch clauses in order
        catches: Vec<Catch>,
        /// Finally block
        finally: Option<Vec<Stmt>>,
    },
}

/// A catch clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catch {
    /// Caught exception type
    pub ty: String,
    /// Bound variable name
    pub name: String,
    /// Handler statements
    pub body: Vec<Stmt>,
}

impl Stmt {
    /// Single-line statement.
    pub fn line(text: impl Into<String>) -> Self {
        Self::Line(text.into())
    }

    /// Line comment.
    pub fn comment(text: impl Into<String>) -> Self {
        Self::Comment(text.into())
    }

    /// `if (condition) { body }`
    pub fn if_then(condition: impl Into<String>, body: Vec<Self>) -> Self {
        Self::If {
            branches: vec![(condition.into(), body)],
            otherwise: None,
        }
    }

    /// `header { body }`
    pub fn block(header: impl Into<String>, body: Vec<Self>) -> Self {
        Self::Block {
            header: header.into(),
            body,
        }
    }
}

impl Field {
    /// Create a field.
    pub fn new(modifiers: &str, ty: &str, name: &str) -> Self {
        Self {
            modifiers: modifiers.to_string(),
            ty: ty.to_string(),
            name: name.to_string(),
            initializer: None,
        }
    }

    /// Set the initializer expression.
    #[must_use]
    pub fn init(mut self, expr: impl Into<String>) -> Self {
        self.initializer = Some(expr.into());
        self
    }
}

impl Method {
    /// Create a method returning `return_type`.
    pub fn new(modifiers: &str, return_type: &str, name: &str) -> Self {
        Self {
            modifiers: modifiers.to_string(),
            return_type: Some(return_type.to_string()),
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Create a constructor for `class`.
    pub fn constructor(modifiers: &str, class: &str) -> Self {
        Self {
            modifiers: modifiers.to_string(),
            name: class.to_string(),
            ..Self::default()
        }
    }

    /// Add a parameter.
    #[must_use]
    pub fn param(mut self, ty: &str, name: &str) -> Self {
        self.params.push((ty.to_string(), name.to_string()));
        self
    }

    /// Declare a checked exception.
    #[must_use]
    pub fn throws(mut self, ty: &str) -> Self {
        self.throws.push(ty.to_string());
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }
}

impl CompilationUnit {
    /// Render the file.
    #[must_use]
    pub fn render(&self) -> String {
        let mut w = Writer::default();
        w.line(&format!("package {};", self.package));
        w.blank();

        let mut imports: Vec<&str> = self.imports.iter().map(String::as_str).collect();
        imports.sort_unstable();
        imports.dedup();
        if !imports.is_empty() {
            for import in imports {
                w.line(&format!("import {import};"));
            }
            w.blank();
        }

        self.class.render(&mut w);
        w.out
    }
}

impl ClassDecl {
    fn render(&self, w: &mut Writer) {
        if !self.doc.is_empty() {
            w.line("/**");
            for line in &self.doc {
                w.line(format!(" * {line}").trim_end());
            }
            w.line(" */");
        }
        w.open(&format!("{} class {}", self.modifiers, self.name));

        for field in &self.fields {
            w.blank();
            let decl = format!("{} {} {}", field.modifiers, field.ty, field.name);
            match &field.initializer {
                Some(init) => w.line(&format!("{decl} = {init};")),
                None => w.line(&format!("{decl};")),
            }
        }

        for method in self.constructors.iter().chain(&self.methods) {
            w.blank();
            method.render(w);
        }

        w.close();
    }
}

impl Method {
    fn render(&self, w: &mut Writer) {
        let params = self
            .params
            .iter()
            .map(|(ty, name)| format!("final {ty} {name}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut signature = self.modifiers.clone();
        if let Some(ty) = &self.return_type {
            let _ = write!(signature, " {ty}");
        }
        let _ = write!(signature, " {}({params})", self.name);
        if !self.throws.is_empty() {
            let _ = write!(signature, " throws {}", self.throws.join(", "));
        }

        w.open(&signature);
        render_stmts(&self.body, w);
        w.close();
    }
}

fn render_stmts(stmts: &[Stmt], w: &mut Writer) {
    for stmt in stmts {
        render_stmt(stmt, w);
    }
}

fn render_stmt(stmt: &Stmt, w: &mut Writer) {
    match stmt {
        Stmt::Line(text) => w.line(text),
        Stmt::Comment(text) => w.line(&format!("// {text}")),
        Stmt::If {
            branches,
            otherwise,
        } => {
            for (idx, (condition, body)) in branches.iter().enumerate() {
                if idx == 0 {
                    w.open(&format!("if ({condition})"));
                } else {
                    w.reopen(&format!("else if ({condition})"));
                }
                render_stmts(body, w);
            }
            if let Some(body) = otherwise {
                w.reopen("else");
                render_stmts(body, w);
            }
            w.close();
        }
        Stmt::Block { header, body } => {
            w.open(header);
            render_stmts(body, w);
            w.close();
        }
        Stmt::Try {
            resources,
            body,
            catches,
            finally,
        } => {
            if resources.is_empty() {
                w.open("try");
            } else {
                w.open(&format!("try ({})", resources.join("; ")));
            }
            render_stmts(body, w);
            for catch in catches {
                w.reopen(&format!("catch (final {} {})", catch.ty, catch.name));
                render_stmts(&catch.body, w);
            }
            if let Some(body) = finally {
                w.reopen("finally");
                render_stmts(body, w);
            }
            w.close();
        }
    }
}

/// Indentation-aware line buffer.
#[derive(Default)]
struct Writer {
    out: String,
    depth: usize,
}

impl Writer {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    /// `header {` and indent.
    fn open(&mut self, header: &str) {
        self.line(&format!("{header} {{"));
        self.depth += 1;
    }

    /// `} header {` at the current block's level.
    fn reopen(&mut self, header: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(&format!("}} {header} {{"));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }
}

/// Quote `value` as a Java string literal.
#[must_use]
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
