//! Compile stage.
//!
//! Lowering a typed module is delegated to a [`CompilerBackend`]. The built-in
//! [`SwcBackend`] parses the module with swc, strips every TypeScript-only
//! construct (annotations, `as` casts, access modifiers, type-only imports)
//! and lowers `enum`s to plain objects. Before stripping it collects the
//! signatures of everything the module exports, which become the entry's
//! [`TypeDeclaration`]s.
//!
//! ```text
//! source ─► parse ─┬─► resolver ─► strip ─► hygiene ─► fixer ─► codegen ─► code
//!                  └─► exported signatures ─────────────────────► codegen ─► declarations
//! ```

use std::collections::HashSet;
use std::path::Path;
use swc_common::{
    comments::{Comments, SingleThreadedComments},
    sync::Lrc,
    FileName, Globals, Mark, SourceMap, DUMMY_SP, GLOBALS,
};
use swc_ecma_ast::{
    Accessibility, Class, ClassDecl, ClassExpr, ClassMember, Decl, DefaultDecl, EsVersion, Expr,
    ExportSpecifier, FnDecl, FnExpr, Function, Ident, Lit, Module, ModuleDecl, ModuleExportName,
    ModuleItem, Param, ParamOrTsParamProp, Pat, Program, Stmt, TsKeywordType, TsKeywordTypeKind,
    TsModuleName, TsParamPropParam, TsType, TsTypeAnn, VarDecl,
};
use swc_ecma_codegen::{text_writer::JsWriter, Emitter};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};
use swc_ecma_transforms_base::{fixer::fixer, hygiene::hygiene, resolver};
use swc_ecma_transforms_typescript::strip;
use swc_ecma_visit::FoldWith;
use thiserror::Error;

/// Emitted JavaScript level. Matches the oldest browsers in the CSS targets.
const TARGET: EsVersion = EsVersion::Es2020;

/// One exported binding, as it appears in the aggregated declaration file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDeclaration {
    pub name: String,
    /// Declaration text without `export`/`declare` modifiers.
    pub definition: String,
}

impl TypeDeclaration {
    #[must_use]
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
        }
    }
}

/// Executable module plus what was learned from its source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutput {
    pub code: String,
    pub declarations: Vec<TypeDeclaration>,
    /// Every static import and re-export specifier of the source, including
    /// the type-only ones that lowering removes.
    pub source_imports: Vec<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("failed to emit: {0}")]
    Emit(String),

    #[error("{0}")]
    Backend(String),
}

/// Compiler backend for the compile stage.
///
/// The trait is `Send + Sync`; files are compiled on parallel workers.
pub trait CompilerBackend: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &'static str;

    /// Lower `source` and extract its exported declarations.
    fn compile(&self, path: &Path, source: &str) -> Result<CompileOutput, CompileError>;
}

/// swc-based backend.
///
/// Every call builds its own source map and syntax globals, so one backend
/// is shared by all workers.
#[derive(Debug, Clone, Default)]
pub struct SwcBackend {
    _private: (),
}

impl SwcBackend {
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn is_typescript(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "ts" | "mts" | "cts"))
    }
}

impl CompilerBackend for SwcBackend {
    fn name(&self) -> &'static str {
        "swc"
    }

    fn compile(&self, path: &Path, source: &str) -> Result<CompileOutput, CompileError> {
        if source.trim().is_empty() {
            return Ok(CompileOutput::default());
        }

        let is_ts = Self::is_typescript(path);
        let cm: Lrc<SourceMap> = Lrc::default();
        let fm = cm.new_source_file(
            Lrc::new(FileName::Custom(path.display().to_string())),
            source.to_string(),
        );
        let comments = SingleThreadedComments::default();

        let syntax = if is_ts {
            Syntax::Typescript(TsSyntax {
                decorators: true,
                ..TsSyntax::default()
            })
        } else {
            Syntax::Es(EsSyntax {
                decorators: true,
                ..EsSyntax::default()
            })
        };

        let lexer = Lexer::new(syntax, TARGET, StringInput::from(&*fm), Some(&comments));
        let mut parser = Parser::new_from(lexer);
        let parsed = parser.parse_module();
        let mut errors: Vec<String> = parser
            .take_errors()
            .into_iter()
            .map(|e| describe_parse_error(&cm, &e))
            .collect();
        let module = match parsed {
            Ok(module) if errors.is_empty() => module,
            Ok(_) => return Err(CompileError::Parse(errors.join("; "))),
            Err(e) => {
                errors.insert(0, describe_parse_error(&cm, &e));
                return Err(CompileError::Parse(errors.join("; ")));
            }
        };

        let source_imports = source_imports(&module);
        let declarations = if is_ts {
            exported_declarations(&cm, &module)?
        } else {
            Vec::new()
        };

        let lowered = GLOBALS.set(&Globals::default(), || {
            let unresolved_mark = Mark::new();
            let top_level_mark = Mark::new();

            let mut program = Program::Module(module);
            program = program.fold_with(&mut resolver(unresolved_mark, top_level_mark, is_ts));
            if is_ts {
                program = program.fold_with(&mut strip(unresolved_mark, top_level_mark));
            }

            let module = match program {
                Program::Module(m) => m,
                Program::Script(s) => Module {
                    span: s.span,
                    body: s.body.into_iter().map(ModuleItem::Stmt).collect(),
                    shebang: s.shebang,
                },
            };
            module
                .fold_with(&mut hygiene())
                .fold_with(&mut fixer(Some(&comments)))
        });

        let code = emit_module(&cm, &lowered, Some(&comments))?;
        Ok(CompileOutput {
            code,
            declarations,
            source_imports,
        })
    }
}

fn describe_parse_error(cm: &SourceMap, error: &swc_ecma_parser::error::Error) -> String {
    let loc = cm.lookup_char_pos(error.span().lo);
    format!("line {}: {:?}", loc.line, error.kind())
}

fn emit_module(
    cm: &Lrc<SourceMap>,
    module: &Module,
    comments: Option<&dyn Comments>,
) -> Result<String, CompileError> {
    let mut buf = Vec::new();
    {
        let writer = JsWriter::new(cm.clone(), "\n", &mut buf, None);
        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default().with_target(TARGET),
            cm: cm.clone(),
            comments,
            wr: writer,
        };
        emitter
            .emit_module(module)
            .map_err(|e| CompileError::Emit(e.to_string()))?;
    }
    String::from_utf8(buf).map_err(|e| CompileError::Emit(format!("invalid UTF-8 output: {e}")))
}

fn source_imports(module: &Module) -> Vec<String> {
    module
        .body
        .iter()
        .filter_map(|item| match item {
            ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => Some(&import.src),
            ModuleItem::ModuleDecl(ModuleDecl::ExportAll(export)) => Some(&export.src),
            ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named)) => named.src.as_ref(),
            _ => None,
        })
        .map(|src| src.value.to_string())
        .collect()
}

// ============================================================================
// Exported signatures
// ============================================================================

/// Signatures of every binding the module exports, merged per name in first
/// export order. Overloads and merged interfaces share one entry.
fn exported_declarations(
    cm: &Lrc<SourceMap>,
    module: &Module,
) -> Result<Vec<TypeDeclaration>, CompileError> {
    let locals: Vec<&Decl> = module
        .body
        .iter()
        .filter_map(|item| match item {
            ModuleItem::Stmt(Stmt::Decl(decl)) => Some(decl),
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => Some(&export.decl),
            _ => None,
        })
        .collect();
    let overloaded: HashSet<String> = locals
        .iter()
        .filter_map(|decl| match decl {
            Decl::Fn(f) if f.function.body.is_none() => Some(f.ident.sym.to_string()),
            _ => None,
        })
        .collect();
    let local = |name: &str| {
        locals
            .iter()
            .copied()
            .find(|decl| bound_names(decl).iter().any(|n| n == name))
    };

    let mut signatures: Vec<Decl> = Vec::new();
    for item in &module.body {
        let ModuleItem::ModuleDecl(export) = item else {
            continue;
        };
        match export {
            ModuleDecl::ExportDecl(export) => {
                signatures.extend(signatures_of(&export.decl, None, None, &overloaded));
            }
            ModuleDecl::ExportDefaultDecl(export) => {
                signatures.extend(default_signature(&export.decl));
            }
            ModuleDecl::ExportDefaultExpr(export) => {
                if let Expr::Ident(id) = &*export.expr {
                    let name = id.sym.to_string();
                    if let Some(decl) = local(&name) {
                        signatures.extend(signatures_of(decl, Some(&name), None, &overloaded));
                    }
                }
            }
            ModuleDecl::ExportNamed(named) if named.src.is_none() => {
                for specifier in &named.specifiers {
                    let ExportSpecifier::Named(specifier) = specifier else {
                        continue;
                    };
                    let ModuleExportName::Ident(orig) = &specifier.orig else {
                        continue;
                    };
                    let exported = match &specifier.exported {
                        Some(ModuleExportName::Ident(exported)) => Some(exported),
                        _ => None,
                    };
                    let name = orig.sym.to_string();
                    if let Some(decl) = local(&name) {
                        signatures.extend(signatures_of(decl, Some(&name), exported, &overloaded));
                    }
                }
            }
            _ => {}
        }
    }

    let mut merged: Vec<TypeDeclaration> = Vec::new();
    for decl in signatures {
        let Some(name) = bound_names(&decl).into_iter().next() else {
            continue;
        };
        let text = print_declaration(cm, decl)?;
        match merged.iter_mut().find(|d| d.name == name) {
            Some(existing) if existing.definition.lines().any(|l| l == text) => {}
            Some(existing) => {
                existing.definition.push('\n');
                existing.definition.push_str(&text);
            }
            None => merged.push(TypeDeclaration::new(name, text)),
        }
    }
    Ok(merged)
}

fn bound_names(decl: &Decl) -> Vec<String> {
    match decl {
        Decl::Class(c) => vec![c.ident.sym.to_string()],
        Decl::Fn(f) => vec![f.ident.sym.to_string()],
        Decl::Var(var) => var
            .decls
            .iter()
            .filter_map(|d| match &d.name {
                Pat::Ident(binding) => Some(binding.id.sym.to_string()),
                _ => None,
            })
            .collect(),
        Decl::TsInterface(i) => vec![i.id.sym.to_string()],
        Decl::TsTypeAlias(a) => vec![a.id.sym.to_string()],
        Decl::TsEnum(e) => vec![e.id.sym.to_string()],
        Decl::TsModule(m) => match &m.id {
            TsModuleName::Ident(id) => vec![id.sym.to_string()],
            TsModuleName::Str(_) => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Body-less copies of `decl`, limited to the binding `only` and renamed to
/// `exported` when given.
fn signatures_of(
    decl: &Decl,
    only: Option<&str>,
    exported: Option<&Ident>,
    overloaded: &HashSet<String>,
) -> Vec<Decl> {
    if let Decl::Var(var) = decl {
        return var_signatures(var, only, exported);
    }
    let names = bound_names(decl);
    if only.is_some_and(|only| !names.iter().any(|n| n == only)) {
        return Vec::new();
    }
    if let Decl::Fn(f) = decl {
        // the implementation of an overloaded function is not part of its type
        if f.function.body.is_some() && overloaded.contains(&f.ident.sym.to_string()) {
            return Vec::new();
        }
    }

    let mut decl = decl.clone();
    make_ambient(&mut decl);
    if let Some(exported) = exported {
        rename(&mut decl, exported);
    }
    vec![decl]
}

fn var_signatures(var: &VarDecl, only: Option<&str>, exported: Option<&Ident>) -> Vec<Decl> {
    var.decls
        .iter()
        .filter_map(|declarator| {
            let Pat::Ident(binding) = &declarator.name else {
                return None;
            };
            if only.is_some_and(|only| binding.id.sym.to_string() != only) {
                return None;
            }

            let mut binding = binding.clone();
            if binding.type_ann.is_none() {
                binding.type_ann = Some(inferred_type(declarator.init.as_deref()));
            }
            if let Some(exported) = exported {
                binding.id.sym = exported.sym.clone();
            }

            let mut declarator = declarator.clone();
            declarator.name = Pat::Ident(binding);
            declarator.init = None;
            declarator.definite = false;

            let mut signature = var.clone();
            signature.declare = false;
            signature.decls = vec![declarator];
            Some(Decl::Var(Box::new(signature)))
        })
        .collect()
}

fn default_signature(decl: &DefaultDecl) -> Option<Decl> {
    let mut decl = match decl {
        DefaultDecl::Fn(FnExpr {
            ident: Some(ident),
            function,
            ..
        }) => Decl::Fn(FnDecl {
            ident: ident.clone(),
            declare: false,
            function: function.clone(),
        }),
        DefaultDecl::Class(ClassExpr {
            ident: Some(ident),
            class,
            ..
        }) => Decl::Class(ClassDecl {
            ident: ident.clone(),
            declare: false,
            class: class.clone(),
        }),
        DefaultDecl::TsInterfaceDecl(interface) => Decl::TsInterface(interface.clone()),
        _ => return None,
    };
    make_ambient(&mut decl);
    Some(decl)
}

fn make_ambient(decl: &mut Decl) {
    match decl {
        Decl::Fn(f) => {
            f.declare = false;
            function_signature(&mut f.function);
        }
        Decl::Class(c) => {
            c.declare = false;
            class_signature(&mut c.class);
        }
        Decl::TsInterface(i) => i.declare = false,
        Decl::TsTypeAlias(a) => a.declare = false,
        Decl::TsEnum(e) => e.declare = false,
        Decl::TsModule(m) => m.declare = false,
        _ => {}
    }
}

fn rename(decl: &mut Decl, to: &Ident) {
    let sym = to.sym.clone();
    match decl {
        Decl::Fn(f) => f.ident.sym = sym,
        Decl::Class(c) => c.ident.sym = sym,
        Decl::TsInterface(i) => i.id.sym = sym,
        Decl::TsTypeAlias(a) => a.id.sym = sym,
        Decl::TsEnum(e) => e.id.sym = sym,
        Decl::TsModule(m) => {
            if let TsModuleName::Ident(id) = &mut m.id {
                id.sym = sym;
            }
        }
        _ => {}
    }
}

fn function_signature(function: &mut Function) {
    function.body = None;
    function.is_async = false;
    function.is_generator = false;
    function.decorators.clear();
    for param in &mut function.params {
        signature_param(param);
    }
}

fn signature_param(param: &mut Param) {
    param.decorators.clear();
    param.pat = signature_pat(param.pat.clone());
}

/// Default values become optional parameters.
fn signature_pat(pat: Pat) -> Pat {
    let Pat::Assign(assign) = pat else {
        return pat;
    };
    match *assign.left {
        Pat::Ident(mut binding) => {
            binding.id.optional = true;
            Pat::Ident(binding)
        }
        other => other,
    }
}

fn class_signature(class: &mut Class) {
    class.decorators.clear();
    class.body.retain_mut(|member| match member {
        ClassMember::Constructor(ctor) => {
            ctor.body = None;
            for param in &mut ctor.params {
                // parameter properties are implementation-only
                let plain = match &*param {
                    ParamOrTsParamProp::TsParamProp(prop) => Some(Param {
                        span: prop.span,
                        decorators: Vec::new(),
                        pat: match &prop.param {
                            TsParamPropParam::Ident(binding) => Pat::Ident(binding.clone()),
                            TsParamPropParam::Assign(assign) => Pat::Assign(assign.clone()),
                        },
                    }),
                    ParamOrTsParamProp::Param(_) => None,
                };
                if let Some(plain) = plain {
                    *param = ParamOrTsParamProp::Param(plain);
                }
                if let ParamOrTsParamProp::Param(p) = param {
                    signature_param(p);
                }
            }
            ctor.accessibility != Some(Accessibility::Private)
        }
        ClassMember::Method(method) => {
            function_signature(&mut method.function);
            method.accessibility != Some(Accessibility::Private)
        }
        ClassMember::ClassProp(prop) => {
            prop.decorators.clear();
            if prop.type_ann.is_none() {
                prop.type_ann = Some(inferred_type(prop.value.as_deref()));
            }
            prop.value = None;
            prop.definite = false;
            prop.accessibility != Some(Accessibility::Private)
        }
        ClassMember::TsIndexSignature(_) => true,
        _ => false,
    });
}

/// Type of an unannotated binding, from its initializer.
fn inferred_type(init: Option<&Expr>) -> Box<TsTypeAnn> {
    let keyword = |kind| {
        Box::new(TsType::TsKeywordType(TsKeywordType {
            span: DUMMY_SP,
            kind,
        }))
    };
    let type_ann = match init {
        Some(Expr::Lit(Lit::Str(_)) | Expr::Tpl(_)) => {
            keyword(TsKeywordTypeKind::TsStringKeyword)
        }
        Some(Expr::Lit(Lit::Num(_))) => keyword(TsKeywordTypeKind::TsNumberKeyword),
        Some(Expr::Lit(Lit::Bool(_))) => keyword(TsKeywordTypeKind::TsBooleanKeyword),
        Some(Expr::TsAs(cast)) => cast.type_ann.clone(),
        _ => keyword(TsKeywordTypeKind::TsUnknownKeyword),
    };
    Box::new(TsTypeAnn {
        span: DUMMY_SP,
        type_ann,
    })
}

fn print_declaration(cm: &Lrc<SourceMap>, decl: Decl) -> Result<String, CompileError> {
    let module = Module {
        span: DUMMY_SP,
        body: vec![ModuleItem::Stmt(Stmt::Decl(decl))],
        shebang: None,
    };
    emit_module(cm, &module, None).map(|text| normalize_definition(&text))
}

/// Trim trailing whitespace per line and drop the trailing newline.
fn normalize_definition(text: &str) -> String {
    text.replace("\r\n", "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> CompileOutput {
        SwcBackend::new()
            .compile(Path::new("src/lib.ts"), source)
            .unwrap()
    }

    fn names(output: &CompileOutput) -> Vec<&str> {
        output.declarations.iter().map(|d| d.name.as_str()).collect()
    }

    fn definition<'a>(output: &'a CompileOutput, name: &str) -> &'a str {
        output
            .declarations
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.definition.as_str())
            .unwrap()
    }

    #[test]
    fn test_backend_name() {
        assert_eq!(SwcBackend::new().name(), "swc");
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(compile("  \n"), CompileOutput::default());
    }

    #[test]
    fn test_exported_interface_is_declared_and_removed() {
        let out = compile(
            "export interface Skeleton {\n  name: string;\n  bodies: Body[];\n}\nexport const x = 1;\n",
        );
        assert_eq!(names(&out), vec!["Skeleton", "x"]);
        let skeleton = definition(&out, "Skeleton");
        assert!(skeleton.starts_with("interface Skeleton {"));
        assert!(skeleton.contains("name: string;"));
        assert!(skeleton.contains("bodies: Body[];"));
        assert!(!out.code.contains("interface"));
        assert!(out.code.contains("export const x = 1;"));
    }

    #[test]
    fn test_annotations_are_removed_from_code() {
        let out = compile(
            "export function connect(url: string, retries: number = 3): Promise<void> {\n  return fetch(url as string).then((): void => undefined);\n}\n",
        );
        assert!(out.code.contains("export function connect(url, retries = 3)"));
        assert!(!out.code.contains(": string"));
        assert!(!out.code.contains(": number"));
        assert!(!out.code.contains("Promise<void>"));
        assert!(!out.code.contains(" as "));
    }

    #[test]
    fn test_function_signature_is_declared() {
        let out = compile(
            "export async function connect(url: string, retries: number = 3): Promise<void> {\n  await fetch(url);\n}\n",
        );
        assert_eq!(names(&out), vec!["connect"]);
        let connect = definition(&out, "connect");
        assert!(connect.starts_with("function connect(url: string, retries?: number): Promise<void>"));
        assert!(!connect.contains("async"));
        assert!(!connect.contains("fetch"));
    }

    #[test]
    fn test_enum_and_private_modifier_are_lowered() {
        let out = compile(
            "export enum Mode { Live, Embedded }\nclass Viewer {\n  private el: HTMLElement;\n  constructor(el: HTMLElement) { this.el = el as HTMLElement; }\n}\nnew Viewer(document.body);\n",
        );
        assert!(!out.code.contains("enum "));
        assert!(!out.code.contains("private"));
        assert!(!out.code.contains(" as "));
        assert!(out.code.contains("Mode"));
        assert!(definition(&out, "Mode").starts_with("enum Mode {"));
    }

    #[test]
    fn test_class_signature_drops_private_members_and_bodies() {
        let out = compile(
            "export class Viewer {\n  private secret = 1;\n  #hidden = 2;\n  url = '';\n  constructor(url: string) { this.url = url; }\n  open(): void { console.log(this.url); }\n}\n",
        );
        let viewer = definition(&out, "Viewer");
        assert!(viewer.starts_with("class Viewer {"));
        assert!(viewer.contains("url: string;"));
        assert!(viewer.contains("constructor(url: string);"));
        assert!(viewer.contains("open(): void;"));
        assert!(!viewer.contains("secret"));
        assert!(!viewer.contains("hidden"));
        assert!(!viewer.contains("console"));
    }

    #[test]
    fn test_const_signatures_use_annotation_or_literal_type() {
        let out = compile(
            "export const version = '1.0.0';\nexport let count: number = 0;\nexport const ready = false, size = 2;\nexport const embed = () => 1;\n",
        );
        assert_eq!(names(&out), vec!["version", "count", "ready", "size", "embed"]);
        assert_eq!(definition(&out, "version"), "const version: string;");
        assert_eq!(definition(&out, "count"), "let count: number;");
        assert_eq!(definition(&out, "ready"), "const ready: boolean;");
        assert_eq!(definition(&out, "size"), "const size: number;");
        assert_eq!(definition(&out, "embed"), "const embed: unknown;");
    }

    #[test]
    fn test_default_export_component_is_declared() {
        let out = compile(
            "export type ViewerProps = { recording: string };\nexport default function Viewer(props: ViewerProps) {\n  return props.recording;\n}\n",
        );
        assert_eq!(names(&out), vec!["ViewerProps", "Viewer"]);
        assert!(definition(&out, "Viewer").starts_with("function Viewer(props: ViewerProps)"));
        assert!(out.code.contains("export default function Viewer(props)"));
    }

    #[test]
    fn test_export_list_declares_local_bindings() {
        let out = compile(
            "function helper(a: number): number { return a; }\ninterface Local { a: 1 }\nconst hidden = 1;\nexport { helper as assist };\nexport type { Local };\n",
        );
        assert_eq!(names(&out), vec!["assist", "Local"]);
        assert!(definition(&out, "assist").starts_with("function assist(a: number): number"));
    }

    #[test]
    fn test_overloads_share_one_declaration() {
        let out = compile(
            "export function pick(a: string): string;\nexport function pick(a: number): number;\nexport function pick(a: any) { return a; }\n",
        );
        assert_eq!(names(&out), vec!["pick"]);
        let pick = definition(&out, "pick");
        assert_eq!(pick.lines().count(), 2);
        assert!(pick.contains("function pick(a: string): string;"));
        assert!(pick.contains("function pick(a: number): number;"));
    }

    #[test]
    fn test_private_bindings_are_not_declared() {
        let out = compile("interface Internal { a: 1 }\ntype Local = number;\nconst v: Local = 0;\nconsole.log(v);\n");
        assert!(out.declarations.is_empty());
        assert!(!out.code.contains("Internal"));
        assert!(!out.code.contains("type Local"));
    }

    #[test]
    fn test_type_only_imports_are_elided_but_reported() {
        let out = compile(
            "import type { Skeleton } from './types';\nimport { Pose } from './pose';\nimport { draw } from './draw';\nexport type { Skeleton } from './types';\ndraw({} as Pose);\n",
        );
        assert!(!out.code.contains("./types"));
        assert!(!out.code.contains("./pose"));
        assert!(out.code.contains("./draw"));
        assert_eq!(
            out.source_imports,
            vec!["./types", "./pose", "./draw", "./types"]
        );
    }

    #[test]
    fn test_default_import_named_type_is_kept() {
        let out = compile("import type from './type-helper';\nexport const helper = type('x');\n");
        assert!(out.code.contains("import type from"));
        assert!(out.code.contains("type-helper"));
        assert!(out.code.contains("type('x')"));
    }

    #[test]
    fn test_javascript_is_parsed_without_declarations() {
        let out = SwcBackend::new()
            .compile(
                Path::new("src/util.js"),
                "export function double(a) { return a * 2; }\n",
            )
            .unwrap();
        assert!(out.declarations.is_empty());
        assert!(out.code.contains("export function double(a)"));
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = SwcBackend::new()
            .compile(Path::new("src/bad.ts"), "const ok = 1;\nexport const = ;\n")
            .unwrap_err();
        match err {
            CompileError::Parse(message) => assert!(message.contains("line 2"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_generic_interface_and_alias() {
        let out = compile(
            "export interface Box<T> {\n  value: T;\n}\nexport type Pair<A, B> = [A, B];\n",
        );
        assert_eq!(names(&out), vec!["Box", "Pair"]);
        assert!(definition(&out, "Pair").starts_with("type Pair<A, B> = ["));
    }
}
