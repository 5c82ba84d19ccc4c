use pretty_assertions::assert_eq;

use super::*;
use crate::ast::{
    ClassKind, ExprKind, FunctionBody, IntKind, Stmt, StringPart, Visibility,
};

fn parse(source: &str) -> ParsedFile {
    parse_file("Main.kt", source)
}

fn messages(file: &ParsedFile) -> Vec<&str> {
    file.errors.iter().map(|e| e.message.as_str()).collect()
}

fn only_function(file: &ParsedFile) -> &crate::ast::FunctionDecl {
    match file.declarations.as_slice() {
        [Declaration::Function(f)] => f,
        other => panic!("expected one function, got {other:?}"),
    }
}

#[test]
fn empty_main() {
    let file = parse("fun main() {}");
    assert!(file.errors.is_empty());
    let main = only_function(&file);
    assert_eq!(main.name, "main");
    assert!(main.params.is_empty());
    assert!(main.return_type.is_none());
    assert_eq!(main.body, Some(FunctionBody::Block(crate::ast::Block {
        statements: Vec::new(),
        span: Span::new(11, 13),
    })));
}

#[test]
fn garbage_at_top_level_is_one_error() {
    let file = parse("abracadabra");
    assert_eq!(messages(&file), ["Expecting a top level declaration"]);
    assert!(file.declarations.is_empty());
    assert_eq!(file.errors[0].span, Span::new(0, 11));
}

#[test]
fn recovery_keeps_following_declarations() {
    let file = parse("oops\nfun a() {}\n)\nfun b() = 1");
    assert_eq!(file.errors.len(), 2);
    let names: Vec<&str> = file.declarations.iter().map(Declaration::name).collect();
    assert_eq!(names, ["a", "b"]);
}

#[test]
fn package_and_imports() {
    let file = parse("package foo.bar\n\nimport kotlin.math.*\nimport a.B as C\n\nval x = 1");
    assert_eq!(file.package.as_deref(), Some("foo.bar"));
    assert_eq!(file.imports.len(), 2);
    assert!(file.imports[0].star);
    assert_eq!(file.imports[0].path, "kotlin.math");
    assert_eq!(file.imports[1].alias.as_deref(), Some("C"));
    assert_eq!(file.declarations.len(), 1);
}

#[test]
fn expression_body_with_unresolved_return_type() {
    let file = parse("fun foo(): Bar = error()");
    assert!(file.errors.is_empty());
    let foo = only_function(&file);
    assert_eq!(foo.return_type.as_ref().map(|t| t.name.as_str()), Some("Bar"));
    let Some(FunctionBody::Expression(body)) = &foo.body else {
        panic!("expected expression body");
    };
    assert!(matches!(body.kind, ExprKind::Call { .. }));
}

#[test]
fn types_with_arguments_and_nullability() {
    let file = parse("fun f(a: List<Map<String, Int?>>, b: (Int) -> Unit): String? = null");
    assert!(file.errors.is_empty(), "{:?}", file.errors);
    let f = only_function(&file);
    let a = &f.params[0].ty;
    assert_eq!(a.name, "List");
    assert_eq!(a.args[0].args[1].name, "Int");
    assert!(a.args[0].args[1].nullable);
    assert_eq!(f.params[1].ty.name, "Function1");
    assert!(f.return_type.as_ref().is_some_and(|t| t.nullable));
}

#[test]
fn classes_objects_and_members() {
    let source = "\
open class Foo(val x: Int, private var y: String) : Base(), Iface {
    fun bar(): Int = x
    val z: Long = 1L
}

object Single {
    fun hi() {}
}

interface Shape
";
    let file = parse(source);
    assert!(file.errors.is_empty(), "{:?}", file.errors);
    let Declaration::Class(foo) = &file.declarations[0] else {
        panic!("expected class");
    };
    assert_eq!(foo.kind, ClassKind::Class);
    assert!(foo.modifiers.has("open"));
    assert_eq!(foo.ctor_params.len(), 2);
    assert_eq!(foo.ctor_params[0].property, Some(false));
    assert_eq!(foo.ctor_params[1].property, Some(true));
    assert_eq!(
        foo.ctor_params[1].modifiers.visibility,
        Some(Visibility::Private)
    );
    assert_eq!(foo.supertypes.len(), 2);
    assert_eq!(foo.members.len(), 2);

    let Declaration::Class(single) = &file.declarations[1] else {
        panic!("expected object");
    };
    assert_eq!(single.kind, ClassKind::Object);
    assert_eq!(single.members.len(), 1);

    let Declaration::Class(shape) = &file.declarations[2] else {
        panic!("expected interface");
    };
    assert_eq!(shape.kind, ClassKind::Interface);
}

#[test]
fn annotations_and_visibility() {
    let file = parse("@Composable\nprivate fun App() {}");
    let app = only_function(&file);
    assert!(app.modifiers.has_annotation("Composable"));
    assert_eq!(app.modifiers.effective_visibility(), Visibility::Private);
    assert_eq!(app.span.start, 0);
}

#[test]
fn extension_function_receiver() {
    let file = parse("fun String.shout(): String = this");
    let shout = only_function(&file);
    assert_eq!(shout.name, "shout");
    assert_eq!(shout.receiver.as_ref().map(|r| r.name.as_str()), Some("String"));
}

#[test]
fn statements_and_newline_termination() {
    let source = "\
fun main() {
    val a = 1 +
        2
    var b = a
    b += 3
    while (b > 0) b -= 1
    for (i in 0..10) { println(i) }
    return
}";
    let file = parse(source);
    assert!(file.errors.is_empty(), "{:?}", file.errors);
    let Some(FunctionBody::Block(body)) = &only_function(&file).body else {
        panic!("expected block body");
    };
    assert_eq!(body.statements.len(), 6);
    assert!(matches!(body.statements[0], Stmt::Local(_)));
    assert!(matches!(body.statements[2], Stmt::Assign { .. }));
    assert!(matches!(body.statements[3], Stmt::While { .. }));
    assert!(matches!(body.statements[4], Stmt::For { .. }));
    assert!(matches!(body.statements[5], Stmt::Return(None, _)));
}

#[test]
fn two_expressions_on_one_line() {
    let file = parse("fun main() { val a = 1 val b = 2 }");
    assert_eq!(
        messages(&file),
        ["Unexpected tokens (use ';' to separate expressions on the same line)"]
    );
}

#[test]
fn missing_closing_brace() {
    let file = parse("fun main() {\n    println(1)\n");
    assert_eq!(messages(&file), ["Expecting '}'"]);
}

#[test]
fn integer_literal_kinds() {
    let file = parse("val a = 1\nval b = 3000000000\nval c = 2L\nval d = 0xFFu");
    let kinds: Vec<IntKind> = file
        .declarations
        .iter()
        .filter_map(|d| match d {
            Declaration::Property(p) => match p.initializer.as_ref().map(|e| &e.kind) {
                Some(ExprKind::Int(_, kind)) => Some(*kind),
                _ => None,
            },
            _ => None,
        })
        .collect();
    assert_eq!(
        kinds,
        [IntKind::Int, IntKind::Long, IntKind::Long, IntKind::UInt]
    );
}

#[test]
fn string_templates() {
    let file = parse(r#"val s = "Hello, $name! ${count}\$""#);
    assert!(file.errors.is_empty(), "{:?}", file.errors);
    let Declaration::Property(s) = &file.declarations[0] else {
        panic!("expected property");
    };
    let Some(ExprKind::Str(parts)) = s.initializer.as_ref().map(|e| &e.kind) else {
        panic!("expected string");
    };
    assert_eq!(parts.len(), 5);
    assert_eq!(parts[0], StringPart::Text("Hello, ".to_string()));
    assert!(matches!(&parts[1], StringPart::Reference(n, _) if n == "name"));
    assert_eq!(parts[2], StringPart::Text("! ".to_string()));
    assert!(matches!(&parts[3], StringPart::Reference(n, _) if n == "count"));
    assert_eq!(parts[4], StringPart::Text("$".to_string()));
    if let StringPart::Reference(_, span) = &parts[1] {
        assert_eq!(file.text.get(span.start as usize..span.end as usize), Some("name"));
    }
}

#[test]
fn trailing_lambdas() {
    let file = parse("fun main() { items.forEach { x -> println(x) }\n run { 1 } }");
    assert!(file.errors.is_empty(), "{:?}", file.errors);
    let Some(FunctionBody::Block(body)) = &only_function(&file).body else {
        panic!("expected block body");
    };
    let Stmt::Expr(first) = &body.statements[0] else {
        panic!("expected expression");
    };
    let ExprKind::Call { args, .. } = &first.kind else {
        panic!("expected call");
    };
    assert!(matches!(&args[0].kind, ExprKind::Lambda { params, .. } if params == &["x"]));
}

#[test]
fn if_else_across_lines() {
    let file = parse("fun f(a: Int) = if (a > 0) {\n 1\n}\nelse {\n 2\n}");
    assert!(file.errors.is_empty(), "{:?}", file.errors);
    let Some(FunctionBody::Expression(body)) = &only_function(&file).body else {
        panic!("expected expression body");
    };
    assert!(matches!(&body.kind, ExprKind::If { else_branch: Some(_), .. }));
}

#[test]
fn facade_names() {
    assert_eq!(parse_file("Main.kt", "").facade_name(), "MainKt");
    assert_eq!(parse_file("my-file.kt", "").facade_name(), "My_fileKt");
    assert_eq!(parse_file("src/util.kt", "").facade_name(), "UtilKt");
}

#[test]
fn deep_nesting_does_not_overflow() {
    let depth = 5_000;
    let source = format!("val x = {}1{}", "(".repeat(depth), ")".repeat(depth));
    let file = parse(&source);
    assert!(file.errors.is_empty());
}

#[test]
fn vararg_params_and_getters() {
    let file = parse("fun sum(vararg xs: Int, scale: Int) = 0\nval answer: Int get() = 42");
    assert!(file.errors.is_empty());
    let [Declaration::Function(sum), Declaration::Property(answer)] = file.declarations.as_slice()
    else {
        panic!("expected a function and a property");
    };
    let varargs: Vec<bool> = sum.params.iter().map(|p| p.vararg).collect();
    assert_eq!(varargs, [true, false]);
    assert!(answer.has_getter);
    assert!(answer.initializer.is_some());
}

#[test]
fn template_expressions() {
    let file = parse(r#"val s = "sum: ${a + 1} and ${ name }, ${items.map { it * 2 }}""#);
    assert!(file.errors.is_empty(), "{:?}", file.errors);
    let Declaration::Property(s) = &file.declarations[0] else {
        panic!("expected property");
    };
    let Some(ExprKind::Str(parts)) = s.initializer.as_ref().map(|e| &e.kind) else {
        panic!("expected string");
    };
    assert_eq!(parts.len(), 6);
    assert_eq!(parts[0], StringPart::Text("sum: ".to_string()));
    let StringPart::Expression(sum) = &parts[1] else {
        panic!("expected expression, got {:?}", parts[1]);
    };
    assert!(matches!(sum.kind, ExprKind::Binary { .. }));
    assert_eq!(
        file.text.get(sum.span.start as usize..sum.span.end as usize),
        Some("a + 1")
    );
    assert_eq!(parts[2], StringPart::Text(" and ".to_string()));
    assert!(matches!(&parts[3], StringPart::Reference(n, _) if n == "name"));
    assert!(matches!(&parts[5], StringPart::Expression(e) if matches!(e.kind, ExprKind::Call { .. })));
}

#[test]
fn malformed_template_expressions() {
    assert_eq!(
        messages(&parse(r#"val s = "${}""#)),
        ["Expecting an expression"]
    );
    assert_eq!(
        messages(&parse(r#"val s = "${a b}""#)),
        ["Unexpected tokens in string template"]
    );
    assert_eq!(
        messages(&parse(r#"val s = "${a""#)),
        ["Unclosed string template expression"]
    );
    let file = parse(r#"val s = "x${a b}""#);
    assert_eq!(file.errors[0].span, Span::new(14, 15));
}
