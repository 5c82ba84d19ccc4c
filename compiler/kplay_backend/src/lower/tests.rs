use kplay_analysis::{acquire, check_typed, Environment, Project, ProjectType};
use pretty_assertions::assert_eq;

use super::*;

fn lower_source(source: &str) -> LoweredModule {
    let env = Environment::bundled();
    let project = Project::single(ProjectType::Js, "Main.kt", source);
    let ctx = acquire(&env, &project, ProjectType::Js).unwrap();
    lower(&ctx, &check_typed(&ctx).inferred)
}

#[test]
fn value_kinds_follow_declared_types() {
    let module = lower_source("fun add(a: Int, b: Long, c: String?, d: Double): Long = b");
    let add = module.function("add").unwrap();
    let kinds: Vec<_> = add.params.iter().map(|p| p.kind).collect();
    assert_eq!(
        kinds,
        [ValueKind::I32, ValueKind::I64, ValueKind::Ref, ValueKind::F64]
    );
    assert_eq!(add.result, ValueKind::I64);
    assert_eq!(add.line, 1);
    assert_eq!(add.file, "Main.kt");
}

#[test]
fn untyped_bodies_infer_integer_results() {
    let module = lower_source("fun twice(x: Int) = x * 2\nfun big() = 1L + 2\nfun text() = \"a\"\nfun unit() {}");
    assert_eq!(module.function("twice").unwrap().result, ValueKind::I32);
    assert_eq!(module.function("big").unwrap().result, ValueKind::I64);
    assert_eq!(module.function("text").unwrap().result, ValueKind::Ref);
    assert_eq!(module.function("unit").unwrap().result, ValueKind::Unit);
    assert_eq!(
        module.function("twice").unwrap().body,
        vec![LStmt::Return(Some(binary(
            LBinOp::Mul,
            LExpr::Local("x".to_string()),
            LExpr::Int(2)
        )))]
    );
}

#[test]
fn templates_become_concatenation() {
    let module = lower_source("val name = \"kotlin\"\nfun greet() = \"hi $name!\"");
    let greet = module.function("greet").unwrap();
    assert_eq!(
        greet.body,
        vec![LStmt::Return(Some(LExpr::Concat(vec![
            LExpr::Str("hi ".to_string()),
            LExpr::Global("name".to_string()),
            LExpr::Str("!".to_string()),
        ])))]
    );
    assert_eq!(module.globals[0].name, "name");
}

#[test]
fn compound_assignment_is_expanded() {
    let module = lower_source("fun main() {\n    var total = 0\n    total += 3\n}");
    let main = module.function("main").unwrap();
    let total = LExpr::Local("total".to_string());
    assert_eq!(
        main.body[1],
        LStmt::Assign {
            target: total.clone(),
            value: binary(LBinOp::Add, total, LExpr::Int(3)),
        }
    );
}

#[test]
fn range_loops_count_in_their_own_scope() {
    let module = lower_source("fun main() {\n    for (i in 1..3) {\n        println(i)\n    }\n}");
    let main = module.function("main").unwrap();
    let LStmt::Scope(inner) = &main.body[0] else {
        panic!("expected a scope, got {:?}", main.body[0]);
    };
    assert_eq!(
        inner[0],
        LStmt::Let {
            name: "i".to_string(),
            value: Some(LExpr::Int(1)),
        }
    );
    let LStmt::While { condition, body } = &inner[2] else {
        panic!("expected a loop, got {:?}", inner[2]);
    };
    assert_eq!(
        *condition,
        binary(
            LBinOp::LtEq,
            LExpr::Local("i".to_string()),
            LExpr::Local("i$last".to_string())
        )
    );
    assert_eq!(
        body[0],
        LStmt::Expr(LExpr::Call {
            callee: "println".to_string(),
            args: vec![LExpr::Local("i".to_string())],
        })
    );
    assert_eq!(body.len(), 2);
}

#[test]
fn other_loops_stay_for_each() {
    let module = lower_source("fun main() {\n    for (x in listOf(1, 2)) {\n        println(x)\n    }\n}");
    let main = module.function("main").unwrap();
    assert!(matches!(&main.body[0], LStmt::ForEach { variable, .. } if variable == "x"));
}

#[test]
fn class_members_resolve_through_this() {
    let source = "class Counter(val start: Int) {\n    var count = start\n    fun next(): Int = count + 1\n    fun twice(): Int = next() * 2\n}\nfun main() {\n    val c = Counter(1)\n    c.next()\n}";
    let module = lower_source(source);
    let counter = &module.classes[0];
    assert_eq!(counter.name, "Counter");
    assert_eq!(counter.fields, ["start"]);
    assert_eq!(
        counter.properties[0].init,
        Some(LExpr::Local("start".to_string()))
    );
    let next = &counter.methods[0];
    assert_eq!(
        next.body,
        vec![LStmt::Return(Some(binary(
            LBinOp::Add,
            LExpr::Field {
                receiver: Box::new(LExpr::This),
                name: "count".to_string(),
                safe: false,
            },
            LExpr::Int(1)
        )))]
    );
    assert!(matches!(
        &counter.methods[1].body[0],
        LStmt::Return(Some(LExpr::Binary { lhs, .. })) if matches!(**lhs, LExpr::MethodCall { .. })
    ));

    let main = module.function("main").unwrap();
    assert_eq!(
        main.body[0],
        LStmt::Let {
            name: "c".to_string(),
            value: Some(LExpr::New {
                class: "Counter".to_string(),
                args: vec![LExpr::Int(1)],
            }),
        }
    );
}

#[test]
fn if_statements_and_expressions() {
    let source = "fun pick(flag: Boolean): Int = if (flag) { 1 } else { 2 }\nfun main() {\n    if (true) {\n        println(\"yes\")\n    }\n}";
    let module = lower_source(source);
    let pick = module.function("pick").unwrap();
    let LStmt::Return(Some(LExpr::If {
        then_branch,
        else_branch,
        ..
    })) = &pick.body[0]
    else {
        panic!("expected an if expression, got {:?}", pick.body[0]);
    };
    assert_eq!(then_branch.value.as_deref(), Some(&LExpr::Int(1)));
    assert_eq!(else_branch.value.as_deref(), Some(&LExpr::Int(2)));

    let main = module.function("main").unwrap();
    assert!(matches!(&main.body[0], LStmt::If { else_branch, .. } if else_branch.is_empty()));
}

#[test]
fn lambdas_default_to_it() {
    let module = lower_source("fun main() {\n    repeat(2) { println(it) }\n}");
    let main = module.function("main").unwrap();
    let LStmt::Expr(LExpr::Call { args, .. }) = &main.body[0] else {
        panic!("expected a call, got {:?}", main.body[0]);
    };
    let LExpr::Lambda { params, body } = &args[1] else {
        panic!("expected a lambda, got {:?}", args[1]);
    };
    assert_eq!(params, &["it"]);
    assert_eq!(
        body.value.as_deref(),
        Some(&LExpr::Call {
            callee: "println".to_string(),
            args: vec![LExpr::Local("it".to_string())],
        })
    );
}

#[test]
fn main_detection() {
    assert!(lower_source("fun main() {}").has_main());
    assert!(!lower_source("fun main(x: Int) {}").has_main());
    assert!(!lower_source("fun other() {}").has_main());
}

#[test]
fn integer_division_is_marked() {
    let module = lower_source("fun half(n: Int) = n / 2\nfun ratio(x: Double): Double = x / 2.0");
    assert_eq!(
        module.function("half").unwrap().body,
        vec![LStmt::Return(Some(binary(
            LBinOp::IntDiv(ValueKind::I32),
            LExpr::Local("n".to_string()),
            LExpr::Int(2)
        )))]
    );
    assert_eq!(
        module.function("ratio").unwrap().body,
        vec![LStmt::Return(Some(binary(
            LBinOp::Div,
            LExpr::Local("x".to_string()),
            LExpr::Float("2.0".to_string())
        )))]
    );
}
