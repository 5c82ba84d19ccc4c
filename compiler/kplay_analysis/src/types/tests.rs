use super::*;

#[test]
fn prim_names() {
    assert_eq!(Prim::from_name("Int"), Some(Prim::Int));
    assert_eq!(Prim::from_name("kotlin.Boolean"), Some(Prim::Boolean));
    assert_eq!(Prim::from_name("Integer"), None);
}

#[test]
fn widening() {
    assert_eq!(Prim::Byte.widen(Prim::Short), Prim::Int);
    assert_eq!(Prim::Int.widen(Prim::Long), Prim::Long);
    assert_eq!(Prim::Long.widen(Prim::Double), Prim::Double);
    assert_eq!(Prim::UInt.widen(Prim::UInt), Prim::UInt);
}

#[test]
fn assignability() {
    let int = Ty::Prim(Prim::Int);
    assert!(int.accepts(&int));
    assert!(int.accepts(&Ty::NOTHING));
    assert!(!int.accepts(&Ty::STRING));
    assert!(!int.accepts(&Ty::null()));
    assert!(int.clone().nullable().accepts(&Ty::null()));
    assert!(int.clone().nullable().accepts(&int));
    assert!(Ty::Prim(Prim::Any).accepts(&Ty::STRING));
    assert!(!Ty::Prim(Prim::Any).accepts(&Ty::STRING.nullable()));
    assert!(int.accepts(&Ty::Unknown));
    assert!(Ty::Error.accepts(&Ty::STRING));
}

#[test]
fn display() {
    assert_eq!(Ty::STRING.nullable().to_string(), "String?");
    assert_eq!(Ty::Class("Foo".into()).to_string(), "Foo");
    assert_eq!(Ty::Function(2).to_string(), "Function2");
}
