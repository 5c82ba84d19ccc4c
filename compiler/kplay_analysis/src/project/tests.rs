use pretty_assertions::assert_eq;

use super::*;

#[test]
fn tags_round_trip_through_from_str() {
    for target in ProjectType::ALL {
        assert_eq!(target.tag().parse::<ProjectType>().unwrap(), target);
    }
}

#[test]
fn unknown_tag_is_a_configuration_error() {
    let err = "junit".parse::<ProjectType>().unwrap_err();
    assert_eq!(err, ConfigurationError::UnknownTarget("junit".to_string()));
}

#[test]
fn deserializes_playground_json() {
    let json = r#"{"files":[{"name":"Main.kt","text":"fun main() {}"}],"args":"-Werror","confType":"js-ir"}"#;
    let project: Project = serde_json::from_str(json).unwrap();
    assert_eq!(project.conf_type, ProjectType::JsIr);
    assert_eq!(project.args, "-Werror");
    assert_eq!(project.files, [SourceFile::new("Main.kt", "fun main() {}")]);
    assert_eq!(serde_json::to_string(&project).unwrap(), json);
}

#[test]
fn missing_fields_take_defaults() {
    let project: Project = serde_json::from_str("{}").unwrap();
    assert_eq!(project, Project::new(ProjectType::Java));
}

#[test]
fn unknown_tag_fails_deserialization() {
    let err = serde_json::from_str::<Project>(r#"{"confType":"kotlin-native"}"#).unwrap_err();
    assert!(err.to_string().contains("unknown target type 'kotlin-native'"));
}

#[test]
fn duplicate_names_are_detected() {
    let project = Project::new(ProjectType::Java)
        .with_file("A.kt", "")
        .with_file("B.kt", "")
        .with_file("A.kt", "val x = 1");
    assert_eq!(project.duplicate_file(), Some("A.kt"));
    assert_eq!(Project::single(ProjectType::Java, "A.kt", "").duplicate_file(), None);
}
