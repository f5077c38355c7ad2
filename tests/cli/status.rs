use crate::CliTest;

#[test]
fn status_reports_missing_keys_without_writing() {
    let test = CliTest::new().unwrap();
    test.write_file(
        ".algebras.config",
        "languages:\n  - en\n  - fr\nsource_language: en\n",
    )
    .unwrap();
    test.write_file("locales/en.json", r#"{"a": "A", "b": "B"}"#).unwrap();
    test.write_file("locales/fr.json", r#"{"a": "A-fr"}"#).unwrap();

    let output = test.status_command().output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    // status never writes, regardless of what it finds.
    let fr = test.read_file("locales/fr.json").unwrap();
    assert!(!fr.contains("\"b\""));
}

#[test]
fn status_succeeds_when_everything_is_in_sync() {
    let test = CliTest::new().unwrap();
    test.write_file(
        ".algebras.config",
        "languages:\n  - en\n  - fr\nsource_language: en\n",
    )
    .unwrap();
    test.write_file("locales/en.json", r#"{"a": "A"}"#).unwrap();
    test.write_file("locales/fr.json", r#"{"a": "A-fr"}"#).unwrap();

    let output = test.status_command().output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
}
