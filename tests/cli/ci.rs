use crate::CliTest;

#[test]
fn ci_fails_when_keys_are_missing() {
    let test = CliTest::new().unwrap();
    test.write_file(
        ".algebras.config",
        "languages:\n  - en\n  - fr\nsource_language: en\n",
    )
    .unwrap();
    test.write_file("locales/en.json", r#"{"a": "A", "b": "B"}"#).unwrap();
    test.write_file("locales/fr.json", r#"{"a": "A-fr"}"#).unwrap();

    let output = test.ci_command().output().unwrap();
    assert!(!output.status.success());
    // ci never writes.
    let fr = test.read_file("locales/fr.json").unwrap();
    assert!(!fr.contains("\"b\""));
}

#[test]
fn ci_succeeds_when_everything_is_in_sync() {
    let test = CliTest::new().unwrap();
    test.write_file(
        ".algebras.config",
        "languages:\n  - en\n  - fr\nsource_language: en\n",
    )
    .unwrap();
    test.write_file("locales/en.json", r#"{"a": "A"}"#).unwrap();
    test.write_file("locales/fr.json", r#"{"a": "A-fr"}"#).unwrap();

    let output = test.ci_command().output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
}
