use crate::CliTest;

#[test]
fn translate_creates_target_locale_file() {
    let test = CliTest::new().unwrap();
    test.write_file(
        ".algebras.config",
        "languages:\n  - en\n  - fr\nsource_language: en\n",
    )
    .unwrap();
    test.write_file("locales/en.json", r#"{"greeting": "Hi"}"#).unwrap();

    let output = test.translate_command().output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    assert!(test.root().join("locales/fr.json").is_file());
}

#[test]
fn translate_restricted_to_single_language() {
    let test = CliTest::new().unwrap();
    test.write_file(
        ".algebras.config",
        "languages:\n  - en\n  - fr\n  - de\nsource_language: en\n",
    )
    .unwrap();
    test.write_file("locales/en.json", r#"{"greeting": "Hi"}"#).unwrap();

    let mut cmd = test.translate_command();
    cmd.args(["--language", "fr"]);
    let output = cmd.output().unwrap();
    assert!(output.status.success());

    assert!(test.root().join("locales/fr.json").is_file());
    assert!(!test.root().join("locales/de.json").is_file());
}
