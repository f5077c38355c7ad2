use crate::CliTest;

#[test]
fn update_only_fills_missing_keys() {
    let test = CliTest::new().unwrap();
    test.write_file(
        ".algebras.config",
        "languages:\n  - en\n  - fr\nsource_language: en\n",
    )
    .unwrap();
    test.write_file("locales/en.json", r#"{"a": "A", "b": "B"}"#).unwrap();
    test.write_file("locales/fr.json", r#"{"a": "A-fr"}"#).unwrap();

    let output = test.update_command().output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let fr = test.read_file("locales/fr.json").unwrap();
    assert!(fr.contains("A-fr"), "existing translated value should be preserved: {fr}");
    assert!(fr.contains("\"b\""), "missing key should have been added: {fr}");
}
