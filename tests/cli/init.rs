use crate::CliTest;

#[test]
fn init_creates_config_file() {
    let test = CliTest::new().unwrap();

    let output = test.init_command().output().unwrap();
    assert!(output.status.success());

    let config = test.read_file(".algebras.config").unwrap();
    assert!(config.contains("languages"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let test = CliTest::with_file(".algebras.config", "languages:\n  - en\n").unwrap();

    let output = test.init_command().output().unwrap();
    assert!(!output.status.success());
}
