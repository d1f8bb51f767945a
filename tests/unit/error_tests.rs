use agent_relay::AppError;

#[test]
fn display_includes_domain_prefix() {
    let cases = [
        (AppError::Config("bad toml".into()), "config: bad toml"),
        (AppError::Gateway("bind failed".into()), "gateway: bind failed"),
        (
            AppError::Unauthorized("nope".into()),
            "unauthorized: nope",
        ),
        (AppError::Io("disk".into()), "io: disk"),
    ];
    for (err, expected) in cases {
        assert_eq!(format!("{err}"), expected);
    }
}

#[test]
fn toml_error_converts_to_config() {
    let parse_err = toml::from_str::<agent_relay::NotificationConfig>("delivery = 42")
        .expect_err("invalid toml must fail");
    let err: AppError = parse_err.into();
    assert!(
        format!("{err}").starts_with("config:"),
        "toml errors map to the config domain"
    );
}

#[test]
fn io_error_converts_to_io() {
    let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(format!("{err}").starts_with("io:"));
}
