use std::net::TcpListener;

use jobboard::{app::start, config::AppSettings};

#[test]
fn test_port_defaults_to_5000() {
    let settings = AppSettings::default().with_env(|_| None).unwrap();
    assert_eq!(settings.server.port, 5000);
    assert_eq!(settings.server.full_url(), "0.0.0.0:5000");
}

#[test]
fn test_port_from_environment() {
    let settings = AppSettings::default()
        .with_env(|key| (key == "PORT").then(|| "8080".to_string()))
        .unwrap();
    assert_eq!(settings.server.port, 8080);
}

#[tokio::test]
async fn test_unreachable_database_never_binds() {
    let port = {
        let probe = TcpListener::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap().port()
    };
    let port_str = port.to_string();
    let settings = AppSettings::default()
        .with_env(|key| match key {
            "BIND_ADDRESS" => Some("127.0.0.1".to_string()),
            "PORT" => Some(port_str.clone()),
            "DATABASE_URL" => Some("invalid".to_string()),
            "DATABASE_CONNECT_RETRIES" => Some("0".to_string()),
            _ => None,
        })
        .unwrap();

    let err = start(&settings).await.unwrap_err();
    assert!(format!("{err:#}").contains("database"));

    // nothing holds the port
    assert!(TcpListener::bind(("127.0.0.1", port)).is_ok());
}

#[tokio::test]
async fn test_missing_database_url_fails_fast() {
    let settings = AppSettings::default().with_env(|_| None).unwrap();
    let err = start(&settings).await.unwrap_err();
    assert!(err.to_string().contains("DATABASE_URL"));
}
